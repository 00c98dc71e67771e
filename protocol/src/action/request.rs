//! Decoding issuance requests.
//!
//! Callers may name an asset by alias. The action itself only knows asset
//! identifiers, so the alias is resolved here, once, before the action
//! exists.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{ActionEnv, ActionError, BuildContext, IssueAction};
use crate::asset::{AssetAmount, AssetId};
use crate::transaction::ReferenceData;

/// An issuance as it arrives over an API boundary.
///
/// ```json
/// {"asset_alias": "gold", "amount": 100, "reference_data": {"memo": "test"}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_alias: Option<String>,

    pub amount: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_data: Option<ReferenceData>,
}

impl IssueRequest {
    /// Resolves the asset and builds the action.
    ///
    /// An explicit `asset_id` wins over `asset_alias`, and no lookup happens
    /// in that case.
    pub async fn decode(
        self,
        env: Arc<ActionEnv>,
        ctx: &BuildContext,
    ) -> Result<IssueAction, ActionError> {
        let asset_id = match (self.asset_id, self.asset_alias) {
            (Some(id), _) => id,
            (None, Some(alias)) => {
                ctx.check()?;
                ctx.run(env.resolver().find_by_alias(&alias))
                    .await?
                    .map_err(|e| ActionError::from_alias_lookup(&alias, e))?
                    .id
            }
            (None, None) => return Err(ActionError::MissingAsset),
        };

        let mut action = IssueAction::new(env, AssetAmount::new(asset_id, self.amount))?;
        if let Some(ms) = self.ttl_ms {
            action = action.with_ttl(Duration::from_millis(ms));
        }
        if let Some(reference_data) = self.reference_data {
            action = action.with_reference_data(reference_data);
        }
        Ok(action)
    }
}
