//! # Actions
//!
//! An action turns one high-level intent into the low-level parts of a
//! transaction: inputs, outputs and signing instructions, plus the time
//! window in which the transaction may land. A template builder collects
//! fragments from many actions and merges them; that merging is not done
//! here.
//!
//! ```text
//! mod.rs      — Action trait, BuildFragment, ActionEnv
//! issue.rs    — IssueAction: mint new units of an asset
//! request.rs  — IssueRequest: decode an API request into an IssueAction
//! context.rs  — BuildContext: cancellation and deadlines
//! clock.rs    — Clock seam for the minimum-time bound
//! error.rs    — ActionError
//! ```
//!
//! ## Collaborators
//!
//! Actions reach the outside world only through [`ActionEnv`]: an asset
//! resolver, a nonce source, a program inspector and a clock. Every one is a
//! trait object behind an `Arc`, so a single environment serves any number of
//! concurrent builds.

pub mod clock;
pub mod context;
pub mod error;
pub mod issue;
pub mod request;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{BuildContext, CancelCause, CancelHandle};
pub use error::ActionError;
pub use issue::IssueAction;
pub use request::IssueRequest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::asset::AssetResolver;
use crate::config::ActionConfig;
use crate::crypto::{NonceSource, OsNonceSource};
use crate::program::{MultisigInspector, ProgramInspector};
use crate::transaction::{SigningInstruction, TxInput, TxOutput};

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// The contract every action kind fulfils.
///
/// Builders hold actions as `Arc<dyn Action>` and never look at the concrete
/// type.
#[async_trait]
pub trait Action: Send + Sync {
    /// How long after `min_time` the transaction stays valid.
    fn effective_ttl(&self) -> Duration;

    /// Earliest acceptable timestamp, in milliseconds since the Unix epoch.
    ///
    /// Recomputed from the clock on every call.
    fn min_time(&self) -> u64;

    /// Produces this action's fragment.
    ///
    /// Implementations check `ctx` before every external call and return
    /// [`ActionError::Cancelled`] once it is done.
    async fn build(&self, ctx: &BuildContext) -> Result<BuildFragment, ActionError>;
}

/// What one action contributes to a transaction template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFragment {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub signing_instructions: Vec<SigningInstruction>,
}

// ---------------------------------------------------------------------------
// ActionEnv
// ---------------------------------------------------------------------------

/// Collaborators and policy shared by the actions of a build request.
#[derive(Clone)]
pub struct ActionEnv {
    resolver: Arc<dyn AssetResolver>,
    nonces: Arc<dyn NonceSource>,
    inspector: Arc<dyn ProgramInspector>,
    clock: Arc<dyn Clock>,
    config: ActionConfig,
}

impl ActionEnv {
    /// Production wiring: OS entropy, the multisig inspector, the host clock
    /// and default time policy.
    pub fn system(resolver: Arc<dyn AssetResolver>) -> Self {
        Self {
            resolver,
            nonces: Arc::new(OsNonceSource),
            inspector: Arc::new(MultisigInspector),
            clock: Arc::new(SystemClock),
            config: ActionConfig::default(),
        }
    }

    pub fn with_nonce_source(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = nonces;
        self
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn ProgramInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: ActionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn resolver(&self) -> &dyn AssetResolver {
        self.resolver.as_ref()
    }

    pub fn nonce_source(&self) -> &dyn NonceSource {
        self.nonces.as_ref()
    }

    pub fn inspector(&self) -> &dyn ProgramInspector {
        self.inspector.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// `now - min_time_skew`, saturating at the epoch.
    pub fn min_time(&self) -> u64 {
        let skew = u64::try_from(self.config.min_time_skew.as_millis()).unwrap_or(u64::MAX);
        self.clock.now_ms().saturating_sub(skew)
    }

    /// `ttl` unless it is absent or zero, else the configured default.
    pub fn resolve_ttl(&self, ttl: Option<Duration>) -> Duration {
        match ttl {
            Some(ttl) if !ttl.is_zero() => ttl,
            _ => self.config.default_ttl,
        }
    }
}

impl fmt::Debug for ActionEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionEnv")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
