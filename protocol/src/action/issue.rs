//! The issuance action: create new units of an existing asset.
//!
//! An issuance has no previous output to spend. Its single input carries a
//! fresh random nonce instead, and is authorized by satisfying the asset's
//! issuance program, a threshold multisig over keys derived from the asset's
//! signer. The build therefore:
//!
//! 1. resolves the asset,
//! 2. draws a nonce,
//! 3. derives the signer's asset-level key identifiers,
//! 4. reads the quorum from the issuance program,
//! 5. and only then assembles the signing instruction.
//!
//! Nothing is written anywhere. Any failure leaves no partial fragment.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{Action, ActionEnv, ActionError, BuildContext, BuildFragment};
use crate::asset::AssetAmount;
use crate::crypto::draw_nonce;
use crate::program::ProgramError;
use crate::signers::{self, KeySpace};
use crate::transaction::{key_ids, IssuanceInput, ReferenceData, SigningInstruction, TxInput};

/// Issue `asset_amount` of an asset.
///
/// Immutable once built; the builder consumes it through [`Action`].
#[derive(Debug, Clone)]
pub struct IssueAction {
    asset_amount: AssetAmount,
    ttl: Option<Duration>,
    reference_data: ReferenceData,
    env: Arc<ActionEnv>,
}

impl IssueAction {
    /// Rejects a zero amount.
    pub fn new(env: Arc<ActionEnv>, asset_amount: AssetAmount) -> Result<Self, ActionError> {
        if asset_amount.is_zero() {
            return Err(ActionError::ZeroAmount(asset_amount.asset_id));
        }
        Ok(Self {
            asset_amount,
            ttl: None,
            reference_data: ReferenceData::empty(),
            env,
        })
    }

    /// A zero TTL means "use the default", same as no TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_reference_data(mut self, reference_data: ReferenceData) -> Self {
        self.reference_data = reference_data;
        self
    }

    pub fn asset_amount(&self) -> &AssetAmount {
        &self.asset_amount
    }

    /// The TTL as supplied, before defaulting.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn reference_data(&self) -> &ReferenceData {
        &self.reference_data
    }
}

#[async_trait]
impl Action for IssueAction {
    fn effective_ttl(&self) -> Duration {
        self.env.resolve_ttl(self.ttl)
    }

    fn min_time(&self) -> u64 {
        self.env.min_time()
    }

    async fn build(&self, ctx: &BuildContext) -> Result<BuildFragment, ActionError> {
        let asset_id = &self.asset_amount.asset_id;
        debug!(asset_id = %asset_id, amount = self.asset_amount.amount, "building issuance");

        ctx.check()?;
        let asset = ctx
            .run(self.env.resolver().find_by_id(asset_id))
            .await?
            .map_err(|e| {
                debug!(asset_id = %asset_id, error = %e, "asset lookup failed");
                ActionError::from_id_lookup(asset_id, e)
            })?;

        ctx.check()?;
        let nonce = draw_nonce(self.env.nonce_source())?;

        let input = IssuanceInput::new(
            nonce,
            self.asset_amount.clone(),
            self.reference_data.clone(),
            asset.initial_block_hash,
            asset.issuance_program.clone(),
        );

        let path = signers::path(&asset.signer, KeySpace::Asset, &[]);
        let keys = key_ids(&asset.signer.xpubs, &path);

        let terms = self.env.inspector().inspect(&asset.issuance_program)?;
        if terms.key_count() != keys.len() {
            return Err(ProgramError::KeyCountMismatch {
                program: terms.key_count(),
                signer: keys.len(),
            }
            .into());
        }

        let key_count = keys.len();
        let mut instruction = SigningInstruction::new(self.asset_amount.clone());
        instruction.add_witness_keys(keys, terms.quorum);

        debug!(
            asset_id = %asset_id,
            amount = self.asset_amount.amount,
            quorum = terms.quorum,
            keys = key_count,
            "issuance built"
        );

        Ok(BuildFragment {
            inputs: vec![TxInput::Issuance(input)],
            outputs: Vec::new(),
            signing_instructions: vec![instruction],
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{CancelCause, Clock, ManualClock, SystemClock};
    use crate::asset::{Asset, AssetId, AssetResolver, MemoryRegistry, StoreError};
    use crate::config::ActionConfig;
    use crate::crypto::{sha256_array, Hash, NonceError, NonceSource, XPrv};
    use crate::program::p2sp_multisig_program;
    use crate::signers::Signer;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn signer(n: u8, quorum: usize) -> Signer {
        let xpubs = (0..n)
            .map(|i| XPrv::from_seed(format!("issue-test-{i}").as_bytes()).xpub())
            .collect();
        Signer::new(xpubs, quorum, 1).unwrap()
    }

    fn ast1() -> Asset {
        let mut asset =
            Asset::define(Some("gold".into()), signer(3, 2), Hash(sha256_array(b"genesis")))
                .unwrap();
        asset.id = AssetId::from("AST1");
        asset
    }

    fn env_with(asset: Asset) -> ActionEnv {
        let registry = MemoryRegistry::new();
        registry.insert(asset).unwrap();
        ActionEnv::system(Arc::new(registry))
    }

    fn issue(env: ActionEnv, amount: u64) -> IssueAction {
        IssueAction::new(Arc::new(env), AssetAmount::new("AST1", amount)).unwrap()
    }

    /// Counts lookups and optionally stalls before answering.
    struct CountingResolver {
        inner: MemoryRegistry,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl CountingResolver {
        fn new(asset: Asset, delay: Option<Duration>) -> Self {
            let inner = MemoryRegistry::new();
            inner.insert(asset).unwrap();
            Self {
                inner,
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl AssetResolver for CountingResolver {
        async fn find_by_id(&self, id: &AssetId) -> Result<Asset, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.inner.find_by_id(id).await
        }

        async fn find_by_alias(&self, alias: &str) -> Result<Asset, StoreError> {
            self.inner.find_by_alias(alias).await
        }
    }

    struct Unreachable;

    #[async_trait]
    impl AssetResolver for Unreachable {
        async fn find_by_id(&self, _id: &AssetId) -> Result<Asset, StoreError> {
            Err(StoreError::Backend("connection refused".into()))
        }

        async fn find_by_alias(&self, _alias: &str) -> Result<Asset, StoreError> {
            Err(StoreError::Backend("connection refused".into()))
        }
    }

    struct Exhausted;

    impl NonceSource for Exhausted {
        fn fill(&self, _dest: &mut [u8]) -> Result<(), NonceError> {
            Err(NonceError::Unavailable("entropy pool empty".into()))
        }
    }

    // -- time bounds --------------------------------------------------------

    #[test]
    fn ttl_defaults_to_one_minute() {
        let action = issue(env_with(ast1()), 1);
        assert_eq!(action.effective_ttl(), Duration::from_secs(60));
        assert_eq!(action.ttl(), None);

        let zero = issue(env_with(ast1()), 1).with_ttl(Duration::ZERO);
        assert_eq!(zero.effective_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn explicit_ttl_is_kept() {
        let action = issue(env_with(ast1()), 1).with_ttl(Duration::from_secs(5));
        assert_eq!(action.effective_ttl(), Duration::from_secs(5));
    }

    #[test]
    fn min_time_follows_the_clock() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let env = env_with(ast1()).with_clock(clock.clone());
        let action = issue(env, 1);

        assert_eq!(action.min_time(), 1_700_000_000_000 - 300_000);
        clock.advance(Duration::from_secs(1));
        assert_eq!(action.min_time(), 1_700_000_000_000 - 299_000);
    }

    #[test]
    fn min_time_against_system_clock() {
        let action = issue(env_with(ast1()).with_clock(Arc::new(SystemClock)), 1);
        let before = SystemClock.now_ms();
        let min_time = action.min_time();
        let after = SystemClock.now_ms();

        assert!(min_time >= before - 300_000);
        assert!(min_time <= after - 300_000);
    }

    #[test]
    fn configured_default_ttl() {
        let env = env_with(ast1()).with_config(ActionConfig {
            default_ttl: Duration::from_secs(10),
            ..ActionConfig::default()
        });
        assert_eq!(issue(env, 1).effective_ttl(), Duration::from_secs(10));
    }

    // -- build --------------------------------------------------------------

    #[tokio::test]
    async fn builds_two_of_three_issuance() {
        let asset = ast1();
        let rd = ReferenceData::from_json(r#"{"memo": "test"}"#).unwrap();
        let action = issue(env_with(asset.clone()), 100).with_reference_data(rd.clone());

        let frag = action.build(&BuildContext::background()).await.unwrap();

        assert_eq!(frag.inputs.len(), 1);
        assert!(frag.outputs.is_empty());
        assert_eq!(frag.signing_instructions.len(), 1);

        let input = frag.inputs[0].as_issuance().unwrap();
        assert_eq!(input.nonce.len(), 8);
        assert_eq!(input.asset_amount, AssetAmount::new("AST1", 100));
        assert_eq!(input.reference_data, rd);
        assert_eq!(input.initial_block_hash, asset.initial_block_hash);
        assert_eq!(input.issuance_program, asset.issuance_program);
        assert!(input.arguments.is_empty());

        let instr = &frag.signing_instructions[0];
        assert_eq!(instr.asset_amount, AssetAmount::new("AST1", 100));
        assert_eq!(instr.witness_components.len(), 1);
        assert_eq!(instr.witness_components[0].quorum, 2);
        assert_eq!(instr.witness_components[0].keys.len(), 3);

        assert_eq!(action.effective_ttl(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn witness_keys_match_the_program() {
        let asset = ast1();
        let action = issue(env_with(asset.clone()), 1);
        let frag = action.build(&BuildContext::background()).await.unwrap();

        let derived: Vec<_> = frag.signing_instructions[0].witness_components[0]
            .keys
            .iter()
            .map(|k| k.derive_public_key())
            .collect();
        let expected = p2sp_multisig_program(&derived, 2).unwrap();
        assert_eq!(expected, asset.issuance_program);
    }

    #[tokio::test]
    async fn nonces_differ_between_builds() {
        let action = issue(env_with(ast1()), 1);
        let ctx = BuildContext::background();
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let frag = action.build(&ctx).await.unwrap();
            let nonce = frag.inputs[0].as_issuance().unwrap().nonce.clone();
            assert!(seen.insert(nonce));
        }
    }

    #[test]
    fn zero_amount_is_refused() {
        let err = IssueAction::new(Arc::new(env_with(ast1())), AssetAmount::new("AST1", 0))
            .unwrap_err();
        assert!(matches!(err, ActionError::ZeroAmount(id) if id.as_str() == "AST1"));
    }

    // -- failures -----------------------------------------------------------

    #[tokio::test]
    async fn unknown_asset_names_the_id() {
        let env = env_with(ast1());
        let action = IssueAction::new(Arc::new(env), AssetAmount::new("AST404", 5)).unwrap();
        let err = action.build(&BuildContext::background()).await.unwrap_err();

        assert!(matches!(err, ActionError::AssetNotFound { ref id, .. } if id == "AST404"));
        assert!(err.to_string().contains("AST404"));
    }

    #[tokio::test]
    async fn resolver_failure_is_not_not_found() {
        let env = ActionEnv::system(Arc::new(Unreachable));
        let err = issue(env, 5)
            .build(&BuildContext::background())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Resolver(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn exhausted_entropy_fails_the_build() {
        let env = env_with(ast1()).with_nonce_source(Arc::new(Exhausted));
        let err = issue(env, 5)
            .build(&BuildContext::background())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "entropy_unavailable");
    }

    #[tokio::test]
    async fn malformed_program_yields_no_instruction() {
        let mut asset = ast1();
        asset.issuance_program = vec![0x76, 0x6b, 0x00];
        let err = issue(env_with(asset), 5)
            .build(&BuildContext::background())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::MalformedSpendingProgram(_)));
    }

    #[tokio::test]
    async fn key_count_mismatch_is_malformed() {
        let mut asset = ast1();
        let two_keys: Vec<_> = signer(2, 1)
            .xpubs
            .iter()
            .map(|x| x.public_key())
            .collect();
        asset.issuance_program = p2sp_multisig_program(&two_keys, 1).unwrap();

        let err = issue(env_with(asset), 5)
            .build(&BuildContext::background())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::MalformedSpendingProgram(ProgramError::KeyCountMismatch {
                program: 2,
                signer: 3
            })
        ));
    }

    // -- cancellation -------------------------------------------------------

    #[tokio::test]
    async fn cancelled_before_build_never_calls_resolver() {
        let resolver = Arc::new(CountingResolver::new(ast1(), None));
        let action = issue(ActionEnv::system(resolver.clone()), 5);

        let (ctx, handle) = BuildContext::cancellable();
        handle.cancel();
        let err = action.build(&ctx).await.unwrap_err();

        assert!(matches!(err, ActionError::Cancelled(CancelCause::Signalled)));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_never_calls_resolver() {
        let resolver = Arc::new(CountingResolver::new(ast1(), None));
        let action = issue(ActionEnv::system(resolver.clone()), 5);

        let ctx = BuildContext::background().with_deadline(tokio::time::Instant::now());
        let err = action.build(&ctx).await.unwrap_err();

        assert!(matches!(err, ActionError::Cancelled(CancelCause::DeadlineExceeded)));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_slow_lookup() {
        let resolver = Arc::new(CountingResolver::new(ast1(), Some(Duration::from_secs(30))));
        let action = issue(ActionEnv::system(resolver.clone()), 5);

        let ctx = BuildContext::background().with_timeout(Duration::from_millis(100));
        let err = action.build(&ctx).await.unwrap_err();

        assert!(matches!(err, ActionError::Cancelled(CancelCause::DeadlineExceeded)));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_builds_share_one_env() {
        let action = Arc::new(issue(env_with(ast1()), 3));
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let action = action.clone();
                tokio::spawn(async move { action.build(&BuildContext::background()).await })
            })
            .collect();

        let mut nonces = HashSet::new();
        for task in tasks {
            let frag = task.await.unwrap().unwrap();
            nonces.insert(frag.inputs[0].as_issuance().unwrap().nonce.clone());
        }
        assert_eq!(nonces.len(), 32);
    }
}
