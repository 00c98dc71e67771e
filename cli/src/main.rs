// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tessera Operator Tool
//!
//! Entry point for the `tessera` binary. Parses CLI arguments, initializes
//! logging, and runs one command against a local sled asset store.
//!
//! - `asset create` — define a multisig-governed asset and store it
//! - `issue`        — build an issuance fragment and print it as JSON
//! - `inspect`      — decode an issuance program
//! - `version`      — print build version information
//!
//! Ctrl+C or SIGTERM during `issue` cancels the build cleanly.

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;

use tessera_protocol::action::{Action, ActionEnv, BuildContext, BuildFragment, IssueRequest};
use tessera_protocol::asset::{Asset, AssetId, SledAssetStore};
use tessera_protocol::crypto::XPrv;
use tessera_protocol::program::{MultisigInspector, MultisigTerms, ProgramInspector};
use tessera_protocol::signers::Signer;
use tessera_protocol::transaction::ReferenceData;

use cli::{AssetCommands, Commands, CreateAssetArgs, IssueArgs, StoreArgs, TesseraCli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TesseraCli::parse();
    logging::init_logging(&cli.log, cli.log_format.into());

    match cli.command {
        Commands::Asset(AssetCommands::Create(args)) => print_json(&create_asset(&args)?),
        Commands::Issue(args) => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                shutdown_signal().await;
                tracing::info!("shutdown signal received, cancelling build");
                shutdown_tx.send_replace(true);
            });
            let report = issue(args, BuildContext::from_signal(shutdown_rx)).await?;
            print_json(&report)
        }
        Commands::Inspect(args) => print_json(&inspect(&args.program)?),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Everything a template builder needs from one issuance.
#[derive(Debug, Serialize)]
struct IssueReport {
    min_time: u64,
    effective_ttl_ms: u64,
    fragment: BuildFragment,
}

fn open_store(args: &StoreArgs) -> Result<SledAssetStore> {
    let dir = &args.data_dir;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create data directory: {}", dir.display()))?;
    SledAssetStore::open(dir)
        .with_context(|| format!("failed to open asset store at {}", dir.display()))
}

/// Defines an asset from the given cosigners and stores it.
fn create_asset(args: &CreateAssetArgs) -> Result<Asset> {
    let mut xpubs = args.xpubs.clone();
    xpubs.extend(args.seeds.iter().map(|s| XPrv::from_seed(s.as_bytes()).xpub()));

    let signer = Signer::new(xpubs, args.quorum, args.key_index)
        .context("invalid signer; pass at least one --xpub or --seed")?;
    let asset = Asset::define(args.alias.clone(), signer, args.initial_block_hash)
        .context("failed to build issuance program")?;

    let store = open_store(&args.store)?;
    store
        .insert(&asset)
        .with_context(|| format!("failed to store asset {}", asset.id))?;

    tracing::info!(
        asset_id = %asset.id,
        alias = ?asset.alias,
        quorum = asset.signer.quorum,
        keys = asset.signer.xpubs.len(),
        "asset created"
    );
    Ok(asset)
}

/// Builds one issuance against the local store.
async fn issue(args: IssueArgs, ctx: BuildContext) -> Result<IssueReport> {
    let store = Arc::new(open_store(&args.store)?);
    let env = Arc::new(ActionEnv::system(store));

    let reference_data = args
        .reference_data
        .as_deref()
        .map(ReferenceData::from_json)
        .transpose()
        .context("--reference-data must be a JSON object")?;

    let ctx = match args.timeout_ms {
        Some(ms) => ctx.with_timeout(Duration::from_millis(ms)),
        None => ctx,
    };

    let request = IssueRequest {
        asset_id: args.asset_id.map(AssetId::new),
        asset_alias: args.alias,
        amount: args.amount,
        ttl_ms: args.ttl_secs.map(|s| s.saturating_mul(1000)),
        reference_data,
    };

    let action = request
        .decode(env, &ctx)
        .await
        .context("failed to decode issuance request")?;
    let fragment = action.build(&ctx).await.map_err(|e| {
        tracing::warn!(kind = e.kind(), error = %e, "issuance build failed");
        e
    })?;

    tracing::info!(
        asset = %action.asset_amount(),
        "issuance fragment built"
    );
    Ok(IssueReport {
        min_time: action.min_time(),
        effective_ttl_ms: u64::try_from(action.effective_ttl().as_millis()).unwrap_or(u64::MAX),
        fragment,
    })
}

fn inspect(program_hex: &str) -> Result<MultisigTerms> {
    let program = hex::decode(program_hex.trim()).context("program is not valid hex")?;
    MultisigInspector
        .inspect(&program)
        .context("not a multisig issuance program")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{out}");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("tessera   {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {}", tessera_protocol::config::PROTOCOL_VERSION);
    println!("vm        {}", tessera_protocol::config::CURRENT_VM_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. A handler that cannot
/// be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
