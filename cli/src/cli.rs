//! # CLI Interface
//!
//! Defines the command-line argument structure for `tessera` using `clap`
//! derive. Subcommands: `asset create`, `issue`, `inspect` and `version`.
//! Every flag that names a place or a policy can also come from a
//! `TESSERA_*` environment variable.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use tessera_protocol::crypto::{Hash, XPub};

/// Tessera transaction-construction tool.
///
/// Defines assets in a local store and builds issuance fragments against
/// them. Fragments are printed as JSON on stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "tessera",
    about = "Tessera asset and issuance tool",
    version,
    propagate_version = true
)]
pub struct TesseraCli {
    /// Log output format.
    #[arg(long, global = true, env = "TESSERA_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, env = "TESSERA_LOG", default_value = "tessera=info,tessera_protocol=info")]
    pub log: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage assets in the local store.
    #[command(subcommand)]
    Asset(AssetCommands),
    /// Build an issuance fragment and print it.
    Issue(IssueArgs),
    /// Decode a hex issuance program and print its multisig terms.
    Inspect(InspectArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum AssetCommands {
    /// Define a new multisig-governed asset and store it.
    Create(CreateAssetArgs),
}

/// Where the asset store lives.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Directory of the sled asset store. Created if missing.
    #[arg(long, short = 'd', env = "TESSERA_DATA_DIR", default_value = ".tessera")]
    pub data_dir: PathBuf,
}

/// Arguments for `asset create`.
#[derive(Args, Debug)]
pub struct CreateAssetArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Unique human-friendly name.
    #[arg(long)]
    pub alias: Option<String>,

    /// Cosigner extended public key, 128 hex chars. Repeatable.
    #[arg(long = "xpub", value_name = "HEX")]
    pub xpubs: Vec<XPub>,

    /// Derive a cosigner key from this seed. Repeatable. Devnets only.
    #[arg(long = "seed", value_name = "SEED")]
    pub seeds: Vec<String>,

    /// Signatures required to issue.
    #[arg(long, short = 'q', default_value_t = 1)]
    pub quorum: usize,

    /// Signer key index, separating this signer's paths from others on the
    /// same keys.
    #[arg(long, default_value_t = 1)]
    pub key_index: u64,

    /// Hash of the chain's initial block, 64 hex chars.
    #[arg(long, env = "TESSERA_INITIAL_BLOCK_HASH", default_value_t = Hash::ZERO)]
    pub initial_block_hash: Hash,
}

/// Arguments for `issue`.
#[derive(Args, Debug)]
pub struct IssueArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Asset identifier.
    #[arg(long, conflicts_with = "alias", required_unless_present = "alias")]
    pub asset_id: Option<String>,

    /// Asset alias, resolved through the store.
    #[arg(long)]
    pub alias: Option<String>,

    /// Units to issue.
    #[arg(long, short = 'a')]
    pub amount: u64,

    /// Validity window in seconds. 0 or absent means the default.
    #[arg(long, env = "TESSERA_TTL_SECS")]
    pub ttl_secs: Option<u64>,

    /// Reference data, a JSON object kept byte for byte.
    #[arg(long, value_name = "JSON")]
    pub reference_data: Option<String>,

    /// Abort the build after this many milliseconds.
    #[arg(long, env = "TESSERA_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,
}

/// Arguments for `inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Issuance program as hex.
    pub program: String,
}
