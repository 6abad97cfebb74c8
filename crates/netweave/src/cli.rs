//! Clap derive structures for the `netweave` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-level CLI ────────────────────────────────────────────────────

/// netweave -- declarative topology management for overlay networks
#[derive(Debug, Parser)]
#[command(
    name = "netweave",
    version,
    about = "Apply and export declarative network topologies",
    long_about = "Reconciles declarative network documents (P2P, P2M, MESH)\n\
        against an overlay control plane, and exports remote networks back\n\
        into reapplicable documents.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Control-plane profile to use
    #[arg(long, short = 'p', env = "NETWEAVE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Control-plane base URL (overrides profile)
    #[arg(long, env = "NETWEAVE_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Control-plane API token
    #[arg(long, env = "NETWEAVE_API_TOKEN", global = true, hide_env = true)]
    pub api_token: Option<String>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "NETWEAVE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "NETWEAVE_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if stdout is a terminal)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Topology kind as a CLI argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TopologyArg {
    P2p,
    P2m,
    Mesh,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile network documents against the control plane
    #[command(alias = "a")]
    Apply(ApplyArgs),

    /// Export remote networks as declarative documents
    #[command(alias = "x")]
    Export(ExportArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Network document files (YAML, multiple documents per file allowed)
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Resolve and diff without touching remote state
    #[arg(long)]
    pub dry_run: bool,

    /// Emit one JSON object per document instead of status lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Network names or ids to export (all networks when omitted)
    #[arg(value_name = "NETWORK")]
    pub networks: Vec<String>,

    /// Export under this topology instead of the stored one
    #[arg(long, value_enum)]
    pub topology: Option<TopologyArg>,

    /// Write the documents to a file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Emit a JSON array instead of a YAML document stream
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration
    Show,
    /// Print the configuration file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
