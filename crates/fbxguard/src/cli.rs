//! Clap derive structures for the `fbxguard` CLI.
//!
//! Only clap and clap_complete may be used here: build.rs includes this
//! file directly to render man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fbxguard -- put a Freebox's forwarding and lease setup back after a reset
#[derive(Debug, Parser)]
#[command(
    name = "fbxguard",
    version,
    about = "Keep a Freebox's port redirections, static leases and incoming ports in line",
    long_about = "Snapshots the port redirections, static DHCP leases and incoming port\n\
        policies of a Freebox to YAML documents, and restores missing entries\n\
        when the appliance loses them (firmware upgrade, factory reset).\n\n\
        The first connection registers fbxguard as an application; approve\n\
        it on the Freebox front panel when asked.",
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

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Appliance profile to use
    #[arg(long, short = 'p', env = "FBXGUARD_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Appliance URL (overrides profile)
    #[arg(long, short = 'u', env = "FBXGUARD_URL", global = true)]
    pub url: Option<String>,

    /// CA bundle the appliance certificate chains to
    #[arg(long, env = "FBXGUARD_CA_CERT", global = true)]
    pub ca_cert: Option<PathBuf>,

    /// Accept any TLS certificate
    #[arg(long, short = 'k', env = "FBXGUARD_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "FBXGUARD_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "FBXGUARD_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, env = "FBXGUARD_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Output ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Restore missing entries from the saved documents
    ///
    /// Exits 1 when anything was restored or a class failed.
    Restore,

    /// Save the live configuration as the documents `restore` reads
    #[command(alias = "snapshot")]
    Save,

    /// List reachable LAN hosts, or look one up by name
    Hosts(HostsArgs),

    /// List DHCP leases
    Leases(LeasesArgs),

    /// Show appliance system information
    #[command(alias = "sys")]
    System,

    /// Inspect the CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct HostsArgs {
    /// Host name to look up; prints its IPv4 address and exits 1 when the
    /// host is unknown or unreachable
    pub name: Option<String>,

    /// Look at the guest Wi-Fi network instead of the main LAN
    #[arg(long, short = 'g')]
    pub guest: bool,

    /// Include unreachable hosts in the listing
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct LeasesArgs {
    /// Show dynamic leases instead of static ones
    #[arg(long, short = 'd')]
    pub dynamic: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Print the configuration file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
