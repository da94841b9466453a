//! Clap derive structures for the `zyxly` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. This
//! file is also compiled by `build.rs` for man page generation, so it may
//! only depend on `clap` and `clap_complete`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// zyxly -- telemetry and control for Zyxel NR7101 cellular routers
#[derive(Debug, Parser)]
#[command(
    name = "zyxly",
    version,
    about = "Read signal, traffic, and device telemetry from Zyxel cellular routers",
    long_about = "Polls a Zyxel NR7101-family router over its local management API,\n\
        flattens the nested status JSON into named sensors, and exposes a\n\
        reboot command.",
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
    /// Stored router entry to use
    #[arg(long, short = 'e', env = "ZYXLY_ENTRY", global = true)]
    pub entry: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ZYXLY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Per-request timeout in seconds (overrides the stored entry)
    #[arg(long, env = "ZYXLY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
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

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to a router, validate credentials, and store it as an entry
    Setup(SetupArgs),

    /// List the router's sensors and their current values
    #[command(alias = "s")]
    Sensors(SensorsArgs),

    /// Poll continuously and print values as they change
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Reboot the router
    Reboot,

    /// Manage stored router entries
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Setup ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Name to store the entry under
    #[arg(long, short = 'n', default_value = "default")]
    pub name: String,

    /// Router address; `https://` is assumed when no scheme is given
    #[arg(long)]
    pub host: Option<String>,

    /// Login user
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Where to keep the password
    #[arg(long, value_enum)]
    pub store: Option<PasswordStore>,

    /// PEM CA bundle to verify the router certificate with
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PasswordStore {
    /// System keyring
    Keyring,
    /// Plaintext in the config file
    Plaintext,
    /// Do not store; supply ZYXLY_PASSWORD at run time
    None,
}

// ── Sensors ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SensorsArgs {
    /// Include unavailable sensors
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Print the raw flattened snapshot instead of sensors
    #[arg(long, conflicts_with = "all")]
    pub raw: bool,

    /// Only show sensors whose name or key contains this text
    #[arg(long, short = 'f')]
    pub filter: Option<String>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between refreshes
    #[arg(long, short = 'i', default_value = "30")]
    pub interval: u64,

    /// Only report sensors whose name or key contains this text
    #[arg(long, short = 'f')]
    pub filter: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display stored entries (passwords are never shown)
    Show,

    /// Print the config file location
    Path,

    /// Remove a stored entry and its keyring password
    Remove {
        /// Entry name
        name: String,
    },

    /// Make an entry the default
    Use {
        /// Entry name
        name: String,
    },

    /// Store an entry's password in the system keyring
    SetPassword {
        /// Entry name (defaults to the active entry)
        name: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
