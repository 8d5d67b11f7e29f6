//! Clap derive structures for the `guestwire` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// guestwire -- manage router hotspot guest users from the command line
#[derive(Debug, Parser)]
#[command(
    name = "guestwire",
    version,
    about = "Manage router hotspot guest users from the command line",
    long_about = "Adds, removes and lists hotspot users and active guest sessions\n\
        over the router's binary management API (default port 8728).",
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
    /// Router profile to use
    #[arg(long, short = 'p', env = "GUESTWIRE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Router host or IP (overrides profile)
    #[arg(long, short = 'H', env = "GUESTWIRE_HOST", global = true)]
    pub host: Option<String>,

    /// Management API port (overrides profile)
    #[arg(long, env = "GUESTWIRE_PORT", global = true)]
    pub port: Option<u16>,

    /// Login user; replaces the profile's credential candidates
    #[arg(long, short = 'u', env = "GUESTWIRE_USERNAME", global = true)]
    pub username: Option<String>,

    /// Login password for --username
    #[arg(long, env = "GUESTWIRE_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "GUESTWIRE_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Timeout in seconds for every router operation (overrides profile)
    #[arg(long, env = "GUESTWIRE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage hotspot users (guest credentials)
    #[command(alias = "user", alias = "u")]
    Users(UsersArgs),

    /// View and disconnect active hotspot sessions
    #[command(alias = "active", alias = "s")]
    Sessions(SessionsArgs),

    /// Send a raw API command and print the reply rows
    Raw(RawArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  USERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List hotspot users
    #[command(alias = "ls")]
    List,

    /// Show one hotspot user
    #[command(alias = "get")]
    Show {
        /// User name
        name: String,
    },

    /// Add a hotspot user
    #[command(alias = "create")]
    Add {
        /// User name
        name: String,

        /// Password the guest logs in with
        #[arg(long = "guest-password", short = 'P')]
        guest_password: String,

        /// Hotspot user profile (rate limits, shared users)
        #[arg(long)]
        hotspot_profile: Option<String>,

        /// Total uptime allowed, e.g. "2h" or "1day 12h"
        #[arg(long, short = 't', value_parser = parse_duration)]
        time_limit: Option<Duration>,

        /// Free-form comment stored on the router
        #[arg(long)]
        comment: Option<String>,
    },

    /// Remove a hotspot user
    #[command(alias = "rm", alias = "delete")]
    Remove {
        /// User name
        name: String,
    },
}

fn parse_duration(value: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(value)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SESSIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    /// List active sessions
    #[command(alias = "ls")]
    List,

    /// Disconnect every active session of a user
    #[command(alias = "disconnect")]
    Kick {
        /// User name
        user: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RAW
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RawArgs {
    /// Command path, e.g. /system/resource/print
    pub command: String,

    /// Extra words sent verbatim, e.g. =name=guest ?user=guest
    #[arg(allow_hyphen_values = true)]
    pub words: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current configuration (secrets masked)
    Show,

    /// Create or replace a profile (uses --profile, default "default")
    Init {
        /// Router host or IP (prompted when omitted)
        #[arg(long = "router")]
        router: Option<String>,

        /// Management API port
        #[arg(long = "api-port")]
        api_port: Option<u16>,

        /// Login user (prompted when omitted)
        #[arg(long = "login")]
        login: Option<String>,

        /// Read the password from this environment variable at run time
        #[arg(long, conflicts_with = "keyring")]
        password_env: Option<String>,

        /// Store --password in the system keyring instead of the file
        #[arg(long)]
        keyring: bool,

        /// Replace an existing profile of the same name
        #[arg(long)]
        force: bool,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_parses_time_limit() {
        let cli = Cli::try_parse_from([
            "guestwire",
            "users",
            "add",
            "guest-1",
            "-P",
            "pw",
            "--time-limit",
            "1h 30m",
        ]);
        match cli.map(|c| c.command) {
            Ok(Command::Users(UsersArgs {
                command: UsersCommand::Add { time_limit, .. },
            })) => assert_eq!(time_limit, Some(Duration::from_secs(5400))),
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
