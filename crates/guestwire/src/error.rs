//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use guestwire_config::ConfigError;
use guestwire_core::{CoreError, ErrorKind};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not communicate with the router")]
    #[diagnostic(
        code(guestwire::connection_failed),
        help(
            "{reason}\n\
             Check that the router is reachable and its API service is enabled.\n\
             Try: guestwire -v sessions list"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(guestwire::auth_failed),
        help(
            "Every configured login was rejected.\n\
             Check the profile's credentials or pass --username/--password."
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(guestwire::no_credentials),
        help(
            "Configure credentials with: guestwire config init\n\
             Or pass --username and set GUESTWIRE_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(guestwire::not_found),
        help("Run: guestwire {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Router has no such item: {message}")]
    #[diagnostic(
        code(guestwire::not_found),
        help("Run: guestwire users list or guestwire sessions list to see what exists")
    )]
    MissingOnRouter { message: String },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(guestwire::conflict), help("Router said: {message}"))]
    Conflict {
        resource_type: String,
        identifier: String,
        message: String,
    },

    // ── Router ───────────────────────────────────────────────────────
    #[error("Router rejected the command: {message}")]
    #[diagnostic(code(guestwire::rejected))]
    Rejected { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(guestwire::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(guestwire::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: guestwire config init --profile {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No router configured")]
    #[diagnostic(
        code(guestwire::no_config),
        help(
            "Create a profile with: guestwire config init\n\
             Or pass --host. Config expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(guestwire::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(guestwire::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Router did not answer within {millis}ms")]
    #[diagnostic(
        code(guestwire::timeout),
        help("Increase the deadline with --timeout or check router load.")
    )]
    Timeout { millis: u128 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::MissingOnRouter { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let kind = err.kind();
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { timeout, .. } => CliError::Timeout {
                millis: timeout.as_millis(),
            },

            CoreError::UserNotFound { name } => CliError::NotFound {
                resource_type: "hotspot user".into(),
                identifier: name,
                list_command: "users list".into(),
            },

            CoreError::AlreadyExists { name, message } => CliError::Conflict {
                resource_type: "hotspot user".into(),
                identifier: name,
                message,
            },

            CoreError::UserCreationFailed { name, message } => CliError::Rejected {
                message: format!("could not add '{name}': {message}"),
            },

            CoreError::Rejected { message } if kind == ErrorKind::NotFound => {
                CliError::MissingOnRouter { message }
            }
            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::Config { message } => CliError::Validation {
                field: "router address".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}
