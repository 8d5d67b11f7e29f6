//! Shared configuration for guestwire tools.
//!
//! TOML router profiles, password resolution (env + keyring + plaintext),
//! and translation to `guestwire_core::RouterConfig`. The CLI layers its
//! flag overrides on top of what this crate produces.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use guestwire_core::{Credential, DEFAULT_PORT, OperationTimeouts, RouterConfig, TransportConfig};

/// Keyring service name; entries are keyed `"{profile}/{username}"`.
pub const KEYRING_SERVICE: &str = "guestwire";

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "GUESTWIRE_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("no usable credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named router profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given explicitly.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Management port for profiles that don't set one.
    #[serde(default = "default_port")]
    pub port: u16,

    /// One deadline (seconds) for every operation. Unset keeps the
    /// per-operation defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            port: default_port(),
            timeout: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}

/// A named router profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Router host name or IP address.
    pub host: String,

    /// Management port override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Login candidates, tried in order.
    #[serde(default)]
    pub credentials: Vec<ProfileCredential>,

    /// Operation timeout override (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// TCP connect and per-candidate login timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,

    /// Seconds an authenticated connection is reused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<u64>,

    /// Ceiling on reply sentences per command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reply_sentences: Option<usize>,
}

/// One login candidate as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProfileCredential {
    pub username: String,

    /// Plaintext password (prefer keyring or env var). An empty string is
    /// a real candidate: a blank password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable holding the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$GUESTWIRE_CONFIG`, else platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("dev", "guestwire", "guestwire").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("guestwire");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing file is fine) layered under `GUESTWIRE_*`
/// variables. Nested keys use `__`, e.g. `GUESTWIRE_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("GUESTWIRE_")
                .ignore(&["CONFIG", "PROFILE", "HOST", "PORT", "USERNAME", "PASSWORD"])
                .split("__"),
        );

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Store a password in the system keyring for `profile_name`/`username`.
pub fn store_password(profile_name: &str, username: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name, username))?;
    entry.set_password(password)?;
    Ok(())
}

fn keyring_user(profile_name: &str, username: &str) -> String {
    format!("{profile_name}/{username}")
}

fn keyring_password(profile_name: &str, username: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name, username))
        .and_then(|entry| entry.get_password())
        .ok()
}

/// Resolve every candidate of a profile into login credentials.
///
/// Each password comes from the candidate's `password_env`, then the
/// system keyring, then plaintext. Candidates with no password source are
/// skipped; a profile left with none is an error.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Vec<Credential>, ConfigError> {
    resolve_credentials_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_password,
    )
}

fn resolve_credentials_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str, &str) -> Option<String>,
) -> Result<Vec<Credential>, ConfigError> {
    let mut resolved = Vec::with_capacity(profile.credentials.len());

    for candidate in &profile.credentials {
        // 1. Named env var
        let password = candidate
            .password_env
            .as_deref()
            .and_then(&env)
            // 2. System keyring
            .or_else(|| keyring(profile_name, &candidate.username))
            // 3. Plaintext in config
            .or_else(|| candidate.password.clone());

        match password {
            Some(password) => resolved.push(Credential {
                username: candidate.username.clone(),
                password: SecretString::from(password),
            }),
            None => warn!(
                profile = profile_name,
                username = %candidate.username,
                "no password source for credential candidate, skipping"
            ),
        }
    }

    if resolved.is_empty() {
        return Err(ConfigError::NoCredentials {
            profile: profile_name.into(),
        });
    }
    Ok(resolved)
}

/// Build a `RouterConfig` from a profile, no CLI flag overrides.
pub fn profile_to_router_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<RouterConfig, ConfigError> {
    let credentials = resolve_credentials(profile, profile_name)?;
    build_router_config(profile, defaults, credentials)
}

/// Assemble a `RouterConfig` from a profile and already-resolved credentials.
pub fn build_router_config(
    profile: &Profile,
    defaults: &Defaults,
    credentials: Vec<Credential>,
) -> Result<RouterConfig, ConfigError> {
    let host = profile.host.trim();
    if host.is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: "must not be empty".into(),
        });
    }

    let port = profile.port.unwrap_or(defaults.port);
    if port == 0 {
        return Err(ConfigError::Validation {
            field: "port".into(),
            reason: "must be between 1 and 65535".into(),
        });
    }

    let mut transport = TransportConfig::default();
    if let Some(secs) = profile.connect_timeout {
        transport.connect_timeout = Duration::from_secs(secs);
        transport.login_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = profile.cache_ttl {
        transport.cache_ttl = Duration::from_secs(secs);
    }
    if let Some(limit) = profile.max_reply_sentences {
        transport.max_reply_sentences = limit;
    }

    let timeouts = profile
        .timeout
        .or(defaults.timeout)
        .map_or_else(OperationTimeouts::default, |secs| {
            OperationTimeouts::uniform(Duration::from_secs(secs))
        });

    Ok(RouterConfig {
        host: host.to_owned(),
        port,
        credentials,
        transport,
        timeouts,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn candidate(username: &str, password: Option<&str>, env: Option<&str>) -> ProfileCredential {
        ProfileCredential {
            username: username.into(),
            password: password.map(Into::into),
            password_env: env.map(Into::into),
        }
    }

    fn profile_with(credentials: Vec<ProfileCredential>) -> Profile {
        Profile {
            host: "10.0.0.1".into(),
            credentials,
            ..Profile::default()
        }
    }

    #[test]
    fn password_sources_in_priority_order() {
        let profile = profile_with(vec![
            candidate("env-user", Some("plain"), Some("ROUTER_PW")),
            candidate("ring-user", Some("plain"), None),
            candidate("plain-user", Some("plain"), None),
        ]);
        let env = |name: &str| (name == "ROUTER_PW").then(|| "from-env".to_owned());
        let ring = |profile: &str, user: &str| {
            (profile == "office" && user == "ring-user").then(|| "from-ring".to_owned())
        };

        let creds = resolve_credentials_with(&profile, "office", env, ring).unwrap();
        let passwords: Vec<_> = creds
            .iter()
            .map(|c| (c.username.as_str(), c.password.expose_secret().to_owned()))
            .collect();

        assert_eq!(
            passwords,
            vec![
                ("env-user", "from-env".to_owned()),
                ("ring-user", "from-ring".to_owned()),
                ("plain-user", "plain".to_owned()),
            ]
        );
    }

    #[test]
    fn blank_plaintext_password_is_a_candidate() {
        let profile = profile_with(vec![candidate("admin", Some(""), None)]);
        let creds = resolve_credentials_with(&profile, "p", |_| None, |_, _| None).unwrap();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].password.expose_secret(), "");
    }

    #[test]
    fn unresolvable_candidates_are_skipped() {
        let profile = profile_with(vec![
            candidate("ghost", None, Some("UNSET_VAR")),
            candidate("admin", Some("x"), None),
        ]);
        let creds = resolve_credentials_with(&profile, "p", |_| None, |_, _| None).unwrap();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].username, "admin");

        let empty = profile_with(vec![candidate("ghost", None, None)]);
        let err = resolve_credentials_with(&empty, "p", |_| None, |_, _| None).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { .. }), "{err:?}");
    }

    #[test]
    fn profile_overrides_shape_the_router_config() {
        let profile = Profile {
            host: " 10.0.0.1 ".into(),
            port: Some(18728),
            timeout: Some(3),
            connect_timeout: Some(2),
            cache_ttl: Some(0),
            max_reply_sentences: Some(500),
            ..Profile::default()
        };
        let config = build_router_config(&profile, &Defaults::default(), Vec::new()).unwrap();

        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.port, 18728);
        assert_eq!(config.timeouts, OperationTimeouts::uniform(Duration::from_secs(3)));
        assert_eq!(config.transport.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.transport.cache_ttl, Duration::ZERO);
        assert_eq!(config.transport.max_reply_sentences, 500);
    }

    #[test]
    fn defaults_fill_unset_profile_fields() {
        let profile = profile_with(Vec::new());
        let config = build_router_config(&profile, &Defaults::default(), Vec::new()).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.timeouts, OperationTimeouts::default());
    }

    #[test]
    fn empty_host_or_zero_port_is_invalid() {
        let no_host = Profile::default();
        let err = build_router_config(&no_host, &Defaults::default(), Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "host"));

        let zero_port = Profile {
            port: Some(0),
            ..profile_with(Vec::new())
        };
        let err = build_router_config(&zero_port, &Defaults::default(), Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "port"));
    }
}
