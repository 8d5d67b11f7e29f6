//! CLI configuration: a thin layer over `guestwire_config` that applies
//! `GlobalOpts` flag overrides (--host, --username, --timeout, ...).

use std::time::Duration;

use clap::ValueEnum;

use guestwire_config::{Config, Profile, build_router_config, config_path, resolve_credentials};
use guestwire_core::{Credential, OperationTimeouts, RouterConfig};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// Output format: flag, then the config file's default, then table.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    global.output.unwrap_or_else(|| {
        OutputFormat::from_str(&config.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

/// Build the `RouterConfig` for a router-bound command.
///
/// A matching profile supplies the base; flags override it. With no
/// profile at all, `--host` is required and credentials come from
/// `--username`/`--password` (blank `admin` when neither is given).
pub fn router_config(global: &GlobalOpts, cfg: &Config) -> Result<RouterConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let (mut profile, explicit) = match cfg.profiles.get(&profile_name) {
        Some(p) => (p.clone(), true),
        None if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available.join(", "),
            });
        }
        None => (Profile::default(), false),
    };

    if let Some(host) = &global.host {
        profile.host.clone_from(host);
    }
    if profile.host.trim().is_empty() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }
    if let Some(port) = global.port {
        profile.port = Some(port);
    }

    let credentials = flag_credentials(global).map_or_else(
        || {
            if explicit {
                resolve_credentials(&profile, &profile_name).map_err(CliError::from)
            } else {
                Ok(vec![Credential::new("admin", "")])
            }
        },
        |c| Ok(vec![c]),
    )?;

    let mut router = build_router_config(&profile, &cfg.defaults, credentials)?;
    if let Some(secs) = global.timeout {
        router.timeouts = OperationTimeouts::uniform(Duration::from_secs(secs));
    }
    Ok(router)
}

fn flag_credentials(global: &GlobalOpts) -> Option<Credential> {
    match (&global.username, &global.password) {
        (Some(user), pw) => Some(Credential::new(user.clone(), pw.clone().unwrap_or_default())),
        (None, Some(pw)) => Some(Credential::new("admin", pw.clone())),
        (None, None) => None,
    }
}
