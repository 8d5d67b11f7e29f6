//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::{Input, Password};

use guestwire_config::{self as config, Config, Profile, ProfileCredential};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of the config with plaintext passwords masked.
fn redacted(cfg: &Config) -> Config {
    let mut masked = cfg.clone();
    for profile in masked.profiles.values_mut() {
        for cred in &mut profile.credentials {
            if cred.password.is_some() {
                cred.password = Some("****".into());
            }
        }
    }
    masked
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn interactive() -> bool {
    std::io::stdin().is_terminal()
}

/// Take a value from flags, else prompt for it, else fail.
fn value_or_prompt(
    value: Option<String>,
    field: &str,
    prompt: &str,
    default: Option<&str>,
) -> Result<String, CliError> {
    if let Some(v) = value {
        return Ok(v);
    }
    if !interactive() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: format!("required when not running interactively (pass --{field})"),
        });
    }
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(d) = default {
        input = input.default(d.to_owned());
    }
    input.interact_text().map_err(prompt_err)
}

fn password_or_prompt(global: &GlobalOpts) -> Result<Option<String>, CliError> {
    if let Some(pw) = &global.password {
        return Ok(Some(pw.clone()));
    }
    if !interactive() {
        return Ok(None);
    }
    Password::new()
        .with_prompt("Router password (empty for none)")
        .allow_empty_password(true)
        .interact()
        .map(Some)
        .map_err(prompt_err)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts, format: OutputFormat) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let masked = redacted(&cfg);
            let out = match format {
                OutputFormat::Json => output::render_json(&masked, false)?,
                OutputFormat::JsonCompact => output::render_json(&masked, true)?,
                OutputFormat::Yaml => output::render_yaml(&masked)?,
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&masked)
                    .map_err(|e| CliError::Config(Box::new(e.into())))?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init {
            router,
            api_port,
            login,
            password_env,
            keyring,
            force,
        } => {
            let mut cfg = config::load_config()?;
            let name = global
                .profile
                .clone()
                .unwrap_or_else(|| cfg.default_profile_name().to_owned());

            if cfg.profiles.contains_key(&name) && !force {
                return Err(CliError::Validation {
                    field: "profile".into(),
                    reason: format!("'{name}' already exists (use --force to replace it)"),
                });
            }

            let host = value_or_prompt(
                router.or_else(|| global.host.clone()),
                "router",
                "Router host or IP",
                None,
            )?;
            let username = value_or_prompt(
                login.or_else(|| global.username.clone()),
                "login",
                "Login user",
                Some("admin"),
            )?;

            let credential = if let Some(env) = password_env {
                ProfileCredential {
                    username,
                    password: None,
                    password_env: Some(env),
                }
            } else {
                let password = password_or_prompt(global)?;
                if keyring {
                    let secret = password.ok_or_else(|| CliError::Validation {
                        field: "password".into(),
                        reason: "--keyring needs --password or an interactive prompt".into(),
                    })?;
                    config::store_password(&name, &username, &secret)?;
                    output::print_status("Password stored in system keyring", global.quiet);
                    ProfileCredential {
                        username,
                        password: None,
                        password_env: None,
                    }
                } else {
                    if password.is_none() {
                        output::print_status(
                            "No password given; store one with --keyring or --password-env",
                            global.quiet,
                        );
                    }
                    ProfileCredential {
                        username,
                        password,
                        password_env: None,
                    }
                }
            };

            cfg.profiles.insert(
                name.clone(),
                Profile {
                    host,
                    port: api_port.or(global.port),
                    credentials: vec![credential],
                    ..Profile::default()
                },
            );
            if cfg.profiles.len() == 1 {
                cfg.default_profile = Some(name.clone());
            }

            let path = config::save_config(&cfg)?;
            output::print_status(
                &format!("Profile '{name}' written to {}", path.display()),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = cfg.default_profile_name();
            let mut names: Vec<_> = cfg.profiles.keys().collect();
            names.sort();
            let out = names
                .iter()
                .map(|n| {
                    let marker = if n.as_str() == default { "*" } else { " " };
                    format!("{marker} {n}  ({})", cfg.profiles[*n].host)
                })
                .collect::<Vec<_>>()
                .join("\n");
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
                available.sort();
                return Err(CliError::ProfileNotFound {
                    name,
                    available: available.join(", "),
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::print_status(&format!("Default profile set to '{name}'"), global.quiet);
            Ok(())
        }
    }
}
