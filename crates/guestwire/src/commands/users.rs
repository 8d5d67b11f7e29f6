//! Hotspot user command handlers.

use tabled::Tabled;

use guestwire_core::{HotspotClient, HotspotUser, NewHotspotUser};

use crate::cli::{GlobalOpts, OutputFormat, UsersArgs, UsersCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Profile")]
    profile: String,
    #[tabled(rename = "Uptime Limit")]
    limit: String,
    #[tabled(rename = "Disabled")]
    disabled: String,
    #[tabled(rename = "Comment")]
    comment: String,
}

impl From<&HotspotUser> for UserRow {
    fn from(u: &HotspotUser) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            profile: u.profile.clone().unwrap_or_default(),
            limit: u.limit_uptime.clone().unwrap_or_default(),
            disabled: if u.disabled { "yes" } else { "no" }.into(),
            comment: u.comment.clone().unwrap_or_default(),
        }
    }
}

fn detail(u: &HotspotUser) -> String {
    [
        format!("ID:           {}", u.id),
        format!("Name:         {}", u.name),
        format!("Profile:      {}", util::or_dash(u.profile.as_deref())),
        format!("Uptime Limit: {}", util::or_dash(u.limit_uptime.as_deref())),
        format!("Disabled:     {}", u.disabled),
        format!("Comment:      {}", util::or_dash(u.comment.as_deref())),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &HotspotClient,
    args: UsersArgs,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    match args.command {
        UsersCommand::List => {
            let users = client.list_users().await?;
            let out =
                output::render_list(format, &users, |u| UserRow::from(u), |u| u.name.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Show { name } => {
            let Some(user) = client.find_user(&name).await? else {
                return Err(CliError::NotFound {
                    resource_type: "hotspot user".into(),
                    identifier: name,
                    list_command: "users list".into(),
                });
            };
            let out = output::render_single(format, &user, detail, |u| u.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Add {
            name,
            guest_password,
            hotspot_profile,
            time_limit,
            comment,
        } => {
            let mut request = NewHotspotUser::new(name, guest_password);
            if let Some(profile) = hotspot_profile {
                request = request.with_profile(profile);
            }
            if let Some(limit) = time_limit {
                request = request.with_time_limit(limit);
            }
            if let Some(comment) = comment {
                request = request.with_comment(comment);
            }

            let id = client.create_user(&request).await?;
            if let Some(id) = &id {
                output::print_output(id, global.quiet || format != OutputFormat::Plain);
            }
            output::print_status(
                &format!(
                    "Hotspot user '{}' created{}",
                    request.name,
                    id.map(|id| format!(" ({id})")).unwrap_or_default()
                ),
                global.quiet,
            );
            Ok(())
        }

        UsersCommand::Remove { name } => {
            if !util::confirm(
                &format!("Remove hotspot user '{name}'?"),
                "users remove",
                global.yes,
            )? {
                return Ok(());
            }
            client.remove_user(&name).await?;
            output::print_status(&format!("Hotspot user '{name}' removed"), global.quiet);
            Ok(())
        }
    }
}
