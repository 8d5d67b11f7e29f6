//! Active session command handlers.

use tabled::Tabled;

use guestwire_core::{ActiveSession, HotspotClient};

use crate::cli::{GlobalOpts, OutputFormat, SessionsArgs, SessionsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "In")]
    bytes_in: String,
    #[tabled(rename = "Out")]
    bytes_out: String,
}

impl From<&ActiveSession> for SessionRow {
    fn from(s: &ActiveSession) -> Self {
        Self {
            user: s.user.clone(),
            address: util::or_dash(s.address.as_deref()).into(),
            mac: util::or_dash(s.mac_address.as_deref()).into(),
            uptime: util::or_dash(s.uptime.as_deref()).into(),
            bytes_in: s.bytes_in.to_string(),
            bytes_out: s.bytes_out.to_string(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &HotspotClient,
    args: SessionsArgs,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    match args.command {
        SessionsCommand::List => {
            let sessions = client.list_active_sessions().await?;
            let out = output::render_list(
                format,
                &sessions,
                |s| SessionRow::from(s),
                |s| s.user.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SessionsCommand::Kick { user } => {
            if !util::confirm(
                &format!("Disconnect every active session of '{user}'?"),
                "sessions kick",
                global.yes,
            )? {
                return Ok(());
            }
            if client.disconnect_active_session(&user).await? {
                output::print_status(&format!("Disconnected '{user}'"), global.quiet);
            } else {
                output::print_status(&format!("'{user}' has no active session"), global.quiet);
            }
            Ok(())
        }
    }
}
