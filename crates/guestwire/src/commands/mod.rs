//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod raw;
pub mod sessions;
pub mod users;
pub mod util;

use guestwire_core::HotspotClient;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Route a router-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    client: &HotspotClient,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    match cmd {
        Command::Users(args) => users::handle(client, args, global, format).await,
        Command::Sessions(args) => sessions::handle(client, args, global, format).await,
        Command::Raw(args) => raw::handle(client, args, global, format).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "does not talk to a router".into(),
        }),
    }
}
