mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use guestwire_core::HotspotClient;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose, cli.global.log_json);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "guestwire", &mut std::io::stdout());
            Ok(())
        }

        // Config commands don't need a router connection
        Command::Config(args) => {
            let cfg = guestwire_config::load_config_or_default();
            let format = config::output_format(&cli.global, &cfg);
            commands::config_cmd::handle(args, &cli.global, format)
        }

        // All other commands talk to the router
        cmd => {
            let cfg = guestwire_config::load_config()?;
            let format = config::output_format(&cli.global, &cfg);
            let router = config::router_config(&cli.global, &cfg)?;
            tracing::debug!(host = %router.host, port = router.port, "using router");

            let client = HotspotClient::new(router);
            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &client, &cli.global, format).await;
            client.close().await;
            result
        }
    }
}
