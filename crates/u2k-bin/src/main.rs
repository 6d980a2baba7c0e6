//! u2k - send web articles to Kindle from the command line.

mod prompt;

use anyhow::Context;
use clap::Parser;
use durable_outbox::{send_or_queue, OutboxStore, SendReport, SweepCoordinator, SweepPolicy};
use kindle_delivery_client::{DeliveryRequest, PushToKindleClient, SenderConfig};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use u2k_config_and_utils::{build_logging, Config, Paths};

/// Send web articles to Kindle from cli.
#[derive(Parser)]
#[command(name = "u2k")]
#[command(version)]
struct Cli {
    /// URL to send
    url: String,

    /// Set custom title for article
    #[arg(short, long, value_name = "TITLE")]
    title: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "U2K_LOG_LEVEL")]
    log_level: Option<String>,

    /// Keep config, outbox and logs under this directory
    #[arg(long, value_name = "DIR", hide = true)]
    base_dir: Option<PathBuf>,
}

/// How the first delivery attempt ended, from the user's point of view.
enum Attempt {
    Sent(SendReport),
    Interrupted,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let paths = match &cli.base_dir {
        Some(base_dir) => Paths::with_base_dir(base_dir.clone()),
        None => Paths::new()?,
    };

    match build_logging(&paths, cli.log_level.as_deref()) {
        Ok(handle) => {
            if let Err(e) = handle.install() {
                eprintln!("Warning: logging already initialised: {e}");
            }
        }
        Err(e) => eprintln!("Warning: logging disabled: {e}"),
    }

    let config = match Config::load(&paths)? {
        Some(config) => config,
        None => {
            let config = {
                let stdin = io::stdin();
                prompt::prompt_for_credentials(
                    &mut stdin.lock(),
                    &mut io::stdout(),
                    &mut io::stderr(),
                )?
            };
            config.save(&paths)?;
            config
        }
    };
    let credentials = config.validate()?;
    debug!(
        email = %credentials.recipient_email,
        from = %credentials.sender_email,
        "Config loaded"
    );

    paths.ensure_dirs()?;
    let store = Arc::new(OutboxStore::open(paths.outbox_dir())?);
    let client = Arc::new(
        PushToKindleClient::new(SenderConfig::from_env())
            .context("Failed to build HTTP client")?,
    );

    let request = DeliveryRequest::new(
        cli.url,
        credentials.recipient_email,
        credentials.sender_email,
        cli.title.unwrap_or_default(),
    );

    let attempt = tokio::select! {
        report = send_or_queue(client.as_ref(), &store, &request) => Attempt::Sent(report?),
        _ = tokio::signal::ctrl_c() => Attempt::Interrupted,
    };

    match attempt {
        Attempt::Interrupted => {
            warn!(url = %request.url(), "Interrupted");
            return Ok(ExitCode::FAILURE);
        }
        Attempt::Sent(report) => {
            if report.is_success() {
                println!("{report}");
            } else {
                eprintln!("Error: {report}");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    let coordinator = SweepCoordinator::new(store, client, SweepPolicy::default());
    retry_saved(&coordinator).await;

    Ok(ExitCode::SUCCESS)
}

/// Sweep the outbox after the new url was handled.
///
/// The url is already delivered or queued at this point, so a failed sweep
/// is logged and does not change the exit status.
async fn retry_saved(coordinator: &SweepCoordinator) -> bool {
    match coordinator.sweep().await {
        Ok(sweep) => {
            if sweep.admitted {
                info!(
                    delivered = sweep.delivered,
                    still_pending = sweep.still_pending,
                    "Retried saved urls"
                );
            }
            true
        }
        Err(e) => {
            error!(error = %e, "Outbox sweep failed");
            false
        }
    }
}
