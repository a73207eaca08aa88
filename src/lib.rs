pub mod cli;
pub mod core;
pub mod progress;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::core::config::EngineConfig;
use crate::core::error::EngineResult;
use crate::core::http::build_http_client;
use crate::core::orchestrator::{Orchestrator, RunSummary};
use crate::core::report::{render_summary, Confirm, PromptConfirmer, Unattended};
use crate::progress::TerminalProgress;

const EXIT_FATAL: u8 = 1;
const EXIT_ABORTED: u8 = 2;

fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,modsync_lib=debug"
    } else {
        "info,modsync_lib=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

/// First Ctrl-C cancels the run gracefully; a second one exits at once.
fn install_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, cancelling remaining downloads (Ctrl-C again to quit)");
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

async fn execute(cli: &Cli, cancel: &CancellationToken) -> EngineResult<RunSummary> {
    let path = cli.config.clone().unwrap_or_else(EngineConfig::default_path);
    let config = EngineConfig::load(&path, cli.overrides())?;
    let entries = config.entries()?;
    config.preflight(&entries)?;

    let http = build_http_client()?;
    let orchestrator = Orchestrator::new(&config, http).with_progress(Arc::new(TerminalProgress::new()));

    let mut confirm: Box<dyn Confirm> = if config.unattended {
        Box::new(Unattended::to_stdout())
    } else {
        Box::new(PromptConfirmer::stdio())
    };

    orchestrator.run(&entries, confirm.as_mut(), cancel).await
}

/// Binary entry point: parse arguments, run, print the summary.
pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("modsync {} starting...", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    install_interrupt_handler(cancel.clone());

    match execute(&cli, &cancel).await {
        Ok(summary) if summary.aborted() => {
            print!("{}", render_summary(&summary));
            println!("Exiting...");
            ExitCode::from(EXIT_ABORTED)
        }
        Ok(summary) => {
            print!("{}", render_summary(&summary));
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::from(EXIT_FATAL)
        }
    }
}
