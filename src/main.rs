use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lingo_review::cancel::{CancelHandle, spawn_interrupt_listener};
use lingo_review::cli::Cli;
use lingo_review::confirm::TerminalPrompter;
use lingo_review::error::{Error, Result, ResultExt};
use lingo_review::orchestrator::{Orchestrator, ReviewOptions};
use lingo_review::prereq;
use lingo_review::remote::HttpReviewService;
use lingo_review::vcs::AnyVcs;

fn init_logging(debug: bool) {
    let default = if debug { "lingo_review=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn review(cli: &Cli) -> Result<String> {
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir)
            .map_err(Error::from)
            .context(format!("changing into {dir}"))?;
    }
    let dir = std::env::current_dir()?;

    let config = prereq::verify(cli, &dir)?;
    let vcs = AnyVcs::open(&dir, &config).context("opening working copy")?;
    let service = HttpReviewService::new(config.service_address.clone(), config.token.clone());

    let cancel = CancelHandle::new();
    spawn_interrupt_listener(cancel.clone());

    let mut orchestrator = Orchestrator::new(vcs, service, TerminalPrompter::stdio(), config);
    orchestrator
        .run(&ReviewOptions::from_cli(cli), cancel)
        .await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    info!("lingo-review starting");

    // Blocking stream readers may still be parked on the socket, so leave
    // through process::exit rather than waiting on runtime shutdown.
    match review(&cli).await {
        Ok(message) => {
            println!("{message}");
            std::process::exit(0);
        }
        Err(e) => {
            if matches!(e.root(), Error::Interrupted) {
                eprintln!("interrupted");
                std::process::exit(130);
            }
            eprintln!("error: {e}");
            if cli.debug {
                eprintln!("{}", e.trace());
            }
            std::process::exit(1);
        }
    }
}
