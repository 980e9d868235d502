use std::process::exit;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tsds_docs::{Dispatch, DocsCommand, Options, Settings, cli::Cli};

const DEFAULT_LOG_LEVEL: &str = "warn";

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let dispatch = match cli.delegate {
        Some(program) => Dispatch::Delegate {
            program,
            args: Vec::new(),
        },
        None => Dispatch::InProcess,
    };
    let command = DocsCommand::new(Settings {
        generator: cli.generator,
        dispatch,
    });
    let options = Options {
        cwd: cli.cwd,
        config_path: cli.config,
        install_path: cli.install_path,
        env: Vec::new(),
    };

    command
        .run(&cli.args, &options)
        .await
        .context("docs failed")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    if let Err(e) = run(cli).await {
        eprintln!("{e:#}");
        exit(1);
    }
}
