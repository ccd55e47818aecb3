use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cherrysync::apply::run_diagnostic;
use cherrysync::cli::{Cli, CliCommand};
use cherrysync::config::Config;
use cherrysync::error::Error;
use cherrysync::lock::RunLock;
use cherrysync::orchestrator::Orchestrator;
use cherrysync::report::render_listing;
use cherrysync::review::gerrit::GerritSource;
use cherrysync::vcs::GitCli;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn fail(e: Error) -> ! {
    if matches!(e, Error::Interrupted) {
        std::process::exit(130);
    }
    eprintln!("error: {e}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    info!("cherrysync starting");

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => fail(e),
    };

    info!(?config, "config loaded");

    let vcs = GitCli::new(config.repo_path.clone(), Some(config.command_timeout));

    match cli.command {
        Some(CliCommand::Try { apply_command }) => {
            // The lock must be released before any exit below.
            let outcome = match RunLock::acquire(&config.repo_path) {
                Ok(_lock) => run_diagnostic(&vcs, &apply_command).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(true) => println!("OKAY"),
                Ok(false) => {
                    println!("NOT OKAY");
                    std::process::exit(2);
                }
                Err(e) => fail(e),
            }
        }
        Some(CliCommand::List) => {
            let source = GerritSource::new(&config);
            let orchestrator = Orchestrator::new(source, vcs, config).unwrap_or_else(|e| fail(e));
            match orchestrator.fetch() {
                Ok(patches) => print!("{}", render_listing(&patches)),
                Err(e) => fail(e),
            }
        }
        None => {
            let source = GerritSource::new(&config);
            let orchestrator = Orchestrator::new(source, vcs, config).unwrap_or_else(|e| fail(e));
            match orchestrator.run().await {
                Ok(report) => print!("{report}"),
                Err(e) => fail(e),
            }
        }
    }
}
