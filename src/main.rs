//! rulegen CLI entry point.

mod cli;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli::run(&cli) {
        Ok(paths) => {
            for path in paths {
                tracing::debug!(path = %path.display(), "done");
            }
        }
        Err(e) => {
            eprintln!("rulegen: {e}");
            std::process::exit(1);
        }
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises the level from `warn`.
fn setup_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .init();
}
