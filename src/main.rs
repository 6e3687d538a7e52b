//! respcache - inspect and populate the local response cache
//!
//! Prints cached or freshly fetched JSON to stdout. Logging goes to stderr and
//! is controlled with `RUST_LOG` (e.g. `RUST_LOG=respcache=debug`).

use std::io;
use std::process;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use respcache::cli::{self, Cli, Outcome};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let mut stdout = io::stdout();

    match cli::run(cli, &mut stdout).await {
        Ok(Outcome::Done) => {}
        Ok(Outcome::Miss) => {
            eprintln!("No fresh cache entry");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}
