//! gp - Garage resource provider
//!
//! Drives create/read/update/delete of Garage buckets, bucket aliases,
//! bucket-key permissions and access keys through the admin API.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use garage_provider::commands::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // --debug wins over RUST_LOG; logs go to stderr so stdout stays parseable
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
