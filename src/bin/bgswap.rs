//! bgswap CLI tool
//!
//! Command-line front end for the bgswap background removal and compositing
//! pipeline.

#[cfg(feature = "cli")]
use bgswap::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(2);
}
