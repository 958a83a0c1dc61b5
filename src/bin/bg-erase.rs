//! bg-erase CLI
//!
//! Replaces the background of a photo using a precomputed mask or a chroma
//! key.

#[cfg(feature = "cli")]
use bg_erase::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
