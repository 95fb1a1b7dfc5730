//! transformerctl - Maker event transformer CLI tool
//!
//! Stores block headers and turns contract event logs emitted in those
//! blocks into records linked to their headers.

use maker_transformers::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
