//! navmap CLI entry point
//!
//! 3D navigation map session controller - CLI + web bridge

use navmap::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
