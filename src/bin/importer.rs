//! Importer admin CLI
//!
//! Inspects and manages a directory-backed import root: create the stage
//! directories, count and list items, and requeue stranded or dead-lettered
//! files.

use importer_core::{cli, logging};

#[tokio::main]
async fn main() {
    logging::init_tracing();

    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
