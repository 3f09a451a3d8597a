//! oprictl - OP_RETURN index CLI tool
//!
//! Reads an index database and its block store offline and prints
//! the results as JSON.

use opri::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
