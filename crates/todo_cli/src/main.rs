//! `todo` command-line client over the core crate.

mod commands;
mod handlers;

use clap::Parser;
use commands::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
