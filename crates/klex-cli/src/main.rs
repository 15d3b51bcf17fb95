mod cli;
mod commands;

use clap::Parser;
use cli::Klex;
use commands::handle_command;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Klex::parse();
    if let Err(e) = handle_command(args.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
