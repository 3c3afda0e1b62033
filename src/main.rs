mod cache;
mod cli;
mod client;
mod commands;
mod drag;
mod export;
mod layout;
mod model;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init { name } => commands::init(name),
        cli::Command::List => commands::list(),
        cli::Command::Add {
            name,
            length,
            location,
            start,
            intensity,
        } => commands::add(name, length, location, start, intensity),
        cli::Command::Remove { task_id } => commands::remove(task_id),
        cli::Command::Schedule { url, no_cache } => commands::schedule(url, no_cache),
        cli::Command::Export { url, timezone } => commands::export(url, timezone),
        cli::Command::Tui => commands::tui(),
    }
}
