mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // dextree info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("dextree", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Tree { path, depth } => commands::tree(path, *depth, &cli.global),
        Command::Summary { path } => commands::summary(path, &cli.global),
        Command::Map { path } => commands::map(path, &cli.global),
        Command::Strings { path } => commands::strings(path, &cli.global),
        Command::Classes { path } => commands::classes(path, &cli.global),
    }
}
