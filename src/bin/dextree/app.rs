use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// dextree - inspect the structure of dex files
#[derive(Debug, Parser)]
#[command(name = "dextree", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Verify the header before decoding.
    #[arg(long, global = true)]
    pub verify: bool,

    /// Verify the Adler-32 checksum before decoding.
    #[arg(long, global = true)]
    pub checksum: bool,

    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the decoded component tree.
    Tree {
        /// Path to the dex file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Only descend this many levels below the file.
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Display header information, table sizes and decode problems.
    Summary {
        /// Path to the dex file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// List the map items of the file.
    Map {
        /// Path to the dex file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// List the decoded strings.
    Strings {
        /// Path to the dex file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// List the defined classes with their fields and methods.
    Classes {
        /// Path to the dex file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}
