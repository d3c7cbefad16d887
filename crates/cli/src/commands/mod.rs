use clap::Subcommand;
use std::error::Error;

pub mod inspect;
pub mod run;
pub mod strip;

use thiserror::Error;

/// Argument and configuration errors reported by the CLI itself.
#[derive(Debug, Error)]
pub enum CliError {
    /// A required pipeline input was given neither on the command line nor in the config.
    #[error("missing required argument: --{0}")]
    MissingArgument(&'static str),
    /// `inspect` was pointed at an archive without naming an entry.
    #[error("{0} is an archive; pass --entry to pick a class")]
    EntryRequired(String),
    /// The named archive entry does not exist.
    #[error("no entry {entry} in {archive}")]
    EntryNotFound { archive: String, entry: String },
    /// File read/write error.
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
}

/// CLI subcommands for Deobf.
#[derive(Subcommand)]
pub enum Cmd {
    /// Run the full remap, access transformer, inject and strip pipeline.
    Run(run::RunArgs),
    /// Clear synthetic flags from members of every class in an archive.
    Strip(strip::StripArgs),
    /// Print a class file's name, hierarchy and members as JSON.
    Inspect(inspect::InspectArgs),
}

/// Trait for executing CLI subcommands.
pub trait Command {
    /// Executes the subcommand.
    ///
    /// # Returns
    /// A `Result` indicating success or an error if execution fails.
    fn execute(self) -> Result<(), Box<dyn Error>>;
}

impl Command for Cmd {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Run(args) => args.execute(),
            Cmd::Strip(args) => args.execute(),
            Cmd::Inspect(args) => args.execute(),
        }
    }
}
