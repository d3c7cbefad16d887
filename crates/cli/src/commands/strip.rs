//! Module for the `strip` subcommand, which runs only the synthetic stripper over a jar.

use clap::Args;
use deobf_transform::synthetic::SyntheticStripper;
use std::error::Error;
use std::path::PathBuf;

/// Arguments for the `strip` subcommand.
#[derive(Args)]
pub struct StripArgs {
    /// Input jar.
    pub input: PathBuf,
    /// Output jar.
    #[arg(short, long)]
    pub output: PathBuf,
    /// Print the stage statistics as JSON instead of a summary line.
    #[arg(long)]
    json: bool,
}

/// Executes the `strip` subcommand.
impl super::Command for StripArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        let stats = SyntheticStripper.strip_archive(&self.input, &self.output)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Stripped {} classes ({} entries, {} copied) into {}",
                stats.classes_rewritten,
                stats.entries_read,
                stats.entries_copied,
                self.output.display()
            );
        }
        Ok(())
    }
}
