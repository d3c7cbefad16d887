//! Module for the `run` subcommand, which drives the whole deobfuscation pipeline.
//!
//! The configuration comes from an optional JSON file; every flag given on the command line
//! overrides the matching file value.

use crate::commands::CliError;
use clap::Args;
use deobf_transform::pipeline::{self, PipelineConfig};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

/// Arguments for the `run` subcommand.
#[derive(Args)]
pub struct RunArgs {
    /// JSON pipeline configuration.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Obfuscated input jar.
    #[arg(long)]
    input: Option<PathBuf>,
    /// SRG mapping file.
    #[arg(long)]
    mapping: Option<PathBuf>,
    /// `old,new` member rename CSV (repeatable).
    #[arg(long = "rename-csv", value_name = "PATH")]
    rename_csvs: Vec<PathBuf>,
    /// Built-in access transformer file; keeps the run clean (repeatable).
    #[arg(long = "clean-at", value_name = "PATH")]
    clean_ats: Vec<PathBuf>,
    /// Custom access transformer file; makes the run dirty (repeatable).
    #[arg(long = "at", value_name = "PATH")]
    ats: Vec<PathBuf>,
    /// Structural descriptor JSON.
    #[arg(long)]
    descriptor: Option<PathBuf>,
    /// Output jar for clean runs.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Output jar for dirty runs.
    #[arg(long)]
    output_dirty: Option<PathBuf>,
    /// Clear synthetic flags from members after injection.
    #[arg(long)]
    strip_synthetics: bool,
    /// Warn about broken access rules instead of aborting.
    #[arg(long)]
    no_fail_on_broken: bool,
    /// Target game version; `1.7.2` disables parameter name generation.
    #[arg(long)]
    target_version: Option<String>,
    /// Always run, even when a fingerprint matches the current inputs.
    #[arg(long)]
    no_cache: bool,
    /// Path to write the updated structural descriptor.
    #[arg(long, value_name = "PATH")]
    emit_descriptor: Option<PathBuf>,
    /// Path to emit the run report as JSON.
    #[arg(long, value_name = "PATH")]
    emit: Option<PathBuf>,
}

impl RunArgs {
    /// Loads the config file, if any, and applies the command line on top.
    pub fn into_config(self) -> Result<(PipelineConfig, Option<PathBuf>), Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(mapping) = self.mapping {
            config.mapping = mapping;
        }
        if let Some(output) = self.output {
            config.output_clean = output;
        }
        if self.output_dirty.is_some() {
            config.output_dirty = self.output_dirty;
        }
        if self.descriptor.is_some() {
            config.descriptor = self.descriptor;
        }
        if self.target_version.is_some() {
            config.target_version = self.target_version;
        }
        if self.emit_descriptor.is_some() {
            config.emit_descriptor = self.emit_descriptor;
        }
        config.rename_csvs.extend(self.rename_csvs);
        config.clean_access_transformers.extend(self.clean_ats);
        config.access_transformers.extend(self.ats);
        config.strip_synthetics |= self.strip_synthetics;
        if self.no_fail_on_broken {
            config.fail_on_broken_rules = false;
        }
        if self.no_cache {
            config.use_cache = false;
        }

        if config.input.as_os_str().is_empty() {
            return Err(CliError::MissingArgument("input").into());
        }
        if config.mapping.as_os_str().is_empty() {
            return Err(CliError::MissingArgument("mapping").into());
        }
        if config.output_clean.as_os_str().is_empty() {
            return Err(CliError::MissingArgument("output").into());
        }
        Ok((config, self.emit))
    }
}

/// Executes the `run` subcommand.
impl super::Command for RunArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        // Step 1: Assemble configuration
        let (config, emit) = self.into_config()?;

        // Step 2: Run the pipeline
        let report = pipeline::run(&config)?;

        // Step 3: Summarise
        if report.from_cache {
            println!("Up to date: {}", report.output.display());
        } else {
            for stage in &report.stages {
                println!(
                    "{:>8}: {} entries, {} classes changed, {} copied",
                    stage.stage, stage.entries_read, stage.classes_rewritten, stage.entries_copied
                );
            }
            println!(
                "Wrote {} ({}, {} rules, {} broken)",
                report.output.display(),
                if report.clean { "clean" } else { "dirty" },
                report.rules.len(),
                report.broken_rules
            );
        }

        // Step 4: Write report if requested
        if let Some(path) = emit {
            fs::write(&path, report.to_json_pretty()?).map_err(CliError::File)?;
            println!("Wrote run report to {}", path.display());
        }

        Ok(())
    }
}
