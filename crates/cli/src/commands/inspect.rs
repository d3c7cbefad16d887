//! Module for the `inspect` subcommand, which decodes one class file and prints it as JSON.
//!
//! The class is read either from a bare `.class` file or, with `--entry`, from a jar.

use crate::commands::CliError;
use clap::Args;
use deobf_core::archive::{ArchiveReader, CLASS_SUFFIX};
use deobf_core::{AccessFlags, ClassFile, ClassMember, decode_class};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

/// Arguments for the `inspect` subcommand.
#[derive(Args)]
pub struct InspectArgs {
    /// A class file, or a jar together with `--entry`.
    pub input: PathBuf,
    /// Entry inside the jar, either `a/b/C.class` or `a/b/C`.
    #[arg(long)]
    entry: Option<String>,
}

/// JSON view of a decoded class.
#[derive(Debug, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access: AccessFlags,
    pub version: String,
    pub members: Vec<ClassMember>,
}

impl ClassSummary {
    pub fn of(class: &ClassFile) -> deobf_core::Result<Self> {
        Ok(Self {
            name: class.name()?.to_string(),
            super_name: class.super_name()?.map(str::to_string),
            interfaces: class
                .interface_names()?
                .into_iter()
                .map(str::to_string)
                .collect(),
            access: class.access,
            version: format!("{}.{}", class.major_version, class.minor_version),
            members: class.members()?,
        })
    }
}

impl InspectArgs {
    fn read_class_bytes(&self) -> Result<Vec<u8>, Box<dyn Error>> {
        let Some(entry) = &self.entry else {
            if self.input.extension().is_some_and(|ext| ext == "jar" || ext == "zip") {
                return Err(CliError::EntryRequired(self.input.display().to_string()).into());
            }
            return Ok(fs::read(&self.input).map_err(CliError::File)?);
        };

        let wanted = if entry.ends_with(CLASS_SUFFIX) {
            entry.clone()
        } else {
            format!("{entry}{CLASS_SUFFIX}")
        };
        let mut reader = ArchiveReader::open(&self.input)?;
        reader
            .entries()?
            .into_iter()
            .find(|e| e.name == wanted)
            .map(|e| e.data)
            .ok_or_else(|| {
                CliError::EntryNotFound {
                    archive: self.input.display().to_string(),
                    entry: wanted,
                }
                .into()
            })
    }
}

/// Executes the `inspect` subcommand.
impl super::Command for InspectArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        let bytes = self.read_class_bytes()?;
        let class = decode_class(&bytes)?;
        let summary = ClassSummary::of(&class)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}
