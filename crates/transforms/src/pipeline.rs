//! Sequential archive pipeline: remap + access rules, structure injection, synthetic strip.
//!
//! Each stage reads one complete archive and writes the next. Intermediate archives live
//! in a temporary directory that is removed when the run ends, successfully or not.

use crate::access::{AccessRuleSet, AccessTransformer, RenameTable};
use crate::hierarchy::ClassHierarchy;
use crate::mapping::MappingTable;
use crate::pass::{DefaultPass, Pass};
use crate::remap::Remapper;
use crate::resolver::RenameResolver;
use crate::structure::{AttributeInjector, InjectOptions, StructureDescriptor, StructureInjector};
use crate::synthetic::SyntheticStripper;
use crate::{ClassUnit, Error, PipelineReport, Result, StageStats, Transform, cache};
use deobf_core::archive::{ArchiveReader, ArchiveWriter, CLASS_SUFFIX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Every input and switch of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Obfuscated input archive.
    pub input: PathBuf,
    /// SRG mapping file.
    pub mapping: PathBuf,
    /// `old,new` member rename tables applied to access rules before matching.
    pub rename_csvs: Vec<PathBuf>,
    /// Built-in access transformers; these keep the run "clean".
    pub clean_access_transformers: Vec<PathBuf>,
    /// User access transformers; any of these makes the run "dirty".
    pub access_transformers: Vec<PathBuf>,
    /// Structural descriptor JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<PathBuf>,
    pub output_clean: PathBuf,
    /// Defaults to the clean output with a `-dirty` suffix on the file stem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dirty: Option<PathBuf>,
    pub strip_synthetics: bool,
    pub fail_on_broken_rules: bool,
    pub use_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
    /// Where to write the descriptor after access rules were merged into it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit_descriptor: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            mapping: PathBuf::new(),
            rename_csvs: Vec::new(),
            clean_access_transformers: Vec::new(),
            access_transformers: Vec::new(),
            descriptor: None,
            output_clean: PathBuf::new(),
            output_dirty: None,
            strip_synthetics: false,
            fail_on_broken_rules: true,
            use_cache: true,
            target_version: None,
            emit_descriptor: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = crate::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// No custom access transformers configured.
    pub fn is_clean(&self) -> bool {
        self.access_transformers.is_empty()
    }

    pub fn output_path(&self) -> PathBuf {
        if self.is_clean() {
            return self.output_clean.clone();
        }
        self.output_dirty.clone().unwrap_or_else(|| {
            let stem = self
                .output_clean
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let name = match self.output_clean.extension() {
                Some(ext) => format!("{stem}-dirty.{}", ext.to_string_lossy()),
                None => format!("{stem}-dirty"),
            };
            self.output_clean.with_file_name(name)
        })
    }

    /// Built-in access transformers followed by custom ones.
    pub fn access_transformer_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.clean_access_transformers
            .iter()
            .chain(self.access_transformers.iter())
    }

    /// Every file whose contents determine the output.
    pub fn input_files(&self) -> Vec<&Path> {
        let mut files = vec![self.input.as_path(), self.mapping.as_path()];
        files.extend(self.rename_csvs.iter().map(PathBuf::as_path));
        files.extend(self.access_transformer_files().map(PathBuf::as_path));
        files.extend(self.descriptor.as_deref());
        files
    }

    pub fn inject_options(&self) -> InjectOptions {
        InjectOptions::for_target(self.target_version.as_deref())
    }

    pub fn validate(&self) -> Result<()> {
        let missing = |what: &str| Err(Error::Config(format!("no {what} configured")));
        if self.input.as_os_str().is_empty() {
            return missing("input archive");
        }
        if self.mapping.as_os_str().is_empty() {
            return missing("mapping file");
        }
        if self.output_clean.as_os_str().is_empty() {
            return missing("output archive");
        }
        Ok(())
    }
}

/// Runs the pipeline with the attribute-rewriting structure injector.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    run_with_injector(config, &AttributeInjector)
}

/// Runs the pipeline with a caller-supplied structure injection step.
pub fn run_with_injector(
    config: &PipelineConfig,
    injector: &dyn StructureInjector,
) -> Result<PipelineReport> {
    config.validate()?;
    let output = config.output_path();
    let clean = config.is_clean();

    tracing::debug!("Starting deobfuscation pipeline:");
    tracing::debug!("  Input: {}", config.input.display());
    tracing::debug!("  Mapping: {}", config.mapping.display());
    tracing::debug!("  Output: {} (clean: {})", output.display(), clean);
    tracing::debug!("  Strip synthetics: {}", config.strip_synthetics);
    tracing::debug!("  Parameter names: {}", config.inject_options().generate_params);

    let fingerprint = if clean && config.use_cache {
        Some(cache::compute(config)?)
    } else {
        None
    };
    if let Some(fingerprint) = &fingerprint
        && cache::is_fresh(&output, fingerprint)
    {
        info!("{:>14} {} (inputs unchanged)", "cached", output.display());
        return Ok(PipelineReport {
            output,
            clean,
            from_cache: true,
            fingerprint: Some(fingerprint.clone()),
            ..Default::default()
        });
    }
    cache::invalidate(&output)?;

    let temp = tempfile::tempdir().map_err(|source| Error::File {
        path: std::env::temp_dir(),
        source,
    })?;

    // Step 1: load mapping, renames and access rules
    let mapping = MappingTable::load(&config.mapping)?;
    let mut renames = RenameTable::new();
    for csv in &config.rename_csvs {
        renames.load_csv(csv)?;
    }
    let mut engine = AccessTransformer::new(renames);
    for at in config.access_transformer_files() {
        engine.load_source(at)?;
    }
    info!(
        "{:>14} {} mapping entries, {} access rules",
        "loaded",
        mapping.len(),
        engine.len()
    );

    // Step 2: rename and apply access rules
    let remapped = temp.path().join("deobfed.jar");
    let remap_stats = rewrite_archive(&config.input, &remapped, &mapping, &mut engine)?;
    log_stage(&remap_stats);

    let outcome = engine.outcome();
    let broken = outcome.broken();
    if !broken.is_empty() {
        if config.fail_on_broken_rules {
            error!("{} broken access transformer rules:", broken.len());
            for record in &broken {
                error!(" ---  {} ({}:{})", record.raw_text, record.origin.file, record.origin.line);
            }
            return Err(Error::BrokenRules(broken));
        }
        for record in &broken {
            warn!("access rule had no effect: {}", record.raw_text);
        }
    }

    // Step 3: structural metadata
    let mut descriptor = match &config.descriptor {
        Some(path) => StructureDescriptor::load(path)?,
        None => StructureDescriptor::new(),
    };
    let inner_class_updates = descriptor.apply_access_rules(engine.rules())?;
    if let Some(path) = &config.emit_descriptor {
        descriptor.write(path)?;
        info!("{:>14} {}", "descriptor", path.display());
    }
    let injected = if config.strip_synthetics {
        temp.path().join("injected.jar")
    } else {
        output.clone()
    };
    let inject_stats = injector
        .inject(&remapped, &injected, &descriptor, config.inject_options())
        .map_err(|err| Error::Injection {
            injector: injector.name(),
            reason: err.to_string(),
        })?;
    log_stage(&inject_stats);

    let mut stages = vec![remap_stats, inject_stats];

    // Step 4: optional synthetic strip
    if config.strip_synthetics {
        let strip_stats = SyntheticStripper.strip_archive(&injected, &output)?;
        log_stage(&strip_stats);
        stages.push(strip_stats);
    }

    if let Some(fingerprint) = &fingerprint {
        cache::store(&output, fingerprint)?;
    }

    Ok(PipelineReport {
        output,
        clean,
        from_cache: false,
        fingerprint,
        stages,
        broken_rules: outcome.broken_count(),
        rules: outcome.records,
        inner_class_updates,
    })
}

fn log_stage(stats: &StageStats) {
    info!(
        "{:>14} {} entries, {} classes changed, {} copied",
        stats.stage, stats.entries_read, stats.classes_rewritten, stats.entries_copied
    );
}

/// Remaps every class and applies the access rules, moving renamed classes to their new
/// entry names.
///
/// All classes are decoded before the first one is written because member resolution
/// needs the complete hierarchy.
pub fn rewrite_archive(
    input: &Path,
    output: &Path,
    mapping: &MappingTable,
    engine: &mut AccessTransformer,
) -> Result<StageStats> {
    let mut reader = ArchiveReader::open(input)?;
    let entries = reader.entries()?;

    let mut hierarchy = ClassHierarchy::new();
    let mut units = Vec::with_capacity(entries.len());
    for entry in &entries {
        if !entry.is_class() {
            units.push(None);
            continue;
        }
        let unit = ClassUnit::decode(&entry.data)
            .inspect_err(|err| error!("cannot read class entry {}: {}", entry.name, err))?;
        hierarchy.insert_class(&unit.class)?;
        units.push(Some(unit));
    }

    let mut remapper = Remapper::new(RenameResolver::new(mapping, &hierarchy));
    let mut writer = ArchiveWriter::create(output)?;
    let mut stats = StageStats::new("remap");

    for (entry, unit) in entries.iter().zip(units) {
        stats.entries_read += 1;
        let Some(mut unit) = unit else {
            writer.write_entry(entry)?;
            stats.entries_copied += 1;
            continue;
        };
        let mut transforms: [&mut dyn Transform; 2] = [&mut remapper, &mut *engine];
        if DefaultPass.run(&mut unit, &mut transforms)? {
            stats.classes_rewritten += 1;
        }

        let mut rewritten = entry.with_data(unit.encode()?);
        if entry.name == format!("{}{CLASS_SUFFIX}", unit.original.name) {
            rewritten.name = format!("{}{CLASS_SUFFIX}", unit.class.name()?);
        }
        writer.write_entry(&rewritten)?;
    }

    writer.finish()?;
    Ok(stats)
}
