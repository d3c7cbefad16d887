use super::Fixture;
use color_eyre::Result;
use deobf_transform::cache::fingerprint_path;
use deobf_transform::pipeline;
use std::fs::{self, OpenOptions};
use std::io::Write;

#[test]
fn unchanged_clean_run_reuses_the_output() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config();

    let first = pipeline::run(&config)?;
    assert!(!first.from_cache);
    let fingerprint = first.fingerprint.clone().unwrap();
    assert_eq!(fingerprint.len(), 64);
    assert_eq!(fs::read_to_string(fingerprint_path(&first.output))?, fingerprint);

    let second = pipeline::run(&config)?;
    assert!(second.from_cache);
    assert_eq!(second.fingerprint.as_deref(), Some(fingerprint.as_str()));
    assert!(second.stages.is_empty());

    // any input change invalidates the fingerprint
    let mut mapping = OpenOptions::new().append(true).open(&fixture.mapping)?;
    writeln!(mapping, "# touched")?;
    drop(mapping);
    let third = pipeline::run(&config)?;
    assert!(!third.from_cache);
    assert_ne!(third.fingerprint.unwrap(), fingerprint);
    Ok(())
}

#[test]
fn missing_output_forces_a_run() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config();

    let first = pipeline::run(&config)?;
    fs::remove_file(&first.output)?;
    let second = pipeline::run(&config)?;
    assert!(!second.from_cache);
    assert!(second.output.exists());
    Ok(())
}

#[test]
fn dirty_or_uncached_runs_never_skip() -> Result<()> {
    let fixture = Fixture::new()?;

    let mut uncached = fixture.config();
    uncached.use_cache = false;
    for _ in 0..2 {
        let report = pipeline::run(&uncached)?;
        assert!(!report.from_cache);
        assert!(report.fingerprint.is_none());
    }
    assert!(!fingerprint_path(&uncached.output_clean).exists());

    let at = fixture.file("mine_at.cfg", "public a.b.C x\n")?;
    let mut dirty = fixture.config();
    dirty.access_transformers.push(at);
    for _ in 0..2 {
        let report = pipeline::run(&dirty)?;
        assert!(!report.from_cache);
        assert!(!report.clean);
    }
    assert!(!fingerprint_path(&dirty.output_path()).exists());
    Ok(())
}
