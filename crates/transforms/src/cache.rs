//! Whole-run fingerprint used to skip a clean run whose inputs have not changed.

use crate::pipeline::PipelineConfig;
use crate::{Error, Result};
use sha3::{Digest, Sha3_256};
use std::path::{Path, PathBuf};

const DOMAIN: &[u8] = b"DEOBF_RUN_FINGERPRINT";

/// `<output>.fingerprint`
pub fn fingerprint_path(output: &Path) -> PathBuf {
    let mut path = output.as_os_str().to_owned();
    path.push(".fingerprint");
    PathBuf::from(path)
}

/// SHA3-256 over the serialized configuration and the contents of every input file, hex
/// encoded.
pub fn compute(config: &PipelineConfig) -> Result<String> {
    let mut hasher = Sha3_256::new();
    hasher.update(DOMAIN);
    hasher.update(serde_json::to_vec(config)?);
    for path in config.input_files() {
        let bytes = std::fs::read(path).map_err(|source| Error::File {
            path: path.to_path_buf(),
            source,
        })?;
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// True when `output` exists and its stored fingerprint equals `fingerprint`.
pub fn is_fresh(output: &Path, fingerprint: &str) -> bool {
    output.is_file()
        && std::fs::read_to_string(fingerprint_path(output))
            .is_ok_and(|stored| stored.trim() == fingerprint)
}

pub fn store(output: &Path, fingerprint: &str) -> Result<()> {
    let path = fingerprint_path(output);
    std::fs::write(&path, fingerprint).map_err(|source| Error::File { path, source })
}

/// Removes a stale fingerprint so a failed or dirty run is never mistaken for fresh.
pub fn invalidate(output: &Path) -> Result<()> {
    let path = fingerprint_path(output);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::File { path, source }),
    }
}
