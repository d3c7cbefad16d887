//! Jar archive I/O.
//!
//! Entries are read in stored order and written in the order they are handed to the
//! writer. Output is staged in a temporary file next to the destination and only moved
//! into place by [`ArchiveWriter::finish`], so a failed run never leaves a partial jar.

use crate::result::{Error, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Suffix identifying compiled class entries.
pub const CLASS_SUFFIX: &str = ".class";

/// Marker identifying jar metadata entries (manifest, signatures, services).
pub const METADATA_MARKER: &str = "META-INF";

/// True when the entry holds a compiled class.
pub fn is_class_entry(name: &str) -> bool {
    name.ends_with(CLASS_SUFFIX)
}

/// True when the entry belongs to the jar metadata tree.
pub fn is_metadata_entry(name: &str) -> bool {
    name.contains(METADATA_MARKER)
}

/// Internal class name for a class entry (`a/b/C.class` -> `a/b/C`).
pub fn class_name_of(entry_name: &str) -> Option<&str> {
    entry_name.strip_suffix(CLASS_SUFFIX)
}

/// A single archive entry held in memory.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub is_dir: bool,
    pub modified: DateTime,
}

impl ArchiveEntry {
    /// A file entry stamped with the zip epoch.
    pub fn file(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            is_dir: false,
            modified: DateTime::default(),
        }
    }

    /// A directory entry stamped with the zip epoch.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Vec::new(),
            is_dir: true,
            modified: DateTime::default(),
        }
    }

    /// Same entry with new contents; name, kind and timestamp are kept.
    pub fn with_data(&self, data: Vec<u8>) -> Self {
        Self {
            name: self.name.clone(),
            data,
            is_dir: self.is_dir,
            modified: self.modified,
        }
    }

    pub fn is_class(&self) -> bool {
        !self.is_dir && is_class_entry(&self.name)
    }

    pub fn is_metadata(&self) -> bool {
        is_metadata_entry(&self.name)
    }
}

/// Random-access reader over an input jar.
pub struct ArchiveReader {
    path: PathBuf,
    zip: ZipArchive<BufReader<File>>,
}

impl ArchiveReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| Error::File {
            path: path.clone(),
            source,
        })?;
        let zip = ZipArchive::new(BufReader::new(file)).map_err(|source| Error::Zip {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, zip })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.zip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zip.len() == 0
    }

    /// Reads the entry at `index` fully into memory.
    pub fn read_entry(&mut self, index: usize) -> Result<ArchiveEntry> {
        let path = &self.path;
        let mut file = self.zip.by_index(index).map_err(|source| Error::Zip {
            path: path.clone(),
            source,
        })?;
        let mut data = Vec::with_capacity(initial_capacity(file.size()));
        if !file.is_dir() {
            file.read_to_end(&mut data).map_err(|source| Error::File {
                path: path.clone(),
                source,
            })?;
        }
        Ok(ArchiveEntry {
            name: file.name().to_string(),
            data,
            is_dir: file.is_dir(),
            modified: file.last_modified(),
        })
    }

    /// Reads every entry in stored order.
    pub fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        (0..self.len()).map(|index| self.read_entry(index)).collect()
    }
}

/// Writer producing an output jar through a staged temporary file.
pub struct ArchiveWriter {
    destination: PathBuf,
    zip: ZipWriter<BufWriter<NamedTempFile>>,
    written: usize,
}

impl ArchiveWriter {
    /// Starts a new archive that will replace `destination` on [`finish`](Self::finish).
    pub fn create(destination: impl AsRef<Path>) -> Result<Self> {
        let destination = destination.as_ref().to_path_buf();
        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|source| Error::File {
            path: parent.clone(),
            source,
        })?;
        let staged = NamedTempFile::new_in(&parent).map_err(|source| Error::File {
            path: parent.clone(),
            source,
        })?;
        Ok(Self {
            destination,
            zip: ZipWriter::new(BufWriter::new(staged)),
            written: 0,
        })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Number of entries written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Appends an entry, keeping its timestamp.
    pub fn write_entry(&mut self, entry: &ArchiveEntry) -> Result<()> {
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(entry.modified);
        let zip_err = |source| Error::Zip {
            path: self.destination.clone(),
            source,
        };
        if entry.is_dir {
            self.zip
                .add_directory(entry.name.clone(), options)
                .map_err(zip_err)?;
        } else {
            self.zip
                .start_file(entry.name.clone(), options)
                .map_err(zip_err)?;
            self.zip.write_all(&entry.data).map_err(|source| Error::File {
                path: self.destination.clone(),
                source,
            })?;
        }
        self.written += 1;
        Ok(())
    }

    /// Completes the archive and moves it onto the destination path.
    pub fn finish(mut self) -> Result<PathBuf> {
        let destination = self.destination.clone();
        let buffered = self.zip.finish().map_err(|source| Error::Zip {
            path: destination.clone(),
            source,
        })?;
        let staged = buffered.into_inner().map_err(|err| Error::File {
            path: destination.clone(),
            source: err.into_error(),
        })?;
        staged.persist(&destination).map_err(|err| Error::File {
            path: destination.clone(),
            source: err.error,
        })?;
        tracing::debug!(entries = self.written, path = %destination.display(), "archive written");
        Ok(destination)
    }
}

/// Upper bound on buffer space reserved from an entry's declared size, which comes from
/// the archive itself.
const MAX_PREALLOCATION: u64 = 1 << 20;

fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOCATION) as usize
}
