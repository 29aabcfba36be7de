//! Flat one-name-per-line cache of extracted given names.
//!
//! Reads and appends are best-effort: failures are logged and degrade to an
//! empty result or a dropped write.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct NameCache {
    path: PathBuf,
}

impl NameCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if a regular, non-empty file is present.
    pub fn is_populated(&self) -> bool {
        fs::metadata(&self.path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    /// Trimmed, non-blank lines in file order.
    pub fn load(&self) -> Vec<String> {
        if !self.path.exists() {
            return Vec::new();
        }
        match fs::read_to_string(&self.path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to load names");
                Vec::new()
            }
        }
    }

    /// Appends one line.
    pub fn append(&self, item: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{item}"));
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "failed to save name");
        }
    }

    /// Replaces the whole file with `names`, one per line.
    pub fn populate(&self, names: &[String]) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = NamedTempFile::new_in(parent)
            .map_err(|e| Error::io(format!("cannot create temporary file in {}", parent.display()), e))?;

        let mut writer = BufWriter::new(&tmp);
        for name in names {
            writeln!(writer, "{name}")
                .map_err(|e| Error::io(format!("cannot write {}", self.path.display()), e))?;
        }
        writer
            .flush()
            .map_err(|e| Error::io(format!("cannot write {}", self.path.display()), e))?;
        drop(writer);

        tmp.persist(&self.path)
            .map_err(|e| Error::io(format!("cannot replace {}", self.path.display()), e.error))?;
        Ok(())
    }
}
