use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// On-disk shapes the names dictionary can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DictionaryForm {
    Xml,
    Gz,
    Bz2,
    Zip,
}

/// File names inside the data directory.
#[derive(Debug, Clone)]
pub struct DataLayout {
    dir: PathBuf,
}

impl DataLayout {
    /// Creates the directory if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::io(format!("cannot create data directory {}", dir.display()), e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn dictionary(&self, form: DictionaryForm) -> PathBuf {
        self.dir.join(match form {
            DictionaryForm::Xml => "JMnedict.xml",
            DictionaryForm::Gz => "JMnedict.xml.gz",
            DictionaryForm::Bz2 => "JMnedict.xml.bz2",
            DictionaryForm::Zip => "JMnedict.xml.zip",
        })
    }

    /// True if any form of the dictionary is already on disk.
    pub fn has_dictionary(&self) -> bool {
        [
            DictionaryForm::Xml,
            DictionaryForm::Gz,
            DictionaryForm::Bz2,
            DictionaryForm::Zip,
        ]
        .into_iter()
        .any(|form| self.dictionary(form).exists())
    }

    pub fn surname_archive(&self) -> PathBuf {
        self.dir.join("us_surnames.zip")
    }

    pub fn surname_table(&self) -> PathBuf {
        self.dir.join("Names_2010Census.csv")
    }

    pub fn name_cache(&self) -> PathBuf {
        self.dir.join("jp_names.txt")
    }
}
