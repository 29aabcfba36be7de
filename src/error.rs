//! Error type shared by every stage of the pipeline.
//!
//! Structural failures (no reachable source, missing archive member, an empty
//! dictionary, a broken surname table) surface as [`Error`] and end the run.
//! Per-entry rejections and cache I/O problems never become an `Error`; they
//! are absorbed where they happen.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// Every dictionary mirror ran out of retries. `last` is the failure of
    /// the final attempt against the final mirror.
    #[error("all {attempted} dictionary sources failed; last error: {last}")]
    SourcesExhausted {
        attempted: usize,
        #[source]
        last: Box<Error>,
    },

    #[error("{member} not found inside {}", archive.display())]
    MissingMember { archive: PathBuf, member: String },

    #[error("cannot read archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("no dictionary file (xml, xml.gz or xml.bz2) in {}", .0.display())]
    DictionaryMissing(PathBuf),

    #[error("no Japanese names found after parsing the dictionary")]
    NoData,

    #[error("cannot parse surname table {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("surname table {} has no `{column}` column", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("cannot choose from an empty sequence")]
    EmptySequence,

    #[error("invalid source list {}: {source}", path.display())]
    SourceList {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl Error {
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    pub fn download(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
