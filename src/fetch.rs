//! Data acquisition: makes sure the dictionary and the surname archive exist
//! locally, trying an ordered list of mirrors for the dictionary.

use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use lazy_static::lazy_static;
use reqwest::blocking::Client;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::layout::{DataLayout, DictionaryForm};

pub const SURNAME_ARCHIVE_URL: &str =
    "https://www2.census.gov/topics/genealogy/2010surnames/names.zip";

const USER_AGENT: &str = concat!("hybrid-names/", env!("CARGO_PKG_VERSION"));

/// Retry and timeout settings applied to every download.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first one fails
    pub retries: u32,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
    /// Upper bound on a whole request, body included
    pub max_time: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(15),
            max_time: Duration::from_secs(120),
        }
    }
}

/// One place the dictionary can be fetched from.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDescriptor {
    pub url: String,
    /// Skip certificate validation for this mirror only.
    #[serde(default)]
    pub insecure: bool,
    /// Form the payload is saved as.
    pub form: DictionaryForm,
}

impl SourceDescriptor {
    fn new(url: &str, insecure: bool, form: DictionaryForm) -> Self {
        Self {
            url: url.to_string(),
            insecure,
            form,
        }
    }
}

lazy_static! {
    static ref DEFAULT_SOURCES: Vec<SourceDescriptor> = vec![
        // EDRDG; its certificate chain is known to be broken
        SourceDescriptor::new(
            "https://ftp.edrdg.org/pub/Nihongo/JMnedict.xml.gz",
            true,
            DictionaryForm::Gz,
        ),
        // USF mirror of the Monash archive
        SourceDescriptor::new(
            "https://ftp.usf.edu/pub/ftp.monash.edu.au/pub/nihongo/JMnedict.xml.gz",
            false,
            DictionaryForm::Gz,
        ),
        SourceDescriptor::new(
            "http://ftp.edrdg.org/pub/Nihongo/JMnedict.xml.gz",
            false,
            DictionaryForm::Gz,
        ),
        // Pinned GitHub snapshot (2021-06-30)
        SourceDescriptor::new(
            "https://raw.githubusercontent.com/echamudi/jp-resources-mirror/\
             443711d6fab8072f7ec23cdd00f47e8f4d51aa71/EDRDG%20-%202021-06-30/JMnedict.xml.zip",
            false,
            DictionaryForm::Zip,
        ),
    ];
}

pub fn default_sources() -> Vec<SourceDescriptor> {
    DEFAULT_SOURCES.clone()
}

#[derive(Debug, Deserialize)]
struct SourceList {
    sources: Vec<SourceDescriptor>,
}

/// Reads a YAML mirror list of the form `sources: [{url, insecure, form}]`.
pub fn load_sources(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("cannot read source list {}", path.display()), e))?;
    let list: SourceList = serde_yaml::from_str(&contents).map_err(|source| Error::SourceList {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(list.sources)
}

/// A single download attempt. Implementations write `dest` only on success.
pub trait Transport {
    fn download(&self, url: &str, insecure: bool, dest: &Path) -> Result<()>;
}

/// Blocking HTTP(S) transport. Holds one verifying and one non-verifying
/// client, both reused across attempts.
pub struct HttpTransport {
    client: Client,
    insecure_client: Client,
    quiet: bool,
}

impl HttpTransport {
    pub fn new(policy: &RetryPolicy, quiet: bool) -> Result<Self> {
        Ok(Self {
            client: build_client(policy, false)?,
            insecure_client: build_client(policy, true)?,
            quiet,
        })
    }

    fn client(&self, insecure: bool) -> &Client {
        if insecure {
            &self.insecure_client
        } else {
            &self.client
        }
    }

    fn progress_bar(&self, len: Option<u64>) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        match len {
            Some(len) => {
                let pb = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("{bar:40} {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
                {
                    pb.set_style(style);
                }
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {bytes} {msg}") {
                    pb.set_style(style);
                }
                pb
            }
        }
    }
}

fn build_client(policy: &RetryPolicy, insecure: bool) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(policy.connect_timeout)
        .timeout(policy.max_time)
        .danger_accept_invalid_certs(insecure)
        .build()
        .map_err(Error::HttpClient)
}

impl Transport for HttpTransport {
    fn download(&self, url: &str, insecure: bool, dest: &Path) -> Result<()> {
        let response = self
            .client(insecure)
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::download(url, e))?;

        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(parent)
            .map_err(|e| Error::io(format!("cannot create temporary file in {}", parent.display()), e))?;

        let pb = self.progress_bar(response.content_length());
        if let Some(name) = dest.file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
        let copied = io::copy(&mut pb.wrap_read(response), &mut tmp);
        pb.finish_and_clear();
        let bytes = copied.map_err(|e| Error::download(url, e))?;

        tmp.persist(dest)
            .map_err(|e| Error::io(format!("cannot move download into {}", dest.display()), e.error))?;
        debug!(url, bytes, "download complete");
        Ok(())
    }
}

/// One attempt plus `policy.retries` more, sleeping `retry_delay` in between.
pub fn download_with_retries(
    transport: &dyn Transport,
    url: &str,
    insecure: bool,
    dest: &Path,
    policy: &RetryPolicy,
) -> Result<()> {
    let attempts = policy.retries + 1;
    let mut attempt = 1;
    loop {
        match transport.download(url, insecure, dest) {
            Ok(()) => return Ok(()),
            Err(err) if attempt < attempts => {
                warn!(url, attempt, error = %err, "download failed, retrying in {:?}", policy.retry_delay);
                if !policy.retry_delay.is_zero() {
                    thread::sleep(policy.retry_delay);
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Fetches the dictionary from the first source that works, unless some form
/// of it is already on disk.
pub fn ensure_dictionary(
    transport: &dyn Transport,
    sources: &[SourceDescriptor],
    layout: &DataLayout,
    policy: &RetryPolicy,
) -> Result<()> {
    if layout.has_dictionary() {
        debug!("dictionary already present, skipping download");
        return Ok(());
    }

    let mut last_error = None;
    for (i, source) in sources.iter().enumerate() {
        info!(
            url = %source.url,
            insecure = source.insecure,
            "fetching dictionary (source {}/{})",
            i + 1,
            sources.len()
        );
        let dest = layout.dictionary(source.form);
        match download_with_retries(transport, &source.url, source.insecure, &dest, policy) {
            Ok(()) => return Ok(()),
            Err(err) => {
                warn!(url = %source.url, error = %err, "dictionary source exhausted");
                last_error = Some(err);
            }
        }
    }

    let last = match last_error {
        Some(err) => err,
        None => Error::download("<none>", "no dictionary sources configured"),
    };
    Err(Error::SourcesExhausted {
        attempted: sources.len(),
        last: Box::new(last),
    })
}

/// Fetches the census archive unless the table or the archive is on disk.
/// There is no fallback mirror.
pub fn ensure_surname_archive(
    transport: &dyn Transport,
    layout: &DataLayout,
    policy: &RetryPolicy,
) -> Result<()> {
    if layout.surname_table().exists() || layout.surname_archive().exists() {
        debug!("surname data already present, skipping download");
        return Ok(());
    }
    info!(url = SURNAME_ARCHIVE_URL, "fetching surname archive");
    download_with_retries(
        transport,
        SURNAME_ARCHIVE_URL,
        false,
        &layout.surname_archive(),
        policy,
    )
}
