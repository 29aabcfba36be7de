//! Turns whatever archive form is on disk into the plain dictionary XML and
//! census CSV. Targets are written to a temporary file in the same directory
//! and renamed into place, so a crash never leaves a truncated target behind.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::layout::{DataLayout, DictionaryForm};

const DICTIONARY_MEMBER: &str = "jmnedict.xml";
const READ_BUFFER: usize = 256 * 1024;

/// Produces `JMnedict.xml` from the zip, gzip or bzip2 form, in that order of
/// preference. An existing XML file is left alone.
pub fn normalize_dictionary(layout: &DataLayout) -> Result<()> {
    let xml = layout.dictionary(DictionaryForm::Xml);
    if xml.exists() {
        return Ok(());
    }

    let zip = layout.dictionary(DictionaryForm::Zip);
    if zip.exists() {
        info!("unzipping {} -> {}", zip.display(), xml.display());
        return extract_member(&zip, DICTIONARY_MEMBER, &xml);
    }

    let gz = layout.dictionary(DictionaryForm::Gz);
    if gz.exists() {
        info!("decompressing {} -> {}", gz.display(), xml.display());
        let file = open(&gz)?;
        return write_atomically(&mut GzDecoder::new(file), &xml);
    }

    let bz2 = layout.dictionary(DictionaryForm::Bz2);
    if bz2.exists() {
        info!("decompressing {} -> {}", bz2.display(), xml.display());
        let file = open(&bz2)?;
        return write_atomically(&mut BzDecoder::new(file), &xml);
    }

    Ok(())
}

/// Extracts every file of the census archive into the data directory,
/// dropping member paths. Fails if the table is still missing afterwards.
pub fn extract_surname_table(layout: &DataLayout) -> Result<()> {
    let csv = layout.surname_table();
    if csv.exists() {
        return Ok(());
    }

    let archive_path = layout.surname_archive();
    info!("extracting census table {} -> {}", archive_path.display(), csv.display());
    let mut archive = open_zip(&archive_path)?;
    for i in 0..archive.len() {
        let mut member = archive.by_index(i).map_err(|source| Error::Archive {
            path: archive_path.clone(),
            source,
        })?;
        if member.is_dir() {
            continue;
        }
        let Some(file_name) = Path::new(member.name()).file_name().map(|n| n.to_owned()) else {
            continue;
        };
        let dest = layout.dir().join(&file_name);
        debug!(member = member.name(), dest = %dest.display(), "extracting");
        write_atomically(&mut member, &dest)?;
    }

    if !csv.exists() {
        return Err(Error::MissingMember {
            archive: archive_path,
            member: "Names_2010Census.csv".to_string(),
        });
    }
    Ok(())
}

/// Opens the dictionary for streaming: plain XML first, then the compressed
/// forms decoded on the fly.
pub fn open_dictionary(layout: &DataLayout) -> Result<Box<dyn Read>> {
    let xml = layout.dictionary(DictionaryForm::Xml);
    if xml.exists() {
        return Ok(Box::new(BufReader::with_capacity(READ_BUFFER, open(&xml)?)));
    }
    let gz = layout.dictionary(DictionaryForm::Gz);
    if gz.exists() {
        return Ok(Box::new(BufReader::with_capacity(
            READ_BUFFER,
            GzDecoder::new(open(&gz)?),
        )));
    }
    let bz2 = layout.dictionary(DictionaryForm::Bz2);
    if bz2.exists() {
        return Ok(Box::new(BufReader::with_capacity(
            READ_BUFFER,
            BzDecoder::new(open(&bz2)?),
        )));
    }
    Err(Error::DictionaryMissing(layout.dir().to_path_buf()))
}

/// Copies the first member whose name ends with `suffix` (ignoring case).
fn extract_member(archive_path: &Path, suffix: &str, dest: &Path) -> Result<()> {
    let mut archive = open_zip(archive_path)?;
    let suffix = suffix.to_lowercase();
    let name = archive
        .file_names()
        .find(|name| name.to_lowercase().ends_with(&suffix))
        .map(str::to_string)
        .ok_or_else(|| Error::MissingMember {
            archive: archive_path.to_path_buf(),
            member: suffix.clone(),
        })?;

    let mut member = archive.by_name(&name).map_err(|source| Error::Archive {
        path: archive_path.to_path_buf(),
        source,
    })?;
    write_atomically(&mut member, dest)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| Error::io(format!("cannot open {}", path.display()), e))
}

fn open_zip(path: &Path) -> Result<ZipArchive<File>> {
    ZipArchive::new(open(path)?).map_err(|source| Error::Archive {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomically(src: &mut impl Read, dest: &Path) -> Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|e| Error::io(format!("cannot create temporary file in {}", parent.display()), e))?;
    io::copy(src, &mut tmp).map_err(|e| Error::io(format!("cannot write {}", dest.display()), e))?;
    tmp.persist(dest)
        .map_err(|e| Error::io(format!("cannot move extracted file to {}", dest.display()), e.error))?;
    Ok(())
}
