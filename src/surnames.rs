use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::text::title_case;

const NAME_COLUMN: &str = "name";

/// Reads the `name` column of a census-style CSV, title-cases each value and
/// returns the distinct values sorted. Empty cells are skipped.
pub fn load_surnames(path: &Path) -> Result<Vec<String>> {
    let csv_error = |source| Error::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let column = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .position(|h| h.trim() == NAME_COLUMN)
        .ok_or_else(|| Error::MissingColumn {
            path: path.to_path_buf(),
            column: NAME_COLUMN.to_string(),
        })?;

    let mut surnames = BTreeSet::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        match record.get(column).map(str::trim) {
            Some(value) if !value.is_empty() => {
                surnames.insert(title_case(value));
            }
            _ => {}
        }
    }

    debug!(count = surnames.len(), path = %path.display(), "loaded surnames");
    Ok(surnames.into_iter().collect())
}
