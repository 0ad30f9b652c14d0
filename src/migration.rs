//! Forward schema migration for CSV stores.
//!
//! [`ensure_columns`] appends any missing columns to an existing CSV file,
//! filling the new cells with empty strings. The first time a file is
//! structurally changed a copy is kept next to it as `<file>.bak`; an
//! existing backup is never overwritten and backups are never pruned.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use ::csv::{ReaderBuilder, StringRecord, Writer};

use crate::{
    error::{Error, Result},
    storage::{
        csv::{LEGACY_EXTERNAL_ID, same_column},
        write_atomic,
    },
};

/// Header assumed for a file that has no header row at all.
const MINIMAL_HEADER: [&str; 4] = ["title", "rating", "year", "poster"];

pub const BACKUP_SUFFIX: &str = ".bak";

/// A column added by migration starts from the renamed column's cells
/// when the file still carries the old name.
const RENAMED_COLUMNS: [(&str, &str); 1] =
    [("external_id", LEGACY_EXTERNAL_ID)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Unchanged,
    Changed {
        added: Vec<String>,
        /// Set when this run created the backup.
        backup: Option<PathBuf>,
    },
}

impl MigrationOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// `movies.csv` → `movies.csv.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

fn check_csv_file(path: &Path) -> Result<()> {
    let corrupt = |reason: &str| Error::CorruptSource {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    if !path.exists() {
        return Err(corrupt("file does not exist"));
    }
    if !path.is_file() {
        return Err(corrupt("not a regular file"));
    }
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(corrupt("not a .csv file"));
    }
    Ok(())
}

/// Make sure every column in `required` exists in the CSV at `path`.
///
/// Idempotent: returns [`MigrationOutcome::Unchanged`] without touching
/// the file when nothing is missing. Fails with
/// [`Error::CorruptSource`] when `path` is missing, not a file, or not a
/// `.csv` file.
pub fn ensure_columns(
    path: &Path,
    required: &[&str],
) -> Result<MigrationOutcome> {
    check_csv_file(path)?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut header: Vec<String> =
        reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

    if header.iter().all(|h| h.trim().is_empty()) {
        header = MINIMAL_HEADER.iter().map(|h| h.to_string()).collect();
    }

    let added: Vec<String> = required
        .iter()
        .filter(|col| !header.iter().any(|h| same_column(h, col)))
        .map(|col| col.to_string())
        .collect();
    if added.is_empty() {
        tracing::debug!(path = %path.display(), "CSV schema already current");
        return Ok(MigrationOutcome::Unchanged);
    }

    let backup = backup_path(path);
    let created_backup = if backup.exists() {
        tracing::debug!(backup = %backup.display(), "keeping existing backup");
        None
    } else {
        std::fs::copy(path, &backup)?;
        Some(backup)
    };

    // Source column for each added column, if it was renamed.
    let seeds: Vec<Option<usize>> =
        added.iter().map(|col| renamed_from(&header, col)).collect();
    let width = header.len();
    header.extend(added.iter().cloned());
    write_atomic(path, |file| {
        let mut writer = Writer::from_writer(file);
        writer.write_record(&header)?;
        for row in &rows {
            let mut cells = padded(row, width);
            cells.extend(
                seeds
                    .iter()
                    .map(|seed| seed.and_then(|i| row.get(i)).unwrap_or("")),
            );
            writer.write_record(cells)?;
        }
        writer.flush()?;
        Ok(())
    })?;

    tracing::info!(
        path = %path.display(),
        added = ?added,
        "migrated CSV schema"
    );
    Ok(MigrationOutcome::Changed {
        added,
        backup: created_backup,
    })
}

fn renamed_from(header: &[String], column: &str) -> Option<usize> {
    let (_, old) = RENAMED_COLUMNS.iter().find(|(new, _)| *new == column)?;
    header.iter().position(|h| same_column(h, old))
}

fn padded(row: &StringRecord, width: usize) -> Vec<&str> {
    (0..width).map(|i| row.get(i).unwrap_or("")).collect()
}
