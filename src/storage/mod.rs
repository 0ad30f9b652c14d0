//! Pluggable flat-file stores behind one CRUD contract.
//!
//! Every mutation is a full read-modify-write pass: read the whole file,
//! apply one change, persist the whole file. Writes go through
//! [`stage`]/[`StagedWrite::commit`] so the target is replaced
//! atomically. There is no cross-process locking; concurrent external
//! writers race.

pub mod csv;
pub mod json;

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

pub use self::{csv::CsvStorage, json::JsonStorage};
use crate::{
    error::{Error, Result},
    normalize::normalize_title,
    record::{Catalog, Rating, Record},
    store_config::{StoreConfig, StoreKind},
};

pub trait Storage {
    /// Full snapshot of the store.
    fn list(&self) -> Result<Catalog>;

    /// Fails with [`Error::AlreadyExists`] when a title collides under
    /// normalized comparison.
    fn add(&self, record: Record) -> Result<()>;

    fn delete(&self, title: &str) -> Result<()>;

    fn update_rating(&self, title: &str, rating: Option<Rating>)
    -> Result<()>;

    fn update_notes(&self, title: &str, notes: Option<&str>) -> Result<()>;

    fn path(&self) -> &Path;

    /// Capability check for CSV-only operations such as schema migration.
    fn as_csv(&self) -> Option<&CsvStorage> {
        None
    }
}

/// Open the backend selected by `config`.
pub fn open(config: &StoreConfig) -> Result<Box<dyn Storage>> {
    tracing::debug!(
        path = %config.path.display(),
        kind = ?config.kind,
        "opening store"
    );
    Ok(match config.kind {
        StoreKind::Json => Box::new(JsonStorage::open(&config.path)?),
        StoreKind::Csv => Box::new(CsvStorage::open(&config.path)?),
    })
}

/// Checks shared by every backend before a record is inserted. Returns
/// the record in the form every backend reads back.
pub(crate) fn prepare_insert(
    catalog: &Catalog,
    record: Record,
) -> Result<Record> {
    let record = canonical(record);
    if normalize_title(&record.title).is_empty() {
        return Err(Error::EmptyTitle);
    }
    if let Some(existing) = catalog.find_normalized(&record.title) {
        return Err(Error::already_exists(&existing.title));
    }
    Ok(record)
}

/// Trimmed title and year; blank optional fields become absent.
fn canonical(record: Record) -> Record {
    Record {
        title: record.title.trim().to_string(),
        year: record.year.trim().to_string(),
        rating: record.rating,
        poster: clean_notes(record.poster.as_deref()),
        notes: clean_notes(record.notes.as_deref()),
        external_id: clean_notes(record.external_id.as_deref()),
    }
}

/// Blank text clears the field.
pub(crate) fn clean_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// A fully written, synced temporary file waiting to replace its target.
pub(crate) struct StagedWrite {
    file: NamedTempFile,
    target: PathBuf,
}

/// Write the new contents of `target` into a temporary file in the same
/// directory, flushed and synced to disk. The target is untouched until
/// [`StagedWrite::commit`].
pub(crate) fn stage<F>(target: &Path, write: F) -> Result<StagedWrite>
where
    F: FnOnce(&mut NamedTempFile) -> Result<()>,
{
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    write(&mut file)?;
    file.flush()?;
    file.as_file().sync_all()?;
    Ok(StagedWrite {
        file,
        target: target.to_path_buf(),
    })
}

impl StagedWrite {
    /// Atomically rename the staged file over the target.
    pub(crate) fn commit(self) -> Result<()> {
        self.file.persist(&self.target)?;
        tracing::trace!(path = %self.target.display(), "store file replaced");
        Ok(())
    }
}

pub(crate) fn write_atomic<F>(target: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut NamedTempFile) -> Result<()>,
{
    stage(target, write)?.commit()
}
