use std::path::{Path, PathBuf};

use ::csv::{ReaderBuilder, StringRecord, Writer};

use super::{Storage, clean_notes, prepare_insert, write_atomic};
use crate::{
    error::{Error, Result},
    migration::{self, MigrationOutcome},
    normalize::fold_case,
    record::{Catalog, Rating, Record},
};

/// Column order written to every CSV store.
pub const COLUMNS: [&str; 6] =
    ["title", "rating", "year", "poster", "notes", "external_id"];

/// Columns older files may lack; see [`CsvStorage::migrate`].
pub const MIGRATED_COLUMNS: [&str; 2] = ["notes", "external_id"];

/// Older files named the external id column after IMDb.
pub(crate) const LEGACY_EXTERNAL_ID: &str = "imdb_id";

/// Header cells match column names ignoring surrounding blanks and ASCII
/// case.
pub(crate) fn same_column(header: &str, name: &str) -> bool {
    header.trim().eq_ignore_ascii_case(name)
}

/// One row per record under a fixed header.
///
/// Titles are looked up by a case-folded linear scan, which is fine for
/// a personal catalog. Columns missing from an older file read as empty
/// and unknown columns are dropped on the next write.
#[derive(Debug)]
pub struct CsvStorage {
    path: PathBuf,
}

/// Header positions of the known columns in the file being read.
struct ColumnIndex {
    title: Option<usize>,
    rating: Option<usize>,
    year: Option<usize>,
    poster: Option<usize>,
    notes: Option<usize>,
    external_id: Option<usize>,
    legacy_external_id: Option<usize>,
}

impl ColumnIndex {
    fn new(headers: &StringRecord) -> Self {
        let find =
            |name: &str| headers.iter().position(|h| same_column(h, name));
        Self {
            title: find("title"),
            rating: find("rating"),
            year: find("year"),
            poster: find("poster"),
            notes: find("notes"),
            external_id: find("external_id"),
            legacy_external_id: find(LEGACY_EXTERNAL_ID),
        }
    }

    /// A blank `external_id` cell falls back to the legacy column.
    fn external_id(&self, row: &StringRecord) -> Option<String> {
        optional_cell(row, self.external_id)
            .or_else(|| optional_cell(row, self.legacy_external_id))
    }
}

fn cell(row: &StringRecord, idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(str::trim).unwrap_or("")
}

fn optional_cell(row: &StringRecord, idx: Option<usize>) -> Option<String> {
    Some(cell(row, idx)).filter(|c| !c.is_empty()).map(str::to_string)
}

/// Empty, `N/A`, unparsable and out-of-range cells all read as absent.
fn parse_rating(text: &str) -> Option<Rating> {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("n/a") {
        return None;
    }
    let value: f64 = text.parse().ok()?;
    Rating::new(value).ok()
}

/// Always carries a decimal point so `9` is written as `9.0`.
fn rating_cell(rating: Option<Rating>) -> String {
    match rating {
        None => String::new(),
        Some(r) => {
            let text = r.value().to_string();
            if text.contains('.') {
                text
            } else {
                format!("{text}.0")
            }
        }
    }
}

impl CsvStorage {
    /// Open the store at `path`, writing a header-only file when it is
    /// missing or blank.
    pub fn open(path: &Path) -> Result<Self> {
        let storage = Self {
            path: path.to_path_buf(),
        };
        let blank = match std::fs::read(path) {
            Ok(bytes) => bytes.iter().all(u8::is_ascii_whitespace),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };
        if blank {
            tracing::debug!(path = %path.display(), "initializing CSV store");
            storage.write_rows(&[])?;
        }
        Ok(storage)
    }

    /// Ensure [`MIGRATED_COLUMNS`] exist in the file.
    pub fn migrate(&self) -> Result<MigrationOutcome> {
        migration::ensure_columns(&self.path, &MIGRATED_COLUMNS)
    }

    fn read_rows(&self) -> Result<Vec<Record>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        let columns = ColumnIndex::new(reader.headers()?);

        let mut rows = Vec::new();
        for row in reader.records() {
            let row = row?;
            let title = cell(&row, columns.title);
            if title.is_empty() {
                continue;
            }
            rows.push(Record {
                title: title.to_string(),
                year: cell(&row, columns.year).to_string(),
                rating: parse_rating(cell(&row, columns.rating)),
                poster: optional_cell(&row, columns.poster),
                notes: optional_cell(&row, columns.notes),
                external_id: columns.external_id(&row),
            });
        }
        Ok(rows)
    }

    fn write_rows(&self, rows: &[Record]) -> Result<()> {
        write_atomic(&self.path, |file| {
            let mut writer = Writer::from_writer(file);
            writer.write_record(COLUMNS)?;
            for r in rows {
                writer.write_record([
                    r.title.as_str(),
                    rating_cell(r.rating).as_str(),
                    r.year.as_str(),
                    r.poster.as_deref().unwrap_or(""),
                    r.notes.as_deref().unwrap_or(""),
                    r.external_id.as_deref().unwrap_or(""),
                ])?;
            }
            writer.flush()?;
            Ok(())
        })?;
        tracing::debug!(
            path = %self.path.display(),
            rows = rows.len(),
            "saved CSV store"
        );
        Ok(())
    }

    fn position(rows: &[Record], title: &str) -> Option<usize> {
        let wanted = fold_case(title);
        rows.iter().position(|r| fold_case(&r.title) == wanted)
    }

    fn modify<F>(&self, title: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut Record),
    {
        let mut rows = self.read_rows()?;
        let idx =
            Self::position(&rows, title).ok_or_else(|| Error::not_found(title))?;
        change(&mut rows[idx]);
        self.write_rows(&rows)
    }
}

impl Storage for CsvStorage {
    fn list(&self) -> Result<Catalog> {
        Ok(self.read_rows()?.into_iter().collect())
    }

    fn add(&self, record: Record) -> Result<()> {
        let mut rows = self.read_rows()?;
        let catalog: Catalog = rows.iter().cloned().collect();
        rows.push(prepare_insert(&catalog, record)?);
        self.write_rows(&rows)
    }

    fn delete(&self, title: &str) -> Result<()> {
        let mut rows = self.read_rows()?;
        let idx =
            Self::position(&rows, title).ok_or_else(|| Error::not_found(title))?;
        rows.remove(idx);
        self.write_rows(&rows)
    }

    fn update_rating(
        &self,
        title: &str,
        rating: Option<Rating>,
    ) -> Result<()> {
        self.modify(title, |r| r.rating = rating)
    }

    fn update_notes(&self, title: &str, notes: Option<&str>) -> Result<()> {
        let notes = clean_notes(notes);
        self.modify(title, |r| r.notes = notes)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn as_csv(&self) -> Option<&CsvStorage> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, CsvStorage) {
        let tmp = tempfile::tempdir().unwrap();
        let store = CsvStorage::open(&tmp.path().join("movies.csv")).unwrap();
        (tmp, store)
    }

    fn lines(store: &CsvStorage) -> Vec<String> {
        std::fs::read_to_string(store.path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn open_writes_header() {
        let (_tmp, store) = test_store();
        assert_eq!(
            lines(&store),
            vec!["title,rating,year,poster,notes,external_id"]
        );
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn open_keeps_existing_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("movies.csv");
        std::fs::write(&path, "title,rating,year,poster\nHeat,8.3,1995,\n")
            .unwrap();
        let store = CsvStorage::open(&path).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn rows_are_written_in_column_order() {
        let (_tmp, store) = test_store();
        store
            .add(
                Record::new("Titanic", "1997")
                    .with_rating(Rating::new(9.0).unwrap())
                    .with_external_id("tt0120338"),
            )
            .unwrap();
        assert_eq!(lines(&store)[1], "Titanic,9.0,1997,,,tt0120338");
    }

    #[test]
    fn null_rating_is_empty_cell() {
        let (_tmp, store) = test_store();
        store.add(Record::new("Heat", "1995")).unwrap();
        assert_eq!(lines(&store)[1], "Heat,,1995,,,");
        assert_eq!(store.list().unwrap().get("Heat").unwrap().rating, None);
    }

    #[test]
    fn unparsable_ratings_read_as_absent() {
        let (_tmp, store) = test_store();
        std::fs::write(
            store.path(),
            "title,rating,year,poster,notes,external_id\n\
             A,N/A,2000,,,\n\
             B,n/a,2000,,,\n\
             C,great,2000,,,\n\
             D,12.5,2000,,,\n\
             E, 7.25 ,2000,,,\n",
        )
        .unwrap();
        let catalog = store.list().unwrap();
        for title in ["A", "B", "C", "D"] {
            assert_eq!(catalog.get(title).unwrap().rating, None, "{title}");
        }
        assert_eq!(
            catalog.get("E").unwrap().rating,
            Some(Rating::new(7.25).unwrap())
        );
    }

    #[test]
    fn preserves_row_order_and_keeps_year_text() {
        let (_tmp, store) = test_store();
        store.add(Record::new("Zodiac", "2007")).unwrap();
        store.add(Record::new("Dark", "2017–2020")).unwrap();
        store.add(Record::new("Alien", "1979/I")).unwrap();

        let catalog = store.list().unwrap();
        let titles: Vec<_> = catalog.titles().collect();
        assert_eq!(titles, vec!["Zodiac", "Dark", "Alien"]);
        assert_eq!(catalog.get("Dark").unwrap().year, "2017–2020");
    }

    #[test]
    fn quotes_titles_with_commas() {
        let (_tmp, store) = test_store();
        let title = "Crouching Tiger, Hidden Dragon";
        store.add(Record::new(title, "2000")).unwrap();
        assert!(lines(&store)[1].starts_with('"'));
        assert!(store.list().unwrap().get(title).is_some());
    }

    #[test]
    fn legacy_columns_are_read_and_unknown_columns_dropped() {
        let (_tmp, store) = test_store();
        std::fs::write(
            store.path(),
            "title,rating,year,poster,imdb_id,mood\nHeat,8.3,1995,,tt0113277,tense\n",
        )
        .unwrap();

        let heat = store.list().unwrap().get("Heat").cloned().unwrap();
        assert_eq!(heat.external_id.as_deref(), Some("tt0113277"));
        assert_eq!(heat.notes, None);

        store.update_notes("Heat", Some("De Niro")).unwrap();
        assert_eq!(
            lines(&store),
            vec![
                "title,rating,year,poster,notes,external_id",
                "Heat,8.3,1995,,De Niro,tt0113277",
            ]
        );
    }

    #[test]
    fn blank_external_id_falls_back_to_imdb_id() {
        let (_tmp, store) = test_store();
        std::fs::write(
            store.path(),
            "title,imdb_id,external_id\nHeat,tt0113277,\nAlien,tt0078748,new\n",
        )
        .unwrap();

        let catalog = store.list().unwrap();
        let ids: Vec<_> = catalog
            .iter()
            .map(|r| r.external_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["tt0113277", "new"]);
    }

    #[test]
    fn add_rejects_case_insensitive_duplicate() {
        let (_tmp, store) = test_store();
        store.add(Record::new("Movie", "2001")).unwrap();
        assert!(matches!(
            store.add(Record::new("movie", "2001")),
            Err(Error::AlreadyExists { .. })
        ));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn lookups_are_case_folded() {
        let (_tmp, store) = test_store();
        store.add(Record::new("Straße", "2001")).unwrap();
        store
            .update_rating("STRASSE", Some(Rating::new(6.0).unwrap()))
            .unwrap();
        assert_eq!(
            store.list().unwrap().get("Straße").unwrap().rating,
            Some(Rating::new(6.0).unwrap())
        );
        store.delete("strasse").unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn absent_titles_are_not_found_and_leave_file_alone() {
        let (_tmp, store) = test_store();
        store.add(Record::new("Heat", "1995")).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        assert!(matches!(store.delete("Alien"), Err(Error::NotFound { .. })));
        assert!(matches!(
            store.update_rating("Alien", None),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            store.update_notes("Alien", None),
            Err(Error::NotFound { .. })
        ));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn exposes_csv_capability() {
        let (_tmp, store) = test_store();
        let dyn_store: &dyn Storage = &store;
        assert!(dyn_store.as_csv().is_some());
    }
}
