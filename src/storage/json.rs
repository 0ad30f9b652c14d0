use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::{Map, Value};

use super::{Storage, clean_notes, prepare_insert, write_atomic};
use crate::{
    error::{Error, Result},
    record::{Catalog, Rating, Record},
};

/// Stores the catalog as one pretty-printed JSON object keyed by title:
///
/// ```json
/// {
///   "Inception": {
///     "year": "2010",
///     "rating": 8.8,
///     "poster": null,
///     "notes": null,
///     "external_id": "tt1375666"
///   }
/// }
/// ```
///
/// A missing, empty, unparsable or non-object file loads as an empty
/// catalog. Key order in the file is the catalog's enumeration order.
#[derive(Debug)]
pub struct JsonStorage {
    path: PathBuf,
}

#[derive(Serialize)]
struct StoredEntry<'a> {
    year: Option<&'a str>,
    rating: Option<f64>,
    poster: Option<&'a str>,
    notes: Option<&'a str>,
    external_id: Option<&'a str>,
}

impl<'a> From<&'a Record> for StoredEntry<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            year: Some(record.year.as_str()).filter(|y| !y.is_empty()),
            rating: record.rating.map(Rating::value),
            poster: record.poster.as_deref(),
            notes: record.notes.as_deref(),
            external_id: record.external_id.as_deref(),
        }
    }
}

impl JsonStorage {
    /// Open the store at `path`, creating an empty document if the file
    /// does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let storage = Self {
            path: path.to_path_buf(),
        };
        if !path.exists() {
            storage.save(&Catalog::new())?;
        }
        Ok(storage)
    }

    fn load(&self) -> Result<Catalog> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Catalog::new());
            }
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Catalog::new());
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(map
                .iter()
                .map(|(title, entry)| record_from_entry(title, entry))
                .collect()),
            Ok(other) => {
                tracing::warn!(
                    path = %self.path.display(),
                    root = json_kind(&other),
                    "store root is not an object, treating as empty"
                );
                Ok(Catalog::new())
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "store is not valid JSON, treating as empty"
                );
                Ok(Catalog::new())
            }
        }
    }

    fn render(catalog: &Catalog) -> Result<Value> {
        let mut map = Map::new();
        for record in catalog {
            map.insert(
                record.title.clone(),
                serde_json::to_value(StoredEntry::from(record))?,
            );
        }
        Ok(Value::Object(map))
    }

    fn save(&self, catalog: &Catalog) -> Result<()> {
        let document = Self::render(catalog)?;
        write_atomic(&self.path, |file| {
            serde_json::to_writer_pretty(&mut *file, &document)?;
            Ok(())
        })?;
        tracing::debug!(
            path = %self.path.display(),
            records = catalog.len(),
            "saved JSON store"
        );
        Ok(())
    }

    fn modify<F>(&self, title: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut Record),
    {
        let mut catalog = self.load()?;
        let record = catalog
            .get_mut(title)
            .ok_or_else(|| Error::not_found(title))?;
        change(record);
        self.save(&catalog)
    }
}

impl Storage for JsonStorage {
    fn list(&self) -> Result<Catalog> {
        self.load()
    }

    fn add(&self, record: Record) -> Result<()> {
        let mut catalog = self.load()?;
        let record = prepare_insert(&catalog, record)?;
        catalog.upsert(record);
        self.save(&catalog)
    }

    fn delete(&self, title: &str) -> Result<()> {
        let mut catalog = self.load()?;
        catalog.remove(title).ok_or_else(|| Error::not_found(title))?;
        self.save(&catalog)
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
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn text_field(entry: &Value, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn rating_field(title: &str, entry: &Value) -> Option<Rating> {
    let value = match entry.get("rating")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    match Rating::new(value) {
        Ok(rating) => Some(rating),
        Err(_) => {
            tracing::warn!(title, value, "ignoring out-of-range rating");
            None
        }
    }
}

/// Missing or oddly typed fields read as absent.
fn record_from_entry(title: &str, entry: &Value) -> Record {
    Record {
        title: title.to_string(),
        year: text_field(entry, "year").unwrap_or_default(),
        rating: rating_field(title, entry),
        poster: text_field(entry, "poster"),
        notes: text_field(entry, "notes"),
        external_id: text_field(entry, "external_id")
            .or_else(|| text_field(entry, "imdb_id")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::stage;

    fn test_store() -> (tempfile::TempDir, JsonStorage) {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonStorage::open(&tmp.path().join("movies.json")).unwrap();
        (tmp, store)
    }

    fn inception() -> Record {
        Record::new("Inception", "2010")
            .with_rating(Rating::new(8.8).unwrap())
            .with_external_id("tt1375666")
    }

    #[test]
    fn open_creates_empty_document() {
        let (_tmp, store) = test_store();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.trim(), "{}");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn add_then_list_round_trips() {
        let (_tmp, store) = test_store();
        store.add(inception()).unwrap();
        assert_eq!(store.list().unwrap().get("Inception"), Some(&inception()));
    }

    #[test]
    fn file_layout_is_keyed_by_title() {
        let (_tmp, store) = test_store();
        store.add(inception()).unwrap();

        let raw: Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap())
                .unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "Inception": {
                    "year": "2010",
                    "rating": 8.8,
                    "poster": null,
                    "notes": null,
                    "external_id": "tt1375666"
                }
            })
        );
    }

    #[test]
    fn preserves_document_order() {
        let (_tmp, store) = test_store();
        for title in ["Zodiac", "Alien", "Memento"] {
            store.add(Record::new(title, "2000")).unwrap();
        }
        store.update_notes("Alien", Some("in space")).unwrap();
        let titles: Vec<String> = store
            .list()
            .unwrap()
            .titles()
            .map(str::to_string)
            .collect();
        assert_eq!(titles, vec!["Zodiac", "Alien", "Memento"]);
    }

    #[test]
    fn missing_nested_keys_default_to_absent() {
        let (_tmp, store) = test_store();
        std::fs::write(
            store.path(),
            r#"{"Heat": {"year": 1995, "imdb_id": "tt0113277"}, "Odd": 5}"#,
        )
        .unwrap();

        let catalog = store.list().unwrap();
        let heat = catalog.get("Heat").unwrap();
        assert_eq!(heat.year, "1995");
        assert_eq!(heat.rating, None);
        assert_eq!(heat.poster, None);
        assert_eq!(heat.external_id.as_deref(), Some("tt0113277"));
        assert_eq!(catalog.get("Odd"), Some(&Record::new("Odd", "")));
    }

    #[test]
    fn out_of_range_rating_reads_as_absent() {
        let (_tmp, store) = test_store();
        std::fs::write(store.path(), r#"{"Heat": {"rating": 42}}"#).unwrap();
        assert_eq!(store.list().unwrap().get("Heat").unwrap().rating, None);
    }

    #[test]
    fn garbage_and_non_object_roots_read_as_empty() {
        let (_tmp, store) = test_store();
        let cases: [&[u8]; 6] = [
            b"\xff\xfe not json at all",
            b"",
            b"   \n",
            b"[1, 2, 3]",
            b"\"movies\"",
            b"{\"truncated\": {\"year\": ",
        ];
        for content in cases {
            std::fs::write(store.path(), content).unwrap();
            assert!(store.list().unwrap().is_empty());
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let (_tmp, store) = test_store();
        std::fs::remove_file(store.path()).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn add_rejects_normalized_collision() {
        let (_tmp, store) = test_store();
        store.add(Record::new("Movie", "2001")).unwrap();
        let err = store.add(Record::new("  MOVIE ", "2002")).unwrap_err();
        assert!(
            matches!(err, Error::AlreadyExists { ref title } if title == "Movie")
        );
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn add_rejects_blank_title() {
        let (_tmp, store) = test_store();
        assert!(matches!(
            store.add(Record::new("  ", "2001")),
            Err(Error::EmptyTitle)
        ));
    }

    #[test]
    fn delete_and_updates_use_exact_key() {
        let (_tmp, store) = test_store();
        store.add(inception()).unwrap();
        let before = store.list().unwrap();

        assert!(matches!(
            store.delete("inception"),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            store.update_rating("Missing", None),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            store.update_notes("Missing", Some("x")),
            Err(Error::NotFound { .. })
        ));
        assert_eq!(store.list().unwrap(), before);
    }

    #[test]
    fn update_rating_and_notes() {
        let (_tmp, store) = test_store();
        store.add(inception()).unwrap();

        store.update_rating("Inception", None).unwrap();
        store.update_notes("Inception", Some(" dream within a dream ")).unwrap();
        let record = store.list().unwrap().get("Inception").cloned().unwrap();
        assert_eq!(record.rating, None);
        assert_eq!(record.notes.as_deref(), Some("dream within a dream"));

        store.update_notes("Inception", Some("")).unwrap();
        assert_eq!(
            store.list().unwrap().get("Inception").unwrap().notes,
            None
        );
    }

    #[test]
    fn delete_removes_record() {
        let (_tmp, store) = test_store();
        store.add(inception()).unwrap();
        store.delete("Inception").unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn interrupted_write_keeps_original_intact() {
        let (_tmp, store) = test_store();
        store.add(inception()).unwrap();
        let original = std::fs::read(store.path()).unwrap();

        // Crash after the temp file is fully written but before the rename.
        let mut catalog = store.list().unwrap();
        catalog.upsert(Record::new("Heat", "1995"));
        let document = JsonStorage::render(&catalog).unwrap();
        let staged = stage(store.path(), |file| {
            serde_json::to_writer_pretty(&mut *file, &document)?;
            Ok(())
        })
        .unwrap();
        drop(staged);

        assert_eq!(std::fs::read(store.path()).unwrap(), original);
        let after = store.list().unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after.get("Inception"), Some(&inception()));
    }
}
