use std::fmt;

use crate::{
    error::{Error, Result},
    normalize::normalize_title,
};

/// A user rating, guaranteed finite and within `0.0..=10.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Rating(f64);

impl Rating {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 10.0;

    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidRating(value))
        }
    }

    /// Parse user-typed text, accepting `,` as the decimal separator.
    ///
    /// Returns `None` for anything that is not a finite number in range.
    ///
    /// ```
    /// use filmshelf::record::Rating;
    ///
    /// assert_eq!(Rating::parse_lenient("7,5").map(|r| r.value()), Some(7.5));
    /// assert!(Rating::parse_lenient("N/A").is_none());
    /// assert!(Rating::parse_lenient("11").is_none());
    /// ```
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let value: f64 = text.trim().replace(',', ".").parse().ok()?;
        Self::new(value).ok()
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl TryFrom<f64> for Rating {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

/// One catalog entry.
///
/// `year` is kept verbatim since it may hold ranges or suffixes such as
/// `"2015–2019"` or `"1997/II"`; see [`Record::year_prefix`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub title: String,
    pub year: String,
    pub rating: Option<Rating>,
    pub poster: Option<String>,
    pub notes: Option<String>,
    pub external_id: Option<String>,
}

impl Record {
    pub fn new(title: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: year.into(),
            ..Self::default()
        }
    }

    pub fn with_rating(mut self, rating: Rating) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// The leading four-digit year, if the year text starts with one.
    ///
    /// Ranges sort by their first year.
    ///
    /// ```
    /// use filmshelf::Record;
    ///
    /// assert_eq!(Record::new("X", "2015–2019").year_prefix(), Some(2015));
    /// assert_eq!(Record::new("X", "1997/II").year_prefix(), Some(1997));
    /// assert_eq!(Record::new("X", "97").year_prefix(), None);
    /// ```
    pub fn year_prefix(&self) -> Option<u16> {
        let prefix = self.year.trim().get(..4)?;
        if prefix.bytes().all(|b| b.is_ascii_digit()) {
            prefix.parse().ok()
        } else {
            None
        }
    }
}

/// The full record set of a store, in the backend's enumeration order.
///
/// Keys are titles as stored; lookups through [`Catalog::get`] use the
/// exact key while [`Catalog::find_normalized`] compares normalized
/// titles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    records: Vec<Record>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, title: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.title == title)
    }

    pub fn find_normalized(&self, title: &str) -> Option<&Record> {
        let wanted = normalize_title(title);
        self.records
            .iter()
            .find(|r| normalize_title(&r.title) == wanted)
    }

    pub fn contains_normalized(&self, title: &str) -> bool {
        self.find_normalized(title).is_some()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.title.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Insert a record, replacing any entry with the same exact key in
    /// place so enumeration order stays stable.
    pub(crate) fn upsert(&mut self, record: Record) {
        match self.records.iter_mut().find(|r| r.title == record.title) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    pub(crate) fn remove(&mut self, title: &str) -> Option<Record> {
        let idx = self.records.iter().position(|r| r.title == title)?;
        Some(self.records.remove(idx))
    }

    pub(crate) fn get_mut(&mut self, title: &str) -> Option<&mut Record> {
        self.records.iter_mut().find(|r| r.title == title)
    }
}

impl FromIterator<Record> for Catalog {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for record in iter {
            catalog.upsert(record);
        }
        catalog
    }
}

impl IntoIterator for Catalog {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
