//! Read-only views over a [`Catalog`]: statistics, orderings, filters and
//! a random pick. None of these touch the store.

use std::cmp::Ordering;

use rand::{Rng, seq::SliceRandom};

use crate::record::{Catalog, Record};

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub rated: usize,
    pub average: f64,
    /// Upper median: the middle element, or the higher of the two middle
    /// elements for an even count.
    pub median: f64,
    pub best: String,
    pub worst: String,
}

/// Rating statistics over rated records, `None` when nothing is rated.
/// Ties for best and worst go to the record enumerated first.
pub fn stats(catalog: &Catalog) -> Option<Stats> {
    let rated: Vec<(&str, f64)> = catalog
        .iter()
        .filter_map(|r| r.rating.map(|x| (r.title.as_str(), x.value())))
        .collect();
    if rated.is_empty() {
        return None;
    }

    let mut values: Vec<f64> = rated.iter().map(|(_, v)| *v).collect();
    values.sort_by(f64::total_cmp);
    let average = values.iter().sum::<f64>() / values.len() as f64;
    let median = values[values.len() / 2];

    let mut best = rated[0];
    let mut worst = rated[0];
    for &entry in &rated[1..] {
        if entry.1 > best.1 {
            best = entry;
        }
        if entry.1 < worst.1 {
            worst = entry;
        }
    }

    Some(Stats {
        rated: rated.len(),
        average,
        median,
        best: best.0.to_string(),
        worst: worst.0.to_string(),
    })
}

/// Highest rated first; unrated records last, in catalog order.
pub fn sorted_by_rating(catalog: &Catalog) -> Vec<&Record> {
    let mut records: Vec<&Record> = catalog.iter().collect();
    records.sort_by(|a, b| match (a.rating, b.rating) {
        (Some(x), Some(y)) => y.value().total_cmp(&x.value()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    records
}

/// Ordered by the leading year. Records without a readable year always
/// come last.
pub fn sorted_by_year(catalog: &Catalog, latest_first: bool) -> Vec<&Record> {
    let mut records: Vec<&Record> = catalog.iter().collect();
    records.sort_by(|a, b| match (a.year_prefix(), b.year_prefix()) {
        (Some(x), Some(y)) if latest_first => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    records
}

/// Criteria for [`filter`]. Unset fields do not constrain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Filter {
    pub min_rating: Option<f64>,
    pub start_year: Option<u16>,
    pub end_year: Option<u16>,
}

impl Filter {
    /// A record missing the field an active criterion needs is excluded.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(min) = self.min_rating
            && !record.rating.is_some_and(|r| r.value() >= min)
        {
            return false;
        }
        let year = record.year_prefix();
        if let Some(start) = self.start_year
            && !year.is_some_and(|y| y >= start)
        {
            return false;
        }
        if let Some(end) = self.end_year
            && !year.is_some_and(|y| y <= end)
        {
            return false;
        }
        true
    }
}

pub fn filter<'a>(catalog: &'a Catalog, criteria: &Filter) -> Vec<&'a Record> {
    catalog.iter().filter(|r| criteria.matches(r)).collect()
}

pub fn random_pick<'a, R: Rng + ?Sized>(
    catalog: &'a Catalog,
    rng: &mut R,
) -> Option<&'a Record> {
    let records: Vec<&Record> = catalog.iter().collect();
    records.choose(rng).copied()
}
