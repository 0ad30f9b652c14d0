//! Title resolution: turns a free-form query into catalog titles.
//!
//! Resolution is a cascade of three stages, each tried only when the
//! previous one found nothing:
//!
//! 1. **Exact**: normalized title equals the normalized query.
//! 2. **Substring**: normalized title contains the normalized query.
//!    Hits keep catalog enumeration order.
//! 3. **Fuzzy**: every title is scored against the raw query; scores at
//!    or above [`FUZZY_THRESHOLD`] survive, ordered by score (descending)
//!    then title (ascending).
//!
//! Every title-based operation goes through [`MatchCascade::resolve`].

use std::{cmp::Ordering, fmt};

use crate::{fuzzy, normalize::normalize_title};

/// Minimum fuzzy score (inclusive) for a title to be a candidate.
pub const FUZZY_THRESHOLD: f64 = 60.0;

/// Similarity metric used by the fuzzy stage. Scores are in `0..=100`.
pub trait Scorer {
    fn score(&self, query: &str, candidate: &str) -> f64;
}

impl<F> Scorer for F
where
    F: Fn(&str, &str) -> f64,
{
    fn score(&self, query: &str, candidate: &str) -> f64 {
        self(query, candidate)
    }
}

/// The default metric, see [`fuzzy::weighted_ratio`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedRatio;

impl Scorer for WeightedRatio {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        fuzzy::weighted_ratio(query, candidate)
    }
}

/// The cascade stage that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Exact,
    Substring,
    Fuzzy,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Substring => "substring",
            Self::Fuzzy => "fuzzy",
        })
    }
}

/// A surviving title. `score` is only set by the fuzzy stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub score: Option<f64>,
}

impl Candidate {
    fn plain(title: &str) -> Self {
        Self {
            title: title.to_string(),
            score: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Unique(String),
    Ambiguous {
        stage: Stage,
        candidates: Vec<Candidate>,
    },
    NoMatch,
}

impl Resolution {
    fn from_stage(stage: Stage, mut candidates: Vec<Candidate>) -> Self {
        match candidates.len() {
            0 => Self::NoMatch,
            1 => Self::Unique(candidates.remove(0).title),
            _ => Self::Ambiguous { stage, candidates },
        }
    }
}

pub struct MatchCascade<S = WeightedRatio> {
    scorer: S,
    threshold: f64,
}

impl Default for MatchCascade<WeightedRatio> {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchCascade<WeightedRatio> {
    pub fn new() -> Self {
        Self::with_scorer(WeightedRatio)
    }
}

impl<S: Scorer> MatchCascade<S> {
    pub fn with_scorer(scorer: S) -> Self {
        Self {
            scorer,
            threshold: FUZZY_THRESHOLD,
        }
    }

    /// Resolve `query` against `titles`, given in catalog enumeration
    /// order. Never fails; no match is [`Resolution::NoMatch`].
    ///
    /// ```
    /// use filmshelf::resolve::{MatchCascade, Resolution};
    ///
    /// let titles = ["The Matrix", "The Matrix Reloaded", "Alien"];
    /// let cascade = MatchCascade::new();
    ///
    /// assert_eq!(
    ///     cascade.resolve(titles, "the  MATRIX"),
    ///     Resolution::Unique("The Matrix".to_string())
    /// );
    /// assert!(matches!(
    ///     cascade.resolve(titles, "matrix"),
    ///     Resolution::Ambiguous { .. }
    /// ));
    /// ```
    pub fn resolve<'a, I>(&self, titles: I, query: &str) -> Resolution
    where
        I: IntoIterator<Item = &'a str>,
    {
        let wanted = normalize_title(query);
        if wanted.is_empty() {
            return Resolution::NoMatch;
        }

        let titles: Vec<&str> = titles.into_iter().collect();
        let normalized: Vec<String> =
            titles.iter().map(|t| normalize_title(t)).collect();

        let exact = self.collect_where(&titles, &normalized, |n| n == wanted);
        if !exact.is_empty() {
            tracing::trace!(query, hits = exact.len(), "exact stage matched");
            return Resolution::from_stage(Stage::Exact, exact);
        }

        let substring = self
            .collect_where(&titles, &normalized, |n| n.contains(&wanted));
        if !substring.is_empty() {
            tracing::trace!(
                query,
                hits = substring.len(),
                "substring stage matched"
            );
            return Resolution::from_stage(Stage::Substring, substring);
        }

        let fuzzy = self.fuzzy_candidates(&titles, query);
        tracing::trace!(query, hits = fuzzy.len(), "fuzzy stage finished");
        Resolution::from_stage(Stage::Fuzzy, fuzzy)
    }

    fn collect_where(
        &self,
        titles: &[&str],
        normalized: &[String],
        keep: impl Fn(&str) -> bool,
    ) -> Vec<Candidate> {
        titles
            .iter()
            .zip(normalized)
            .filter(|(_, n)| keep(n))
            .map(|(t, _)| Candidate::plain(t))
            .collect()
    }

    /// Score every title against the raw query, keep those at or above the
    /// threshold, best first with ties broken by title.
    pub fn fuzzy_candidates(
        &self,
        titles: &[&str],
        query: &str,
    ) -> Vec<Candidate> {
        let mut scored: Vec<(&str, f64)> = titles
            .iter()
            .map(|t| (*t, self.scorer.score(query, t)))
            .filter(|(_, score)| *score >= self.threshold)
            .collect();

        scored.sort_by(|(ta, sa), (tb, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| ta.cmp(tb))
        });

        scored
            .into_iter()
            .map(|(title, score)| Candidate {
                title: title.to_string(),
                score: Some(score),
            })
            .collect()
    }
}
