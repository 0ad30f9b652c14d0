//! Disambiguation protocol between the resolver and whoever talks to the
//! user.
//!
//! When the cascade returns more than one candidate the caller hands the
//! ordered list to a [`Disambiguator`], which answers with a 1-based
//! index into that exact list or a cancellation. Anything outside
//! `1..=len` counts as a cancellation, and a cancelled selection must not
//! be followed by a store mutation.

use crate::resolve::{Candidate, MatchCascade, Resolution, Scorer, Stage};

/// Answer from a [`Disambiguator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// 1-based position in the presented list.
    Index(usize),
    Cancel,
}

pub trait Disambiguator {
    fn choose(
        &mut self,
        query: &str,
        stage: Stage,
        candidates: &[Candidate],
    ) -> Choice;
}

/// Outcome of resolving a query down to at most one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Chosen(String),
    Cancelled,
    NoMatch,
}

impl Selection {
    pub fn into_title(self) -> Option<String> {
        match self {
            Self::Chosen(title) => Some(title),
            Self::Cancelled | Self::NoMatch => None,
        }
    }
}

/// Map a [`Choice`] onto the candidate list, rejecting out-of-domain
/// indices.
pub fn apply_choice(candidates: &[Candidate], choice: Choice) -> Selection {
    match choice {
        Choice::Index(i) if (1..=candidates.len()).contains(&i) => {
            Selection::Chosen(candidates[i - 1].title.clone())
        }
        Choice::Index(i) => {
            tracing::warn!(
                index = i,
                len = candidates.len(),
                "selection out of range, treating as cancelled"
            );
            Selection::Cancelled
        }
        Choice::Cancel => Selection::Cancelled,
    }
}

/// Resolve `query` against `titles`, asking `disambiguator` only when the
/// cascade is ambiguous.
pub fn select_title<'a, I, S, D>(
    cascade: &MatchCascade<S>,
    titles: I,
    query: &str,
    disambiguator: &mut D,
) -> Selection
where
    I: IntoIterator<Item = &'a str>,
    S: Scorer,
    D: Disambiguator + ?Sized,
{
    match cascade.resolve(titles, query) {
        Resolution::Unique(title) => Selection::Chosen(title),
        Resolution::NoMatch => Selection::NoMatch,
        Resolution::Ambiguous { stage, candidates } => {
            let choice = disambiguator.choose(query, stage, &candidates);
            apply_choice(&candidates, choice)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed answer and remembers what it was shown.
    struct Scripted {
        answer: Choice,
        seen: Vec<(Stage, Vec<String>)>,
    }

    impl Scripted {
        fn new(answer: Choice) -> Self {
            Self {
                answer,
                seen: Vec::new(),
            }
        }
    }

    impl Disambiguator for Scripted {
        fn choose(
            &mut self,
            _query: &str,
            stage: Stage,
            candidates: &[Candidate],
        ) -> Choice {
            self.seen.push((
                stage,
                candidates.iter().map(|c| c.title.clone()).collect(),
            ));
            self.answer
        }
    }

    const TITLES: [&str; 3] = ["Alien", "Aliens", "Heat"];

    #[test]
    fn unique_result_skips_disambiguator() {
        let mut d = Scripted::new(Choice::Cancel);
        let got = select_title(&MatchCascade::new(), TITLES, "heat", &mut d);
        assert_eq!(got, Selection::Chosen("Heat".to_string()));
        assert!(d.seen.is_empty());
    }

    #[test]
    fn index_is_one_based() {
        let mut d = Scripted::new(Choice::Index(2));
        let got = select_title(&MatchCascade::new(), TITLES, "lie", &mut d);
        assert_eq!(got, Selection::Chosen("Aliens".to_string()));
        assert_eq!(
            d.seen,
            vec![(
                Stage::Substring,
                vec!["Alien".to_string(), "Aliens".to_string()]
            )]
        );
    }

    #[test]
    fn out_of_range_index_cancels() {
        for bad in [0, 3, usize::MAX] {
            let mut d = Scripted::new(Choice::Index(bad));
            let got =
                select_title(&MatchCascade::new(), TITLES, "lie", &mut d);
            assert_eq!(got, Selection::Cancelled, "index {bad}");
        }
    }

    #[test]
    fn cancel_is_cancelled() {
        let mut d = Scripted::new(Choice::Cancel);
        let got = select_title(&MatchCascade::new(), TITLES, "lie", &mut d);
        assert_eq!(got, Selection::Cancelled);
        assert_eq!(got.into_title(), None);
    }

    #[test]
    fn no_match_skips_disambiguator() {
        let mut d = Scripted::new(Choice::Index(1));
        let got =
            select_title(&MatchCascade::new(), TITLES, "qqqqqqqq", &mut d);
        assert_eq!(got, Selection::NoMatch);
        assert!(d.seen.is_empty());
    }
}
