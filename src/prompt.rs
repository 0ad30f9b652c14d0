use std::io::{BufRead, Write};

use crate::{
    disambiguate::{Choice, Disambiguator},
    resolve::{Candidate, Stage},
};

/// Asks on a line-oriented terminal which candidate was meant.
///
/// Prints a numbered list (with scores for fuzzy candidates) to `output`
/// and reads one line from `input`. A blank line, a non-number or a read
/// failure cancels.
pub struct LineDisambiguator<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineDisambiguator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn present(
        &mut self,
        stage: Stage,
        candidates: &[Candidate],
    ) -> std::io::Result<()> {
        let heading = match stage {
            Stage::Fuzzy => "Fuzzy matches:",
            Stage::Exact | Stage::Substring => "Multiple matches:",
        };
        writeln!(self.output, "{heading}")?;
        for (i, c) in candidates.iter().enumerate() {
            match c.score {
                Some(score) => writeln!(
                    self.output,
                    "{}. {} [score: {score:.0}]",
                    i + 1,
                    c.title
                )?,
                None => writeln!(self.output, "{}. {}", i + 1, c.title)?,
            }
        }
        write!(self.output, "Enter number to choose (blank to cancel): ")?;
        self.output.flush()
    }

    fn read_choice(&mut self) -> std::io::Result<Choice> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Choice::Cancel);
        }
        Ok(line
            .trim()
            .parse::<usize>()
            .map(Choice::Index)
            .unwrap_or(Choice::Cancel))
    }
}

impl<R: BufRead, W: Write> Disambiguator for LineDisambiguator<R, W> {
    fn choose(
        &mut self,
        _query: &str,
        stage: Stage,
        candidates: &[Candidate],
    ) -> Choice {
        let answer = self
            .present(stage, candidates)
            .and_then(|()| self.read_choice());
        match answer {
            Ok(choice) => choice,
            Err(e) => {
                tracing::warn!(error = %e, "could not read selection");
                Choice::Cancel
            }
        }
    }
}
