//! Gap-run detection over aligned sequence strings.
//!
//! An aligned sequence in an XMFA block is nucleotides interleaved with `-`
//! gap characters. [`GapScanner`] walks the string once and reports each
//! maximal run of `-` as a [`Gap`] with 1-based coordinates, where `end` is
//! the position just after the run.

use crate::error::Diagnostic;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One run of gap characters. `start` is 1-based inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start: usize,
    pub end: usize,
}

impl Gap {
    /// Number of gap characters in the run.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// How a gap run reaching the end of the sequence is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingGaps {
    /// Drop a run that is not followed by a non-gap character.
    /// Matches the JSON written by earlier versions of the workflow.
    #[default]
    Legacy,
    /// Report the trailing run too, with `end = len + 1`.
    Strict,
}

/// Result of scanning one sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapScan {
    pub gaps: Vec<Gap>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scans aligned sequences for gap runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GapScanner {
    trailing: TrailingGaps,
}

impl GapScanner {
    pub fn new(trailing: TrailingGaps) -> Self {
        GapScanner { trailing }
    }

    /// Scanner that also reports a run extending to the end of the string.
    pub fn strict() -> Self {
        Self::new(TrailingGaps::Strict)
    }

    /// Returns the gap runs of `sequence`, logging any invalid characters.
    pub fn scan(&self, sequence: &str) -> Vec<Gap> {
        self.scan_with_diagnostics(sequence).gaps
    }

    /// Returns the gap runs together with the invalid-character diagnostics.
    pub fn scan_with_diagnostics(&self, sequence: &str) -> GapScan {
        let mut result = GapScan::default();
        let mut run_start: Option<usize> = None;
        let mut len = 0;

        for (i, c) in sequence.chars().enumerate() {
            let pos = i + 1;
            len = pos;

            if !is_valid_base(c) {
                warn!(position = pos, character = %c, "invalid character in aligned sequence");
                result.diagnostics.push(Diagnostic::InvalidCharacter {
                    position: pos,
                    character: c,
                });
            }

            if c == '-' {
                if run_start.is_none() {
                    run_start = Some(pos);
                }
            } else if let Some(start) = run_start.take() {
                result.gaps.push(Gap { start, end: pos });
            }
        }

        if let (Some(start), TrailingGaps::Strict) = (run_start, self.trailing) {
            result.gaps.push(Gap {
                start,
                end: len + 1,
            });
        }

        result
    }
}

/// Convenience wrapper for [`GapScanner::scan`] in legacy mode.
pub fn scan(sequence: &str) -> Vec<Gap> {
    GapScanner::default().scan(sequence)
}

fn is_valid_base(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 't' | 'g' | 'c' | 'n' | '-')
}
