//! Transformations applied to parsed blocks before they are exported.

use crate::gaps::{GapScanner, TrailingGaps};
use crate::xmfa::Lcb;
use tracing::debug;

/// Which transformations to apply. Each one is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcessOptions {
    /// Replace each name with the part after its last `/`
    pub shorten_names: bool,

    /// Compute `gaps` from each region's sequence
    pub annotate_gaps: bool,

    /// Remove `sequence` from each region
    pub strip_sequences: bool,

    /// Trailing gap-run handling used when annotating
    pub trailing_gaps: TrailingGaps,
}

impl PostProcessOptions {
    /// Sequences are kept and names left untouched.
    pub fn full() -> Self {
        Self::default()
    }

    /// Short names and no sequence data: the layout written by the
    /// workflow's JSON export.
    pub fn summary() -> Self {
        PostProcessOptions {
            shorten_names: true,
            strip_sequences: true,
            ..Default::default()
        }
    }

    pub fn with_gaps(mut self, trailing_gaps: TrailingGaps) -> Self {
        self.annotate_gaps = true;
        self.trailing_gaps = trailing_gaps;
        self
    }
}

/// Applies `options` to every region in place.
///
/// Gaps are computed before sequences are stripped, so both can be
/// requested together.
pub fn process(lcbs: &mut [Lcb], options: &PostProcessOptions) {
    let scanner = GapScanner::new(options.trailing_gaps);
    debug!(?options, lcbs = lcbs.len(), "post-processing alignment");

    for region in lcbs.iter_mut().flatten() {
        if options.annotate_gaps {
            let gaps = region
                .sequence
                .as_deref()
                .map(|seq| scanner.scan(seq))
                .unwrap_or_default();
            region.gaps = Some(gaps);
        }
        if options.shorten_names {
            region.name = short_name(&region.name).to_string();
        }
        if options.strip_sequences {
            region.sequence = None;
        }
    }
}

/// The portion of `name` after the last `/`.
pub fn short_name(name: &str) -> &str {
    name.rsplit_once('/').map_or(name, |(_, tail)| tail)
}
