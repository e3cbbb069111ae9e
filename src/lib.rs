//! # mauve-rs: Mauve alignment workflows and XMFA parsing
//!
//! This library drives comparative-genomics alignments with the Mauve
//! aligners and turns their XMFA output into structured data.
//!
//! ## Overview
//!
//! - Parse XMFA text into locally collinear blocks (LCBs), one
//!   [`AlignedRegion`] per participating sequence
//! - Find gap runs in aligned sequences
//! - Shorten names, annotate gaps or drop sequence data before export
//! - Run `progressiveMauve` / `mauveAligner` as a subprocess and write the
//!   alignment as JSON
//!
//! ## Example Usage
//!
//! ```
//! # fn main() -> mauve_rs::Result<()> {
//! use mauve_rs::{parse, process, PostProcessOptions, TrailingGaps};
//!
//! let text = "> 1:1-4 + /data/genomeA.fasta\nAC-T\n> 2:11-14 - /data/genomeB.fasta\nACGT\n=\n";
//! let mut lcbs = parse(text)?;
//! assert_eq!(lcbs.len(), 1);
//!
//! process(&mut lcbs, &PostProcessOptions::summary().with_gaps(TrailingGaps::Legacy));
//! assert_eq!(lcbs[0][0].name, "genomeA.fasta");
//! assert_eq!(lcbs[0][0].gaps.as_ref().map(Vec::len), Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - `xmfa`: line-driven XMFA parser
//! - `gaps`: gap-run scanning
//! - `postprocess`: name shortening, gap annotation, sequence stripping
//! - `output`: JSON export
//! - `config`: aligner options and job parameters
//! - `runner`: aligner subprocess execution
//! - `error`: error and diagnostic types
//!
//! ## Thread Safety
//!
//! Parsers carry no shared state. Separate documents can be parsed in
//! parallel with one [`XmfaParser`] each.

pub mod config;
pub mod error;
pub mod gaps;
pub mod output;
pub mod postprocess;
pub mod runner;
pub mod xmfa;

use std::path::Path;

pub use config::{Config, JobParams, Recipe, ServerConfig};
pub use error::{Diagnostic, MauveError, Result};
pub use gaps::{Gap, GapScanner, TrailingGaps};
pub use postprocess::{process, PostProcessOptions};
pub use runner::{MauveRunner, RunOutput};
pub use xmfa::{parse, parse_complete, AlignedRegion, HeaderPolicy, Lcb, Strand, XmfaParser};

/// Reads an XMFA file and applies `options`, as the alignment JSON export does.
///
/// A final block without a terminator line is dropped.
pub fn load_alignment(path: &Path, options: &PostProcessOptions) -> Result<Vec<Lcb>> {
    let mut lcbs = xmfa::read_xmfa_file(path, XmfaParser::new())?.into_lcbs();
    process(&mut lcbs, options);
    Ok(lcbs)
}
