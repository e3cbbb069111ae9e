//! XMFA (eXtended Multi-FASTA Alignment) parsing.
//!
//! An XMFA document is a series of alignment blocks. Each block holds one
//! `>` header per participating sequence, followed by that sequence's gapped
//! alignment text, and ends with a line starting with `=`:
//!
//! ```text
//! #FormatVersion Mauve1
//! #Sequence1File	genomeA.fasta
//! #Sequence1Format	FastA
//! > 1:1-8 + genomeA.fasta
//! ACGT--AC
//! GT
//! > 2:101-110 - genomeB.fasta
//! ACGTTTACGT
//! =
//! ```
//!
//! [`XmfaParser`] consumes such text one line at a time and groups regions
//! into locally collinear blocks ([`Lcb`]). Parsing never fails on ordinary
//! input: unusable headers drop their region and are reported as
//! [`Diagnostic`]s unless [`HeaderPolicy::Strict`] is selected.
//!
//! A block is only emitted when an empty or `=` line closes it. Text that
//! stops without a terminator leaves the last block pending; call
//! [`XmfaParser::finish`] to keep it.

use crate::error::{Diagnostic, MauveError, Result};
use crate::gaps::Gap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Orientation of an aligned region on its source sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    pub fn as_char(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One sequence's contribution to one locally collinear block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedRegion {
    /// Sequence name or file path from the header
    pub name: String,

    /// Start coordinate on the source sequence (1-based, inclusive)
    pub start: u64,

    /// End coordinate on the source sequence (1-based, inclusive)
    pub end: u64,

    pub strand: Strand,

    /// Block index from the header
    #[serde(rename = "lcbIndex")]
    pub lcb_index: u32,

    /// Gapped alignment text, absent once stripped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,

    /// Gap runs within `sequence`, present once annotated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaps: Option<Vec<Gap>>,
}

/// A locally collinear block: regions in header order.
pub type Lcb = Vec<AlignedRegion>;

/// What to do with a `>` line that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderPolicy {
    /// Treat the header as having start = end = 0 so its region is dropped.
    #[default]
    Lenient,
    /// Abort the parse with [`MauveError::MalformedHeader`].
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    lcb_index: u32,
    start: u64,
    end: u64,
    strand: Strand,
    name: String,
}

/// Region whose sequence lines are still being collected.
#[derive(Debug)]
struct OpenRegion {
    header: Option<Header>,
    sequence: String,
}

impl OpenRegion {
    fn is_usable(&self) -> bool {
        matches!(&self.header, Some(h) if h.start != 0 && h.end != 0)
    }

    fn into_region(self) -> Option<AlignedRegion> {
        if !self.is_usable() {
            return None;
        }
        let h = self.header?;
        Some(AlignedRegion {
            name: h.name,
            start: h.start,
            end: h.end,
            strand: h.strand,
            lcb_index: h.lcb_index,
            sequence: Some(self.sequence),
            gaps: None,
        })
    }
}

/// Line-driven XMFA parser.
///
/// Each parser owns its own state; independent parsers can run on different
/// threads.
#[derive(Debug, Default)]
pub struct XmfaParser {
    policy: HeaderPolicy,
    line_no: usize,
    sequence_count: usize,
    current: Option<OpenRegion>,
    lcb: Lcb,
    lcbs: Vec<Lcb>,
    diagnostics: Vec<Diagnostic>,
}

impl XmfaParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: HeaderPolicy) -> Self {
        XmfaParser {
            policy,
            ..Default::default()
        }
    }

    /// Feeds a whole document, split on `\n`.
    ///
    /// A document ending in `\n` yields a final empty line, which closes the
    /// last block.
    pub fn parse_str(&mut self, text: &str) -> Result<()> {
        for line in text.split('\n') {
            self.parse_line(line)?;
        }
        Ok(())
    }

    /// Feeds lines from a reader with the same line semantics as
    /// [`parse_str`](Self::parse_str).
    pub fn parse_reader<R: BufRead>(&mut self, mut reader: R) -> Result<()> {
        let mut buf = String::new();
        let mut ended_with_newline = true;

        loop {
            buf.clear();
            if reader.read_line(&mut buf)? == 0 {
                break;
            }
            ended_with_newline = buf.ends_with('\n');
            self.parse_line(&buf)?;
        }

        if ended_with_newline {
            self.parse_line("")?;
        }
        Ok(())
    }

    /// Processes one line. A trailing `\n` or `\r\n` is ignored.
    pub fn parse_line(&mut self, line: &str) -> Result<()> {
        self.line_no += 1;
        let line = line.trim_end_matches(['\n', '\r']);

        match line.chars().next() {
            None | Some('=') => self.close_lcb(),
            Some('#') => {
                if line.contains("#Sequence") && line.contains("Format\t") {
                    self.sequence_count += 1;
                }
            }
            Some('>') => {
                self.close_region();
                let header = self.read_header(line)?;
                self.current = Some(OpenRegion {
                    header,
                    sequence: String::new(),
                });
            }
            Some(_) => match self.current.as_mut() {
                Some(region) => region.sequence.extend(line.chars().filter(|&c| c != '\n')),
                None => {
                    self.report(Diagnostic::OrphanSequenceLine { line: self.line_no });
                }
            },
        }
        Ok(())
    }

    /// Blocks completed so far.
    pub fn lcbs(&self) -> &[Lcb] {
        &self.lcbs
    }

    /// Number of `#Sequence<N>Format` declarations seen.
    pub fn sequence_count(&self) -> usize {
        self.sequence_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Whether any usable region is waiting for a terminator line.
    pub fn has_pending(&self) -> bool {
        self.pending_regions() > 0
    }

    /// Number of usable regions that a terminator line would still emit.
    pub fn pending_regions(&self) -> usize {
        let open = self.current.as_ref().map_or(0, |r| r.is_usable() as usize);
        self.lcb.len() + open
    }

    /// Fails with [`MauveError::IncompleteDocument`] if regions are pending.
    pub fn ensure_complete(&self) -> Result<()> {
        match self.pending_regions() {
            0 => Ok(()),
            regions => Err(MauveError::IncompleteDocument { regions }),
        }
    }

    /// Closes any pending block and returns all blocks.
    pub fn finish(mut self) -> Vec<Lcb> {
        self.close_lcb();
        self.lcbs
    }

    /// Returns the blocks closed so far, dropping anything still pending.
    pub fn into_lcbs(self) -> Vec<Lcb> {
        if self.has_pending() {
            warn!(
                regions = self.pending_regions(),
                "XMFA input ended without a terminator; last block dropped"
            );
        }
        self.lcbs
    }

    fn close_region(&mut self) {
        if let Some(region) = self.current.take().and_then(OpenRegion::into_region) {
            self.lcb.push(region);
        }
    }

    fn close_lcb(&mut self) {
        self.close_region();
        let lcb = std::mem::take(&mut self.lcb);
        if !lcb.is_empty() {
            debug!(lcb = self.lcbs.len(), regions = lcb.len(), "closed LCB");
            self.lcbs.push(lcb);
        }
    }

    fn read_header(&mut self, line: &str) -> Result<Option<Header>> {
        match parse_header(line) {
            Ok((header, secondary)) => {
                if let Some(secondary) = secondary.filter(|&s| s != header.lcb_index) {
                    self.report(Diagnostic::LcbIndexMismatch {
                        line: self.line_no,
                        declared: header.lcb_index,
                        secondary,
                    });
                }
                Ok(Some(header))
            }
            Err(reason) => match self.policy {
                HeaderPolicy::Strict => Err(MauveError::MalformedHeader {
                    line: self.line_no,
                    reason,
                }),
                HeaderPolicy::Lenient => {
                    self.report(Diagnostic::DiscardedHeader {
                        line: self.line_no,
                        reason,
                    });
                    Ok(None)
                }
            },
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}

/// Parses `><idx> <idx>:<start>-<end> <strand> <name>`.
///
/// Returns the header and, when field 0 carried its own index, the index
/// found before the colon so the caller can compare them. A bare `>` takes
/// its index from the second field.
fn parse_header(line: &str) -> std::result::Result<(Header, Option<u32>), String> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() < 4 {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    }

    let (index, coords) = fields[1]
        .split_once(':')
        .ok_or_else(|| format!("missing ':' in {:?}", fields[1]))?;
    let (start, end) = coords
        .split_once('-')
        .ok_or_else(|| format!("missing '-' in {coords:?}"))?;

    let secondary: u32 = parse_int(index, "block index")?;
    let start: u64 = parse_int(start, "start")?;
    let end: u64 = parse_int(end, "end")?;

    let strand = match fields[2] {
        "+" => Strand::Forward,
        "-" => Strand::Reverse,
        other => return Err(format!("invalid strand {other:?}")),
    };

    let declared = &fields[0][1..];
    let (lcb_index, secondary) = if declared.is_empty() {
        (secondary, None)
    } else {
        (parse_int(declared, "block index")?, Some(secondary))
    };

    Ok((
        Header {
            lcb_index,
            start,
            end,
            strand,
            name: fields[3].to_string(),
        },
        secondary,
    ))
}

fn parse_int<T: std::str::FromStr>(s: &str, what: &str) -> std::result::Result<T, String> {
    s.parse().map_err(|_| format!("invalid {what} {s:?}"))
}

/// Parses a whole document, dropping a trailing unterminated block.
pub fn parse(text: &str) -> Result<Vec<Lcb>> {
    let mut parser = XmfaParser::new();
    parser.parse_str(text)?;
    Ok(parser.into_lcbs())
}

/// Parses a whole document, keeping a trailing unterminated block.
pub fn parse_complete(text: &str) -> Result<Vec<Lcb>> {
    let mut parser = XmfaParser::new();
    parser.parse_str(text)?;
    Ok(parser.finish())
}

/// Parses an XMFA file from disk with the given parser.
pub fn read_xmfa_file(path: &Path, mut parser: XmfaParser) -> Result<XmfaParser> {
    if !path.exists() {
        return Err(MauveError::FileNotFound(path.to_path_buf()));
    }
    debug!(path = %path.display(), "reading XMFA");
    parser.parse_reader(BufReader::new(File::open(path)?))?;
    Ok(parser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn region(name: &str, start: u64, end: u64, lcb_index: u32, seq: &str) -> AlignedRegion {
        AlignedRegion {
            name: name.to_string(),
            start,
            end,
            strand: Strand::Forward,
            lcb_index,
            sequence: Some(seq.to_string()),
            gaps: None,
        }
    }

    #[test]
    fn test_blocks_returned_in_input_order() {
        let text = ">1 1:1-4 + a\nACGT\n\n>2 2:5-8 + a\nTTTT\n\n>3 3:9-12 + a\nGGGG\n\n";
        let lcbs = parse(text).unwrap();
        assert_eq!(lcbs.len(), 3);
        let indices: Vec<u32> = lcbs.iter().map(|l| l[0].lcb_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_regions_keep_header_order() {
        let text = ">1 1:50-60 + zeta\nAC\n>1 1:1-10 - alpha\nGT\n>1 1:20-30 + mid\nAA\n=\n";
        let lcbs = parse(text).unwrap();
        let names: Vec<&str> = lcbs[0].iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(lcbs[0][1].strand, Strand::Reverse);
    }

    #[test]
    fn test_header_fields() {
        let lcbs = parse(">3 3:120-340 + contig_1/path/seqA\nACGT\n\n").unwrap();
        let r = &lcbs[0][0];
        assert_eq!(r.lcb_index, 3);
        assert_eq!(r.start, 120);
        assert_eq!(r.end, 340);
        assert_eq!(r.strand, Strand::Forward);
        assert_eq!(r.name, "contig_1/path/seqA");
    }

    #[test]
    fn test_block_index_from_first_field_wins() {
        let mut parser = XmfaParser::new();
        parser
            .parse_str(">3 1:120-340 + contig_1/path/seqA\nACGT\n\n")
            .unwrap();
        assert_eq!(parser.lcbs()[0][0].lcb_index, 3);
        assert_eq!(
            parser.diagnostics(),
            &[Diagnostic::LcbIndexMismatch {
                line: 1,
                declared: 3,
                secondary: 1
            }]
        );
    }

    #[test]
    fn test_bare_marker_takes_index_from_second_field() {
        let mut parser = XmfaParser::new();
        parser.parse_str("> 2:1-8 + /data/genomeB.fasta\nACGT\n=\n").unwrap();
        assert_eq!(parser.lcbs()[0][0].lcb_index, 2);
        assert!(parser.diagnostics().is_empty());
    }

    #[test]
    fn test_sequence_lines_are_concatenated() {
        let lcbs = parse(">1 1:1-10 + a\nACGT--\nGGCA\n\n").unwrap();
        assert_eq!(lcbs[0][0].sequence.as_deref(), Some("ACGT--GGCA"));
    }

    #[test]
    fn test_crlf_input() {
        let lcbs = parse(">1 1:1-6 + a\r\nACG\r\nTTT\r\n=\r\n").unwrap();
        assert_eq!(lcbs[0][0].name, "a");
        assert_eq!(lcbs[0][0].sequence.as_deref(), Some("ACGTTT"));
    }

    #[test]
    fn test_zero_coordinates_are_discarded() {
        let text = ">1 1:0-0 + gone\n\n>1 1:1-4 + kept\nACGT\n> 2:0-0 + absent\n-----\n=\n";
        let lcbs = parse(text).unwrap();
        assert_eq!(lcbs.len(), 1);
        assert_eq!(lcbs[0], vec![region("kept", 1, 4, 1, "ACGT")]);
    }

    #[test]
    fn test_unparsable_coordinates_dropped_in_lenient_mode() {
        let mut parser = XmfaParser::new();
        parser.parse_str(">1 1:x-y + bad\n\n").unwrap();
        assert!(parser.lcbs().is_empty());
        assert!(matches!(
            parser.diagnostics(),
            [Diagnostic::DiscardedHeader { line: 1, .. }]
        ));
    }

    #[test]
    fn test_sequence_of_discarded_header_is_not_misattributed() {
        let text = ">1 1:1-4 + good\nACGT\n>1 1:1-?? + bad\nTTTT\n=\n";
        let lcbs = parse(text).unwrap();
        assert_eq!(lcbs, vec![vec![region("good", 1, 4, 1, "ACGT")]]);
    }

    #[test]
    fn test_strict_policy_rejects_malformed_header() {
        let mut parser = XmfaParser::with_policy(HeaderPolicy::Strict);
        parser.parse_line("#FormatVersion Mauve1").unwrap();
        let err = parser.parse_line(">1 1:1-4 * name").unwrap_err();
        assert!(matches!(err, MauveError::MalformedHeader { line: 2, .. }));

        let mut parser = XmfaParser::with_policy(HeaderPolicy::Strict);
        assert!(parser.parse_line(">1 1:1-4").is_err());
    }

    #[test]
    fn test_strict_policy_still_discards_zero_coordinates() {
        let mut parser = XmfaParser::with_policy(HeaderPolicy::Strict);
        parser.parse_str(">1 1:0-0 + a\n\n").unwrap();
        assert!(parser.lcbs().is_empty());
    }

    #[test]
    fn test_terminator_without_regions_adds_nothing() {
        let lcbs = parse("\n=\n\n#comment\n=\n").unwrap();
        assert!(lcbs.is_empty());
    }

    #[test]
    fn test_sequence_count_declarations() {
        let text = "#FormatVersion Mauve1\n#Sequence1File\ta.fa\n#Sequence1Format\tFastA\n\
                    #Sequence2File\tb.fa\n#Sequence2Format\tFastA\n#BackboneFile\tx.backbone\n";
        let mut parser = XmfaParser::new();
        parser.parse_str(text).unwrap();
        assert_eq!(parser.sequence_count(), 2);
    }

    #[test]
    fn test_orphan_sequence_line_is_reported() {
        let mut parser = XmfaParser::new();
        parser.parse_str("ACGT\n>1 1:1-4 + a\nACGT\n\n").unwrap();
        assert_eq!(parser.lcbs().len(), 1);
        assert_eq!(
            parser.diagnostics(),
            &[Diagnostic::OrphanSequenceLine { line: 1 }]
        );
    }

    #[test]
    fn test_missing_terminator_drops_last_block() {
        let text = ">1 1:1-4 + a\nACGT\n=\n>2 1:5-8 + a\nGGGG";
        assert_eq!(parse(text).unwrap().len(), 1);
        assert_eq!(parse_complete(text).unwrap().len(), 2);

        let mut parser = XmfaParser::new();
        parser.parse_str(text).unwrap();
        assert!(parser.has_pending());
        assert!(matches!(
            parser.ensure_complete(),
            Err(MauveError::IncompleteDocument { regions: 1 })
        ));
    }

    #[test]
    fn test_trailing_newline_closes_last_block() {
        let mut parser = XmfaParser::new();
        parser.parse_str(">1 1:1-4 + a\nACGT\n").unwrap();
        assert!(!parser.has_pending());
        assert_eq!(parser.into_lcbs().len(), 1);
    }

    #[test]
    fn test_reader_matches_str_semantics() {
        for text in [
            ">1 1:1-4 + a\nACGT\n",
            ">1 1:1-4 + a\nACGT",
            ">1 1:1-4 + a\nAC\nGT\n=\n>2 2:1-2 - b\nAA\n\n",
            "",
        ] {
            let mut from_reader = XmfaParser::new();
            from_reader.parse_reader(text.as_bytes()).unwrap();
            assert_eq!(from_reader.into_lcbs(), parse(text).unwrap(), "input {text:?}");
        }
    }

    #[test]
    fn test_two_block_scenario() {
        let text = ">1 1:1-4 + seqA\nACGT\n\n>1 2:1-4 + seqB\nAC-T\n\n";
        let lcbs = parse(text).unwrap();
        assert_eq!(lcbs.len(), 2);
        assert!(lcbs.iter().all(|l| l.len() == 1));
        assert_eq!(lcbs[1][0].sequence.as_deref(), Some("AC-T"));
    }

    #[test]
    fn test_strand_serializes_as_symbol() {
        let r = region("a", 1, 2, 1, "AC");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["strand"], "+");
        assert_eq!(json["lcbIndex"], 1);
        assert!(json.get("gaps").is_none());
    }
}
