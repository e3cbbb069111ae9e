//! Runner tests against a stub aligner script.
//!
//! The stub mimics progressiveMauve's command line: it reads `--output=`,
//! writes a small XMFA there naming the genome files it was given, and
//! chats on stdout/stderr.

#![cfg(unix)]

use anyhow::Result;
use mauve_rs::config::{Config, Recipe};
use mauve_rs::{MauveError, MauveRunner, PostProcessOptions, TrailingGaps};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const STUB_ALIGNER: &str = r##"#!/bin/sh
out=""
genomes=""
for arg in "$@"; do
    case "$arg" in
        --output=*) out="${arg#--output=}" ;;
        --*) ;;
        *) genomes="$genomes $arg" ;;
    esac
done
echo "Aligning:$genomes"
echo "progress 50%" >&2
set -- $genomes
{
    echo "#FormatVersion Mauve1"
    echo "> 1:1-6 + $1"
    echo "AC--GT"
    echo "> 2:1-6 + $2"
    echo "ACGTGT"
    echo "="
    echo "> 1:7-10 + $1"
    printf "TTTT"
} > "$out"
"##;

const NON_UTF8_ALIGNER: &str = r##"#!/bin/sh
for arg in "$@"; do
    case "$arg" in
        --output=*) out="${arg#--output=}" ;;
    esac
done
printf 'prog\377ress\n'
printf 'seed\377weight\n' >&2
printf '> 1:1-4 + a.fasta\nACGT\n=\n' > "$out"
echo "done"
"##;

const FAILING_ALIGNER: &str = "#!/bin/sh\necho 'out of memory' >&2\nexit 3\n";

fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, body)?;
    let mut perms = fs::metadata(&path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms)?;
    Ok(path)
}

fn write_genomes(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for id in ["204722.5", "224914.11"] {
        let path = dir.join(format!("{id}.fasta"));
        fs::write(&path, format!(">{id}\nACGTACGTAC\n"))?;
        paths.push(path);
    }
    Ok(paths)
}

// Scripts are written and executed from a single test so that no other
// thread holds a script open for writing while one is exec'd.
#[test]
fn test_runner_with_stub_aligners() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let genomes = write_genomes(dir.path())?;
    let out_dir = dir.path().join("results");
    let stub = write_script(dir.path(), "progressiveMauve", STUB_ALIGNER)?;
    let failing = write_script(dir.path(), "failingMauve", FAILING_ALIGNER)?;
    let non_utf8 = write_script(dir.path(), "nonUtf8Mauve", NON_UTF8_ALIGNER)?;

    // Default export: short names, no sequences, last unterminated block dropped
    let config = Config::builder().output_dir(&out_dir).build()?;
    let output = MauveRunner::new(config.clone())
        .with_binary(&stub)
        .run(&genomes)?;

    assert_eq!(output.xmfa_path, out_dir.join("alignment.xmfa"));
    assert_eq!(output.json_path, out_dir.join("alignment.json"));
    assert_eq!(output.lcb_count, 1);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output.json_path)?)?;
    assert_eq!(json[0][0]["name"], "204722.5.fasta");
    assert_eq!(json[0][1]["name"], "224914.11.fasta");
    assert!(json[0][0].get("sequence").is_none());

    // Flushing at EOF and annotating gaps
    let output = MauveRunner::new(config.clone())
        .with_binary(&stub)
        .with_post_process(PostProcessOptions::full().with_gaps(TrailingGaps::Legacy))
        .flush_at_eof(true)
        .run(&genomes)?;
    assert_eq!(output.lcb_count, 2);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output.json_path)?)?;
    assert_eq!(json[0][0]["sequence"], "AC--GT");
    assert_eq!(json[0][0]["gaps"], serde_json::json!([{"start": 3, "end": 5}]));
    assert_eq!(
        json[1][0]["name"],
        genomes[0].to_string_lossy().as_ref()
    );

    // Console output that is not UTF-8 does not fail the run
    let config_b = Config::builder()
        .output_dir(dir.path().join("results_b"))
        .build()?;
    let output = MauveRunner::new(config_b)
        .with_binary(&non_utf8)
        .run(&genomes)?;
    assert_eq!(output.lcb_count, 1);

    // Non-zero exit status
    let err = MauveRunner::new(config)
        .with_binary(&failing)
        .run(&genomes)
        .unwrap_err();
    assert!(matches!(err, MauveError::AlignerFailed(_)), "{err}");

    Ok(())
}

#[test]
fn test_runner_reports_missing_genome() {
    let config = Config::builder()
        .recipe(Recipe::MauveAligner)
        .output_dir("/nonexistent/results")
        .build()
        .unwrap();
    let err = MauveRunner::new(config)
        .run(&[PathBuf::from("/nonexistent/genome.fasta")])
        .unwrap_err();
    assert!(matches!(err, MauveError::FileNotFound(_)));
}
