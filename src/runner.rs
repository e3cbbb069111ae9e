//! Subprocess runner for the Mauve aligners.
//!
//! The runner invokes `progressiveMauve` or `mauveAligner` on a set of genome
//! FASTA files, relays the aligner's console output to the log, and then
//! converts the resulting XMFA into the JSON document consumed downstream.

use crate::config::{Config, Recipe};
use crate::error::{MauveError, Result};
use crate::output::{json_path_for, write_json_file};
use crate::postprocess::{process, PostProcessOptions};
use crate::xmfa::{read_xmfa_file, HeaderPolicy, Lcb, XmfaParser};
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, info, warn};

/// Paths and counts produced by a completed run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub xmfa_path: PathBuf,
    pub json_path: PathBuf,
    pub lcb_count: usize,
}

/// Runs a Mauve aligner and exports its alignment.
#[derive(Debug, Clone)]
pub struct MauveRunner {
    config: Config,
    binary: Option<PathBuf>,
    post_process: PostProcessOptions,
    header_policy: HeaderPolicy,
    flush_at_eof: bool,
}

impl MauveRunner {
    pub fn new(config: Config) -> Self {
        MauveRunner {
            config,
            binary: None,
            post_process: PostProcessOptions::summary(),
            header_policy: HeaderPolicy::default(),
            flush_at_eof: false,
        }
    }

    /// Use this executable instead of searching `PATH` for the recipe's command.
    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    /// Default: [`PostProcessOptions::summary`]
    pub fn with_post_process(mut self, options: PostProcessOptions) -> Self {
        self.post_process = options;
        self
    }

    pub fn with_header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.header_policy = policy;
        self
    }

    /// Keep a final block that is not followed by a terminator line.
    pub fn flush_at_eof(mut self, flush: bool) -> Self {
        self.flush_at_eof = flush;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Locates the aligner executable.
    pub fn find_binary(&self) -> Result<PathBuf> {
        if let Some(path) = &self.binary {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(MauveError::BinaryNotFound(path.display().to_string()));
        }
        let command = self.config.recipe.command();
        which::which(command).map_err(|e| MauveError::BinaryNotFound(format!("{command}: {e}")))
    }

    /// Full argument list: output, genome paths, then aligner options.
    ///
    /// `mauveAligner` also receives a `<path>.sml` seed-match file after each
    /// genome.
    pub fn build_args(&self, genome_fastas: &[PathBuf]) -> Vec<OsString> {
        let mut args = Vec::with_capacity(genome_fastas.len() * 2 + 9);

        let mut output = OsString::from("--output=");
        output.push(self.config.xmfa_path());
        args.push(output);

        for path in genome_fastas {
            args.push(path.clone().into_os_string());
            if self.config.recipe == Recipe::MauveAligner {
                let mut sml = path.clone().into_os_string();
                sml.push(".sml");
                args.push(sml);
            }
        }

        args.extend(self.config.to_args().into_iter().map(OsString::from));
        args
    }

    /// Aligns the genomes and writes `alignment.json` next to the XMFA.
    pub fn run(&self, genome_fastas: &[PathBuf]) -> Result<RunOutput> {
        let xmfa_path = self.run_aligner(genome_fastas)?;
        let json_path = json_path_for(&xmfa_path);
        let lcbs = self.export(&xmfa_path, &json_path)?;
        Ok(RunOutput {
            xmfa_path,
            json_path,
            lcb_count: lcbs.len(),
        })
    }

    /// Runs the aligner only, returning the XMFA path.
    pub fn run_aligner(&self, genome_fastas: &[PathBuf]) -> Result<PathBuf> {
        if genome_fastas.is_empty() {
            return Err(MauveError::InvalidConfig(
                "At least one genome is required".to_string(),
            ));
        }
        for path in genome_fastas {
            if !path.exists() {
                return Err(MauveError::FileNotFound(path.clone()));
            }
        }

        let binary = self.find_binary()?;
        if !self.config.output_dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&self.config.output_dir)?;
        }

        let args = self.build_args(genome_fastas);
        info!(command = %binary.display(), ?args, "running {}", self.config.recipe);

        let mut child = Command::new(&binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MauveError::AlignerFailed(format!("Failed to spawn {}: {e}", binary.display())))?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            child.wait()?;
            return Err(MauveError::Other("Failed to capture aligner output".to_string()));
        };

        let stderr_relay = thread::spawn(move || {
            relay_lines(stderr, |line| warn!(target: "aligner", "{line}"));
        });
        relay_lines(stdout, |line| info!(target: "aligner", "{line}"));

        let status = child.wait()?;
        if stderr_relay.join().is_err() {
            warn!("aligner stderr relay panicked");
        }
        info!(%status, "aligner exited");

        if !status.success() {
            return Err(MauveError::AlignerFailed(format!(
                "{} exited with status: {status}",
                self.config.recipe
            )));
        }

        let xmfa_path = self.config.xmfa_path();
        if !xmfa_path.exists() {
            return Err(MauveError::AlignerFailed(format!(
                "{} produced no output at {}",
                self.config.recipe,
                xmfa_path.display()
            )));
        }
        Ok(xmfa_path)
    }

    /// Parses an XMFA file, post-processes it and writes the JSON document.
    pub fn export(&self, xmfa_path: &Path, json_path: &Path) -> Result<Vec<Lcb>> {
        let parser = read_xmfa_file(xmfa_path, XmfaParser::with_policy(self.header_policy))?;
        debug!(
            sequences = parser.sequence_count(),
            diagnostics = parser.diagnostics().len(),
            "parsed XMFA"
        );
        let mut lcbs = if self.flush_at_eof {
            parser.finish()
        } else {
            parser.into_lcbs()
        };
        process(&mut lcbs, &self.post_process);
        write_json_file(json_path, &lcbs)?;
        Ok(lcbs)
    }
}

/// Logs each line of `stream`, reading to EOF.
///
/// Invalid UTF-8 is replaced rather than treated as an error.
fn relay_lines<R: Read>(stream: R, mut log: impl FnMut(&str)) {
    for line in BufReader::new(stream).split(b'\n') {
        match line {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                log(text.trim_end_matches('\r'));
            }
            Err(e) => {
                warn!(error = %e, "failed to read aligner output");
                break;
            }
        }
    }
}
