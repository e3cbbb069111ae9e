//! Configuration for Mauve alignment jobs.
//!
//! [`Config`] holds the aligner options and where results go. It can be built
//! directly with [`Config::builder`] or derived from a JSON job description
//! ([`JobParams`]) as submitted by the genome alignment service.

use crate::error::{MauveError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which Mauve aligner executable to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Recipe {
    #[default]
    #[serde(rename = "progressiveMauve")]
    ProgressiveMauve,
    #[serde(rename = "mauveAligner")]
    MauveAligner,
}

impl Recipe {
    /// Executable name.
    pub fn command(&self) -> &'static str {
        match self {
            Recipe::ProgressiveMauve => "progressiveMauve",
            Recipe::MauveAligner => "mauveAligner",
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl FromStr for Recipe {
    type Err = MauveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "progressiveMauve" => Ok(Recipe::ProgressiveMauve),
            "mauveAligner" => Ok(Recipe::MauveAligner),
            other => Err(MauveError::InvalidConfig(format!("Invalid recipe: {other}"))),
        }
    }
}

/// Configuration for a Mauve run.
///
/// Unset aligner options are left to the aligner's own defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub recipe: Recipe,

    /// Directory receiving `alignment.xmfa` and `alignment.json`
    pub output_dir: PathBuf,

    /// Suffix inserted into genome FASTA names (`<id>.<suffix>.fasta`)
    pub suffix: Option<String>,

    /// Seed weight for calculating initial anchors
    pub seed_weight: Option<u32>,

    /// Maximum number of base pairs to attempt aligning with the gapped aligner
    pub max_gapped_aligner_length: Option<u64>,

    /// Maximum weight scaling by breakpoint distance, in [0, 1]
    pub max_breakpoint_distance_scale: Option<f64>,

    /// Conservation distance scaling, in [0, 1]
    pub conservation_distance_scale: Option<f64>,

    /// Minimum pairwise LCB score
    pub weight: Option<f64>,

    /// Minimum breakpoint penalty after scaling by expected divergence
    pub min_scaled_penalty: Option<f64>,

    /// Probability of moving from the unrelated to the homologous state
    pub hmm_p_go_homologous: Option<f64>,

    /// Probability of moving from the homologous to the unrelated state
    pub hmm_p_go_unrelated: Option<f64>,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Example
    /// ```
    /// use mauve_rs::Config;
    ///
    /// let config = Config::builder()
    ///     .output_dir("results")
    ///     .seed_weight(15)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.to_args(), vec!["--seed-weight=15"]);
    /// ```
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Builds a configuration from job parameters.
    pub fn from_job(params: &JobParams) -> Result<Self> {
        let recipe = match params.recipe.as_deref() {
            Some(r) => r.parse()?,
            None => Recipe::default(),
        };
        let config = Config {
            recipe,
            output_dir: params.output.clone().unwrap_or_default(),
            suffix: params.suffix.clone(),
            seed_weight: params.seed_weight,
            max_gapped_aligner_length: params.max_gapped_aligner_length,
            max_breakpoint_distance_scale: params.max_breakpoint_distance_scale,
            conservation_distance_scale: params.conservation_distance_scale,
            weight: params.weight,
            min_scaled_penalty: params.min_scaled_penalty,
            hmm_p_go_homologous: params.hmm_p_go_homologous,
            hmm_p_go_unrelated: params.hmm_p_go_unrelated,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        check_unit("max-breakpoint-distance-scale", self.max_breakpoint_distance_scale)?;
        check_unit("conservation-distance-scale", self.conservation_distance_scale)?;
        check_probability("hmm-p-go-homologous", self.hmm_p_go_homologous)?;
        check_probability("hmm-p-go-unrelated", self.hmm_p_go_unrelated)?;
        if self.seed_weight == Some(0) {
            return Err(MauveError::InvalidConfig(
                "seed-weight must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Aligner options as `--name=value` arguments, in a fixed order.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut push = |name: &str, value: Option<String>| {
            if let Some(v) = value {
                args.push(format!("--{name}={v}"));
            }
        };
        push("seed-weight", self.seed_weight.map(|v| v.to_string()));
        push(
            "max-gapped-aligner-length",
            self.max_gapped_aligner_length.map(|v| v.to_string()),
        );
        push(
            "max-breakpoint-distance-scale",
            self.max_breakpoint_distance_scale.map(|v| v.to_string()),
        );
        push(
            "conservation-distance-scale",
            self.conservation_distance_scale.map(|v| v.to_string()),
        );
        push("weight", self.weight.map(|v| v.to_string()));
        push(
            "min-scaled-penalty",
            self.min_scaled_penalty.map(|v| v.to_string()),
        );
        push(
            "hmm-p-go-homologous",
            self.hmm_p_go_homologous.map(|v| v.to_string()),
        );
        push(
            "hmm-p-go-unrelated",
            self.hmm_p_go_unrelated.map(|v| v.to_string()),
        );
        args
    }

    /// Path of the XMFA file the aligner writes.
    pub fn xmfa_path(&self) -> PathBuf {
        self.output_dir.join("alignment.xmfa")
    }

    /// Conventional FASTA location for a genome: `<out>/<id>[.<suffix>].fasta`.
    pub fn genome_fasta_path(&self, genome_id: &str) -> PathBuf {
        let file = match &self.suffix {
            Some(suffix) => format!("{genome_id}.{suffix}.fasta"),
            None => format!("{genome_id}.fasta"),
        };
        self.output_dir.join(file)
    }
}

fn check_unit(name: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(MauveError::InvalidConfig(format!(
            "{name} must be in [0, 1], got {v}"
        ))),
        _ => Ok(()),
    }
}

fn check_probability(name: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !(v > 0.0 && v < 1.0) => Err(MauveError::InvalidConfig(format!(
            "{name} must be in (0, 1), got {v}"
        ))),
        _ => Ok(()),
    }
}

/// Builder for constructing Config instances.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Default: progressiveMauve
    pub fn recipe(mut self, recipe: Recipe) -> Self {
        self.config.recipe = recipe;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.suffix = Some(suffix.into());
        self
    }

    pub fn seed_weight(mut self, weight: u32) -> Self {
        self.config.seed_weight = Some(weight);
        self
    }

    pub fn max_gapped_aligner_length(mut self, length: u64) -> Self {
        self.config.max_gapped_aligner_length = Some(length);
        self
    }

    /// Must be in [0, 1]. Aligner default: 0.9
    pub fn max_breakpoint_distance_scale(mut self, scale: f64) -> Self {
        self.config.max_breakpoint_distance_scale = Some(scale);
        self
    }

    /// Must be in [0, 1]. Aligner default: 1
    pub fn conservation_distance_scale(mut self, scale: f64) -> Self {
        self.config.conservation_distance_scale = Some(scale);
        self
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.config.weight = Some(weight);
        self
    }

    pub fn min_scaled_penalty(mut self, penalty: f64) -> Self {
        self.config.min_scaled_penalty = Some(penalty);
        self
    }

    /// Aligner default: 0.0001
    pub fn hmm_p_go_homologous(mut self, p: f64) -> Self {
        self.config.hmm_p_go_homologous = Some(p);
        self
    }

    /// Aligner default: 0.000001
    pub fn hmm_p_go_unrelated(mut self, p: f64) -> Self {
        self.config.hmm_p_go_unrelated = Some(p);
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Job description as submitted by the alignment service (`--jfile`/`--jstring`).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobParams {
    #[serde(default, rename = "genome_ids")]
    pub genome_ids: Vec<String>,
    pub recipe: Option<String>,
    pub output: Option<PathBuf>,
    pub suffix: Option<String>,
    pub seed_weight: Option<u32>,
    pub max_gapped_aligner_length: Option<u64>,
    pub max_breakpoint_distance_scale: Option<f64>,
    pub conservation_distance_scale: Option<f64>,
    pub weight: Option<f64>,
    pub min_scaled_penalty: Option<f64>,
    #[serde(rename = "hmmPGoHomologous")]
    pub hmm_p_go_homologous: Option<f64>,
    #[serde(rename = "hmmPGoUnrelated")]
    pub hmm_p_go_unrelated: Option<f64>,
}

impl JobParams {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MauveError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Server settings passed with `--sstring`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub data_api: Option<String>,
}

impl ServerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            MauveError::InvalidConfig(format!("Error parsing server config: {e}"))
        })
    }
}
