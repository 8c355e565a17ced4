// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Configuration management for line scoring components

use crate::protocol::ECHO_SEPARATOR;
use crate::retry::ConnectRetry;
use crate::rules::{ContainsRule, Rule, RuleSet, StartsWithRule};
use crate::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Fixed value or inclusive range, written `N` or `MIN:MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSpec {
    Fixed(usize),
    Range { min: usize, max: usize },
}

impl SizeSpec {
    /// Draw a value: uniform over the range, or the fixed value
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match *self {
            SizeSpec::Fixed(value) => value,
            SizeSpec::Range { min, max } => rng.gen_range(min..=max),
        }
    }

    pub fn min(&self) -> usize {
        match *self {
            SizeSpec::Fixed(value) => value,
            SizeSpec::Range { min, .. } => min,
        }
    }

    pub fn max(&self) -> usize {
        match *self {
            SizeSpec::Fixed(value) => value,
            SizeSpec::Range { max, .. } => max,
        }
    }
}

impl FromStr for SizeSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| Error::Config(format!("Invalid size '{}': {}", part, e)))
        };

        match s.split_once(':') {
            Some((min, max)) => Ok(SizeSpec::Range {
                min: parse(min)?,
                max: parse(max)?,
            }),
            None => Ok(SizeSpec::Fixed(parse(s)?)),
        }
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeSpec::Fixed(value) => write!(f, "{}", value),
            SizeSpec::Range { min, max } => write!(f, "{}:{}", min, max),
        }
    }
}

/// String generator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Length of each string
    pub length: SizeSpec,
    /// Number of inner spaces in each string
    pub blank_spaces: SizeSpec,
    /// Number of strings to produce
    pub count: usize,
    /// Seed for a reproducible batch
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            length: SizeSpec::Range { min: 50, max: 100 },
            blank_spaces: SizeSpec::Range { min: 3, max: 5 },
            count: 10,
            seed: None,
        }
    }
}

impl GenerationConfig {
    /// Validate configuration
    ///
    /// Only the shape is checked here. Whether a drawn length can host the drawn
    /// space count is decided per string by the generator.
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(Error::Config("count must be > 0".to_string()));
        }

        for (name, spec) in [("length", &self.length), ("blank_spaces", &self.blank_spaces)] {
            if spec.min() > spec.max() {
                return Err(Error::Config(format!(
                    "{} range {} has min > max",
                    name, spec
                )));
            }
        }

        if self.length.min() == 0 {
            return Err(Error::Config("length must be >= 1".to_string()));
        }

        Ok(())
    }
}

/// Declarative rule definition
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    /// Reject lines containing `substring`
    Contains {
        substring: String,
        message: String,
        #[serde(default = "default_true")]
        ignore_case: bool,
    },
    /// Reject lines starting with `prefix`
    StartsWith {
        prefix: String,
        message: String,
        #[serde(default = "default_true")]
        ignore_case: bool,
    },
}

impl RuleConfig {
    pub fn build(&self) -> Box<dyn Rule> {
        match self {
            RuleConfig::Contains {
                substring,
                message,
                ignore_case,
            } => Box::new(ContainsRule::new(substring.as_str(), message.as_str(), *ignore_case)),
            RuleConfig::StartsWith {
                prefix,
                message,
                ignore_case,
            } => Box::new(StartsWithRule::new(prefix.as_str(), message.as_str(), *ignore_case)),
        }
    }

    fn validate(&self) -> Result<()> {
        let (pattern, message) = match self {
            RuleConfig::Contains { substring, message, .. } => (substring, message),
            RuleConfig::StartsWith { prefix, message, .. } => (prefix, message),
        };

        if pattern.is_empty() {
            return Err(Error::Config("rule pattern cannot be empty".to_string()));
        }
        if pattern.contains('\n') || message.contains('\n') {
            return Err(Error::Config(
                "rule pattern and message cannot contain newlines".to_string(),
            ));
        }
        if message.trim().is_empty() {
            return Err(Error::Config("rule message cannot be empty".to_string()));
        }
        if message.contains(ECHO_SEPARATOR) {
            return Err(Error::Config(format!(
                "rule message cannot contain '{}': {}",
                ECHO_SEPARATOR.trim(),
                message
            )));
        }
        Ok(())
    }
}

/// Scoring server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address for the TCP listener
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Rules applied to every line, in order
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,

    /// Socket read chunk size in bytes
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            rules: default_rules(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `LINESCORE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let config: Self = envy::prefixed("LINESCORE_").from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.listen_address.trim().is_empty() {
            return Err(Error::Config("listen_address cannot be empty".to_string()));
        }

        if self.read_buffer_size == 0 {
            return Err(Error::Config("read_buffer_size must be > 0".to_string()));
        }

        for rule in &self.rules {
            rule.validate()?;
        }

        Ok(())
    }

    /// Build the immutable rule set shared by all connections
    pub fn rule_set(&self) -> RuleSet {
        self.rules.iter().map(RuleConfig::build).collect()
    }
}

/// Scoring client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Address of the scoring server
    #[serde(default = "default_listen_address")]
    pub server_address: String,

    /// File the generated corpus is written to before connecting
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,

    /// File receiving `original -> score` lines
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,

    /// Maximum connection attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff between connection attempts in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Socket read chunk size in bytes
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: default_listen_address(),
            corpus_path: default_corpus_path(),
            results_path: default_results_path(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

impl ClientConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server_address.trim().is_empty() {
            return Err(Error::Config("server_address cannot be empty".to_string()));
        }

        if self.max_retries == 0 {
            return Err(Error::Config("max_retries must be >= 1".to_string()));
        }

        if self.read_buffer_size == 0 {
            return Err(Error::Config("read_buffer_size must be > 0".to_string()));
        }

        if self.corpus_path == self.results_path {
            return Err(Error::Config(
                "corpus_path and results_path must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Connect behaviour derived from `max_retries` and `initial_backoff_ms`
    pub fn connect_retry(&self) -> ConnectRetry {
        ConnectRetry {
            attempts: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_backoff_ms),
            ..Default::default()
        }
    }
}

// Default value functions
fn default_listen_address() -> String {
    format!("{}:{}", crate::DEFAULT_HOST, crate::DEFAULT_PORT)
}

fn default_rules() -> Vec<RuleConfig> {
    vec![RuleConfig::Contains {
        substring: "aa".to_string(),
        message: "Double \"a\" rule detected".to_string(),
        ignore_case: true,
    }]
}

fn default_read_buffer_size() -> usize {
    crate::DEFAULT_READ_BUFFER_SIZE
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("chains.txt")
}

fn default_results_path() -> PathBuf {
    PathBuf::from("results.txt")
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}
