//! Run configuration: tunables with defaults and the optional config file.
//!
//! The file uses a flat `key = value` syntax (a TOML subset): strings are
//! double-quoted, integers are bare, `#` starts a comment.
//!
//! ```text
//! start_date = "07/01/2025"
//! end_date = "10/21/2025"
//! document_types = "NTSALE, CNLNT:CANCELLATION"
//! output_dir = "Results"
//! page_delay_ms = 1500
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::fetch::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY, DEFAULT_KEEPALIVE_EVERY, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_JITTER, RetryPolicy,
};
use crate::portal::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, PortalEndpoints};
use crate::scrape::{
    DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_FILE, DEFAULT_PAGE_DELAY, RunWriter, ScrapeSettings,
};
use crate::session::DEFAULT_STEP_DELAY;

/// Document types searched when none are configured.
pub const DEFAULT_DOCUMENT_TYPES: [&str; 2] = ["NTSALE", "CNLNT"];

/// Accepted request timeout range in seconds.
pub const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=300;

/// Cap on the exponential part of the retry delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Largest accepted pacing delay in milliseconds.
const MAX_DELAY_MS: u64 = 60_000;

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config syntax on line {line}: expected key = value")]
    Syntax { line: usize },

    #[error("unknown configuration key '{key}' on line {line}")]
    UnknownKey { key: String, line: usize },

    #[error("invalid `{key}` value on line {line}: {reason}")]
    InvalidValue {
        key: String,
        line: usize,
        reason: String,
    },

    #[error("invalid value for `{field}`: {value}. Expected range: {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("invalid base URL '{url}': {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Every tunable of a run, after merging all sources.
#[derive(Debug, Clone, PartialEq)]
pub struct ScraperConfig {
    pub base_url: String,
    pub step_delay: Duration,
    pub page_delay: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_multiplier: f32,
    pub retry_max_jitter: Duration,
    pub request_timeout: Duration,
    pub keepalive_every: u32,
    pub output_dir: PathBuf,
    pub output_file: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            step_delay: DEFAULT_STEP_DELAY,
            page_delay: DEFAULT_PAGE_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: DEFAULT_BASE_DELAY,
            retry_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            retry_max_jitter: DEFAULT_MAX_JITTER,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            keepalive_every: DEFAULT_KEEPALIVE_EVERY,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

impl ScraperConfig {
    /// Checks values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] or [`ConfigError::BaseUrl`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10).contains(&self.max_attempts) {
            return Err(out_of_range("max_attempts", self.max_attempts, "1..=10"));
        }
        let timeout = self.request_timeout.as_secs();
        if !TIMEOUT_RANGE_SECS.contains(&timeout) {
            return Err(out_of_range("timeout_secs", timeout, "1..=300"));
        }
        validate_delay("step_delay_ms", self.step_delay)?;
        validate_delay("page_delay_ms", self.page_delay)?;
        if self.output_file.trim().is_empty() {
            return Err(out_of_range("output_file", "\"\"", "a non-empty file name"));
        }
        self.endpoints()?;
        Ok(())
    }

    /// Portal endpoints for the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BaseUrl`] if the base URL does not parse.
    pub fn endpoints(&self) -> Result<PortalEndpoints, ConfigError> {
        PortalEndpoints::new(&self.base_url).map_err(|source| ConfigError::BaseUrl {
            url: self.base_url.clone(),
            source,
        })
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            self.retry_base_delay,
            MAX_RETRY_DELAY,
            self.retry_multiplier,
            self.retry_max_jitter,
        )
    }

    #[must_use]
    pub fn scrape_settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            step_delay: self.step_delay,
            page_delay: self.page_delay,
            retry_policy: self.retry_policy(),
            keepalive_every: self.keepalive_every,
        }
    }

    #[must_use]
    pub fn run_writer(&self) -> RunWriter {
        RunWriter::new(self.output_dir.clone(), self.output_file.clone())
    }

    /// Overlays the values present in `file`.
    pub fn apply_file(&mut self, file: &FileConfig) {
        if let Some(base_url) = &file.base_url {
            self.base_url.clone_from(base_url);
        }
        if let Some(ms) = file.step_delay_ms {
            self.step_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.page_delay_ms {
            self.page_delay = Duration::from_millis(ms);
        }
        if let Some(attempts) = file.max_attempts {
            self.max_attempts = attempts;
        }
        if let Some(secs) = file.timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(pages) = file.keepalive_every {
            self.keepalive_every = pages;
        }
        if let Some(dir) = &file.output_dir {
            self.output_dir.clone_from(dir);
        }
        if let Some(name) = &file.output_file {
            self.output_file.clone_from(name);
        }
    }
}

fn validate_delay(field: &'static str, delay: Duration) -> Result<(), ConfigError> {
    let ms = delay.as_millis();
    if ms > u128::from(MAX_DELAY_MS) {
        return Err(out_of_range(field, ms, "0..=60000"));
    }
    Ok(())
}

fn out_of_range(field: &'static str, value: impl ToString, expected: &str) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

/// Values read from a config file; `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// `CODE` or `CODE:Label` entries.
    pub document_types: Option<Vec<String>>,
    pub base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub output_file: Option<String>,
    pub step_delay_ms: Option<u64>,
    pub page_delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub keepalive_every: Option<u32>,
}

impl FileConfig {
    /// Parses config file contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the offending line on syntax errors,
    /// unknown keys or malformed values.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        for (line_index, raw_line) in raw.lines().enumerate() {
            let line_no = line_index + 1;
            let line = strip_inline_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            let Some((raw_key, raw_value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax { line: line_no });
            };
            let key = raw_key.trim();
            let value = raw_value.trim();
            let invalid = |reason: String| ConfigError::InvalidValue {
                key: key.to_string(),
                line: line_no,
                reason,
            };

            match key {
                "start_date" => cfg.start_date = Some(parse_string_literal(value).map_err(invalid)?),
                "end_date" => cfg.end_date = Some(parse_string_literal(value).map_err(invalid)?),
                "document_types" => {
                    let list = parse_string_literal(value).map_err(invalid)?;
                    cfg.document_types = Some(split_list(&list));
                }
                "base_url" => cfg.base_url = Some(parse_string_literal(value).map_err(invalid)?),
                "output_dir" => {
                    cfg.output_dir = Some(PathBuf::from(parse_string_literal(value).map_err(invalid)?));
                }
                "output_file" => {
                    cfg.output_file = Some(parse_string_literal(value).map_err(invalid)?);
                }
                "step_delay_ms" => cfg.step_delay_ms = Some(parse_integer(value).map_err(invalid)?),
                "page_delay_ms" => cfg.page_delay_ms = Some(parse_integer(value).map_err(invalid)?),
                "max_attempts" => {
                    let parsed = parse_integer(value).map_err(invalid)?;
                    cfg.max_attempts =
                        Some(u32::try_from(parsed).map_err(|_| invalid("out of range for u32".into()))?);
                }
                "timeout_secs" => cfg.timeout_secs = Some(parse_integer(value).map_err(invalid)?),
                "keepalive_every" => {
                    let parsed = parse_integer(value).map_err(invalid)?;
                    cfg.keepalive_every =
                        Some(u32::try_from(parsed).map_err(|_| invalid("out of range for u32".into()))?);
                }
                unknown => {
                    return Err(ConfigError::UnknownKey {
                        key: unknown.to_string(),
                        line: line_no,
                    });
                }
            }
        }
        Ok(cfg)
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or any
    /// parse error from [`FileConfig::parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/recorder/config.toml`
/// 2. `$HOME/.config/recorder/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("recorder")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("recorder")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Splits a comma-separated list, dropping empty entries.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String, String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        return Err("expected double-quoted string".to_string());
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer(raw_value: &str) -> Result<u64, String> {
    let token = raw_value.trim();
    if token.is_empty() {
        return Err("expected integer value".to_string());
    }
    if token.starts_with('-') {
        return Err("expected non-negative integer".to_string());
    }
    token.parse::<u64>().map_err(|e| e.to_string())
}
