//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use recorder_core::{
    DEFAULT_DOCUMENT_TYPES, FileConfig, ScraperConfig, SearchCriteria, split_list,
};

/// Scrape every result page of a recorder document search.
///
/// Establishes a portal session, submits the date range and document types,
/// then fetches and parses each result page into one JSON file.
#[derive(Parser, Debug)]
#[command(name = "recorder")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/recorder/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// First recording date, MM/DD/YYYY or YYYY-MM-DD
    #[arg(long, value_name = "DATE")]
    pub start_date: Option<String>,

    /// Last recording date (inclusive), MM/DD/YYYY or YYYY-MM-DD
    #[arg(long, value_name = "DATE")]
    pub end_date: Option<String>,

    /// Document type as CODE or CODE:Label (repeatable, comma separated)
    #[arg(short = 't', long = "doc-type", value_name = "TYPE", value_delimiter = ',')]
    pub document_types: Vec<String>,

    /// Output directory
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output file name inside the output directory
    #[arg(long, value_name = "NAME")]
    pub output_file: Option<String>,

    /// Portal base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Delay after each handshake step in milliseconds (max 60000)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub step_delay: Option<u64>,

    /// Delay between result pages in milliseconds (max 60000)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub page_delay: Option<u64>,

    /// Maximum attempts per result page (1-10)
    #[arg(short = 'r', long = "max-attempts", value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Per-request timeout in seconds (1-300)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=300))]
    pub timeout: Option<u64>,

    /// Pages between session keep-alive pings (0 disables)
    #[arg(long, value_name = "PAGES")]
    pub keepalive_every: Option<u32>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    /// Merges flags over `file` over built-in defaults.
    pub fn scraper_config(&self, file: Option<&FileConfig>) -> Result<ScraperConfig> {
        let mut config = ScraperConfig::default();
        if let Some(file) = file {
            config.apply_file(file);
        }

        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(ms) = self.step_delay {
            config.step_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.page_delay {
            config.page_delay = Duration::from_millis(ms);
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(secs) = self.timeout {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(pages) = self.keepalive_every {
            config.keepalive_every = pages;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if let Some(name) = &self.output_file {
            config.output_file.clone_from(name);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Builds search criteria from flags, falling back to `file`.
    pub fn search_criteria(&self, file: Option<&FileConfig>) -> Result<SearchCriteria> {
        let start = self
            .start_date
            .clone()
            .or_else(|| file.and_then(|f| f.start_date.clone()));
        let end = self
            .end_date
            .clone()
            .or_else(|| file.and_then(|f| f.end_date.clone()));
        let (Some(start), Some(end)) = (start, end) else {
            bail!("A date range is required: pass --start-date and --end-date or set them in the config file");
        };

        let types: Vec<String> = if !self.document_types.is_empty() {
            self.document_types
                .iter()
                .flat_map(|entry| split_list(entry.as_str()))
                .collect()
        } else if let Some(types) = file.and_then(|f| f.document_types.clone()) {
            types
        } else {
            DEFAULT_DOCUMENT_TYPES.iter().map(ToString::to_string).collect()
        };

        SearchCriteria::parse(&start, &end, &types).context("Invalid search criteria")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["recorder"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.start_date.is_none());
        assert!(args.document_types.is_empty());
        assert!(!args.no_progress);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["recorder", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["recorder", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["recorder", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["recorder", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["recorder", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_doc_type_repeatable_and_comma_separated() {
        let args =
            Args::try_parse_from(["recorder", "-t", "NTSALE,CNLNT", "--doc-type", "DEED:Deed"])
                .unwrap();
        assert_eq!(args.document_types, vec!["NTSALE", "CNLNT", "DEED:Deed"]);
    }

    #[test]
    fn test_cli_max_attempts_range() {
        let args = Args::try_parse_from(["recorder", "-r", "5"]).unwrap();
        assert_eq!(args.max_attempts, Some(5));

        let err = Args::try_parse_from(["recorder", "-r", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = Args::try_parse_from(["recorder", "-r", "11"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_timeout_over_max_rejected() {
        let err = Args::try_parse_from(["recorder", "--timeout", "301"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_page_delay_over_max_rejected() {
        let err = Args::try_parse_from(["recorder", "--page-delay", "60001"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_scraper_config_cli_overrides_file() {
        let args = Args::try_parse_from(["recorder", "--page-delay", "0", "-o", "cli-out"]).unwrap();
        let file = FileConfig {
            page_delay_ms: Some(2500),
            step_delay_ms: Some(100),
            output_dir: Some(PathBuf::from("file-out")),
            ..FileConfig::default()
        };

        let config = args.scraper_config(Some(&file)).unwrap();
        assert_eq!(config.page_delay, Duration::ZERO);
        assert_eq!(config.step_delay, Duration::from_millis(100));
        assert_eq!(config.output_dir, PathBuf::from("cli-out"));
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_search_criteria_requires_dates() {
        let args = Args::try_parse_from(["recorder", "--start-date", "07/01/2025"]).unwrap();
        let err = args.search_criteria(None).unwrap_err();
        assert!(err.to_string().contains("date range"), "{err}");
    }

    #[test]
    fn test_search_criteria_defaults_document_types() {
        let args = Args::try_parse_from([
            "recorder",
            "--start-date",
            "2025-07-01",
            "--end-date",
            "10/21/2025",
        ])
        .unwrap();
        let criteria = args.search_criteria(None).unwrap();
        let codes: Vec<&str> = criteria.document_types().iter().map(|t| t.code()).collect();
        assert_eq!(codes, vec!["NTSALE", "CNLNT"]);
    }

    #[test]
    fn test_search_criteria_falls_back_to_file() {
        let args = Args::try_parse_from(["recorder", "--end-date", "07/31/2025"]).unwrap();
        let file = FileConfig {
            start_date: Some("07/01/2025".to_string()),
            end_date: Some("12/31/2025".to_string()),
            document_types: Some(vec!["DEED".to_string()]),
            ..FileConfig::default()
        };
        let criteria = args.search_criteria(Some(&file)).unwrap();
        assert_eq!(criteria.end_date().to_string(), "2025-07-31");
        assert_eq!(criteria.document_types()[0].code(), "DEED");
    }

    #[test]
    fn test_search_criteria_rejects_inverted_range() {
        let args = Args::try_parse_from([
            "recorder",
            "--start-date",
            "10/21/2025",
            "--end-date",
            "07/01/2025",
        ])
        .unwrap();
        assert!(args.search_criteria(None).is_err());
    }
}
