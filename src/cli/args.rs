use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Settings;
use crate::ingest::RefreshFailurePolicy;
use crate::utils::constants::DEFAULT_PAGE_SIZE;

#[derive(Parser)]
#[command(name = "air-quality-processor")]
#[command(about = "Ingest, keep and query Swiss real-time and WHO air quality data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        help = "Settings file [default: airq.toml if present]"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Directory holding the stored tables")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "URL of the real-time table page")]
    pub local_url: Option<String>,

    #[arg(long, global = true, help = "URL of the WHO workbook")]
    pub archive_url: Option<String>,

    #[arg(long, global = true, value_enum)]
    pub on_refresh_failure: Option<RefreshFailurePolicy>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Hide progress spinners")]
    pub quiet: bool,
}

impl Cli {
    /// Command-line flags win over file and environment settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(ref dir) = self.data_dir {
            settings.data_dir = dir.clone();
        }
        if let Some(ref url) = self.local_url {
            settings.local.url = url.clone();
        }
        if let Some(ref url) = self.archive_url {
            settings.archive.url = url.clone();
        }
        if let Some(policy) = self.on_refresh_failure {
            settings.on_refresh_failure = policy;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load stored history, refresh from upstream and persist
    Ingest {
        #[arg(short, long, value_enum, default_value_t = SourceSelection::All)]
        source: SourceSelection,
    },

    /// Print one page of a filtered, sorted table
    Query {
        #[arg(short, long, value_enum)]
        source: QuerySource,

        #[arg(
            short,
            long,
            default_value = "",
            help = "Filter expression, e.g. \"{NO2} gt 20 && {Type of site} contains urban\""
        )]
        filter: String,

        #[arg(long, help = "Sort keys, e.g. \"timestamp:desc,location\"")]
        sort: Option<String>,

        #[arg(long, default_value = "0", help = "Zero-based page index")]
        page: usize,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(long, help = "Refresh the source before querying")]
        refresh: bool,
    },

    /// Summarise the stored tables
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceSelection {
    Local,
    Archive,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuerySource {
    Local,
    Archive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line
    Json,
    Csv,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_apply_to_settings() {
        let cli = Cli::parse_from([
            "air-quality-processor",
            "--data-dir",
            "/tmp/airq",
            "--local-url",
            "http://localhost:8080/nabel.html",
            "--on-refresh-failure",
            "exit",
            "ingest",
            "--source",
            "local",
        ]);

        let mut settings = Settings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/airq"));
        assert_eq!(settings.local.url, "http://localhost:8080/nabel.html");
        assert_eq!(settings.on_refresh_failure, RefreshFailurePolicy::Exit);
        assert!(matches!(
            cli.command,
            Commands::Ingest {
                source: SourceSelection::Local
            }
        ));
    }

    #[test]
    fn test_query_defaults() {
        let cli = Cli::parse_from(["air-quality-processor", "query", "--source", "archive"]);
        match cli.command {
            Commands::Query {
                source,
                filter,
                page,
                page_size,
                format,
                refresh,
                ..
            } => {
                assert_eq!(source, QuerySource::Archive);
                assert!(filter.is_empty());
                assert_eq!(page, 0);
                assert_eq!(page_size, 10);
                assert_eq!(format, OutputFormat::Json);
                assert!(!refresh);
            }
            _ => panic!("expected query"),
        }
    }
}
