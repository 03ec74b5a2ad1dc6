use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!(
                "Invalid log format: {}. Please specify 'compact', 'pretty' or 'json'",
                s
            )),
        }
    }
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// Serve npm package risk reports over HTTP
#[derive(Parser, Debug)]
#[command(name = "npm-risk-report")]
#[command(version)]
#[command(
    about = "Serve npm package risk reports: dependency resolution, OSV vulnerabilities and AI summaries",
    long_about = None
)]
pub struct Args {
    /// Path to a config file (defaults to ./npm-risk-report.config.yml when present)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8080 (overrides config and environment)
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Log output format: compact, pretty or json
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
