use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "subscout",
    version,
    about = "Fast passive subdomain enumeration tool",
    long_about = "subscout queries certificate logs, passive DNS, web archives and code search\nengines in parallel and streams the in-scope subdomains they know about.\nThe target is never contacted directly."
)]
pub struct Args {
    /// Target domain(s) to enumerate
    #[arg(short = 'd', long = "domain", value_name = "DOMAIN")]
    pub domain: Vec<String>,

    /// Sources to use (comma-separated, default: all)
    #[arg(short = 'u', long = "use-sources", value_delimiter = ',', value_name = "SOURCES")]
    pub use_sources: Vec<String>,

    /// Sources to skip (comma-separated)
    #[arg(short = 'e', long = "exclude-sources", value_delimiter = ',', value_name = "SOURCES")]
    pub exclude_sources: Vec<String>,

    /// List all available sources and exit
    #[arg(short = 's', long = "sources")]
    pub list_sources: bool,

    /// Output file (.txt, or .json for JSON lines)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write JSON lines regardless of the output extension
    #[arg(long = "json")]
    pub json: bool,

    /// Disable colored log output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbosity", action = ArgAction::Count)]
    pub verbosity: u8,

    /// Provider configuration file (YAML)
    #[arg(short = 'c', long = "configuration", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", default_value_t = 30, value_name = "SECONDS")]
    pub timeout: u64,

    /// Proxy URL for every outbound request
    #[arg(long = "proxy", value_name = "URL")]
    pub proxy: Option<String>,
}

impl Args {
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
