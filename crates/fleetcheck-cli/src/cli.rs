//! Command-line flags and their merge with the optional config file.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use fleetcheck_core::{CheckConfig, ConfigResult, Settings};

use crate::logging::LogFormat;

#[derive(Debug, Parser)]
#[command(
    name = "fleetcheck",
    about = "Check that a service fleet registered in discovery is present and healthy",
    version
)]
pub struct Cli {
    /// Discovery server base URL
    #[arg(short, long, value_name = "URL")]
    pub discovery: Option<String>,

    /// Service type to check
    #[arg(short, long, value_name = "NAME")]
    pub service: Option<String>,

    /// Health endpoint, resolved against each announced service URI [default: health]
    #[arg(short, long, value_name = "PATH")]
    pub endpoint: Option<String>,

    /// Only count instances; do not probe them
    #[arg(short = 'n', long)]
    pub no_healthcheck: bool,

    /// Per-probe timeout in seconds [default: 5]
    #[arg(short, long, value_name = "SECS", allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    /// CRITICAL when fewer instances are found; 0 disables [default: 1]
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    pub crit_fewer: Option<i64>,

    /// WARNING when fewer instances are found; 0 disables [default: 1]
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    pub warn_fewer: Option<i64>,

    /// Extra probe header, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// TOML file supplying any of the options above
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Overall deadline in seconds; in-flight probes are abandoned when it passes
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Maximum number of concurrent probes [default: unbounded]
    #[arg(long, value_name = "N")]
    pub max_in_flight: Option<usize>,

    /// Log more to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Settings given on the command line, without any file layer.
    pub fn flag_settings(&self) -> Settings {
        Settings {
            discovery: self.discovery.clone(),
            service: self.service.clone(),
            endpoint: self.endpoint.clone(),
            no_healthcheck: self.no_healthcheck.then_some(true),
            timeout: self.timeout,
            crit_fewer: self.crit_fewer,
            warn_fewer: self.warn_fewer,
            headers: (!self.headers.is_empty()).then(|| self.headers.clone()),
            deadline: self.deadline,
            max_in_flight: self.max_in_flight,
        }
    }

    /// Flags layered over the config file, then validated.
    pub fn check_config(&self) -> ConfigResult<CheckConfig> {
        let mut settings = self.flag_settings();
        if let Some(path) = &self.config {
            settings = settings.merge(Settings::from_file(path)?);
        }
        CheckConfig::try_from(settings)
    }
}
