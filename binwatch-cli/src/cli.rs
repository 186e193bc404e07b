use std::path::PathBuf;

use binwatch_core::config::{ConfigError, TrackerConfig};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "binwatch",
    version,
    about = "Poll bin fill levels and request collection routes for full bins"
)]
pub(crate) struct Cli {
    /// Path to a binwatch.toml file; built-in defaults are used when omitted.
    #[arg(long, short)]
    pub(crate) config: Option<PathBuf>,

    /// Backend to use (`http` or `simulated`), overriding the file.
    #[arg(long)]
    pub(crate) backend: Option<String>,

    /// Seconds between cycles, overriding the file.
    #[arg(long)]
    pub(crate) interval_secs: Option<u64>,

    /// Run a single cycle and exit.
    #[arg(long)]
    pub(crate) once: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub(crate) print_config: bool,
}

impl Cli {
    /// Load the configuration file (if any) and apply command line overrides.
    pub(crate) fn load_config(&self) -> Result<TrackerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::from_file(path)?,
            None => TrackerConfig::default(),
        };

        if let Some(backend) = &self.backend {
            config.backend.clone_from(backend);
        }
        if let Some(secs) = self.interval_secs {
            config.interval_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}
