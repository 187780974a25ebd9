use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use skygen_client::ClientOptions;

use crate::CliError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8585;
pub const DEFAULT_ITERATIONS: u64 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Defaults read from a `--config` TOML file. Command-line flags win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub table: Option<String>,
    pub overwrite: Option<bool>,
    pub iterations: Option<u64>,
    pub seed: Option<u64>,
    pub verbose: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<FileConfig, CliError> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct FlagValues {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub table: Option<String>,
    pub overwrite: bool,
    pub iterations: Option<u64>,
    pub seed: Option<u64>,
    pub verbose: bool,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

/// Fully resolved parameters of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub host: String,
    pub port: u16,
    pub table: String,
    pub overwrite: bool,
    pub iterations: u64,
    pub seed: Option<u64>,
    pub verbose: bool,
    pub timeout: Duration,
    pub log_file: Option<PathBuf>,
}

impl RunSettings {
    pub fn resolve(flags: FlagValues, config: FileConfig) -> Result<Self, CliError> {
        let table = flags
            .table
            .or(config.table)
            .filter(|table| !table.trim().is_empty())
            .ok_or_else(|| CliError::InvalidConfig("table name required (--table)".to_string()))?;

        let iterations = flags
            .iterations
            .or(config.iterations)
            .unwrap_or(DEFAULT_ITERATIONS);

        let timeout_secs = flags
            .timeout_secs
            .or(config.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(CliError::InvalidConfig(
                "timeout must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            host: flags
                .host
                .or(config.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: flags.port.or(config.port).unwrap_or(DEFAULT_PORT),
            table,
            overwrite: flags.overwrite || config.overwrite.unwrap_or(false),
            iterations,
            seed: flags.seed.or(config.seed),
            verbose: flags.verbose || config.verbose.unwrap_or(false),
            timeout: Duration::from_secs(timeout_secs),
            log_file: flags.log_file.or(config.log_file),
        })
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            host: self.host.clone(),
            port: self.port,
            timeout: self.timeout,
        }
    }
}
