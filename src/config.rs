//! Command-line and config-file handling.
//!
//! Hand-rolled flag parser following the classic short options:
//!
//! ```text
//! oscii [-v] [-W width] [-H height] [-X sample-ms] [-Y max-Y]
//!       [-s baudrate] [-r refresh-ms] [--capacity n] [--config file.json]
//!       (--simulate | input-dev)
//! ```
//!
//! Values from `--config` act as defaults; flags on the command line win
//! regardless of their position.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::drivers::plot::GUTTER;
use crate::drivers::DEFAULT_CAPACITY;
use crate::types::PlotConfig;

pub const DEFAULT_BAUD: u32 = 115_200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("invalid value '{value}' for {flag}")]
    InvalidNumber { flag: String, value: String },
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    #[error("expected exactly one input device, got {0}")]
    DeviceCount(usize),
    #[error("cannot read config file {}: {source}", .path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid plot settings: {0}")]
    Invalid(&'static str),
}

/// Where samples come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceConfig {
    Serial { path: String, baud: u32 },
    Simulated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub plot: PlotConfig,
    pub device: DeviceConfig,
    pub capacity: usize,
    pub verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Run(AppConfig),
    Help,
}

/// Contents of a `--config` JSON file. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub plot: Option<PlotConfig>,
    pub baud: Option<u32>,
    pub capacity: Option<usize>,
    pub device: Option<String>,
}

impl ConfigFile {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

#[derive(Default)]
struct Overrides {
    width: Option<u32>,
    height: Option<u32>,
    sample_msecs: Option<u64>,
    max_y: Option<u32>,
    baud: Option<u32>,
    refresh_ms: Option<u64>,
    capacity: Option<usize>,
    config: Option<PathBuf>,
    simulate: bool,
    verbose: bool,
    devices: Vec<String>,
}

/// Parses arguments, excluding the program name.
pub fn parse_args<I>(args: I) -> Result<Command, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let mut flags = Overrides::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" => flags.verbose = true,
            "--simulate" => flags.simulate = true,
            "-W" => flags.width = Some(number(&arg, args.next())?),
            "-H" => flags.height = Some(number(&arg, args.next())?),
            "-X" => flags.sample_msecs = Some(number(&arg, args.next())?),
            "-Y" => flags.max_y = Some(number(&arg, args.next())?),
            "-s" => flags.baud = Some(number(&arg, args.next())?),
            "-r" => flags.refresh_ms = Some(number(&arg, args.next())?),
            "--capacity" => flags.capacity = Some(number(&arg, args.next())?),
            "--config" => {
                let path = args.next().ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                flags.config = Some(PathBuf::from(path));
            }
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(ConfigError::UnknownOption(other.to_string()));
            }
            _ => flags.devices.push(arg),
        }
    }

    let file = match &flags.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    resolve(flags, file).map(Command::Run)
}

fn resolve(flags: Overrides, file: ConfigFile) -> Result<AppConfig, ConfigError> {
    let mut plot = file.plot.unwrap_or_default();
    if let Some(v) = flags.width {
        plot.width = v;
    }
    if let Some(v) = flags.height {
        plot.height = v;
    }
    if let Some(v) = flags.sample_msecs {
        plot.sample_msecs = v;
    }
    if let Some(v) = flags.max_y {
        plot.max_y = v;
    }
    if let Some(v) = flags.refresh_ms {
        plot.refresh_ms = v;
    }
    validate_plot(&plot)?;

    let capacity = flags.capacity.or(file.capacity).unwrap_or(DEFAULT_CAPACITY);
    if capacity < 2 {
        return Err(ConfigError::Invalid("capacity must be at least 2"));
    }

    let device = if flags.simulate {
        DeviceConfig::Simulated
    } else {
        let mut devices = flags.devices;
        if devices.is_empty() {
            devices.extend(file.device);
        }
        if devices.len() != 1 {
            return Err(ConfigError::DeviceCount(devices.len()));
        }
        DeviceConfig::Serial {
            path: devices.remove(0),
            baud: flags.baud.or(file.baud).unwrap_or(DEFAULT_BAUD),
        }
    };

    Ok(AppConfig {
        plot,
        device,
        capacity,
        verbose: flags.verbose,
    })
}

pub fn validate_plot(plot: &PlotConfig) -> Result<(), ConfigError> {
    let min_side = 2 * GUTTER as u32;
    if plot.width < min_side || plot.height < min_side {
        return Err(ConfigError::Invalid("canvas must be at least 80x80"));
    }
    if plot.width > 16_384 || plot.height > 16_384 {
        return Err(ConfigError::Invalid("canvas larger than 16384 pixels"));
    }
    if plot.max_y == 0 {
        return Err(ConfigError::Invalid("max-Y must be positive"));
    }
    if plot.sample_msecs == 0 {
        return Err(ConfigError::Invalid("sample-ms must be positive"));
    }
    Ok(())
}

fn number<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::MissingValue(flag.to_string()))?;
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        flag: flag.to_string(),
        value,
    })
}

pub fn usage(exe: &str) -> String {
    format!(
        "{exe} -v -W <width> -H <height> -X <sample-ms> -Y <max-Y> -s <baudrate> -r <refresh-rate> input-dev\n\
         \x20 x-axis sample-ms the number of milliseconds to take one\n\
         \x20 snapshot sample of the input data\n\
         \x20 --simulate          read from a built-in synthetic device\n\
         \x20 --capacity <n>      sample ring capacity (default {DEFAULT_CAPACITY})\n\
         \x20 --config <file>     JSON file with default settings\n"
    )
}
