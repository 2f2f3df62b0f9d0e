//! Runtime configuration from environment variables.
//!
//! | Variable              | Default                    |
//! |-----------------------|----------------------------|
//! | `UROFLOW_DATA_DIR`    | `data`                     |
//! | `UROFLOW_MODEL_DIR`   | `<data dir>/models`        |
//! | `UROFLOW_NUM_SAMPLES` | `500`                      |
//! | `UROFLOW_SEED`        | `42`                       |
//! | `UROFLOW_LOG_MODE`    | `auto` (`stdout`, `file`)  |
//! | `UROFLOW_LOG_FILE`    | `<data dir>/uroflow.log`   |

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::UroflowError;

/// File name of the dataset inside the data directory.
pub const DATASET_FILE: &str = "simulated_uroflow_data.csv";

const DEFAULT_NUM_SAMPLES: usize = 500;
const DEFAULT_SEED: u64 = 42;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when attached to a terminal, stdout otherwise
    Auto,
    Stdout,
    File,
}

impl FromStr for LogMode {
    type Err = UroflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "stdout" => Ok(Self::Stdout),
            "file" => Ok(Self::File),
            other => Err(UroflowError::Validation(format!(
                "UROFLOW_LOG_MODE must be auto, stdout or file, got '{other}'"
            ))),
        }
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct UroflowConfig {
    pub data_dir: PathBuf,
    pub model_dir: PathBuf,
    pub num_samples: usize,
    pub seed: u64,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for UroflowConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            model_dir: data_dir.join("models"),
            log_file: data_dir.join("uroflow.log"),
            data_dir,
            num_samples: DEFAULT_NUM_SAMPLES,
            seed: DEFAULT_SEED,
            log_mode: LogMode::Auto,
        }
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, UroflowError> {
    value.trim().parse().map_err(|_| {
        UroflowError::Validation(format!("{name} must be a non-negative integer, got '{value}'"))
    })
}

impl UroflowConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns `Validation` for malformed numeric values or log mode.
    pub fn from_env() -> Result<Self, UroflowError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup` (variable name -> value).
    ///
    /// # Errors
    /// Returns `Validation` for malformed numeric values or log mode.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, UroflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let data_dir = get("UROFLOW_DATA_DIR").map_or_else(|| PathBuf::from("data"), PathBuf::from);
        let model_dir = get("UROFLOW_MODEL_DIR")
            .map_or_else(|| data_dir.join("models"), PathBuf::from);
        let log_file = get("UROFLOW_LOG_FILE")
            .map_or_else(|| data_dir.join("uroflow.log"), PathBuf::from);

        let num_samples = match get("UROFLOW_NUM_SAMPLES") {
            Some(v) => parse_number("UROFLOW_NUM_SAMPLES", &v)?,
            None => DEFAULT_NUM_SAMPLES,
        };
        if num_samples == 0 {
            return Err(UroflowError::Validation(
                "UROFLOW_NUM_SAMPLES must be at least 1".to_string(),
            ));
        }
        let seed = match get("UROFLOW_SEED") {
            Some(v) => parse_number("UROFLOW_SEED", &v)?,
            None => DEFAULT_SEED,
        };
        let log_mode = match get("UROFLOW_LOG_MODE") {
            Some(v) => v.parse()?,
            None => LogMode::Auto,
        };

        Ok(Self {
            data_dir,
            model_dir,
            num_samples,
            seed,
            log_mode,
            log_file,
        })
    }

    /// Path of the dataset file.
    #[must_use]
    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(DATASET_FILE)
    }

    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}
