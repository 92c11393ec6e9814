#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValveError {
    #[error("{0}")]
    Validation(String),

    #[error("a job with valve ID '{0}' already exists")]
    DuplicateValveId(String),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("failed to parse {path}: {msg}")]
    Parse { path: PathBuf, msg: String },

    #[error("unsupported spreadsheet format: {0}")]
    UnsupportedFormat(String),

    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode jobs: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("invalid config value for '{key}': {msg}")]
    InvalidConfigValue { key: String, msg: String },
}

impl ValveError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            msg: msg.into(),
        }
    }
}
