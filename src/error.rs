use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GulError {
    #[error("{description} file {} does not exist", .path.display())]
    MissingInput { description: &'static str, path: PathBuf },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid analysis settings {}: {source}", .path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("analysis settings {} define number_of_samples under neither analysis_settings nor the top level", .path.display())]
    MissingSampleCount { path: PathBuf },

    #[error("analysis settings {} give number_of_samples = {value}, expected an integer in 0..=2147483647", .path.display())]
    InvalidSampleCount { path: PathBuf, value: String },

    #[error("invalid event batch {index} of {count}")]
    InvalidBatch { index: u32, count: u32 },

    #[error("loss stream: {0}")]
    Stream(#[from] std::io::Error),

    #[error("unexpected loss stream id {found:#x} (expected {expected:#x})")]
    StreamId { found: i32, expected: i32 },
}

pub type GulResult<T> = Result<T, GulError>;
