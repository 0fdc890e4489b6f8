use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while fetching a batch from the generator endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure talking to generator endpoint: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generator endpoint returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("generator response body is not a valid object array: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("fetch cancelled")]
    Cancelled,
}

/// Failure while appending to or resetting the accumulation buffer.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to open accumulation buffer {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to append to accumulation buffer {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to reset accumulation buffer {path}: {source}")]
    Reset {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure during the sort-and-rotate step.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("failed to read accumulation buffer {path}: {source}")]
    ReadBuffer {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write sorted output {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
