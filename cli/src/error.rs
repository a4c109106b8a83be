use std::path::PathBuf;

use smf_core::error::{LayoutError, PackingError, ProviderError, SerializeError};
use thiserror::Error;

/// Reasons a command fails.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unknown format '{0}'")]
    UnknownFormat(String),

    #[error("cannot tell the output format of {}; use --format", .0.display())]
    NoOutputFormat(PathBuf),

    #[error("{} is not in any supported format", .0.display())]
    Unrecognized(PathBuf),

    #[error("{} has {count} data error(s)", path.display())]
    DataErrors { path: PathBuf, count: usize },

    #[error("invalid attribute name: {0}")]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("serialization failed: {0}")]
    Serialize(#[from] SerializeError),

    #[error("packing failed: {0}")]
    Packing(#[from] PackingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;
