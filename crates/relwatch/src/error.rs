use relwatch_core::{AssetError, FetchError, MonitorError, TransportError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("no current version configured; pass --current or set current_version")]
    MissingCurrentVersion,

    #[error("poll interval of {hours} hours is longer than the {max}-hour maximum")]
    IntervalOutOfRange { hours: u64, max: u64 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}
