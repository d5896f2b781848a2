//! Release polling engine for relwatch.
//!
//! This crate is independent of the command-line front end:
//! - Release model decoding and asset selection.
//! - Release checker bound to an `account/repository` pair.
//! - Transport seam with a default `reqwest` implementation.
//! - Update monitor: recurring checks, observable state, error channel.

mod checker;
mod error;
pub mod monitor;
mod release;
mod transport;

/// Endpoint construction and release fetching.
pub use checker::{DEFAULT_API_BASE, LATEST_RELEASE, ReleaseChecker};
/// Error taxonomy shared by fetches, schedules and asset selection.
pub use error::{AssetError, DecodeError, FetchError, MonitorError, TransportError};
/// Scheduling, state snapshots and notifications.
pub use monitor::{
    DEFAULT_POLL_INTERVAL, FieldValue, MIN_POLL_INTERVAL, MonitorState, PollInterval, StateChanged,
    StateField, TickOutcome, UpdateCallback, UpdateMonitor,
};
/// Release record and its downloadable assets.
pub use release::{Release, ReleaseAsset};
/// Fetch-by-URL capability and its HTTP implementation.
pub use transport::{HttpTransport, ReleaseTransport};
