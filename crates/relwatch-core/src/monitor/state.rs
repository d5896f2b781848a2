use chrono::{DateTime, Utc};

use super::PollInterval;

/// Snapshot of what a monitor knows about its repository.
///
/// `update_available` is true exactly when `update_url` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    pub account: Option<String>,
    pub repository: Option<String>,
    pub baseline_version: Option<String>,
    pub interval: Option<PollInterval>,
    pub last_checked: Option<DateTime<Utc>>,
    pub update_available: bool,
    pub update_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    LastChecked,
    UpdateAvailable,
    UpdateUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Timestamp(Option<DateTime<Utc>>),
    Flag(bool),
    Url(Option<String>),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timestamp(Some(at)) => write!(f, "{}", at.to_rfc3339()),
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Url(Some(url)) => write!(f, "{url}"),
            Self::Timestamp(None) | Self::Url(None) => write!(f, "unset"),
        }
    }
}

/// One observable field of [`MonitorState`] changed during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChanged {
    pub field: StateField,
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Changes between two snapshots, in field declaration order.
pub(super) fn diff(before: &MonitorState, after: &MonitorState) -> Vec<StateChanged> {
    let mut changes = Vec::new();

    if before.last_checked != after.last_checked {
        changes.push(StateChanged {
            field: StateField::LastChecked,
            old: FieldValue::Timestamp(before.last_checked),
            new: FieldValue::Timestamp(after.last_checked),
        });
    }
    if before.update_available != after.update_available {
        changes.push(StateChanged {
            field: StateField::UpdateAvailable,
            old: FieldValue::Flag(before.update_available),
            new: FieldValue::Flag(after.update_available),
        });
    }
    if before.update_url != after.update_url {
        changes.push(StateChanged {
            field: StateField::UpdateUrl,
            old: FieldValue::Url(before.update_url.clone()),
            new: FieldValue::Url(after.update_url.clone()),
        });
    }

    changes
}
