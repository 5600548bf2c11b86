use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A point in time, serialized as milliseconds since the Unix epoch.
///
/// The payloads routed to feature collaborators carry a timestamp the way
/// the upstream Go service does (`time.Time`, JSON-marshaled); rather than
/// pull in a calendar crate for a field that is only ever stamped and
/// logged, this wraps the one integer that matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The current time, per the local clock.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self(millis)
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }
}
