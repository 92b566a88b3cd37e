//! User and log-entry documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One exercise record in a user's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub description: String,
    /// Minutes spent.
    pub duration: u32,
    /// Stored as a UTC instant; date-only inputs map to midnight UTC.
    pub date: DateTime<Utc>,
}

/// A user document embedding its append-only exercise log.
///
/// The entry count is derived from `log` on every read and is never stored;
/// see [`User::count`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub log: Vec<LogEntry>,
}

impl User {
    pub fn new(username: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            log: Vec::new(),
        }
    }

    /// Number of entries currently in the log.
    pub fn count(&self) -> usize {
        self.log.len()
    }
}
