//! Authenticated identity for one session.

use serde::{Deserialize, Serialize};

/// Credentials block echoed back to the API on every call.
///
/// Lives only as long as the process; nothing is written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub database: String,
    pub session_id: String,
    pub user_name: String,
}

impl Session {
    pub fn new(database: &str, user_name: &str, session_id: &str) -> Self {
        Self {
            database: database.to_string(),
            session_id: session_id.to_string(),
            user_name: user_name.to_string(),
        }
    }

    /// Display line for the navbar: `user@database`.
    pub fn display_name(&self) -> String {
        format!("{}@{}", self.user_name, self.database)
    }
}
