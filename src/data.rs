use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Format used when echoing `received_at` back to the caller.
pub const RECEIVED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One captured inbound call, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedMessage {
    pub id: i64,
    pub method: String,
    pub path: String,
    /// Header map serialized as JSON text.
    pub headers: String,
    pub body: Option<String>,
    pub source_ip: String,
    pub received_at: NaiveDateTime,
}

impl CapturedMessage {
    pub fn received_at_formatted(&self) -> String {
        self.received_at.format(RECEIVED_AT_FORMAT).to_string()
    }

    /// Parses the stored header text back into a map.
    pub fn header_map(&self) -> serde_json::Result<HashMap<String, String>> {
        serde_json::from_str(&self.headers)
    }
}

/// Input to `MessageStore::persist`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    pub source_ip: String,
    /// Stamped by the store when `None`.
    pub received_at: Option<NaiveDateTime>,
}

impl NewMessage {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        headers: HashMap<String, String>,
        body: Option<String>,
        source_ip: impl Into<String>,
    ) -> NewMessage {
        NewMessage {
            method: method.into(),
            path: path.into(),
            headers,
            body,
            source_ip: source_ip.into(),
            received_at: None,
        }
    }
}
