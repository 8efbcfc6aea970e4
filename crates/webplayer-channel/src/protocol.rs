//! Messages exchanged with the player runtime across the frame boundary.
//!
//! Inbound events arrive as extended JSON envelopes; the single outbound
//! request is a run message carrying the file map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use webplayer_core::Value;

use crate::error::ChannelResult;

/// Marker identifying run messages sent by a host.
pub const RUN_SOURCE: &str = "rnwp";

/// Virtual file system handed to the runtime: path -> source text.
pub type FileMap = BTreeMap<String, String>;

/// Kind of event reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The runtime finished loading and accepts run messages.
    Ready,
    /// Application code raised an error.
    Error,
    /// Application code wrote to the console.
    Console,
    /// Anything else. Ignored.
    #[serde(other)]
    Unknown,
}

/// An event sent from the runtime to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Session id of the channel the event is meant for.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Event data, in extended JSON.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(id: impl Into<String>, kind: EventKind, payload: Value) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
        }
    }

    /// Decode a raw boundary message.
    pub fn decode(raw: &str) -> ChannelResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Encode for the wire.
    pub fn encode(&self) -> ChannelResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The run request posted into the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMessage {
    pub file_map: FileMap,
    /// Path of the module to execute first.
    pub entry: String,
    /// Always [`RUN_SOURCE`].
    pub source: String,
}

impl RunMessage {
    pub fn new(file_map: FileMap, entry: impl Into<String>) -> Self {
        Self {
            file_map,
            entry: entry.into(),
            source: RUN_SOURCE.to_string(),
        }
    }

    pub fn to_json(&self) -> ChannelResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
