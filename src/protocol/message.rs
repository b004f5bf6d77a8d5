//! Job ids, upload receipts and live channel frames.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::timestamp::{format_timestamp, usable_timestamp};

// ---------------------------------------------------------------------------
// ProtocolError
// ---------------------------------------------------------------------------

/// Errors raised while decoding or encoding channel frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON.
    #[error("malformed JSON frame: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// Opaque token correlating an uploaded video with its processing output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// UploadReceipt
// ---------------------------------------------------------------------------

/// JSON body of a successful `POST /upload`.
///
/// Only `job_id` is required; the backend also echoes the stored file name
/// and byte count, which the UI shows when present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadReceipt {
    pub job_id: JobId,
    pub filename: Option<String>,
    pub size: Option<u64>,
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// JobAnnouncement
// ---------------------------------------------------------------------------

/// The one frame the client sends: `{"job_id":"<id>"}`.
#[derive(Debug, Serialize)]
pub struct JobAnnouncement<'a> {
    pub job_id: &'a JobId,
}

impl<'a> JobAnnouncement<'a> {
    pub fn new(job_id: &'a JobId) -> Self {
        Self { job_id }
    }

    /// Serialise to the text frame payload.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ---------------------------------------------------------------------------
// CommentaryEvent
// ---------------------------------------------------------------------------

/// One unit of generated play-by-play text.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentaryEvent {
    /// The spoken/displayed commentary text.
    pub text: String,
    /// Offset into the video in seconds, when the backend supplied one.
    pub timestamp_secs: Option<f64>,
}

impl CommentaryEvent {
    /// Build an event, discarding timestamps that cannot be displayed.
    pub fn new(text: impl Into<String>, timestamp_secs: Option<f64>) -> Self {
        Self {
            text: text.into(),
            timestamp_secs: usable_timestamp(timestamp_secs),
        }
    }

    /// The line shown in the commentary panel.
    ///
    /// ```
    /// use match_commentator::protocol::CommentaryEvent;
    ///
    /// assert_eq!(CommentaryEvent::new("Goal!", Some(95.0)).display_line(), "[1:35] Goal!");
    /// assert_eq!(CommentaryEvent::new("Replay", None).display_line(), "Replay");
    /// ```
    pub fn display_line(&self) -> String {
        match self.timestamp_secs {
            Some(secs) => format!("[{}] {}", format_timestamp(secs), self.text),
            None => self.text.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelMessage
// ---------------------------------------------------------------------------

/// An inbound live channel frame, classified by the keys it carries.
///
/// Classification order is `commentary`, then `status`, then `error`; the
/// first key holding a non-empty string wins.  Anything else (including
/// valid JSON that is not an object) is [`ChannelMessage::Unrecognized`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    /// `{"commentary": "...", "timestamp": 12.5?}`
    Commentary(CommentaryEvent),
    /// `{"status": "...", "message": "..."?}`
    Status {
        status: String,
        message: Option<String>,
    },
    /// `{"error": "..."}`, reported by the server; the channel stays open.
    Error { error: String },
    /// A frame with none of the known shapes.
    Unrecognized,
}

impl ChannelMessage {
    /// Parse one text frame.
    ///
    /// Only malformed JSON is an error.  The caller is expected to log it and
    /// carry on with the next frame.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(map) = value else {
            return Ok(Self::Unrecognized);
        };

        if let Some(text) = non_empty_str(&map, "commentary") {
            let timestamp = map.get("timestamp").and_then(Value::as_f64);
            return Ok(Self::Commentary(CommentaryEvent::new(text, timestamp)));
        }

        if let Some(status) = non_empty_str(&map, "status") {
            return Ok(Self::Status {
                status: status.to_string(),
                message: map
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }

        if let Some(error) = non_empty_str(&map, "error") {
            return Ok(Self::Error {
                error: error.to_string(),
            });
        }

        Ok(Self::Unrecognized)
    }
}

fn non_empty_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
