//! Event-stream message envelope.
//!
//! Every frame is a CloudEvents-style JSON object:
//!
//! ```json
//! {"type": "com.simplisafe.event.standard", "data": {...}, "time": "...",
//!  "id": "...", "specversion": "1.0", "source": "...", "datacontenttype": "application/json"}
//! ```

use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Outbound identify message type.
pub const IDENTIFY_TYPE: &str = "com.simplisafe.connection.identify";

/// `specversion` sent on outbound messages.
pub const SPEC_VERSION: &str = "1.0";

/// `datacontenttype` sent on outbound messages.
pub const DATA_CONTENT_TYPE: &str = "application/json";

/// A single stream message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specversion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,
}

/// Inbound message classes, recognized by `type` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Hello,
    Registered,
    Subscribed,
    Event,
    Other,
}

impl MessageKind {
    pub fn from_type(kind: &str) -> Self {
        let matches = |suffix: &str| kind == suffix || kind.ends_with(&format!(".{}", suffix));
        if matches("hello") {
            Self::Hello
        } else if matches("registered") {
            Self::Registered
        } else if matches("subscribed") {
            Self::Subscribed
        } else if matches("event.standard") {
            Self::Event
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hello => write!(f, "hello"),
            Self::Registered => write!(f, "registered"),
            Self::Subscribed => write!(f, "subscribed"),
            Self::Event => write!(f, "event"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Decoded payload of an event message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// Numeric event class (`data.eventCid`).
    pub code: i64,
    /// Human-readable subject (`data.messageSubject`).
    pub subject: String,
}

impl Envelope {
    /// Parse a text frame.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn message_kind(&self) -> MessageKind {
        MessageKind::from_type(&self.kind)
    }

    /// Event code and subject, when `data.eventCid` is present.
    ///
    /// The code may arrive as a number or a numeric string.
    pub fn event(&self) -> Option<StreamEvent> {
        let code = match self.data.get("eventCid")? {
            Value::Number(n) => n.as_i64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        let subject = self
            .data
            .get("messageSubject")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(StreamEvent { code, subject })
    }

    /// Build the identify reply to a server hello.
    pub fn identify(
        user_id: &str,
        token: &str,
        time: SystemTime,
        id: String,
        source: &str,
    ) -> Self {
        Self {
            kind: IDENTIFY_TYPE.to_string(),
            data: json!({
                "auth": { "schema": "bearer", "token": token },
                "join": [format!("uid:{}", user_id)],
            }),
            time: Some(format_time(time)),
            id: Some(id),
            specversion: Some(SPEC_VERSION.to_string()),
            source: Some(source.to_string()),
            datacontenttype: Some(DATA_CONTENT_TYPE.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// ISO-8601 UTC with second precision.
pub fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}
