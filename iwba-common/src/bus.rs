use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::PayloadError;

// -----------------------------------------------------------------------------
// Channels
// -----------------------------------------------------------------------------

pub const CHANNEL_INSTALLER_EVENTS: &str = "installer_events";

// -----------------------------------------------------------------------------
// Events (EVT:*)
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum EventType {
    #[serde(rename = "EVT:INSTANCE_PROVISIONED")]
    InstanceProvisioned,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::InstanceProvisioned => "EVT:INSTANCE_PROVISIONED",
        }
    }
}

/// Delivery wrapper published on the bus. The payload is carried as text so
/// consumers can apply quote normalization before structured parsing (older
/// producers stringified the event with single quotes).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Envelope {
    pub event_id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: String,
}

pub const ENVELOPE_VERSION: u32 = 1;

impl Envelope {
    pub fn new(event_type: EventType, payload: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            version: ENVELOPE_VERSION,
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn to_message(&self) -> Result<String, PayloadError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_message(message: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(message)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_message_text() {
        let env = Envelope::new(
            EventType::InstanceProvisioned,
            r#"{"ip":"10.0.0.5"}"#.to_string(),
        );
        let wire = env.to_message().unwrap();
        let back = Envelope::from_message(&wire).unwrap();
        assert_eq!(back.event_id, env.event_id);
        assert_eq!(back.event_type, EventType::InstanceProvisioned);
        assert_eq!(back.version, ENVELOPE_VERSION);
        assert_eq!(back.payload, env.payload);
    }

    #[test]
    fn event_type_tag_matches_wire_name() {
        let wire = serde_json::to_string(&EventType::InstanceProvisioned).unwrap();
        assert_eq!(wire, "\"EVT:INSTANCE_PROVISIONED\"");
        assert_eq!(
            EventType::InstanceProvisioned.as_str(),
            "EVT:INSTANCE_PROVISIONED"
        );
    }
}
