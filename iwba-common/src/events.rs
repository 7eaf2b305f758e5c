use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("payload missing field '{0}'")]
    MissingField(&'static str),
}

/// Build request as received on `POST /provision`. Fields are taken as-is;
/// nothing beyond JSON shape is validated.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProvisionRequest {
    pub instance_names: Vec<String>,
    pub instance_type: String,
    pub email: String,
}

impl ProvisionRequest {
    /// Store key: the instance names joined with commas. Two requests naming
    /// the same instances collide on this key (last writer wins).
    pub fn record_name(&self) -> String {
        self.instance_names.join(",")
    }
}

/// The request augmented with the assigned public address. This is the
/// payload shape the installer depends on.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProvisionEvent {
    pub instance_names: Vec<String>,
    pub instance_type: String,
    pub email: String,
    pub ip: String,
}

impl ProvisionEvent {
    pub fn from_request(request: ProvisionRequest, ip: String) -> Self {
        Self {
            instance_names: request.instance_names,
            instance_type: request.instance_type,
            email: request.email,
            ip,
        }
    }

    pub fn to_payload(&self) -> Result<String, PayloadError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a payload string as delivered on the bus. Single quotes are
    /// normalized first so stringified-dict producers still parse.
    pub fn from_payload(payload: &str) -> Result<Self, PayloadError> {
        let normalized = normalize_quotes(payload);
        let event: ProvisionEvent = serde_json::from_str(&normalized)?;
        if event.ip.trim().is_empty() {
            return Err(PayloadError::MissingField("ip"));
        }
        if event.email.trim().is_empty() {
            return Err(PayloadError::MissingField("email"));
        }
        Ok(event)
    }
}

/// Replace single quotes with double quotes so informally serialized
/// mappings (`{'ip': '1.2.3.4'}`) become parseable JSON. Values containing
/// literal single quotes are not expected on this channel.
pub fn normalize_quotes(payload: &str) -> String {
    payload.replace('\'', "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_quoted_payload() {
        let payload = "{'instance_names': ['web1', 'web2'], 'instance_type': 't2.micro', 'email': 'a@b.com', 'ip': '54.12.8.9'}";
        let event = ProvisionEvent::from_payload(payload).unwrap();
        assert_eq!(event.instance_names, vec!["web1", "web2"]);
        assert_eq!(event.instance_type, "t2.micro");
        assert_eq!(event.email, "a@b.com");
        assert_eq!(event.ip, "54.12.8.9");
    }

    #[test]
    fn strict_payload_round_trips() {
        let request = ProvisionRequest {
            instance_names: vec!["web1".to_string()],
            instance_type: "t2.micro".to_string(),
            email: "a@b.com".to_string(),
        };
        let event = ProvisionEvent::from_request(request, "54.12.8.9".to_string());
        let payload = event.to_payload().unwrap();
        let back = ProvisionEvent::from_payload(&payload).unwrap();
        assert_eq!(back.ip, "54.12.8.9");
        assert_eq!(back.instance_names, vec!["web1"]);
    }

    #[test]
    fn rejects_payload_without_ip() {
        let payload = r#"{"instance_names":["web1"],"instance_type":"t2.micro","email":"a@b.com","ip":""}"#;
        let err = ProvisionEvent::from_payload(payload).unwrap_err();
        assert!(matches!(err, PayloadError::MissingField("ip")));
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(ProvisionEvent::from_payload("not json at all").is_err());
        assert!(ProvisionEvent::from_payload(r#"{"ip":"1.2.3.4"}"#).is_err());
    }

    #[test]
    fn record_name_joins_instance_names() {
        let request = ProvisionRequest {
            instance_names: vec!["web1".to_string(), "web2".to_string()],
            instance_type: "t2.micro".to_string(),
            email: "a@b.com".to_string(),
        };
        assert_eq!(request.record_name(), "web1,web2");
    }
}
