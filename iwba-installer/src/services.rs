use anyhow::Result;
use iwba_common::{Envelope, PayloadError, ProvisionEvent};

use crate::deploy::{build_remote_command, ControlHost, PlaybookJob};
use crate::email::EmailService;

pub const EMAIL_SUBJECT: &str = "Your build has commissioned";

/// Unwrap the bus envelope and parse the event payload. Fails before any
/// side effect when the delivery is malformed.
pub fn parse_event(message: &str) -> Result<ProvisionEvent, PayloadError> {
    let envelope = Envelope::from_message(message)?;
    ProvisionEvent::from_payload(&envelope.payload)
}

/// Handle one delivery: dispatch the playbook on the control host, then mail
/// the requester. A session failure aborts before the email; the email never
/// waits for the playbook itself (fire-and-forget dispatch).
pub async fn process_install(
    message: &str,
    control_host: &ControlHost,
    playbook: &PlaybookJob,
    email: &EmailService,
) -> Result<()> {
    let event = parse_event(message)?;
    println!(
        "📩 install event: ip={} instances={}",
        event.ip,
        event.instance_names.join(",")
    );

    let remote_command = build_remote_command(playbook, &event.ip, &event.instance_names);
    control_host.dispatch(&remote_command).await?;

    let body = compose_email_body(&event);
    email.send_text(&event.email, EMAIL_SUBJECT, &body).await?;
    println!("✉️  commission notice sent to {}", event.email);
    Ok(())
}

/// Fixed notification template with the instance details filled in.
pub fn compose_email_body(event: &ProvisionEvent) -> String {
    format!(
        r#"Dear Member,

We are pleased to inform you that the Integrated Web Server Build Automation (IWBA) process for Tomcat instance deployment has been commissioned for build. Below are the key details for the setup and access:

Project Details:

Allocated Server: RHEL server as per the instance specifications
Server IP Address: {ip}
Tomcat Instances: {instances}
Instance Type : {instance_type}

Automation Process:

The build automation uses Ansible to deploy and configure the Tomcat instances in parallel.
This process is expected to complete within 15 minutes, depending on the number of Tomcat instances.

Access and Instructions:

A readme.txt file with detailed setup instructions and usage notes has been generated at /local/apps folder. This file provides essential information to guide you through the instance setup and verification steps.
To access the instance, please ensure you have the key associated with this deployment.

If you have any questions or need further assistance, please don't hesitate to reach out to iwbaproject@gmail.com.

IWBA Tool
"#,
        ip = event.ip,
        instances = event.instance_names.join(","),
        instance_type = event.instance_type,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use iwba_common::EventType;

    fn event() -> ProvisionEvent {
        ProvisionEvent {
            instance_names: vec!["web1".to_string(), "web2".to_string()],
            instance_type: "t2.micro".to_string(),
            email: "a@b.com".to_string(),
            ip: "54.12.8.9".to_string(),
        }
    }

    #[test]
    fn parses_delivery_with_strict_payload() {
        let envelope = Envelope::new(
            EventType::InstanceProvisioned,
            event().to_payload().unwrap(),
        );
        let parsed = parse_event(&envelope.to_message().unwrap()).unwrap();
        assert_eq!(parsed.ip, "54.12.8.9");
        assert_eq!(parsed.email, "a@b.com");
    }

    #[test]
    fn parses_delivery_with_single_quoted_payload() {
        let envelope = Envelope::new(
            EventType::InstanceProvisioned,
            "{'instance_names': ['web1'], 'instance_type': 't2.micro', 'email': 'a@b.com', 'ip': '54.12.8.9'}".to_string(),
        );
        let parsed = parse_event(&envelope.to_message().unwrap()).unwrap();
        assert_eq!(parsed.instance_names, vec!["web1"]);
    }

    #[test]
    fn malformed_delivery_fails_before_side_effects() {
        assert!(parse_event("not an envelope").is_err());

        // Envelope is valid but the payload is missing fields.
        let envelope = Envelope::new(
            EventType::InstanceProvisioned,
            r#"{"ip":"54.12.8.9"}"#.to_string(),
        );
        assert!(parse_event(&envelope.to_message().unwrap()).is_err());
    }

    #[test]
    fn email_body_carries_ip_type_and_joined_names() {
        let body = compose_email_body(&event());
        assert!(body.contains("54.12.8.9"));
        assert!(body.contains("t2.micro"));
        assert!(body.contains("web1,web2"));
    }
}
