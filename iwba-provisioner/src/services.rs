use anyhow::Result;
use iwba_common::{Envelope, EventType, ProvisionEvent, ProvisionRequest, CHANNEL_INSTALLER_EVENTS};
use iwba_providers::{ComputeProvider, STATE_ACTIVE};
use redis::AsyncCommands;
use sqlx::{Pool, Postgres};
use tokio::time::sleep;

use crate::settings::{Settings, WaitConfig};
use crate::store;

/// Full provisioning chain. Each step is a hard dependency on the previous
/// one; a failure after instance creation leaves the instance running and
/// unrecorded (accepted limitation, no rollback).
pub async fn process_provisioning(
    db: &Pool<Postgres>,
    redis_client: &redis::Client,
    provider: &dyn ComputeProvider,
    settings: &Settings,
    request: ProvisionRequest,
) -> Result<ProvisionEvent> {
    let name = request.record_name();
    let event = assign_instance(provider, &settings.launch_template, &settings.wait, request).await?;

    store::record_assignment(db, &name, &event).await?;
    println!("💾 recorded assignment: name={} ip={}", name, event.ip);

    publish_event(redis_client, &event).await?;
    println!("📤 published {} for {}", EventType::InstanceProvisioned.as_str(), name);

    Ok(event)
}

/// Create the instance and wait until it is reachable; returns the event
/// payload carrying the assigned address.
pub async fn assign_instance(
    provider: &dyn ComputeProvider,
    template: &iwba_providers::LaunchTemplate,
    wait: &WaitConfig,
    request: ProvisionRequest,
) -> Result<ProvisionEvent> {
    let server_name = format!("iwba-{}", request.record_name());
    let server_id = provider
        .create_instance(&server_name, &request.instance_type, template)
        .await?;
    println!("🚀 instance created: id={} type={}", server_id, request.instance_type);

    // Fixed settle delay before the first metadata query, not a readiness check.
    sleep(wait.settle).await;

    let ip = provider
        .get_instance_ip(&server_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no public address for instance {}", server_id))?;
    println!("🌐 instance {} has address {}", server_id, ip);

    wait_for_status_ok(provider, &server_id, wait).await?;

    Ok(ProvisionEvent::from_request(request, ip))
}

/// Bounded status poll: fixed interval, fixed attempt cap. Fails (never
/// hangs) when the instance does not reach the healthy state in time.
pub async fn wait_for_status_ok(
    provider: &dyn ComputeProvider,
    server_id: &str,
    wait: &WaitConfig,
) -> Result<()> {
    for attempt in 1..=wait.max_attempts {
        match provider.get_server_state(server_id).await? {
            Some(state) if state == STATE_ACTIVE => {
                println!("✅ instance {} healthy after {} attempt(s)", server_id, attempt);
                return Ok(());
            }
            Some(state) => {
                eprintln!(
                    "⏳ instance {} state={} (attempt {}/{})",
                    server_id, state, attempt, wait.max_attempts
                );
            }
            None => {
                eprintln!(
                    "⏳ instance {} has no state yet (attempt {}/{})",
                    server_id, attempt, wait.max_attempts
                );
            }
        }
        if attempt < wait.max_attempts {
            sleep(wait.poll_interval).await;
        }
    }
    Err(anyhow::anyhow!(
        "instance {} did not reach {} within {} attempts",
        server_id,
        STATE_ACTIVE,
        wait.max_attempts
    ))
}

async fn publish_event(redis_client: &redis::Client, event: &ProvisionEvent) -> Result<()> {
    let envelope = Envelope::new(EventType::InstanceProvisioned, event.to_payload()?);
    let message = envelope.to_message()?;
    let mut conn = redis_client.get_multiplexed_async_connection().await?;
    let _: () = conn.publish(CHANNEL_INSTALLER_EVENTS, message).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iwba_providers::mock::MockProvider;
    use iwba_providers::LaunchTemplate;
    use std::time::Duration;

    fn fast_wait(max_attempts: u32) -> WaitConfig {
        WaitConfig {
            settle: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    fn template() -> LaunchTemplate {
        LaunchTemplate {
            image_id: "img-1".to_string(),
            security_group_id: "sg-1".to_string(),
            subnet_id: "net-1".to_string(),
            key_name: "key-1".to_string(),
        }
    }

    fn request() -> ProvisionRequest {
        ProvisionRequest {
            instance_names: vec!["web1".to_string()],
            instance_type: "t2.micro".to_string(),
            email: "a@b.com".to_string(),
        }
    }

    #[tokio::test]
    async fn assign_instance_carries_request_fields_and_ip() {
        let provider = MockProvider::new(2);
        let event = assign_instance(&provider, &template(), &fast_wait(10), request())
            .await
            .unwrap();
        assert_eq!(event.instance_names, vec!["web1"]);
        assert_eq!(event.instance_type, "t2.micro");
        assert_eq!(event.email, "a@b.com");
        assert!(!event.ip.is_empty());
    }

    #[tokio::test]
    async fn bounded_poll_fails_when_instance_never_healthy() {
        let provider = MockProvider::never_ready();
        let id = provider
            .create_instance("web1", "t2.micro", &template())
            .await
            .unwrap();
        let err = wait_for_status_ok(&provider, &id, &fast_wait(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("within 5 attempts"));
    }

    #[tokio::test]
    async fn bounded_poll_succeeds_when_instance_turns_healthy_mid_poll() {
        let provider = MockProvider::new(3);
        let id = provider
            .create_instance("web1", "t2.micro", &template())
            .await
            .unwrap();
        wait_for_status_ok(&provider, &id, &fast_wait(10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn published_payload_parses_back_to_same_ip() {
        let provider = MockProvider::new(0);
        let event = assign_instance(&provider, &template(), &fast_wait(3), request())
            .await
            .unwrap();
        let envelope = Envelope::new(EventType::InstanceProvisioned, event.to_payload().unwrap());
        let wire = envelope.to_message().unwrap();
        let back = Envelope::from_message(&wire).unwrap();
        let parsed = ProvisionEvent::from_payload(&back.payload).unwrap();
        assert_eq!(parsed.ip, event.ip);
        assert_eq!(parsed.email, "a@b.com");
    }
}
