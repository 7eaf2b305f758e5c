use crate::{ComputeProvider, LaunchTemplate, STATE_ACTIVE};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

struct MockInstance {
    ip: String,
    state_polls: u32,
}

/// In-memory provider for tests: instances become ACTIVE after a configured
/// number of state polls (u32::MAX = never).
pub struct MockProvider {
    ready_after_polls: u32,
    instances: Mutex<HashMap<String, MockInstance>>,
}

impl MockProvider {
    pub fn new(ready_after_polls: u32) -> Self {
        Self {
            ready_after_polls,
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn never_ready() -> Self {
        Self::new(u32::MAX)
    }
}

#[async_trait]
impl ComputeProvider for MockProvider {
    async fn create_instance(
        &self,
        _name: &str,
        _instance_type: &str,
        _template: &LaunchTemplate,
    ) -> Result<String> {
        let mut instances = self
            .instances
            .lock()
            .map_err(|_| anyhow::anyhow!("mock provider lock poisoned"))?;
        let n = instances.len() + 1;
        let server_id = format!("mock-{}", uuid::Uuid::new_v4());
        instances.insert(
            server_id.clone(),
            MockInstance {
                ip: format!("192.0.2.{}", n),
                state_polls: 0,
            },
        );
        Ok(server_id)
    }

    async fn get_instance_ip(&self, server_id: &str) -> Result<Option<String>> {
        let instances = self
            .instances
            .lock()
            .map_err(|_| anyhow::anyhow!("mock provider lock poisoned"))?;
        Ok(instances.get(server_id).map(|i| i.ip.clone()))
    }

    async fn get_server_state(&self, server_id: &str) -> Result<Option<String>> {
        let mut instances = self
            .instances
            .lock()
            .map_err(|_| anyhow::anyhow!("mock provider lock poisoned"))?;
        let Some(instance) = instances.get_mut(server_id) else {
            return Ok(None);
        };
        instance.state_polls = instance.state_polls.saturating_add(1);
        if instance.state_polls > self.ready_after_polls {
            Ok(Some(STATE_ACTIVE.to_string()))
        } else {
            Ok(Some("BUILD".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> LaunchTemplate {
        LaunchTemplate {
            image_id: "img-1".to_string(),
            security_group_id: "sg-1".to_string(),
            subnet_id: "net-1".to_string(),
            key_name: "key-1".to_string(),
        }
    }

    #[tokio::test]
    async fn instance_becomes_active_after_configured_polls() {
        let provider = MockProvider::new(2);
        let id = provider
            .create_instance("web1", "t2.micro", &template())
            .await
            .unwrap();
        assert!(provider.get_instance_ip(&id).await.unwrap().is_some());
        assert_eq!(
            provider.get_server_state(&id).await.unwrap().as_deref(),
            Some("BUILD")
        );
        assert_eq!(
            provider.get_server_state(&id).await.unwrap().as_deref(),
            Some("BUILD")
        );
        assert_eq!(
            provider.get_server_state(&id).await.unwrap().as_deref(),
            Some(STATE_ACTIVE)
        );
    }

    #[tokio::test]
    async fn unknown_server_has_no_state() {
        let provider = MockProvider::new(0);
        assert!(provider.get_server_state("missing").await.unwrap().is_none());
        assert!(provider.get_instance_ip("missing").await.unwrap().is_none());
    }
}
