use anyhow::Result;
use async_trait::async_trait;

/// Provider-agnostic view of the compute API the provisioner drives. One
/// implementation per cloud; the provisioner only ever creates an instance,
/// reads its address and polls its state.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Create one instance and return the provider-side server id. Fixed
    /// placement (image, security group, subnet, key pair) comes from the
    /// launch template; only `instance_type` is caller-supplied.
    async fn create_instance(
        &self,
        name: &str,
        instance_type: &str,
        template: &LaunchTemplate,
    ) -> Result<String>;

    /// Public address assigned to the instance, if one exists yet.
    async fn get_instance_ip(&self, server_id: &str) -> Result<Option<String>>;

    /// Provider-reported server state (e.g. "BUILD", "ACTIVE", "ERROR").
    /// None when the provider has no state for the id.
    async fn get_server_state(&self, server_id: &str) -> Result<Option<String>>;
}

/// State value a server must report before it is considered reachable.
pub const STATE_ACTIVE: &str = "ACTIVE";

/// Fixed placement parameters for instance creation. Populated once from
/// settings; never caller-supplied.
#[derive(Debug, Clone)]
pub struct LaunchTemplate {
    pub image_id: String,
    pub security_group_id: String,
    pub subnet_id: String,
    pub key_name: String,
}

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "openstack")]
pub mod openstack;
