use anyhow::{Context, Result};
use iwba_providers::LaunchTemplate;
use std::time::Duration;

/// Bounded wait applied after instance creation: fixed settle delay before
/// the first metadata query, then a status poll at a fixed interval with a
/// fixed attempt cap.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub settle: Duration,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(10),
            poll_interval: Duration::from_secs(10),
            max_attempts: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub redis_url: String,
    pub bind_addr: String,
    pub provider_api_url: String,
    pub provider_token: String,
    pub launch_template: LaunchTemplate,
    pub wait: WaitConfig,
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} must be set", key))
}

fn optional_secs(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let wait = WaitConfig {
            settle: optional_secs("SETTLE_SECS", 10),
            poll_interval: optional_secs("STATUS_POLL_SECS", 10),
            max_attempts: std::env::var("STATUS_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(60),
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8001".to_string()),
            provider_api_url: required("PROVIDER_API_URL")?,
            provider_token: required("PROVIDER_TOKEN")?,
            launch_template: LaunchTemplate {
                image_id: required("IMAGE_ID")?,
                security_group_id: required("SECURITY_GROUP_ID")?,
                subnet_id: required("SUBNET_ID")?,
                key_name: required("KEY_NAME")?,
            },
            wait,
        })
    }
}
