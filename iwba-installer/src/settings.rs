use anyhow::{Context, Result};
use std::time::Duration;

use crate::deploy::{ControlHost, PlaybookJob};
use crate::email::SmtpConfig;

#[derive(Debug, Clone)]
pub struct Settings {
    pub redis_url: String,
    pub control_host: ControlHost,
    pub playbook: PlaybookJob,
    pub smtp: SmtpConfig,
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} must be set", key))
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let control_host = ControlHost {
            host: required("CONTROL_HOST")?,
            user: std::env::var("CONTROL_USER").unwrap_or_else(|_| "ansible".to_string()),
            identity_file: required("CONTROL_IDENTITY_FILE")?,
            connect_timeout: Duration::from_secs(10),
            dispatch_timeout: Duration::from_secs(30),
        };

        let playbook = PlaybookJob {
            playbook: std::env::var("PLAYBOOK")
                .unwrap_or_else(|_| "tomcat_installer.yml".to_string()),
            private_key_file: std::env::var("PLAYBOOK_KEY_FILE")
                .unwrap_or_else(|_| "tomcatkey.pem".to_string()),
        };

        let smtp = SmtpConfig::from_env()
            .context("SMTP_SERVER, SMTP_USERNAME and SMTP_PASSWORD must be set")?;

        Ok(Self {
            redis_url: required("REDIS_URL")?,
            control_host,
            playbook,
            smtp,
        })
    }
}
