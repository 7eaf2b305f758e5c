use crate::{ComputeProvider, LaunchTemplate};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// OpenStack-compatible compute API (Nova style: token auth, JSON bodies).
pub struct OpenStackProvider {
    client: Client,
    api_url: String,
    auth_token: reqwest::header::HeaderValue,
}

impl OpenStackProvider {
    pub fn new(api_url: String, token: String) -> Result<Self> {
        // Default reqwest client has no overall timeout. If the compute API
        // stalls, a provisioning call can hang forever.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()?;
        let auth_token = reqwest::header::HeaderValue::from_str(token.trim())
            .map_err(|_| anyhow::anyhow!("provider token is not a valid header value"))?;
        Ok(Self {
            client,
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    fn headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("X-Auth-Token", self.auth_token.clone());
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        headers
    }

    async fn get_server(&self, server_id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/servers/{}", self.api_url, server_id);
        let resp = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "compute API GET {} failed: status={} body={}",
                url,
                status.as_u16(),
                text
            ));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ComputeProvider for OpenStackProvider {
    async fn create_instance(
        &self,
        name: &str,
        instance_type: &str,
        template: &LaunchTemplate,
    ) -> Result<String> {
        let url = format!("{}/servers", self.api_url);
        let body = json!({
            "server": {
                "name": name,
                "flavorRef": instance_type,
                "imageRef": template.image_id,
                "key_name": template.key_name,
                "security_groups": [{"name": template.security_group_id}],
                "networks": [{"uuid": template.subnet_id}],
                "min_count": 1,
                "max_count": 1
            }
        });

        eprintln!(
            "🔵 [compute API] POST {} - creating instance: name={}, type={}, image={}",
            url, name, instance_type, template.image_id
        );

        let resp = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            eprintln!(
                "❌ [compute API] POST {} failed: status={}, response={}",
                url,
                status.as_u16(),
                text
            );
            return Err(anyhow::anyhow!(
                "compute API create_instance failed: status={} body={}",
                status.as_u16(),
                text
            ));
        }

        let json_resp: serde_json::Value = resp.json().await?;
        let server_id = json_resp["server"]["id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("no server id in create response"))?
            .to_string();
        eprintln!("✅ [compute API] instance created: id={}", server_id);
        Ok(server_id)
    }

    async fn get_instance_ip(&self, server_id: &str) -> Result<Option<String>> {
        let server = self.get_server(server_id).await?;
        let Some(addresses) = server["server"]["addresses"].as_object() else {
            return Ok(None);
        };

        // Prefer the floating (public) address; fall back to the first one.
        let mut first: Option<String> = None;
        for entries in addresses.values() {
            let Some(entries) = entries.as_array() else {
                continue;
            };
            for entry in entries {
                let Some(addr) = entry["addr"].as_str() else {
                    continue;
                };
                if entry["OS-EXT-IPS:type"].as_str() == Some("floating") {
                    return Ok(Some(addr.to_string()));
                }
                if first.is_none() {
                    first = Some(addr.to_string());
                }
            }
        }
        Ok(first)
    }

    async fn get_server_state(&self, server_id: &str) -> Result<Option<String>> {
        let server = self.get_server(server_id).await?;
        Ok(server["server"]["status"].as_str().map(|s| s.to_string()))
    }
}
