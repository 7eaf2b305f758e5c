use anyhow::Result;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Fixed control host the configuration-management jobs run from.
#[derive(Debug, Clone)]
pub struct ControlHost {
    pub host: String,
    pub user: String,
    pub identity_file: String,
    pub connect_timeout: Duration,
    pub dispatch_timeout: Duration,
}

/// Playbook parameters for the Tomcat install job.
#[derive(Debug, Clone)]
pub struct PlaybookJob {
    pub playbook: String,
    pub private_key_file: String,
}

/// Remote command line run on the control host: the playbook is detached
/// with nohup so the session returns immediately. Only output available at
/// dispatch time is ever seen; the job's exit status is never inspected.
pub fn build_remote_command(job: &PlaybookJob, ip: &str, instance_names: &[String]) -> String {
    let names_json =
        serde_json::to_string(instance_names).unwrap_or_else(|_| "[]".to_string());
    format!(
        "nohup ansible-playbook -i {}, {} -e '{{\"tomcat_instances\":{}}}' --private-key={} > tomcat_output.log 2>&1 &",
        ip, job.playbook, names_json, job.private_key_file
    )
}

impl ControlHost {
    /// Open the SSH session and submit the detached playbook run. Returns
    /// whatever output the session produced before returning.
    pub async fn dispatch(&self, remote_command: &str) -> Result<String> {
        let connect_timeout = format!("ConnectTimeout={}", self.connect_timeout.as_secs());
        let destination = format!("{}@{}", self.user, self.host);

        println!("🔧 dispatching on {}: {}", destination, remote_command);

        let mut child = Command::new("ssh")
            .args([
                "-o",
                "BatchMode=yes",
                "-o",
                "StrictHostKeyChecking=accept-new",
                "-o",
                connect_timeout.as_str(),
                "-i",
                self.identity_file.as_str(),
                destination.as_str(),
                remote_command,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("failed to spawn ssh: {}", e))?;

        let output = tokio::select! {
            result = child.wait_with_output() => result?,
            _ = tokio::time::sleep(self.dispatch_timeout) => {
                anyhow::bail!(
                    "ssh dispatch to {} timed out after {}s",
                    destination,
                    self.dispatch_timeout.as_secs()
                );
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ssh dispatch to {} failed: {}", destination, stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !stdout.trim().is_empty() {
            println!("{}", stdout.trim());
        }
        if !stderr.trim().is_empty() {
            eprintln!("{}", stderr.trim());
        }
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> PlaybookJob {
        PlaybookJob {
            playbook: "tomcat_installer.yml".to_string(),
            private_key_file: "tomcatkey.pem".to_string(),
        }
    }

    #[test]
    fn remote_command_embeds_ip_and_name_list() {
        let cmd = build_remote_command(
            &job(),
            "54.12.8.9",
            &["web1".to_string(), "web2".to_string()],
        );
        assert!(cmd.contains("-i 54.12.8.9,"));
        assert!(cmd.contains(r#"{"tomcat_instances":["web1","web2"]}"#));
        assert!(cmd.contains("tomcat_installer.yml"));
        assert!(cmd.contains("--private-key=tomcatkey.pem"));
    }

    #[test]
    fn remote_command_is_detached() {
        let cmd = build_remote_command(&job(), "54.12.8.9", &["web1".to_string()]);
        assert!(cmd.starts_with("nohup "));
        assert!(cmd.ends_with("&"));
        assert!(cmd.contains("> tomcat_output.log 2>&1"));
    }
}
