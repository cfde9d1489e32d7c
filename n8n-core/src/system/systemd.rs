use super::command::{failure_text, run_command, stdout_text};
use super::types::ServiceManager;
use crate::{N8nError, Result};

/// 基于 systemctl 的服务管理
#[derive(Debug, Clone)]
pub struct SystemdManager {
    systemctl: String,
}

impl SystemdManager {
    pub fn new(systemctl: impl Into<String>) -> Self {
        Self {
            systemctl: systemctl.into(),
        }
    }

    async fn systemctl(&self, args: &[&str]) -> Result<String> {
        let output = run_command(&self.systemctl, args).await?;
        if !output.status.success() {
            return Err(N8nError::service_manager(format!(
                "systemctl {} 失败: {}",
                args.join(" "),
                failure_text(&output)
            )));
        }
        Ok(stdout_text(&output))
    }
}

impl ServiceManager for SystemdManager {
    async fn stop(&self, unit: &str) -> Result<()> {
        self.systemctl(&["stop", unit]).await?;
        Ok(())
    }

    async fn start(&self, unit: &str) -> Result<()> {
        self.systemctl(&["start", unit])
            .await
            .map_err(|e| N8nError::service_start(e.to_string()))?;
        Ok(())
    }

    async fn daemon_reload(&self) -> Result<()> {
        self.systemctl(&["daemon-reload"]).await?;
        Ok(())
    }

    async fn is_active(&self, unit: &str) -> Result<bool> {
        // 非活动状态时 is-active 以非零状态退出，只看输出
        let output = run_command(&self.systemctl, &["is-active", unit]).await?;
        Ok(stdout_text(&output) == "active")
    }

    async fn show_property(&self, unit: &str, property: &str) -> Result<Option<String>> {
        let value = self
            .systemctl(&["show", "-p", property, "--value", unit])
            .await?;
        Ok(if value.is_empty() { None } else { Some(value) })
    }

    async fn cat(&self, unit: &str) -> Result<String> {
        let output = run_command(&self.systemctl, &["cat", unit]).await?;
        if !output.status.success() {
            return Err(N8nError::service_manager(format!(
                "systemctl cat {} 失败: {}",
                unit,
                failure_text(&output)
            )));
        }
        // 保留原始输出，不裁剪
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
