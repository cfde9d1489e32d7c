use crate::archive::running_as_root;
use crate::config::AppConfig;
use crate::constants::defaults;
use crate::{N8nError, Result};
use tracing::{debug, info};

/// 需要的外部命令
pub fn required_tools(config: &AppConfig) -> Vec<String> {
    vec![
        config.package.package_manager.clone(),
        config.package.runtime.clone(),
        defaults::SERVICE_MANAGER.to_string(),
    ]
}

/// 检查权限
pub fn check_privileges(is_admin: bool) -> Result<()> {
    if !is_admin {
        return Err(N8nError::precondition("需要 root 权限运行 (请使用 sudo)"));
    }
    Ok(())
}

/// 检查外部命令是否都可找到，一次列出所有缺失项
pub fn check_tools<F>(tools: &[String], mut is_available: F) -> Result<()>
where
    F: FnMut(&str) -> bool,
{
    let missing: Vec<&str> = tools
        .iter()
        .map(String::as_str)
        .filter(|tool| !is_available(tool))
        .collect();

    if !missing.is_empty() {
        return Err(N8nError::precondition(format!(
            "未找到必需的命令: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// 执行前置检查，失败时不做任何修改
pub fn run(config: &AppConfig) -> Result<()> {
    check_privileges(running_as_root())?;
    check_tools(&required_tools(config), |tool| match which::which(tool) {
        Ok(path) => {
            debug!("找到 {}: {}", tool, path.display());
            true
        }
        Err(_) => false,
    })?;
    info!("✅ 前置检查通过");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_admin() {
        assert!(check_privileges(true).is_ok());
        assert!(matches!(
            check_privileges(false),
            Err(N8nError::Precondition(_))
        ));
    }

    #[test]
    fn test_reports_every_missing_tool() {
        let tools = required_tools(&AppConfig::default());
        assert_eq!(tools, vec!["npm", "node", "systemctl"]);

        let err = check_tools(&tools, |tool| tool == "systemctl").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("npm"));
        assert!(msg.contains("node"));
        assert!(!msg.contains("systemctl"));

        assert!(check_tools(&tools, |_| true).is_ok());
    }
}
