use super::command::{failure_text, run_command, stdout_text};
use super::types::PackageManager;
use crate::{N8nError, Result};
use serde_json::Value;
use std::path::PathBuf;

/// 基于 npm 命令行的全局包管理
#[derive(Debug, Clone)]
pub struct NpmManager {
    npm: String,
    node: String,
}

impl NpmManager {
    pub fn new(npm: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            npm: npm.into(),
            node: node.into(),
        }
    }

    async fn npm_text(&self, args: &[&str]) -> Result<String> {
        let output = run_command(&self.npm, args).await?;
        if !output.status.success() {
            return Err(N8nError::package_manager(format!(
                "{} {} 失败: {}",
                self.npm,
                args.join(" "),
                failure_text(&output)
            )));
        }
        Ok(stdout_text(&output))
    }
}

/// 解析 `npm ls -g <pkg> --depth=0 --json` 的输出
pub(crate) fn parse_ls_version(json: &str, package: &str) -> Result<Option<String>> {
    if json.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(json)?;
    Ok(value
        .get("dependencies")
        .and_then(|deps| deps.get(package))
        .and_then(|pkg| pkg.get("version"))
        .and_then(Value::as_str)
        .map(str::to_string))
}

impl PackageManager for NpmManager {
    async fn global_root(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(self.npm_text(&["root", "-g"]).await?))
    }

    async fn global_bin_dir(&self) -> Result<PathBuf> {
        let prefix = PathBuf::from(self.npm_text(&["prefix", "-g"]).await?);
        Ok(prefix.join("bin"))
    }

    async fn installed_version(&self, package: &str) -> Result<Option<String>> {
        // 包不存在时 npm ls 以非零状态退出，但仍输出合法 JSON
        let output = run_command(&self.npm, &["ls", "-g", package, "--depth=0", "--json"]).await?;
        parse_ls_version(&stdout_text(&output), package)
    }

    async fn tool_version(&self) -> Result<String> {
        self.npm_text(&["--version"]).await
    }

    async fn runtime_version(&self) -> Result<String> {
        let output = run_command(&self.node, &["--version"]).await?;
        if !output.status.success() {
            return Err(N8nError::package_manager(format!(
                "{} --version 失败: {}",
                self.node,
                failure_text(&output)
            )));
        }
        Ok(stdout_text(&output))
    }

    async fn uninstall(&self, package: &str) -> Result<()> {
        if self.installed_version(package).await?.is_none() {
            return Err(N8nError::PackageNotInstalled(package.to_string()));
        }
        self.npm_text(&["uninstall", "-g", package]).await?;
        Ok(())
    }

    async fn install(&self, package: &str, version: &str) -> Result<()> {
        let spec = format!("{package}@{version}");
        let output = run_command(&self.npm, &["install", "-g", &spec]).await?;
        if !output.status.success() {
            return Err(N8nError::install(format!(
                "npm install -g {} 失败: {}",
                spec,
                failure_text(&output)
            )));
        }
        Ok(())
    }

    fn locate_executable(&self, executable: &str) -> Option<PathBuf> {
        which::which(executable).ok()
    }
}
