use crate::{
    N8nError, Result,
    config::AppConfig,
    system::{HealthProbe, Host, PackageManager, ServiceManager},
};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 版本切换：停止服务、卸载、清理残留、安装指定版本
pub struct VersionSwitcher<'a, S, P, H> {
    config: &'a AppConfig,
    host: &'a Host<S, P, H>,
}

impl<'a, S, P, H> VersionSwitcher<'a, S, P, H>
where
    S: ServiceManager,
    P: PackageManager,
    H: HealthProbe,
{
    pub fn new(config: &'a AppConfig, host: &'a Host<S, P, H>) -> Self {
        Self { config, host }
    }

    pub async fn stop_service(&self) -> Result<()> {
        let unit = self.config.unit_name();
        info!("⏹️  停止服务 {}...", unit);
        self.host.service.stop(&unit).await
    }

    /// 卸载当前版本，未安装不算错误
    pub async fn uninstall_current(&self) -> Result<()> {
        let package = &self.config.package.name;
        info!("🗑️  卸载 {}...", package);
        match self.host.packages.uninstall(package).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                warn!("⚠️  {} 当前未安装，跳过卸载", package);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// 清理 npm 遗留的 `.<package>-XXXXXXXX` 临时目录，尽力而为
    pub async fn remove_residuals(&self) -> Vec<PathBuf> {
        let global_root = match self.host.packages.global_root().await {
            Ok(root) => root,
            Err(e) => {
                warn!("⚠️  无法确定全局包目录，跳过残留清理: {}", e);
                return Vec::new();
            }
        };

        match remove_stale_dirs(&global_root, &self.config.package.name) {
            Ok(removed) => {
                for dir in &removed {
                    info!("🧹 已清理残留目录: {}", dir.display());
                }
                removed
            }
            Err(e) => {
                warn!("⚠️  残留清理失败: {}", e);
                Vec::new()
            }
        }
    }

    /// 安装指定版本并确认可执行文件可用
    pub async fn install(&self, version: &str) -> Result<PathBuf> {
        let package = &self.config.package.name;
        info!("📥 安装 {}@{}...", package, version);
        self.host.packages.install(package, version).await?;
        self.verify_executable()
    }

    /// 确认可执行文件在搜索路径中
    pub fn verify_executable(&self) -> Result<PathBuf> {
        let executable = &self.config.package.executable;
        let path = self
            .host
            .packages
            .locate_executable(executable)
            .ok_or_else(|| N8nError::install(format!("在 PATH 中找不到 {executable}")))?;
        info!("✅ 可执行文件: {}", path.display());
        Ok(path)
    }
}

/// 删除匹配残留模式的目录，返回已删除的路径
pub fn remove_stale_dirs(global_root: &Path, package: &str) -> Result<Vec<PathBuf>> {
    if !global_root.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = Regex::new(&format!(r"^\.{}-[A-Za-z0-9]+$", regex::escape(package)))?;
    let mut removed = Vec::new();
    for entry in std::fs::read_dir(global_root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type()?.is_dir() && pattern.is_match(&name) {
            std::fs::remove_dir_all(entry.path())?;
            removed.push(entry.path());
        }
    }
    removed.sort();
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeProbe, TestEnv};

    #[test]
    fn test_remove_stale_dirs_only_matches_pattern() {
        let root = tempfile::tempdir().unwrap();
        for name in [".n8n-AbC123", ".n8n-x9", "n8n", ".n8n-", ".n8nx-abc", ".other-abc"] {
            std::fs::create_dir_all(root.path().join(name)).unwrap();
        }
        std::fs::write(root.path().join(".n8n-file1"), "not a dir").unwrap();

        let removed = remove_stale_dirs(root.path(), "n8n").unwrap();
        assert_eq!(
            removed,
            vec![root.path().join(".n8n-AbC123"), root.path().join(".n8n-x9")]
        );
        assert!(root.path().join("n8n").exists());
        assert!(root.path().join(".n8n-").exists());
        assert!(root.path().join(".n8nx-abc").exists());
        assert!(root.path().join(".n8n-file1").exists());
    }

    #[test]
    fn test_remove_stale_dirs_missing_root() {
        let root = tempfile::tempdir().unwrap();
        assert!(
            remove_stale_dirs(&root.path().join("absent"), "n8n")
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_uninstall_skips_absent_package() {
        let env = TestEnv::new();
        let host = env.host(FakeProbe::never());

        VersionSwitcher::new(&env.config, &host)
            .uninstall_current()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_uninstall_propagates_package_manager_failure() {
        let env = TestEnv::new();
        let mut host = env.host(FakeProbe::never());
        host.packages.seed("n8n", "1.30.1");
        host.packages.uninstall_fails = true;

        let result = VersionSwitcher::new(&env.config, &host)
            .uninstall_current()
            .await;

        assert!(matches!(result, Err(N8nError::PackageManager(_))));
        assert!(host.packages.package_dir("n8n").exists());
    }
}
