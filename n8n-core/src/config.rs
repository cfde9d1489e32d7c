use crate::constants::{defaults, health};
use crate::error::{N8nError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 应用配置结构
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub package: PackageConfig,
    pub paths: PathsConfig,
    pub health: HealthConfig,
}

/// systemd 服务配置
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    /// 单元名（不含 `.service` 后缀）
    pub name: String,
    /// 恢复单元文件时写入的目录
    pub unit_dir: PathBuf,
}

/// 全局软件包配置
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PackageConfig {
    pub name: String,
    pub executable: String,
    pub package_manager: String,
    pub runtime: String,
}

/// 路径配置
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub backup_root: PathBuf,
    /// 用户数据目录；未设置时根据服务用户推断
    pub user_data_dir: Option<PathBuf>,
    /// 归档条目的相对基准，恢复时解压到此处
    pub fs_root: PathBuf,
}

/// 健康检查配置
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HealthConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub settle_delay_secs: u64,
    pub attempts: u32,
    pub probe_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: defaults::SERVICE_NAME.to_string(),
            unit_dir: PathBuf::from(defaults::UNIT_DIR),
        }
    }
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: defaults::PACKAGE_NAME.to_string(),
            executable: defaults::EXECUTABLE.to_string(),
            package_manager: defaults::PACKAGE_MANAGER.to_string(),
            runtime: defaults::RUNTIME.to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            backup_root: PathBuf::from(defaults::BACKUP_ROOT),
            user_data_dir: None,
            fs_root: PathBuf::from(defaults::FS_ROOT),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            host: health::DEFAULT_HOST.to_string(),
            port: health::DEFAULT_PORT,
            path: health::DEFAULT_PATH.to_string(),
            settle_delay_secs: health::SETTLE_DELAY_SECS,
            attempts: health::ATTEMPTS,
            probe_interval_ms: health::PROBE_INTERVAL_MS,
            request_timeout_secs: health::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// 加载配置：显式路径优先，其次按顺序查找当前目录下的配置文件，都没有则使用默认值。
    /// 找不到配置文件时不会创建文件。
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                tracing::debug!("使用指定配置文件: {}", path.display());
                Self::load_from_file(path)?
            }
            None => Self::find_config()?,
        };

        config.apply_port_override(std::env::var(defaults::PORT_ENV).ok().as_deref())?;
        Ok(config)
    }

    fn find_config() -> Result<Self> {
        for config_file in &defaults::CONFIG_FILES {
            if Path::new(config_file).exists() {
                tracing::debug!("找到配置文件: {}", config_file);
                return Self::load_from_file(config_file);
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(Self::default())
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// 以 TOML 形式输出当前配置
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 应用端口环境变量覆盖
    pub fn apply_port_override(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(raw) = value {
            let port = raw.trim().parse::<u16>().map_err(|_| {
                N8nError::precondition(format!(
                    "环境变量 {} 的值无效: '{}'",
                    defaults::PORT_ENV,
                    raw
                ))
            })?;
            self.health.port = port;
        }
        Ok(())
    }

    /// 完整单元名，例如 `n8n.service`
    pub fn unit_name(&self) -> String {
        if self.service.name.ends_with(".service") {
            self.service.name.clone()
        } else {
            format!("{}.service", self.service.name)
        }
    }

    /// 健康检查地址
    pub fn health_url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.health.host, self.health.port, self.health.path
        )
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.health.settle_delay_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.health.probe_interval_ms)
    }

    /// 备份根目录
    pub fn backup_root(&self) -> &Path {
        &self.paths.backup_root
    }

    /// 决定用户数据目录：显式配置 > 服务用户的家目录 > 默认目录
    pub fn resolve_user_data_dir(&self, service_user_home: Option<&Path>) -> PathBuf {
        if let Some(dir) = &self.paths.user_data_dir {
            return dir.clone();
        }
        match service_user_home {
            Some(home) => home.join(defaults::USER_DATA_DIR_NAME),
            None => PathBuf::from(defaults::FALLBACK_USER_DATA_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.unit_name(), "n8n.service");
        assert_eq!(config.health.port, 5678);
        assert_eq!(config.health.attempts, 30);
        assert_eq!(config.health_url(), "http://127.0.0.1:5678/healthz");
        assert_eq!(config.backup_root(), Path::new("./n8n-backups"));
    }

    #[test]
    fn test_port_override() {
        let mut config = AppConfig::default();
        config.apply_port_override(Some("8080")).unwrap();
        assert_eq!(config.health.port, 8080);

        config.apply_port_override(None).unwrap();
        assert_eq!(config.health.port, 8080);

        let err = config.apply_port_override(Some("not-a-port")).unwrap_err();
        assert!(matches!(err, N8nError::Precondition(_)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n8n-upgrade.toml");
        std::fs::write(
            &path,
            r#"
[service]
name = "n8n-prod"

[health]
port = 15678
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.unit_name(), "n8n-prod.service");
        assert_eq!(config.health.port, 15678);
        assert_eq!(config.health.path, "/healthz");
        assert_eq!(config.package.package_manager, "npm");
    }

    #[test]
    fn test_user_data_dir_resolution() {
        let mut config = AppConfig::default();
        assert_eq!(
            config.resolve_user_data_dir(None),
            PathBuf::from("/root/.n8n")
        );
        assert_eq!(
            config.resolve_user_data_dir(Some(Path::new("/home/n8n"))),
            PathBuf::from("/home/n8n/.n8n")
        );

        config.paths.user_data_dir = Some(PathBuf::from("/srv/n8n-data"));
        assert_eq!(
            config.resolve_user_data_dir(Some(Path::new("/home/n8n"))),
            PathBuf::from("/srv/n8n-data")
        );
    }
}
