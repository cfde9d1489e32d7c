// 模块声明
mod command;
mod http;
mod npm;
mod systemd;
mod types;

// 重新导出公共API
pub use http::HttpProbe;
pub use npm::NpmManager;
pub use systemd::SystemdManager;
pub use types::{HealthProbe, InstallationState, PackageManager, ServiceManager};

use crate::config::AppConfig;
use crate::constants::defaults;
use crate::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// 外部协作方集合：服务管理器、包管理器、HTTP 探测
#[derive(Debug, Clone)]
pub struct Host<S, P, H> {
    pub service: S,
    pub packages: P,
    pub probe: H,
}

/// 实际运行时使用的组合
pub type LiveHost = Host<SystemdManager, NpmManager, HttpProbe>;

impl LiveHost {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Host {
            service: SystemdManager::new(defaults::SERVICE_MANAGER),
            packages: NpmManager::new(&config.package.package_manager, &config.package.runtime),
            probe: HttpProbe::new(Duration::from_secs(config.health.request_timeout_secs))?,
        })
    }
}

impl<S: ServiceManager, P: PackageManager, H: HealthProbe> Host<S, P, H> {
    /// 实时查询安装状态
    pub async fn installation_state(&self, config: &AppConfig) -> Result<InstallationState> {
        let version = self.packages.installed_version(&config.package.name).await?;
        let service_active = self.service.is_active(&config.unit_name()).await?;
        let responding = self.probe.probe(&config.health_url()).await;

        Ok(InstallationState {
            version,
            service_active,
            port: config.health.port,
            responding,
        })
    }

    /// 服务运行用户的家目录
    pub async fn service_user_home(&self, config: &AppConfig) -> Option<PathBuf> {
        let user = match self.service.show_property(&config.unit_name(), "User").await {
            Ok(Some(user)) => user,
            Ok(None) => return None,
            Err(e) => {
                debug!("无法读取服务用户: {}", e);
                return None;
            }
        };
        lookup_home(&user)
    }

    /// 实际使用的用户数据目录
    pub async fn user_data_dir(&self, config: &AppConfig) -> PathBuf {
        let home = if config.paths.user_data_dir.is_some() {
            None
        } else {
            self.service_user_home(config).await
        };
        config.resolve_user_data_dir(home.as_deref())
    }
}

#[cfg(unix)]
fn lookup_home(user: &str) -> Option<PathBuf> {
    match nix::unistd::User::from_name(user) {
        Ok(Some(entry)) => Some(entry.dir),
        Ok(None) => None,
        Err(e) => {
            debug!("查询用户 {} 失败: {}", user, e);
            None
        }
    }
}

#[cfg(not(unix))]
fn lookup_home(_user: &str) -> Option<PathBuf> {
    None
}
