use crate::Result;
use std::path::PathBuf;

/// 服务管理器（systemd）
#[allow(async_fn_in_trait)]
pub trait ServiceManager {
    /// 停止服务，等待服务管理器受理停止请求
    async fn stop(&self, unit: &str) -> Result<()>;

    async fn start(&self, unit: &str) -> Result<()>;

    async fn daemon_reload(&self) -> Result<()>;

    async fn is_active(&self, unit: &str) -> Result<bool>;

    /// 读取单元属性，空值返回 `None`
    async fn show_property(&self, unit: &str, property: &str) -> Result<Option<String>>;

    /// 合并后的生效配置（单元文件 + drop-in）
    async fn cat(&self, unit: &str) -> Result<String>;
}

/// 全局软件包管理器（npm）
#[allow(async_fn_in_trait)]
pub trait PackageManager {
    /// 全局包安装目录，例如 `/usr/lib/node_modules`
    async fn global_root(&self) -> Result<PathBuf>;

    /// 全局可执行文件目录，例如 `/usr/bin`
    async fn global_bin_dir(&self) -> Result<PathBuf>;

    /// 当前安装的版本，未安装返回 `None`
    async fn installed_version(&self, package: &str) -> Result<Option<String>>;

    async fn tool_version(&self) -> Result<String>;

    async fn runtime_version(&self) -> Result<String>;

    /// 卸载全局包；未安装时返回 `N8nError::PackageNotInstalled`
    async fn uninstall(&self, package: &str) -> Result<()>;

    /// 安装 `package@version`
    async fn install(&self, package: &str, version: &str) -> Result<()>;

    /// 在搜索路径中查找可执行文件
    fn locate_executable(&self, executable: &str) -> Option<PathBuf>;
}

/// HTTP 健康探测
#[allow(async_fn_in_trait)]
pub trait HealthProbe {
    /// 单次探测，返回是否成功响应
    async fn probe(&self, url: &str) -> bool;
}

/// 当前安装状态（实时查询，不落盘）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationState {
    pub version: Option<String>,
    pub service_active: bool,
    pub port: u16,
    pub responding: bool,
}
