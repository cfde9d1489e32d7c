use thiserror::Error;

pub type Result<T> = std::result::Result<T, N8nError>;

#[derive(Error, Debug)]
pub enum N8nError {
    #[error("前置条件不满足: {0}")]
    Precondition(String),

    #[error("备份不完整，已中止: {0}")]
    BackupIntegrity(String),

    #[error("软件包未安装: {0}")]
    PackageNotInstalled(String),

    #[error("包管理器命令失败: {0}")]
    PackageManager(String),

    #[error("安装失败: {0}")]
    Install(String),

    #[error("服务管理器命令失败: {0}")]
    ServiceManager(String),

    #[error("服务启动失败: {0}")]
    ServiceStart(String),

    #[error("备份记录不存在: {timestamp} (可用备份: {})", format_available(.available))]
    RollbackTargetMissing {
        timestamp: String,
        available: Vec<String>,
    },

    #[error("备份记录 {timestamp} 缺少 {artifact}，无法回滚")]
    RollbackArtifactMissing { timestamp: String, artifact: String },

    #[error("配置错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("配置序列化错误: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("HTTP 请求错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("任务执行错误: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("目录遍历错误: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("路径错误: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    #[error("正则表达式错误: {0}")]
    Regex(#[from] regex::Error),

    #[error("自定义错误: {0}")]
    Custom(String),
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "无".to_string()
    } else {
        available.join(", ")
    }
}

impl N8nError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn backup_integrity(msg: impl Into<String>) -> Self {
        Self::BackupIntegrity(msg.into())
    }

    pub fn package_manager(msg: impl Into<String>) -> Self {
        Self::PackageManager(msg.into())
    }

    pub fn install(msg: impl Into<String>) -> Self {
        Self::Install(msg.into())
    }

    pub fn service_manager(msg: impl Into<String>) -> Self {
        Self::ServiceManager(msg.into())
    }

    pub fn service_start(msg: impl Into<String>) -> Self {
        Self::ServiceStart(msg.into())
    }

    /// 软件包本来就不存在（卸载时可忽略）
    ///
    /// 只认 `PackageNotInstalled`：`Io(NotFound)` 可能是 npm 本身找不到，必须上报。
    pub fn is_not_found(&self) -> bool {
        matches!(self, N8nError::PackageNotInstalled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(N8nError::PackageNotInstalled("n8n".into()).is_not_found());
        assert!(!N8nError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)).is_not_found());
        assert!(!N8nError::package_manager("npm exited with 1").is_not_found());
        assert!(
            !N8nError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
                .is_not_found()
        );
    }

    #[test]
    fn test_missing_target_lists_available() {
        let err = N8nError::RollbackTargetMissing {
            timestamp: "20240101-000000".into(),
            available: vec!["20240131-101010".into(), "20240201-090000".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("20240131-101010"));
        assert!(msg.contains("20240201-090000"));
    }
}
