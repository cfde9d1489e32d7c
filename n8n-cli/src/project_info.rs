/// n8n-upgrade 项目信息模块
///
/// n8n-cli 是面向用户的主程序，项目元数据统一在这里定义；
/// n8n-core 作为内部库，只提供技术性常量

/// 项目元数据（自动从 n8n-cli 的 Cargo.toml 同步）
pub mod metadata {
    pub const PROJECT_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

    pub const PROJECT_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    pub const PROJECT_LICENSE: &str = env!("CARGO_PKG_LICENSE");

    /// 用户友好的显示名称（手动维护，用于 UI 显示）
    pub mod display {
        pub const FRIENDLY_NAME: &str = "n8n Upgrade";

        /// 项目详细描述（比 Cargo.toml 中的描述更详细）
        pub const DESCRIPTION_LONG: &str = "为 systemd 托管的 npm 全局 n8n 安装提供备份、升级与回滚：\
            升级前快照软件包、用户数据和单元配置，升级后验证服务状态与 HTTP 响应，\
            并可按时间戳回滚到任意一次备份";
    }
}

/// 版本信息
pub mod version_info {
    /// CLI 版本（自动从 Cargo.toml 同步）
    pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// 核心库版本（从 n8n-core 获取）
    pub const CORE_VERSION: &str = n8n_core::constants::version::version_info::CORE_VERSION;
}

/// 获取版本信息字符串
pub fn get_version_string() -> String {
    format!(
        "{} v{} (core v{})",
        metadata::display::FRIENDLY_NAME,
        version_info::CLI_VERSION,
        version_info::CORE_VERSION
    )
}

/// 获取作者和许可证信息
pub fn get_copyright_info() -> String {
    format!(
        "© {} - Licensed under {}",
        metadata::PROJECT_AUTHORS,
        metadata::PROJECT_LICENSE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_mentions_both_crates() {
        let version = get_version_string();
        assert!(version.contains(version_info::CLI_VERSION));
        assert!(version.contains("core"));
        assert!(get_copyright_info().contains(metadata::PROJECT_LICENSE));
    }
}
