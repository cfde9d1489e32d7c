/// 备份记录目录布局（升级与回滚之间的持久格式，不得随意修改）
pub mod layout {
    /// 软件包安装树归档
    pub const PACKAGE_ARCHIVE: &str = "n8n-node-modules.tar.gz";

    /// 用户数据目录归档
    pub const USER_DATA_ARCHIVE: &str = "n8n-data.tar.gz";

    /// systemd 单元配置目录
    pub const SYSTEMD_DIR: &str = "systemd";

    /// 版本信息文件
    pub const VERSION_INFO: &str = "version-info.txt";

    /// 升级日志
    pub const UPGRADE_LOG: &str = "upgrade.log";

    /// `systemctl cat` 输出文件后缀
    pub const MERGED_UNIT_SUFFIX: &str = ".merged";

    /// drop-in 目录后缀
    pub const DROP_IN_SUFFIX: &str = ".d";

    /// 回滚日志目录（位于备份根目录下，不属于任何备份记录）
    pub const ROLLBACK_LOG_DIR: &str = "rollback-logs";
}

/// 时间戳格式
pub mod timestamp {
    /// 备份记录名格式（定宽，补零，可按字典序排序）
    pub const RECORD_FORMAT: &str = "%Y%m%d-%H%M%S";

    /// 日期部分格式
    pub const DATE_FORMAT: &str = "%Y%m%d";

    /// 日期部分长度
    pub const DATE_LEN: usize = 8;

    /// 备份记录名的正则
    pub const RECORD_PATTERN: &str = r"^\d{8}-\d{6}$";
}

/// 默认配置
pub mod defaults {
    pub const SERVICE_NAME: &str = "n8n";
    pub const UNIT_DIR: &str = "/etc/systemd/system";
    pub const PACKAGE_NAME: &str = "n8n";
    pub const EXECUTABLE: &str = "n8n";
    pub const PACKAGE_MANAGER: &str = "npm";
    pub const RUNTIME: &str = "node";
    pub const SERVICE_MANAGER: &str = "systemctl";
    pub const BACKUP_ROOT: &str = "./n8n-backups";
    pub const FS_ROOT: &str = "/";

    /// n8n 用户数据目录名（位于服务用户的家目录下）
    pub const USER_DATA_DIR_NAME: &str = ".n8n";

    /// 无法确定服务用户时的数据目录
    pub const FALLBACK_USER_DATA_DIR: &str = "/root/.n8n";

    /// 未指定版本时安装的版本标记
    pub const LATEST: &str = "latest";

    /// 查询不到软件包时写入版本信息的标记
    pub const NOT_INSTALLED: &str = "not installed";

    /// 配置文件查找顺序
    pub const CONFIG_FILES: [&str; 2] = ["n8n-upgrade.toml", ".n8n-upgrade.toml"];

    /// 覆盖健康检查端口的环境变量
    pub const PORT_ENV: &str = "N8N_PORT";
}

/// 健康检查相关常量
pub mod health {
    pub const DEFAULT_HOST: &str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 5678;
    pub const DEFAULT_PATH: &str = "/healthz";

    /// 启动后等待服务稳定的时间（秒）
    pub const SETTLE_DELAY_SECS: u64 = 5;

    /// HTTP 探测次数
    pub const ATTEMPTS: u32 = 30;

    /// 探测间隔（毫秒）
    pub const PROBE_INTERVAL_MS: u64 = 1000;

    /// 单次请求超时（秒）
    pub const REQUEST_TIMEOUT_SECS: u64 = 3;
}

/// 保留策略可选项（天）
pub mod retention {
    pub const OPTIONS_DAYS: [u64; 2] = [7, 30];

    /// 至少已有这么多备份时才询问清理
    pub const MIN_RECORDS_TO_OFFER: usize = 2;
}

/// 技术版本信息常量
pub mod version {
    pub mod version_info {
        /// 核心库版本（自动同步）
        pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
    }
}
