use n8n_core::{config::AppConfig, error::Result, logging::OperationLog, system::LiveHost};
use std::path::Path;

use crate::cli::Commands;
use crate::commands;
use crate::utils::Console;

pub struct CliApp {
    pub config: AppConfig,
    pub host: LiveHost,
    /// 与终端日志共享，进度指示器登记在这里
    pub console: Console,
    /// 与日志系统共享的操作日志句柄
    pub oplog: OperationLog,
}

impl CliApp {
    /// 加载配置并初始化外部协作方（不产生任何副作用）
    pub fn new(config_path: Option<&Path>, console: Console, oplog: OperationLog) -> Result<Self> {
        let config = AppConfig::load(config_path)?;
        let host = LiveHost::from_config(&config)?;
        Ok(Self {
            config,
            host,
            console,
            oplog,
        })
    }

    /// 运行应用命令
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Upgrade { version } => commands::run_upgrade(self, version).await,
            Commands::Rollback { timestamp } => commands::run_rollback(self, &timestamp).await,
            Commands::List => commands::run_list(self),
            Commands::Status => commands::run_status(self).await,
            Commands::ShowConfig => commands::run_show_config(self),
        }
    }
}
