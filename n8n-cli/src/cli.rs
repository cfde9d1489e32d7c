use crate::project_info::{metadata, version_info};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// n8n Upgrade CLI - n8n 全局安装的备份、升级与回滚工具
#[derive(Parser, Debug)]
#[command(name = "n8n-upgrade")]
#[command(about = metadata::PROJECT_DESCRIPTION)]
#[command(version = version_info::CLI_VERSION)]
#[command(long_about = metadata::display::DESCRIPTION_LONG)]
#[command(author = metadata::PROJECT_AUTHORS)]
pub struct Cli {
    /// 配置文件路径（默认依次查找 n8n-upgrade.toml、.n8n-upgrade.toml）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// 备份当前安装并升级到指定版本
    Upgrade {
        /// 目标版本，原样传给 npm；不指定则安装 latest
        version: Option<String>,
    },
    /// 回滚到指定备份
    Rollback {
        /// 备份时间戳，例如 20240131-101010
        timestamp: String,
    },
    /// 列出所有备份
    List,
    /// 显示当前安装状态
    Status,
    /// 显示生效的配置
    ShowConfig,
}
