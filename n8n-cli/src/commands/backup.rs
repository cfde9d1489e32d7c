use crate::app::CliApp;
use crate::utils::{SuspendingPrompt, progress_spinner};
use n8n_core::{
    backup::format_size,
    constants::defaults,
    error::Result,
    preflight,
    prompt::TerminalPrompt,
    record::list_records,
    rollback::{RollbackManager, RollbackOutcome},
};
use tracing::{info, warn};

/// 取消回滚按正常结束处理，明确告知操作员退出码
const DECLINED_NOTICE: &str = "💡 已取消回滚，退出码为 0（不按失败处理）";

/// 列出所有备份
pub fn run_list(app: &CliApp) -> Result<()> {
    let root = app.config.backup_root();
    let records = list_records(root)?;

    info!("📦 备份列表: {}", root.display());
    if records.is_empty() {
        info!("   暂无备份");
        return Ok(());
    }

    info!(
        "   {:<17} {:<16} {:<6} {:<6} {:>8}",
        "时间戳", "版本", "软件包", "数据", "大小"
    );
    for record in &records {
        let version = record
            .recorded_package_version()
            .unwrap_or_else(|| defaults::NOT_INSTALLED.to_string());
        info!(
            "   {:<17} {:<16} {:<6} {:<6} {:>8}",
            record.timestamp,
            version,
            mark(record.package_archive().is_some()),
            mark(record.user_data_archive().is_some()),
            format_size(record.total_size())
        );
    }
    info!("共 {} 个备份", records.len());
    info!("💡 回滚: n8n-upgrade rollback <时间戳>");
    Ok(())
}

fn mark(present: bool) -> &'static str {
    if present { "✅" } else { "❌" }
}

/// 从备份回滚
pub async fn run_rollback(app: &CliApp, timestamp: &str) -> Result<()> {
    info!("🔄 n8n 回滚");
    info!("===========");

    preflight::run(&app.config)?;

    let (_, progress) = progress_spinner(&app.console);
    let mut prompt = SuspendingPrompt::new(TerminalPrompt::stdin(), app.console.clone());
    let result = RollbackManager::new(&app.config, &app.host, &app.oplog)
        .with_progress(&progress)
        .rollback(timestamp, &mut prompt)
        .await;
    app.console.finish();

    match result? {
        RollbackOutcome::Declined => {
            info!("未做任何改动");
            info!("{}", DECLINED_NOTICE);
        }
        RollbackOutcome::Completed(report) => {
            info!("📋 回滚摘要:");
            info!("   备份记录: {}", report.record.timestamp);
            info!(
                "   当前版本: {}",
                report
                    .restored_version
                    .as_deref()
                    .unwrap_or(defaults::NOT_INSTALLED)
            );
            info!("   用户数据: {}", restored(report.user_data_restored));
            info!("   systemd 配置: {}", restored(report.service_config_restored));
            if report.health.is_warning() {
                warn!("⚠️  服务已启动但未通过 HTTP 检查，请手动确认");
            }
            info!("📝 回滚日志: {}", report.log_path.display());
        }
    }
    Ok(())
}

fn restored(done: bool) -> &'static str {
    if done { "已还原" } else { "保持不变" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declined_notice_states_exit_code() {
        assert!(DECLINED_NOTICE.contains("退出码为 0"));
        assert_eq!(mark(true), "✅");
        assert_eq!(restored(false), "保持不变");
    }
}
