use crate::app::CliApp;
use crate::utils::{SuspendingPrompt, progress_spinner};
use n8n_core::{
    constants::defaults, error::Result, preflight, prompt::TerminalPrompt,
    upgrade::UpgradeManager,
};
use tracing::{info, warn};

/// 备份并升级到指定版本
pub async fn run_upgrade(app: &CliApp, version: Option<String>) -> Result<()> {
    info!("🚀 n8n 升级");
    info!("===========");

    preflight::run(&app.config)?;

    let (_, progress) = progress_spinner(&app.console);
    let mut prompt = SuspendingPrompt::new(TerminalPrompt::stdin(), app.console.clone());
    let result = UpgradeManager::new(&app.config, &app.host, &app.oplog)
        .with_progress(&progress)
        .upgrade(version.as_deref(), &mut prompt)
        .await;
    app.console.finish();
    let report = result?;

    info!("📋 升级摘要:");
    info!("   备份记录: {}", report.record.dir.display());
    info!(
        "   版本: {} -> {}",
        report.from_version.as_deref().unwrap_or(defaults::NOT_INSTALLED),
        report.to_version.as_deref().unwrap_or("unknown")
    );
    info!("   可执行文件: {}", report.executable.display());
    if report.pruned > 0 {
        info!("   已清理旧备份: {} 个", report.pruned);
    }
    if !report.gaps.is_empty() {
        warn!("⚠️  备份不完整 ({} 项):", report.gaps.len());
        for gap in &report.gaps {
            warn!("   - {}", gap);
        }
    }
    if report.health.is_warning() {
        warn!("⚠️  服务已启动但未通过 HTTP 检查，请手动确认");
    }
    info!("📝 升级日志: {}", report.record.log_path().display());

    Ok(())
}
