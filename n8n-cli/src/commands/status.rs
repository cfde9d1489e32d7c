use crate::app::CliApp;
use crate::project_info::{get_copyright_info, get_version_string};
use n8n_core::{constants::defaults, error::Result, record::list_records};
use tracing::{info, warn};

/// 显示当前安装状态
pub async fn run_status(app: &CliApp) -> Result<()> {
    info!("📊 {}", get_version_string());
    info!("   {}", get_copyright_info());
    info!("==================");

    let config = &app.config;
    let state = app.host.installation_state(config).await?;

    info!("📋 安装状态:");
    info!(
        "   {}: {}",
        config.package.name,
        state.version.as_deref().unwrap_or(defaults::NOT_INSTALLED)
    );
    if state.service_active {
        info!("   ✅ {}: active", config.unit_name());
    } else {
        warn!("   ❌ {}: 未运行", config.unit_name());
    }
    if state.responding {
        info!("   ✅ HTTP {}: 正常响应", config.health_url());
    } else {
        warn!("   ❌ HTTP {}: 无响应 (端口 {})", config.health_url(), state.port);
    }

    let data_dir = app.host.user_data_dir(config).await;
    info!("   用户数据目录: {}", data_dir.display());

    let records = list_records(config.backup_root())?;
    info!("📦 备份: {} 个 ({})", records.len(), config.backup_root().display());
    if let Some(latest) = records.last() {
        info!("   最近一次: {}", latest.timestamp);
    }
    Ok(())
}
