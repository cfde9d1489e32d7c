use crate::{
    Result,
    backup::{BackupGap, BackupManager, BackupReport},
    config::AppConfig,
    constants::defaults,
    health::{HealthState, HealthVerifier},
    logging::OperationLog,
    progress::{OperationStep, ProgressCallback, send_progress},
    prompt::Confirm,
    record::{BackupRecord, timestamp_for},
    retention,
    switcher::VersionSwitcher,
    system::{HealthProbe, Host, PackageManager, ServiceManager},
};
use chrono::Local;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// 升级管理器
pub struct UpgradeManager<'a, S, P, H> {
    config: &'a AppConfig,
    host: &'a Host<S, P, H>,
    oplog: &'a OperationLog,
    progress: Option<&'a ProgressCallback>,
}

#[derive(Debug)]
pub struct UpgradeReport {
    pub record: BackupRecord,
    pub gaps: Vec<BackupGap>,
    /// 升级前版本，`None` 表示之前未安装
    pub from_version: Option<String>,
    pub to_version: Option<String>,
    pub executable: PathBuf,
    pub health: HealthState,
    pub pruned: usize,
}

impl<'a, S, P, H> UpgradeManager<'a, S, P, H>
where
    S: ServiceManager,
    P: PackageManager,
    H: HealthProbe,
{
    pub fn new(config: &'a AppConfig, host: &'a Host<S, P, H>, oplog: &'a OperationLog) -> Self {
        Self {
            config,
            host,
            oplog,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// 升级到指定版本（`None` 为最新版）
    pub async fn upgrade<C: Confirm>(
        &self,
        version: Option<&str>,
        prompt: &mut C,
    ) -> Result<UpgradeReport> {
        let timestamp = timestamp_for(&Local::now());
        self.upgrade_with_timestamp(version, &timestamp, prompt).await
    }

    /// 使用给定记录名执行升级
    pub async fn upgrade_with_timestamp<C: Confirm>(
        &self,
        version: Option<&str>,
        timestamp: &str,
        prompt: &mut C,
    ) -> Result<UpgradeReport> {
        let target = version.unwrap_or(defaults::LATEST);
        info!("🚀 开始升级 {} -> {}", self.config.package.name, target);

        send_progress(self.progress, OperationStep::CleaningBackups, "检查旧备份");
        let pruned =
            retention::offer_cleanup(self.config.backup_root(), Local::now().date_naive(), prompt)?;

        send_progress(self.progress, OperationStep::CreatingBackup, "创建备份");
        let (result, record) = match BackupManager::new(self.config, self.host, self.oplog)
            .create_backup(timestamp)
            .await
        {
            Ok(backup) => {
                let record = backup.record.clone();
                (self.switch_version(target, backup, pruned).await, Some(record))
            }
            Err(e) => (Err(e), None),
        };

        match &result {
            Ok(report) => {
                send_progress(self.progress, OperationStep::Completed, "升级完成");
                info!(
                    "🎉 升级完成: {} -> {}",
                    report.from_version.as_deref().unwrap_or(defaults::NOT_INSTALLED),
                    report.to_version.as_deref().unwrap_or(target)
                );
                info!("💡 如需回滚: rollback {}", report.record.timestamp);
            }
            Err(e) => {
                error!("❌ 升级失败: {}", e);
                match record.as_ref() {
                    None => info!("💡 备份阶段已中止，未执行任何破坏性操作"),
                    Some(record) => match recovery_hint(record) {
                        Some(hint) => warn!("💡 {}", hint),
                        None => warn!(
                            "⚠️  备份 {} 不含软件包归档，无法通过 rollback 恢复",
                            record.timestamp
                        ),
                    },
                }
                send_progress(self.progress, OperationStep::Failed(e.to_string()), "升级失败");
            }
        }
        self.oplog.detach();
        result
    }

    /// 备份完成之后的破坏性阶段：停止、卸载、安装、启动、健康检查
    async fn switch_version(
        &self,
        target: &str,
        backup: BackupReport,
        pruned: usize,
    ) -> Result<UpgradeReport> {
        let switcher = VersionSwitcher::new(self.config, self.host);
        send_progress(self.progress, OperationStep::StoppingService, "停止服务");
        switcher.stop_service().await?;
        send_progress(self.progress, OperationStep::RemovingPackage, "卸载当前版本");
        switcher.uninstall_current().await?;
        switcher.remove_residuals().await;
        send_progress(
            self.progress,
            OperationStep::InstallingPackage,
            &format!("安装 {}@{}", self.config.package.name, target),
        );
        let executable = switcher.install(target).await?;

        let to_version = self
            .host
            .packages
            .installed_version(&self.config.package.name)
            .await
            .unwrap_or_else(|e| {
                warn!("⚠️  查询新版本失败: {}", e);
                None
            });

        let unit = self.config.unit_name();
        send_progress(self.progress, OperationStep::StartingService, "启动服务");
        info!("▶️  启动服务 {}...", unit);
        self.host.service.start(&unit).await?;
        let health = HealthVerifier::new(self.config, self.host, self.progress)
            .verify()
            .await?;

        Ok(UpgradeReport {
            record: backup.record,
            gaps: backup.gaps,
            from_version: backup.package_version,
            to_version,
            executable,
            health,
            pruned,
        })
    }
}

/// 升级失败后的恢复提示，只有记录里有软件包归档时才能回滚
pub fn recovery_hint(record: &BackupRecord) -> Option<String> {
    record
        .package_archive()
        .map(|_| format!("可使用 rollback {} 恢复到升级前的状态", record.timestamp))
}
