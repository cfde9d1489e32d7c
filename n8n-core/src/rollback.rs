use crate::{
    N8nError, Result,
    archive::extract_archive,
    config::AppConfig,
    constants::layout,
    fs_utils::copy_dir_all,
    health::{HealthState, HealthVerifier},
    logging::OperationLog,
    progress::{OperationStep, ProgressCallback, send_progress},
    prompt::Confirm,
    record::{BackupRecord, find_record, timestamp_for},
    switcher::VersionSwitcher,
    system::{HealthProbe, Host, PackageManager, ServiceManager},
};
use chrono::Local;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// 回滚管理器
pub struct RollbackManager<'a, S, P, H> {
    config: &'a AppConfig,
    host: &'a Host<S, P, H>,
    oplog: &'a OperationLog,
    progress: Option<&'a ProgressCallback>,
}

/// 回滚结果
#[derive(Debug)]
pub enum RollbackOutcome {
    /// 操作员在第一道确认时拒绝，未做任何改动
    Declined,
    Completed(RollbackReport),
}

#[derive(Debug)]
pub struct RollbackReport {
    pub record: BackupRecord,
    pub restored_version: Option<String>,
    pub user_data_restored: bool,
    pub service_config_restored: bool,
    pub health: HealthState,
    pub log_path: PathBuf,
}

impl<'a, S, P, H> RollbackManager<'a, S, P, H>
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

    /// 回滚到指定备份记录
    ///
    /// 记录目录只读；本次操作的日志写入 `<backup_root>/rollback-logs/`。
    pub async fn rollback<C: Confirm>(
        &self,
        timestamp: &str,
        prompt: &mut C,
    ) -> Result<RollbackOutcome> {
        let record = find_record(self.config.backup_root(), timestamp)?;
        let package_archive = record
            .package_archive()
            .ok_or_else(|| N8nError::RollbackArtifactMissing {
                timestamp: record.timestamp.clone(),
                artifact: layout::PACKAGE_ARCHIVE.to_string(),
            })?;

        info!("📋 备份记录: {}", record.dir.display());
        match record.version_info_text() {
            Some(text) => {
                for line in text.lines() {
                    info!("   {}", line);
                }
            }
            None => warn!("⚠️  备份记录中没有 {}", layout::VERSION_INFO),
        }

        if !prompt.confirm(&format!(
            "确认回滚到 {}? 当前安装的 {} 将被卸载",
            record.timestamp, self.config.package.name
        ))? {
            info!("已取消回滚");
            return Ok(RollbackOutcome::Declined);
        }

        let log_path = self.attach_log(&record)?;
        let result = self.restore(&record, &package_archive, prompt).await;
        match &result {
            Ok(_) => send_progress(self.progress, OperationStep::Completed, "回滚完成"),
            Err(e) => {
                error!("❌ 回滚失败: {}", e);
                send_progress(self.progress, OperationStep::Failed(e.to_string()), "回滚失败");
            }
        }
        self.oplog.detach();

        let (restored_version, user_data_restored, service_config_restored, health) = result?;
        info!("📝 回滚日志: {}", log_path.display());
        Ok(RollbackOutcome::Completed(RollbackReport {
            record,
            restored_version,
            user_data_restored,
            service_config_restored,
            health,
            log_path,
        }))
    }

    fn attach_log(&self, record: &BackupRecord) -> Result<PathBuf> {
        let dir = self.config.backup_root().join(layout::ROLLBACK_LOG_DIR);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!(
            "{}-from-{}.log",
            timestamp_for(&Local::now()),
            record.timestamp
        ));
        self.oplog.attach(&path)?;
        info!("🔄 开始回滚到 {}", record.timestamp);
        Ok(path)
    }

    async fn restore<C: Confirm>(
        &self,
        record: &BackupRecord,
        package_archive: &std::path::Path,
        prompt: &mut C,
    ) -> Result<(Option<String>, bool, bool, HealthState)> {
        let switcher = VersionSwitcher::new(self.config, self.host);
        let fs_root = &self.config.paths.fs_root;

        send_progress(self.progress, OperationStep::StoppingService, "停止服务");
        switcher.stop_service().await?;
        send_progress(self.progress, OperationStep::RemovingPackage, "卸载当前版本");
        switcher.uninstall_current().await?;
        switcher.remove_residuals().await;

        send_progress(self.progress, OperationStep::RestoringPackage, "还原软件包");
        extract_archive(package_archive, fs_root).await?;
        info!("✅ 已还原软件包: {}", package_archive.display());

        let user_data_restored = self.restore_user_data(record, prompt).await?;
        let service_config_restored = self.restore_service_config(record, prompt).await?;

        switcher.verify_executable()?;
        let restored_version = self
            .host
            .packages
            .installed_version(&self.config.package.name)
            .await
            .unwrap_or_else(|e| {
                warn!("⚠️  查询还原后的版本失败: {}", e);
                None
            });

        let unit = self.config.unit_name();
        send_progress(self.progress, OperationStep::StartingService, "启动服务");
        info!("▶️  启动服务 {}...", unit);
        self.host.service.start(&unit).await?;
        let health = HealthVerifier::new(self.config, self.host, self.progress)
            .verify()
            .await?;

        Ok((restored_version, user_data_restored, service_config_restored, health))
    }

    async fn restore_user_data<C: Confirm>(
        &self,
        record: &BackupRecord,
        prompt: &mut C,
    ) -> Result<bool> {
        let Some(archive) = record.user_data_archive() else {
            info!("备份中没有用户数据归档，跳过");
            return Ok(false);
        };
        if !prompt.confirm("是否同时还原用户数据? 当前数据会被备份中的内容覆盖")? {
            info!("保留当前用户数据");
            return Ok(false);
        }

        send_progress(self.progress, OperationStep::RestoringUserData, "还原用户数据");
        extract_archive(&archive, &self.config.paths.fs_root).await?;
        info!("✅ 已还原用户数据");
        Ok(true)
    }

    async fn restore_service_config<C: Confirm>(
        &self,
        record: &BackupRecord,
        prompt: &mut C,
    ) -> Result<bool> {
        let unit = self.config.unit_name();
        let systemd_dir = record.systemd_dir();
        let unit_copy = systemd_dir.join(&unit);
        if !unit_copy.is_file() {
            info!("备份中没有 {} 的单元文件，跳过", unit);
            return Ok(false);
        }
        if !prompt.confirm(&format!("是否还原 {unit} 的 systemd 配置?"))? {
            info!("保留当前 systemd 配置");
            return Ok(false);
        }

        send_progress(
            self.progress,
            OperationStep::RestoringServiceConfig,
            "还原 systemd 配置",
        );
        let unit_dir = &self.config.service.unit_dir;
        std::fs::create_dir_all(unit_dir)?;
        std::fs::copy(&unit_copy, unit_dir.join(&unit))?;
        info!("✅ 已还原单元文件: {}", unit_dir.join(&unit).display());

        let drop_in_name = format!("{unit}{}", layout::DROP_IN_SUFFIX);
        let drop_in_copy = systemd_dir.join(&drop_in_name);
        if drop_in_copy.is_dir() {
            let target = unit_dir.join(&drop_in_name);
            // 备份之后新增的覆盖片段不应继续生效
            if target.is_dir() {
                std::fs::remove_dir_all(&target)?;
            }
            copy_dir_all(&drop_in_copy, &target)?;
            info!("✅ 已还原 drop-in 目录: {}", target.display());
        }

        self.host.service.daemon_reload().await?;
        Ok(true)
    }
}
