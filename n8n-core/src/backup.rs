use crate::{
    N8nError, Result,
    archive::create_archive,
    config::AppConfig,
    constants::{defaults, layout},
    fs_utils::path_exists,
    logging::OperationLog,
    record::{BackupRecord, VersionInfo},
    system::{HealthProbe, Host, PackageManager, ServiceManager},
};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 备份管理器
pub struct BackupManager<'a, S, P, H> {
    config: &'a AppConfig,
    host: &'a Host<S, P, H>,
    oplog: &'a OperationLog,
}

/// 非致命的备份缺口（记录下来，升级继续）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupGap {
    /// 备份时软件包未安装
    PackageNotInstalled,
    PackageArchiveFailed(String),
    /// 用户数据目录不存在
    UserDataMissing(PathBuf),
    UserDataArchiveFailed(String),
    VersionInfoFailed(String),
}

impl fmt::Display for BackupGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupGap::PackageNotInstalled => write!(f, "软件包未安装，跳过软件包归档"),
            BackupGap::PackageArchiveFailed(e) => write!(f, "软件包归档失败: {e}"),
            BackupGap::UserDataMissing(dir) => {
                write!(f, "用户数据目录不存在: {}", dir.display())
            }
            BackupGap::UserDataArchiveFailed(e) => write!(f, "用户数据归档失败: {e}"),
            BackupGap::VersionInfoFailed(e) => write!(f, "版本信息写入失败: {e}"),
        }
    }
}

/// 备份结果
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub record: BackupRecord,
    pub gaps: Vec<BackupGap>,
    /// 备份时安装的软件包版本
    pub package_version: Option<String>,
}

impl<'a, S, P, H> BackupManager<'a, S, P, H>
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
        }
    }

    /// 创建备份记录
    ///
    /// 记录目录创建后立即绑定 `upgrade.log`，之后的日志都写入该文件，
    /// 直到调用方解除绑定。systemd 配置捕获失败是致命错误，本次创建的目录会被删除；
    /// 其余步骤失败只记录缺口。
    pub async fn create_backup(&self, timestamp: &str) -> Result<BackupReport> {
        let record = self.create_record_dir(timestamp)?;
        match self.fill_record(&record).await {
            Ok(report) => Ok(report),
            Err(e) => {
                // 不完整的记录不能出现在列表里，也不能计入保留策略
                self.oplog.detach();
                match std::fs::remove_dir_all(&record.dir) {
                    Ok(()) => warn!("🗑️  已删除不完整的备份目录: {}", record.dir.display()),
                    Err(cleanup) => warn!(
                        "⚠️  删除不完整的备份目录 {} 失败: {}",
                        record.dir.display(),
                        cleanup
                    ),
                }
                Err(e)
            }
        }
    }

    async fn fill_record(&self, record: &BackupRecord) -> Result<BackupReport> {
        self.oplog.attach(&record.log_path())?;

        info!("📦 开始创建备份: {}", record.dir.display());

        self.capture_service_config(record).await?;

        let mut gaps = Vec::new();
        if let Some(gap) = self.archive_package(record).await {
            warn!("⚠️  {}", gap);
            gaps.push(gap);
        }
        if let Some(gap) = self.archive_user_data(record).await {
            warn!("⚠️  {}", gap);
            gaps.push(gap);
        }

        let package_version = self.current_package_version().await;
        if let Err(e) = self.write_version_info(record, package_version.clone()).await {
            let gap = BackupGap::VersionInfoFailed(e.to_string());
            warn!("⚠️  {}", gap);
            gaps.push(gap);
        }

        info!("✅ 备份完成: {} ({} 个缺口)", record.timestamp, gaps.len());
        Ok(BackupReport {
            record: record.clone(),
            gaps,
            package_version,
        })
    }

    fn create_record_dir(&self, timestamp: &str) -> Result<BackupRecord> {
        let root = self.config.backup_root();
        std::fs::create_dir_all(root)?;

        let record = BackupRecord::new(root, timestamp);
        // 非递归创建：同名目录已存在说明时间戳冲突，不能合并写入
        std::fs::create_dir(&record.dir).map_err(|e| {
            N8nError::backup_integrity(format!(
                "无法创建备份目录 {}: {}",
                record.dir.display(),
                e
            ))
        })?;
        Ok(record)
    }

    /// 捕获 systemd 单元配置：生效配置、单元文件、drop-in 目录
    async fn capture_service_config(&self, record: &BackupRecord) -> Result<()> {
        let unit = self.config.unit_name();
        let systemd_dir = record.systemd_dir();
        std::fs::create_dir_all(&systemd_dir)?;

        let merged = self.host.service.cat(&unit).await.map_err(|e| {
            N8nError::backup_integrity(format!("无法获取 {unit} 的生效配置: {e}"))
        })?;
        let merged_path = systemd_dir.join(format!("{unit}{}", layout::MERGED_UNIT_SUFFIX));
        std::fs::write(&merged_path, merged)
            .map_err(|e| N8nError::backup_integrity(format!("写入生效配置失败: {e}")))?;
        info!("   ✅ 生效配置: {}", merged_path.display());

        let fragment = self
            .host
            .service
            .show_property(&unit, "FragmentPath")
            .await
            .map_err(|e| {
                N8nError::backup_integrity(format!("无法读取 {unit} 的单元文件路径: {e}"))
            })?
            .map(PathBuf::from)
            .ok_or_else(|| N8nError::backup_integrity(format!("{unit} 没有单元文件")))?;

        let unit_copy = systemd_dir.join(&unit);
        std::fs::copy(&fragment, &unit_copy).map_err(|e| {
            N8nError::backup_integrity(format!("复制单元文件 {} 失败: {}", fragment.display(), e))
        })?;
        info!("   ✅ 单元文件: {}", fragment.display());

        let drop_ins = self.drop_in_files(&unit, &fragment).await?;
        if !drop_ins.is_empty() {
            let target = systemd_dir.join(format!("{unit}{}", layout::DROP_IN_SUFFIX));
            std::fs::create_dir_all(&target)?;
            for file in &drop_ins {
                let Some(name) = file.file_name() else {
                    continue;
                };
                std::fs::copy(file, target.join(name)).map_err(|e| {
                    N8nError::backup_integrity(format!(
                        "复制 drop-in 文件 {} 失败: {}",
                        file.display(),
                        e
                    ))
                })?;
                info!("   ✅ drop-in: {}", file.display());
            }
        }

        Ok(())
    }

    /// 生效的 drop-in 文件，与 `systemctl cat` 列出的一致
    ///
    /// `DropInPaths` 为空时回退到扫描单元目录和单元文件所在目录下的 `<unit>.d`。
    async fn drop_in_files(&self, unit: &str, fragment: &Path) -> Result<Vec<PathBuf>> {
        let listed = self
            .host
            .service
            .show_property(unit, "DropInPaths")
            .await
            .map_err(|e| {
                N8nError::backup_integrity(format!("无法读取 {unit} 的 drop-in 列表: {e}"))
            })?;
        if let Some(paths) = listed {
            return Ok(paths.split_whitespace().map(PathBuf::from).collect());
        }

        let Some(dir) = self.find_drop_in_dir(fragment) else {
            return Ok(Vec::new());
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn find_drop_in_dir(&self, fragment: &Path) -> Option<PathBuf> {
        let name = format!("{}{}", self.config.unit_name(), layout::DROP_IN_SUFFIX);
        let mut candidates = vec![self.config.service.unit_dir.join(&name)];
        if let Some(parent) = fragment.parent() {
            candidates.push(parent.join(&name));
        }
        candidates.into_iter().find(|dir| dir.is_dir())
    }

    async fn archive_package(&self, record: &BackupRecord) -> Option<BackupGap> {
        let packages = &self.host.packages;
        let global_root = match packages.global_root().await {
            Ok(root) => root,
            Err(e) => return Some(BackupGap::PackageArchiveFailed(e.to_string())),
        };

        let package_dir = global_root.join(&self.config.package.name);
        if !package_dir.is_dir() {
            return Some(BackupGap::PackageNotInstalled);
        }

        let mut sources = vec![package_dir];
        // 全局可执行文件链接一并归档，解压后即可在 PATH 中找到
        match packages.global_bin_dir().await {
            Ok(bin_dir) => {
                let link = bin_dir.join(&self.config.package.executable);
                if path_exists(&link) {
                    sources.push(link);
                }
            }
            Err(e) => warn!("⚠️  无法确定全局 bin 目录，跳过可执行文件链接: {}", e),
        }

        let dest = record.package_archive_path();
        match create_archive(&self.config.paths.fs_root, &sources, &dest).await {
            Ok(size) => {
                info!("   ✅ 软件包归档: {} ({})", dest.display(), format_size(size));
                None
            }
            Err(e) => {
                let _ = std::fs::remove_file(&dest);
                Some(BackupGap::PackageArchiveFailed(e.to_string()))
            }
        }
    }

    async fn archive_user_data(&self, record: &BackupRecord) -> Option<BackupGap> {
        let data_dir = self.host.user_data_dir(self.config).await;
        if !data_dir.is_dir() {
            return Some(BackupGap::UserDataMissing(data_dir));
        }

        let dest = record.user_data_archive_path();
        match create_archive(&self.config.paths.fs_root, &[data_dir.clone()], &dest).await {
            Ok(size) => {
                info!(
                    "   ✅ 用户数据归档: {} -> {} ({})",
                    data_dir.display(),
                    dest.display(),
                    format_size(size)
                );
                None
            }
            Err(e) => {
                let _ = std::fs::remove_file(&dest);
                Some(BackupGap::UserDataArchiveFailed(e.to_string()))
            }
        }
    }

    async fn current_package_version(&self) -> Option<String> {
        match self
            .host
            .packages
            .installed_version(&self.config.package.name)
            .await
        {
            Ok(version) => version,
            Err(e) => {
                warn!("⚠️  查询已安装版本失败: {}", e);
                None
            }
        }
    }

    async fn write_version_info(
        &self,
        record: &BackupRecord,
        package_version: Option<String>,
    ) -> Result<()> {
        let packages = &self.host.packages;
        let runtime = packages
            .runtime_version()
            .await
            .unwrap_or_else(|e| format!("unknown ({e})"));
        let package_manager = packages
            .tool_version()
            .await
            .unwrap_or_else(|e| format!("unknown ({e})"));

        let info = VersionInfo {
            timestamp: record.timestamp.clone(),
            service: self.config.unit_name(),
            runtime,
            package_manager,
            package: self.config.package.name.clone(),
            package_version,
        };
        std::fs::write(record.version_info_path(), info.render())?;
        info!(
            "   ✅ 版本信息: {} {}",
            info.package,
            info.package_version.as_deref().unwrap_or(defaults::NOT_INSTALLED)
        );
        Ok(())
    }
}

/// 人类可读的文件大小
pub fn format_size(size: u64) -> String {
    if size > 1024 * 1024 * 1024 {
        format!("{:.1}GB", size as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if size > 1024 * 1024 {
        format!("{:.1}MB", size as f64 / (1024.0 * 1024.0))
    } else if size > 1024 {
        format!("{:.1}KB", size as f64 / 1024.0)
    } else {
        format!("{size}B")
    }
}
