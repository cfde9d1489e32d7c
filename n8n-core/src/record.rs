use crate::constants::{defaults, layout, timestamp};
use crate::{N8nError, Result};
use chrono::{DateTime, TimeZone};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 一次时间点快照，对应备份根目录下的一个时间戳目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub timestamp: String,
    pub dir: PathBuf,
}

/// 备份时记录的版本信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub timestamp: String,
    pub service: String,
    pub runtime: String,
    pub package_manager: String,
    pub package: String,
    /// `None` 表示备份时软件包未安装
    pub package_version: Option<String>,
}

/// 由时间生成备份记录名
pub fn timestamp_for<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    now.format(timestamp::RECORD_FORMAT).to_string()
}

/// 名称是否符合备份记录格式
pub fn is_record_name(name: &str) -> bool {
    // 模式是常量，编译失败只可能是代码错误
    Regex::new(timestamp::RECORD_PATTERN)
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

impl BackupRecord {
    pub fn new(backup_root: &Path, timestamp: &str) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            dir: backup_root.join(timestamp),
        }
    }

    /// 记录的日期部分（`YYYYMMDD`）
    pub fn date_part(&self) -> &str {
        self.timestamp
            .get(..timestamp::DATE_LEN)
            .unwrap_or(&self.timestamp)
    }

    pub fn package_archive_path(&self) -> PathBuf {
        self.dir.join(layout::PACKAGE_ARCHIVE)
    }

    pub fn user_data_archive_path(&self) -> PathBuf {
        self.dir.join(layout::USER_DATA_ARCHIVE)
    }

    pub fn systemd_dir(&self) -> PathBuf {
        self.dir.join(layout::SYSTEMD_DIR)
    }

    pub fn version_info_path(&self) -> PathBuf {
        self.dir.join(layout::VERSION_INFO)
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(layout::UPGRADE_LOG)
    }

    /// 软件包归档（不存在返回 `None`）
    pub fn package_archive(&self) -> Option<PathBuf> {
        Some(self.package_archive_path()).filter(|p| p.is_file())
    }

    /// 用户数据归档（不存在返回 `None`）
    pub fn user_data_archive(&self) -> Option<PathBuf> {
        Some(self.user_data_archive_path()).filter(|p| p.is_file())
    }

    /// 已捕获的 systemd 文件
    pub fn service_unit_files(&self) -> Vec<PathBuf> {
        let dir = self.systemd_dir();
        if !dir.is_dir() {
            return Vec::new();
        }
        WalkDir::new(&dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .flatten()
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()
    }

    /// 版本信息原文
    pub fn version_info_text(&self) -> Option<String> {
        std::fs::read_to_string(self.version_info_path()).ok()
    }

    /// 版本信息中记录的软件包版本
    pub fn recorded_package_version(&self) -> Option<String> {
        self.version_info_text()
            .and_then(|text| lookup_field(&text, "package_version"))
            .filter(|v| v != defaults::NOT_INSTALLED)
    }

    /// 记录目录总大小（字节）
    pub fn total_size(&self) -> u64 {
        WalkDir::new(&self.dir)
            .into_iter()
            .flatten()
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|metadata| metadata.len())
            .sum()
    }
}

/// 列出备份根目录下的所有记录，按时间戳升序
///
/// 只认符合记录名格式的目录，根目录不存在时返回空列表。
pub fn list_records(backup_root: &Path) -> Result<Vec<BackupRecord>> {
    if !backup_root.exists() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for entry in std::fs::read_dir(backup_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if is_record_name(&name) {
            records.push(BackupRecord::new(backup_root, &name));
        }
    }

    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok(records)
}

/// 查找指定时间戳的记录，找不到时错误中附带可用记录
pub fn find_record(backup_root: &Path, timestamp: &str) -> Result<BackupRecord> {
    let records = list_records(backup_root)?;
    records
        .iter()
        .find(|record| record.timestamp == timestamp)
        .cloned()
        .ok_or_else(|| N8nError::RollbackTargetMissing {
            timestamp: timestamp.to_string(),
            available: records.into_iter().map(|r| r.timestamp).collect(),
        })
}

impl VersionInfo {
    pub fn render(&self) -> String {
        format!(
            "timestamp: {}\nservice: {}\nruntime: {}\npackage_manager: {}\npackage: {}\npackage_version: {}\n",
            self.timestamp,
            self.service,
            self.runtime,
            self.package_manager,
            self.package,
            self.package_version.as_deref().unwrap_or(defaults::NOT_INSTALLED),
        )
    }
}

/// 在 `key: value` 文本中查找字段
fn lookup_field(text: &str, key: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == key).then(|| v.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_timestamp_format() {
        let now = Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 1, 31)
                .unwrap()
                .and_hms_opt(9, 5, 7)
                .unwrap(),
        );
        let ts = timestamp_for(&now);
        assert_eq!(ts, "20240131-090507");
        assert!(is_record_name(&ts));
        assert!(!is_record_name("rollback-logs"));
        assert!(!is_record_name("20240131-0905"));
    }

    #[test]
    fn test_list_records_sorted_and_filtered() {
        let root = tempfile::tempdir().unwrap();
        for name in ["20240201-000000", "20240131-235959", "rollback-logs", "notes"] {
            std::fs::create_dir_all(root.path().join(name)).unwrap();
        }
        std::fs::write(root.path().join("20240301-000000"), "a file, not a record").unwrap();

        let records = list_records(root.path()).unwrap();
        let names: Vec<_> = records.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(names, vec!["20240131-235959", "20240201-000000"]);
        assert_eq!(records[0].date_part(), "20240131");
    }

    #[test]
    fn test_list_missing_root() {
        let root = tempfile::tempdir().unwrap();
        assert!(list_records(&root.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_find_record_missing_lists_available() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("20240131-101010")).unwrap();

        match find_record(root.path(), "20991231-000000") {
            Err(N8nError::RollbackTargetMissing { available, .. }) => {
                assert_eq!(available, vec!["20240131-101010".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_version_info_roundtrip_fields() {
        let root = tempfile::tempdir().unwrap();
        let record = BackupRecord::new(root.path(), "20240131-101010");
        std::fs::create_dir_all(&record.dir).unwrap();

        let info = VersionInfo {
            timestamp: record.timestamp.clone(),
            service: "n8n.service".into(),
            runtime: "v20.11.0".into(),
            package_manager: "10.2.4".into(),
            package: "n8n".into(),
            package_version: None,
        };
        std::fs::write(record.version_info_path(), info.render()).unwrap();
        assert!(record.version_info_text().unwrap().contains("package_version: not installed"));
        assert_eq!(record.recorded_package_version(), None);

        let info = VersionInfo {
            package_version: Some("1.30.1".into()),
            ..info
        };
        std::fs::write(record.version_info_path(), info.render()).unwrap();
        assert_eq!(record.recorded_package_version(), Some("1.30.1".into()));
    }

    #[test]
    fn test_foreign_version_info_is_tolerated() {
        let root = tempfile::tempdir().unwrap();
        let record = BackupRecord::new(root.path(), "20240131-101010");
        std::fs::create_dir_all(&record.dir).unwrap();
        std::fs::write(
            record.version_info_path(),
            "Node: v18.19.0\nnpm: 10.2.3\nn8n version before upgrade: 1.22.6\n",
        )
        .unwrap();

        assert_eq!(record.recorded_package_version(), None);
        assert!(record.version_info_text().unwrap().contains("1.22.6"));
    }
}
