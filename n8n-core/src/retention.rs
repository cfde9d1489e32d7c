use crate::{
    Result,
    constants::{retention, timestamp},
    prompt::Confirm,
    record::{BackupRecord, list_records},
};
use chrono::{Days, NaiveDate};
use std::path::Path;
use tracing::{info, warn};

/// 截止日期字符串（`YYYYMMDD`）
pub fn cutoff_date(today: NaiveDate, days: u64) -> String {
    today
        .checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
        .format(timestamp::DATE_FORMAT)
        .to_string()
}

/// 日期部分按字典序小于截止日期的记录
///
/// 记录名是定宽补零格式，字典序与日期先后一致。
pub fn records_older_than<'r>(
    records: &'r [BackupRecord],
    cutoff: &str,
) -> Vec<&'r BackupRecord> {
    records
        .iter()
        .filter(|record| record.date_part() < cutoff)
        .collect()
}

/// 删除早于截止日期的记录，返回删除数量
pub fn prune_older_than(backup_root: &Path, cutoff: &str) -> Result<usize> {
    let records = list_records(backup_root)?;
    let mut deleted = 0;
    for record in records_older_than(&records, cutoff) {
        std::fs::remove_dir_all(&record.dir)?;
        info!("🗑️  已删除备份: {}", record.timestamp);
        deleted += 1;
    }
    Ok(deleted)
}

/// 交互式清理：已有至少两个备份时才询问
///
/// 返回删除的记录数，选择跳过或不满足条件时为 0。
pub fn offer_cleanup<C: Confirm>(
    backup_root: &Path,
    today: NaiveDate,
    prompt: &mut C,
) -> Result<usize> {
    let records = list_records(backup_root)?;
    if records.len() < retention::MIN_RECORDS_TO_OFFER {
        return Ok(0);
    }

    info!("📦 已有 {} 个备份", records.len());
    let mut options: Vec<String> = retention::OPTIONS_DAYS
        .iter()
        .map(|days| format!("删除 {days} 天前的备份"))
        .collect();
    options.push("跳过".to_string());

    let choice = prompt.select("是否清理旧备份?", &options)?;
    let Some(days) = retention::OPTIONS_DAYS.get(choice) else {
        info!("跳过备份清理");
        return Ok(0);
    };

    let cutoff = cutoff_date(today, *days);
    let deleted = prune_older_than(backup_root, &cutoff)?;
    if deleted == 0 {
        info!("没有早于 {} 的备份", cutoff);
    } else {
        warn!("已删除 {} 个早于 {} 的备份", deleted, cutoff);
    }
    Ok(deleted)
}
