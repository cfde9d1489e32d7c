use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// 单次操作的日志文件句柄
///
/// 作为 `tracing_subscriber` 的写入目标使用：未绑定文件时丢弃输出，
/// 绑定后所有日志以追加方式写入该文件。升级时绑定到备份记录中的
/// `upgrade.log`，回滚时绑定到备份根目录下的回滚日志。
#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    inner: Arc<Mutex<Option<AttachedFile>>>,
}

#[derive(Debug)]
struct AttachedFile {
    path: PathBuf,
    file: File,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定日志文件（追加写入，不存在则创建）
    pub fn attach(&self, path: &Path) -> Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut guard = self.lock();
        *guard = Some(AttachedFile {
            path: path.to_path_buf(),
            file,
        });
        Ok(())
    }

    /// 解除绑定，返回之前的日志路径
    pub fn detach(&self) -> Option<PathBuf> {
        let mut guard = self.lock();
        guard.take().map(|attached| {
            let mut file = attached.file;
            let _ = file.flush();
            attached.path
        })
    }

    /// 当前绑定的日志路径
    pub fn current_path(&self) -> Option<PathBuf> {
        self.lock().as_ref().map(|attached| attached.path.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<AttachedFile>> {
        // 写日志的线程 panic 后锁会中毒，日志仍然可以继续写
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 单次写入使用的 writer
pub struct OperationLogWriter {
    inner: Arc<Mutex<Option<AttachedFile>>>,
}

impl Write for OperationLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_mut() {
            Some(attached) => attached.file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_mut() {
            Some(attached) => attached.file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for OperationLog {
    type Writer = OperationLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        OperationLogWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discards_until_attached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upgrade.log");
        let log = OperationLog::new();

        log.make_writer().write_all(b"dropped\n").unwrap();
        assert!(!path.exists());

        log.attach(&path).unwrap();
        log.make_writer().write_all(b"kept\n").unwrap();
        assert_eq!(log.current_path(), Some(path.clone()));

        assert_eq!(log.detach(), Some(path.clone()));
        log.make_writer().write_all(b"dropped again\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "kept\n");
    }

    #[test]
    fn test_attach_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upgrade.log");
        std::fs::write(&path, "first\n").unwrap();

        let log = OperationLog::new();
        log.attach(&path).unwrap();
        log.make_writer().write_all(b"second\n").unwrap();
        log.detach();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
