use crate::{N8nError, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};

/// 归档条目名：相对文件系统根的路径（去掉开头的 `/`）
///
/// 与 `tar -czf x.tar.gz /abs/path` 生成的条目一致，解压到根目录即可还原绝对路径。
pub fn entry_name(fs_root: &Path, path: &Path) -> Result<PathBuf> {
    let relative = path.strip_prefix(fs_root)?;
    if relative.as_os_str().is_empty() {
        return Err(N8nError::custom(format!(
            "不能归档文件系统根本身: {}",
            path.display()
        )));
    }
    Ok(relative.to_path_buf())
}

/// 创建 gzip 压缩的 tar 归档
///
/// `sources` 中的目录递归加入，文件和符号链接按原样加入（符号链接不跟随）。
pub async fn create_archive(fs_root: &Path, sources: &[PathBuf], dest: &Path) -> Result<u64> {
    let fs_root = fs_root.to_path_buf();
    let sources = sources.to_vec();
    let dest = dest.to_path_buf();

    // 在后台线程中执行压缩操作，避免阻塞异步运行时
    tokio::task::spawn_blocking(move || {
        let file = File::create(&dest)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut archive = Builder::new(encoder);
        archive.follow_symlinks(false);

        for source in &sources {
            let name = entry_name(&fs_root, source)?;
            let metadata = std::fs::symlink_metadata(source)?;
            if metadata.is_dir() {
                archive.append_dir_all(&name, source)?;
            } else {
                archive.append_path_with_name(source, &name)?;
            }
        }

        let encoder = archive.into_inner()?;
        encoder.finish()?;

        Ok::<u64, N8nError>(std::fs::metadata(&dest)?.len())
    })
    .await?
}

/// 将归档解压到文件系统根，覆盖已有文件
pub async fn extract_archive(archive_path: &Path, fs_root: &Path) -> Result<()> {
    let archive_path = archive_path.to_path_buf();
    let fs_root = fs_root.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let file = File::open(&archive_path)?;
        let mut archive = Archive::new(GzDecoder::new(file));
        archive.set_overwrite(true);
        archive.set_preserve_permissions(true);
        archive.set_preserve_mtime(true);
        archive.set_preserve_ownerships(running_as_root());

        archive.unpack(&fs_root).map_err(|e| {
            N8nError::custom(format!(
                "解压 {} 到 {} 失败: {}",
                archive_path.display(),
                fs_root.display(),
                e
            ))
        })?;

        Ok::<(), N8nError>(())
    })
    .await?
}

/// 当前进程是否以 root 身份运行
#[cfg(unix)]
pub(crate) fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub(crate) fn running_as_root() -> bool {
    false
}
