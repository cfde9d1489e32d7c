//! 测试用的外部协作方替身

use crate::{
    N8nError, Result,
    config::AppConfig,
    prompt::Confirm,
    system::{HealthProbe, Host, PackageManager, ServiceManager},
};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// 按脚本回答的确认器，脚本耗尽后回答"否"/最后一项
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<bool>,
    selections: VecDeque<usize>,
    pub asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new(answers: Vec<bool>) -> Self {
        Self {
            answers: answers.into(),
            ..Default::default()
        }
    }

    pub fn with_selections(mut self, selections: Vec<usize>) -> Self {
        self.selections = selections.into();
        self
    }
}

impl Confirm for ScriptedPrompt {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        self.asked.push(prompt.to_string());
        Ok(self.answers.pop_front().unwrap_or(false))
    }

    fn select(&mut self, prompt: &str, options: &[String]) -> Result<usize> {
        self.asked.push(prompt.to_string());
        Ok(self
            .selections
            .pop_front()
            .unwrap_or(options.len().saturating_sub(1)))
    }
}

/// systemd 替身
#[derive(Debug)]
pub struct FakeService {
    pub fragment: PathBuf,
    pub becomes_active: bool,
    pub cat_fails: bool,
    /// `DropInPaths` 属性，空表示 systemd 未报告
    pub drop_in_paths: Vec<PathBuf>,
    state: Mutex<FakeServiceState>,
}

#[derive(Debug, Default)]
struct FakeServiceState {
    active: bool,
    calls: Vec<String>,
}

impl FakeService {
    pub fn new(fragment: PathBuf) -> Self {
        Self {
            fragment,
            becomes_active: true,
            cat_fails: false,
            drop_in_paths: Vec::new(),
            state: Mutex::new(FakeServiceState {
                active: true,
                calls: Vec::new(),
            }),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl ServiceManager for FakeService {
    async fn stop(&self, unit: &str) -> Result<()> {
        self.record(format!("stop {unit}"));
        self.state.lock().unwrap().active = false;
        Ok(())
    }

    async fn start(&self, unit: &str) -> Result<()> {
        self.record(format!("start {unit}"));
        self.state.lock().unwrap().active = self.becomes_active;
        Ok(())
    }

    async fn daemon_reload(&self) -> Result<()> {
        self.record("daemon-reload".to_string());
        Ok(())
    }

    async fn is_active(&self, _unit: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().active)
    }

    async fn show_property(&self, _unit: &str, property: &str) -> Result<Option<String>> {
        match property {
            "FragmentPath" => Ok(Some(self.fragment.to_string_lossy().to_string())),
            "DropInPaths" if !self.drop_in_paths.is_empty() => {
                let paths: Vec<String> = self
                    .drop_in_paths
                    .iter()
                    .map(|path| path.to_string_lossy().to_string())
                    .collect();
                Ok(Some(paths.join(" ")))
            }
            _ => Ok(None),
        }
    }

    async fn cat(&self, unit: &str) -> Result<String> {
        if self.cat_fails {
            return Err(N8nError::service_manager(format!("Unit {unit} could not be found.")));
        }
        let body = fs::read_to_string(&self.fragment)?;
        Ok(format!("# {}\n{}", self.fragment.display(), body))
    }
}

/// npm 替身：在临时根目录下维护真实的目录结构
#[derive(Debug)]
pub struct FakePackages {
    pub global_root: PathBuf,
    pub bin_dir: PathBuf,
    pub install_fails: bool,
    /// 卸载时包管理器本身出错（例如 npm 不可用）
    pub uninstall_fails: bool,
    /// 安装成功但不生成可执行文件
    pub install_without_executable: bool,
    installs: Mutex<Vec<String>>,
}

impl FakePackages {
    pub fn new(fs_root: &Path) -> Self {
        Self {
            global_root: fs_root.join("usr/lib/node_modules"),
            bin_dir: fs_root.join("usr/bin"),
            install_fails: false,
            uninstall_fails: false,
            install_without_executable: false,
            installs: Mutex::new(Vec::new()),
        }
    }

    pub fn package_dir(&self, package: &str) -> PathBuf {
        self.global_root.join(package)
    }

    pub fn installs(&self) -> Vec<String> {
        self.installs.lock().unwrap().clone()
    }

    /// 直接放置一个已安装的版本
    pub fn seed(&self, package: &str, version: &str) {
        let dir = self.package_dir(package);
        fs::create_dir_all(dir.join("bin")).unwrap();
        fs::write(
            dir.join("package.json"),
            format!(r#"{{"name":"{package}","version":"{version}"}}"#),
        )
        .unwrap();
        fs::write(dir.join("bin/n8n"), "#!/usr/bin/env node\n").unwrap();

        fs::create_dir_all(&self.bin_dir).unwrap();
        let link = self.bin_dir.join("n8n");
        let _ = fs::remove_file(&link);
        #[cfg(unix)]
        std::os::unix::fs::symlink(format!("../lib/node_modules/{package}/bin/n8n"), &link)
            .unwrap();
        #[cfg(not(unix))]
        fs::write(&link, "n8n").unwrap();
    }
}

impl PackageManager for FakePackages {
    async fn global_root(&self) -> Result<PathBuf> {
        Ok(self.global_root.clone())
    }

    async fn global_bin_dir(&self) -> Result<PathBuf> {
        Ok(self.bin_dir.clone())
    }

    async fn installed_version(&self, package: &str) -> Result<Option<String>> {
        let manifest = self.package_dir(package).join("package.json");
        if !manifest.exists() {
            return Ok(None);
        }
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(manifest)?)?;
        Ok(value["version"].as_str().map(str::to_string))
    }

    async fn tool_version(&self) -> Result<String> {
        Ok("10.2.4".to_string())
    }

    async fn runtime_version(&self) -> Result<String> {
        Ok("v20.11.0".to_string())
    }

    async fn uninstall(&self, package: &str) -> Result<()> {
        if self.uninstall_fails {
            return Err(N8nError::package_manager("无法执行 npm: No such file or directory"));
        }
        let dir = self.package_dir(package);
        if !dir.exists() {
            return Err(N8nError::PackageNotInstalled(package.to_string()));
        }
        fs::remove_dir_all(dir)?;
        let link = self.bin_dir.join("n8n");
        if fs::symlink_metadata(&link).is_ok() {
            fs::remove_file(link)?;
        }
        Ok(())
    }

    async fn install(&self, package: &str, version: &str) -> Result<()> {
        self.installs
            .lock()
            .unwrap()
            .push(format!("{package}@{version}"));
        if self.install_fails {
            return Err(N8nError::install(format!("npm ERR! 404 {package}@{version}")));
        }
        let resolved = if version == "latest" { "9.9.9" } else { version };
        self.seed(package, resolved);
        if self.install_without_executable {
            fs::remove_file(self.bin_dir.join("n8n"))?;
        }
        Ok(())
    }

    fn locate_executable(&self, executable: &str) -> Option<PathBuf> {
        let path = self.bin_dir.join(executable);
        // exists() 跟随符号链接，悬空链接视为找不到
        path.exists().then_some(path)
    }
}

/// HTTP 探测替身：第 N 次探测开始成功，`None` 表示永不成功
#[derive(Debug, Default)]
pub struct FakeProbe {
    pub respond_from: Option<u32>,
    count: Mutex<u32>,
}

impl FakeProbe {
    pub fn responding_from(attempt: u32) -> Self {
        Self {
            respond_from: Some(attempt),
            ..Default::default()
        }
    }

    pub fn never() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        *self.count.lock().unwrap()
    }
}

impl HealthProbe for FakeProbe {
    async fn probe(&self, _url: &str) -> bool {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        matches!(self.respond_from, Some(n) if *count >= n)
    }
}

pub type FakeHost = Host<FakeService, FakePackages, FakeProbe>;

/// 一套完整的临时环境：文件系统根、备份根、单元文件、用户数据
pub struct TestEnv {
    pub root: TempDir,
    pub config: AppConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let base = root.path();

        let mut config = AppConfig::default();
        config.paths.fs_root = base.to_path_buf();
        config.paths.backup_root = base.join("backups");
        config.paths.user_data_dir = Some(base.join("home/n8n/.n8n"));
        config.service.unit_dir = base.join("etc/systemd/system");
        config.health.settle_delay_secs = 0;
        config.health.probe_interval_ms = 0;

        fs::create_dir_all(&config.service.unit_dir).unwrap();
        fs::write(
            config.service.unit_dir.join("n8n.service"),
            "[Service]\nExecStart=/usr/bin/n8n start\n",
        )
        .unwrap();

        Self { root, config }
    }

    pub fn base(&self) -> &Path {
        self.root.path()
    }

    pub fn unit_file(&self) -> PathBuf {
        self.config.service.unit_dir.join("n8n.service")
    }

    pub fn drop_in_dir(&self) -> PathBuf {
        self.config.service.unit_dir.join("n8n.service.d")
    }

    pub fn user_data_dir(&self) -> PathBuf {
        self.config.paths.user_data_dir.clone().unwrap()
    }

    pub fn write_user_data(&self, content: &str) {
        let dir = self.user_data_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("database.sqlite"), content).unwrap();
    }

    pub fn write_drop_in(&self, content: &str) {
        fs::create_dir_all(self.drop_in_dir()).unwrap();
        fs::write(self.drop_in_dir().join("override.conf"), content).unwrap();
    }

    pub fn host(&self, probe: FakeProbe) -> FakeHost {
        Host {
            service: FakeService::new(self.unit_file()),
            packages: FakePackages::new(self.base()),
            probe,
        }
    }
}
