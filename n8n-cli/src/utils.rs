use indicatif::{ProgressBar, ProgressStyle};
use n8n_core::logging::OperationLog;
use n8n_core::progress::{OperationStep, ProgressCallback};
use n8n_core::{error::Result, prompt::Confirm};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// # n8n-upgrade 日志系统
///
/// 1. **库代码只使用 `tracing` 宏**，入口在 `main.rs` 中调用 `setup_logging()`
/// 2. **终端输出**：紧凑格式，受 `RUST_LOG` 控制，默认 `info`，`-v` 时为 `debug`；
///    进度指示器显示期间先暂停指示器再输出，见 [`Console`]
/// 3. **操作日志**：升级写入备份记录中的 `upgrade.log`，回滚写入
///    `rollback-logs/`，始终记录 `debug` 级别的完整过程（含外部命令输出）
///
/// ```bash
/// # 详细日志输出到终端
/// n8n-upgrade -v upgrade 1.40.0
///
/// # 只看核心库的调试日志
/// RUST_LOG=n8n_core=debug n8n-upgrade status
/// ```
pub fn setup_logging(verbose: bool, console: Console, oplog: OperationLog) {
    use tracing_subscriber::filter::Targets;
    use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = fmt::layer()
        .with_writer(console)
        .with_target(false) // 不显示模块路径
        .without_time()
        .compact()
        .with_filter(env_filter);

    // 操作日志需要完整的时间线，第三方库只保留 info 以上
    let file_filter = Targets::new()
        .with_target("n8n_core", Level::DEBUG)
        .with_target("n8n_cli", Level::DEBUG)
        .with_default(Level::INFO);
    let file = fmt::layer()
        .with_writer(oplog)
        .with_ansi(false)
        .with_target(true)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();
}

/// 终端输出协调：进度指示器与日志、交互提示共用终端
///
/// 指示器显示期间，输出前先清除指示器，输出后再重绘，避免重绘覆盖日志行或提示。
#[derive(Clone, Default)]
pub struct Console {
    spinner: Arc<Mutex<Option<ProgressBar>>>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.spinner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn show(&self, spinner: ProgressBar) {
        *self.slot() = Some(spinner);
    }

    /// 清除并移除当前的进度指示器
    pub fn finish(&self) {
        let active = self.slot().take();
        if let Some(spinner) = active {
            spinner.finish_and_clear();
        }
    }

    pub fn is_active(&self) -> bool {
        self.slot().is_some()
    }

    /// 暂停进度指示器执行 `f`
    ///
    /// 执行期间指示器从槽位中取出，`f` 内部再输出日志时直接写终端。
    pub fn suspend<T>(&self, f: impl FnOnce() -> T) -> T {
        let active = self.slot().take();
        match active {
            Some(spinner) => {
                let result = spinner.suspend(f);
                if !spinner.is_finished() {
                    self.show(spinner);
                }
                result
            }
            None => f(),
        }
    }
}

/// 终端日志写入器
pub struct ConsoleWriter {
    console: Console,
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.console.suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for Console {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            console: self.clone(),
        }
    }
}

/// 交互前暂停进度指示器的确认器
pub struct SuspendingPrompt<C> {
    inner: C,
    console: Console,
}

impl<C: Confirm> SuspendingPrompt<C> {
    pub fn new(inner: C, console: Console) -> Self {
        Self { inner, console }
    }
}

impl<C: Confirm> Confirm for SuspendingPrompt<C> {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let inner = &mut self.inner;
        self.console.suspend(|| inner.confirm(prompt))
    }

    fn select(&mut self, prompt: &str, options: &[String]) -> Result<usize> {
        let inner = &mut self.inner;
        self.console.suspend(|| inner.select(prompt, options))
    }
}

/// 终端进度指示器，返回的回调交给升级/回滚管理器
///
/// 指示器登记到 `console`，操作结束（完成或失败）时自动移除。
pub fn progress_spinner(console: &Console) -> (ProgressBar, ProgressCallback) {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg}") {
        spinner.set_style(style);
    }
    console.show(spinner.clone());

    let handle = spinner.clone();
    let owner = console.clone();
    let callback: ProgressCallback = Box::new(move |step, message| match step {
        OperationStep::Completed | OperationStep::Failed(_) => owner.finish(),
        _ => {
            handle.set_message(message.to_string());
            handle.tick();
        }
    });
    (spinner, callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use n8n_core::prompt::TerminalPrompt;
    use std::io::Cursor;

    #[test]
    fn test_spinner_follows_progress() {
        let console = Console::new();
        let (spinner, callback) = progress_spinner(&console);
        assert!(console.is_active());

        callback(OperationStep::StoppingService, "停止服务");
        assert_eq!(spinner.message(), "停止服务");

        callback(OperationStep::ProbingHttp { attempt: 3, max: 30 }, "探测 (3/30)");
        assert_eq!(spinner.message(), "探测 (3/30)");

        callback(OperationStep::Completed, "完成");
        assert!(spinner.is_finished());
        assert!(!console.is_active());
    }

    #[test]
    fn test_prompt_hides_spinner_while_waiting_for_answer() {
        let console = Console::new();
        let (spinner, _callback) = progress_spinner(&console);
        let input = Cursor::new(b"y\n2\n".to_vec());
        let mut prompt = SuspendingPrompt::new(TerminalPrompt::new(input), console.clone());

        assert!(prompt.confirm("继续?").unwrap());
        let options = vec!["保留".to_string(), "删除".to_string()];
        assert_eq!(prompt.select("旧备份:", &options).unwrap(), 1);

        // 回答之后指示器继续显示
        assert!(console.is_active());
        assert!(!spinner.is_finished());
    }

    #[test]
    fn test_log_lines_written_while_spinner_active() {
        let console = Console::new();
        let (_spinner, _callback) = progress_spinner(&console);

        let mut writer = console.make_writer();
        writer.write_all("📦 开始创建备份\n".as_bytes()).unwrap();
        writer.flush().unwrap();
        assert!(console.is_active());

        console.finish();
        assert!(!console.is_active());
        // 没有指示器时直接输出
        console.make_writer().write_all(b"done\n").unwrap();
    }
}
