use crate::Result;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// 执行外部命令并等待结束
///
/// 命令行和全部输出都会以 debug 级别记录，进入当前操作的日志文件。
pub(crate) async fn run_command(program: &str, args: &[&str]) -> Result<Output> {
    debug!("$ {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    log_output(program, &output);
    Ok(output)
}

fn log_output(program: &str, output: &Output) {
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!("[{program}] {line}");
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        debug!("[{program} stderr] {line}");
    }
    if !output.status.success() {
        debug!("[{program}] 退出状态: {}", output.status);
    }
}

/// 标准输出（去除首尾空白）
pub(crate) fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// 失败信息：优先使用 stderr，其次 stdout
pub(crate) fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    let stdout = stdout_text(output);
    if stdout.is_empty() {
        format!("退出状态 {}", output.status)
    } else {
        stdout
    }
}
