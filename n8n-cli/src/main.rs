use clap::Parser;
use n8n_cli::{Cli, CliApp, Console, setup_logging};
use n8n_core::logging::OperationLog;
use tracing::error;

#[tokio::main]
async fn main() {
    // 解析命令行参数（--help / --version 在这里直接退出）
    let cli = Cli::parse();

    // 操作日志在命令执行过程中绑定到具体文件
    let oplog = OperationLog::new();
    let console = Console::new();
    setup_logging(cli.verbose, console.clone(), oplog.clone());

    let app = match CliApp::new(cli.config.as_deref(), console, oplog) {
        Ok(app) => app,
        Err(e) => {
            error!("❌ 应用初始化失败: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run_command(cli.command).await {
        error!("❌ 操作失败: {}", e);
        std::process::exit(1);
    }
}
