// 私有模块声明
mod app;
mod cli;
mod commands;
pub mod project_info; // 公开项目信息模块
mod utils;

// 通过 pub use 精确控制对外暴露的接口
pub use app::CliApp;
pub use cli::{Cli, Commands};
pub use utils::{Console, SuspendingPrompt, progress_spinner, setup_logging};
