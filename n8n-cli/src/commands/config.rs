use crate::app::CliApp;
use n8n_core::error::Result;

/// 以 TOML 形式输出生效配置（文件 + 环境变量覆盖之后）
pub fn run_show_config(app: &CliApp) -> Result<()> {
    // 输出到 stdout，便于重定向保存为配置文件
    print!("{}", app.config.to_toml()?);
    Ok(())
}
