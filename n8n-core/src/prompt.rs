use crate::Result;
use std::io::{self, BufRead, Write};

/// 交互确认能力
pub trait Confirm {
    /// 是/否确认，空输入视为"否"
    fn confirm(&mut self, prompt: &str) -> Result<bool>;

    /// 从选项中选择一项，返回下标；空输入或无效输入视为最后一项
    fn select(&mut self, prompt: &str, options: &[String]) -> Result<usize>;
}

/// 解析是/否回答
pub fn parse_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// 解析菜单选择（从 1 开始编号）
pub fn parse_choice(input: &str, option_count: usize) -> usize {
    let fallback = option_count.saturating_sub(1);
    match input.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= option_count => n - 1,
        _ => fallback,
    }
}

/// 终端交互，从任意输入流读取回答
pub struct TerminalPrompt<R> {
    input: R,
}

impl TerminalPrompt<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> TerminalPrompt<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    fn read_answer(&mut self, prompt: &str) -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;

        let mut line = String::new();
        // EOF 时读到空串，按默认值处理
        self.input.read_line(&mut line)?;
        Ok(line)
    }
}

impl<R: BufRead> Confirm for TerminalPrompt<R> {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.read_answer(&format!("{prompt} (y/N): "))?;
        Ok(parse_yes(&answer))
    }

    fn select(&mut self, prompt: &str, options: &[String]) -> Result<usize> {
        println!("{prompt}");
        for (i, option) in options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }
        let answer = self.read_answer(&format!("请选择 [1-{}]: ", options.len()))?;
        Ok(parse_choice(&answer, options.len()))
    }
}
