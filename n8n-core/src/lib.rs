pub mod archive;
pub mod backup;
pub mod config;
pub mod constants;
pub mod error;
pub mod fs_utils;
pub mod health;
pub mod logging;
pub mod preflight;
pub mod progress;
pub mod prompt;
pub mod record;
pub mod retention;
pub mod rollback;
pub mod switcher;
pub mod system;
pub mod upgrade;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{N8nError, Result};
