mod backup;
mod config;
mod status;
mod update;

// Status commands
pub use status::run_status;

// Update commands
pub use update::run_upgrade;

// Backup commands
pub use backup::{run_list, run_rollback};

// Config commands
pub use config::run_show_config;
