pub mod config;
pub mod error;
pub mod types;

pub use config::{
    load_file_config, ArchiveConfig, Config, EmailConfig, FeedsConfig, FileConfig,
    ScheduleConfig, SinksConfig, SocialConfig, WatchlistConfig,
};
pub use error::ConfigError;
pub use types::*;
