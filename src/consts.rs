use std::env;

use const_format::concatcp;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMPILER: &str = env!("SW_COMPILER");
pub const COMMIT: &str = env!("SW_COMMIT");
pub const OS: &str = env::consts::OS;
pub const ARCH: &str = env::consts::ARCH;

/// `Server` 响应头
pub const SERVER_HEADER: &str = concatcp!(NAME, "/", VERSION);

// config defaults
pub const LOG_LEVEL_DEFAULT: &str = "info";
pub fn log_level_default() -> String {
    LOG_LEVEL_DEFAULT.to_string()
}

pub const LOG_FOLDER_DEFAULT: &str = "./logs";
pub fn log_folder_default() -> String {
    LOG_FOLDER_DEFAULT.to_string()
}

pub const LOG_FILE_PREFIX_DEFAULT: &str = "swcache";
pub fn log_file_prefix_default() -> String {
    LOG_FILE_PREFIX_DEFAULT.to_string()
}

pub const HOST_TIMEOUT_DEFAULT: u16 = 75;
pub fn host_timeout_default() -> u16 {
    HOST_TIMEOUT_DEFAULT
}

pub const CACHE_PREFIX_DEFAULT: &str = "swcache";
pub fn cache_prefix_default() -> String {
    CACHE_PREFIX_DEFAULT.to_string()
}

pub const CONTROL_PREFIX_DEFAULT: &str = "/__sw";
pub fn control_prefix_default() -> String {
    CONTROL_PREFIX_DEFAULT.to_string()
}

pub const SYNC_TAG_DEFAULT: &str = "sync-data";
pub fn sync_tag_default() -> String {
    SYNC_TAG_DEFAULT.to_string()
}

pub const NOTIFICATION_URL_DEFAULT: &str = "/";
pub fn notification_url_default() -> String {
    NOTIFICATION_URL_DEFAULT.to_string()
}

/// 推送消息未携带 icon 时使用的图标
pub const DEFAULT_ICON: &str = "/images/icon-192.png";

/// 最多保留的已展示通知数量
pub const MAX_NOTIFICATIONS: usize = 64;

pub const STORAGE_PATH_DEFAULT: &str = "./cache";
pub fn storage_path_default() -> String {
    STORAGE_PATH_DEFAULT.to_string()
}
