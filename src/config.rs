use std::fs;

use http::Uri;
use serde::{Deserialize, Serialize};

use crate::{
    consts::{
        cache_prefix_default, control_prefix_default, host_timeout_default, log_file_prefix_default,
        log_folder_default, log_level_default, notification_url_default, storage_path_default, sync_tag_default,
    },
    error::{Error, Result},
};

/// 缓存存储后端
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 进程内存储，重启后丢失
    Memory,
    /// 磁盘存储，重启后保留
    #[default]
    Disk,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SettingStorage {
    #[serde(default)]
    pub backend: StorageBackend,
    /// 磁盘存储根目录
    #[serde(default = "storage_path_default")]
    pub path: String,
}

impl Default for SettingStorage {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: storage_path_default(),
        }
    }
}

/// 安装阶段预取静态资源失败时的处理策略
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstallPolicy {
    /// 任意一个资源失败则整个安装失败，不写入任何条目
    #[default]
    Atomic,
    /// 记录失败的资源并跳过，其余资源照常写入
    Tolerant,
}

/// Worker 配置
///
/// 缓存名称由 `cache_prefix` 与 `version` 组成，例如 `game-data-v2`。
/// 修改 `version` 后重新加载配置会安装新版本并在激活时清理旧缓存。
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SettingWorker {
    /// 被代理的源站，例如 `http://127.0.0.1:3000`
    pub origin: String,
    #[serde(default = "cache_prefix_default")]
    pub cache_prefix: String,
    pub version: String,
    /// 安装时预取的静态资源列表，相对路径基于 origin 解析
    #[serde(default)]
    pub manifest: Vec<String>,
    #[serde(default)]
    pub install_policy: InstallPolicy,
    /// 单次网络请求超时（秒），未设置则不超时
    pub fetch_timeout: Option<u64>,
    /// 触发数据缓存重新验证的后台同步标签
    #[serde(default = "sync_tag_default")]
    pub sync_tag: String,
    /// 点击通知后打开的地址
    #[serde(default = "notification_url_default")]
    pub notification_url: String,
}

impl SettingWorker {
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct SettingHost {
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub ssl: bool,
    /// SSL certificate location
    pub certificate: Option<String>,
    /// ssl key location
    pub certificate_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "host_timeout_default")]
    pub timeout: u16,
    /// 控制接口（push/sync/status）的路径前缀
    #[serde(default = "control_prefix_default")]
    pub control_prefix: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default = "log_folder_default")]
    pub log_folder: String,
    /// 日志文件名前缀，文件按天分割为 `<prefix>.<date>.log`
    #[serde(default = "log_file_prefix_default")]
    pub log_file_prefix: String,
    #[serde(default)]
    pub storage: SettingStorage,
    pub worker: SettingWorker,
    pub host: Vec<SettingHost>,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self> {
        let file = fs::read_to_string(path)?;
        Self::from_toml(&file)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let worker = &self.worker;
        let origin: Uri = worker.origin.parse()?;
        match origin.scheme_str() {
            Some("http") | Some("https") => {}
            _ => {
                return Err(Error::InvalidConfig(format!(
                    "worker origin must be an absolute http(s) url: {}",
                    worker.origin
                )));
            }
        }
        if origin.authority().is_none() {
            return Err(Error::InvalidConfig(format!(
                "worker origin missing host: {}",
                worker.origin
            )));
        }
        if worker.version.trim().is_empty() {
            return Err(Error::InvalidConfig("worker version is empty".into()));
        }
        if worker.cache_prefix.trim().is_empty() {
            return Err(Error::InvalidConfig("worker cache_prefix is empty".into()));
        }
        if crate::storage::validate_cache_name(&worker.cache_name()).is_err() {
            return Err(Error::InvalidConfig(format!(
                "cache name {:?} may only contain ascii letters, digits, '-', '_' and '.'",
                worker.cache_name()
            )));
        }
        if let Some(url) = worker.manifest.iter().find(|url| url.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!(
                "manifest contains an empty url: {url:?}"
            )));
        }

        if self.host.is_empty() {
            return Err(Error::InvalidConfig("at least one host is required".into()));
        }
        for host in &self.host {
            if host.ssl && (host.certificate.is_none() || host.certificate_key.is_none()) {
                return Err(Error::InvalidConfig(format!(
                    "host {}:{} enables ssl without certificate or certificate_key",
                    host.ip, host.port
                )));
            }
            if !host.control_prefix.starts_with('/') || host.control_prefix.len() < 2 {
                return Err(Error::InvalidConfig(format!(
                    "control_prefix must start with '/' and not be the root: {}",
                    host.control_prefix
                )));
            }
        }
        Ok(())
    }
}
