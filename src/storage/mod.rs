//! 按名称与版本区分的异步缓存存储

use std::{io, sync::Arc};

use async_trait::async_trait;

use crate::{
    config::{SettingStorage, StorageBackend},
    fetch::{CachedResponse, RequestKey},
};

pub mod disk;
pub mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("failed io {0}")]
    Io(#[from] io::Error),
    #[error("failed to handle json {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to decode body {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid cache name {0:?}")]
    InvalidName(String),
    #[error("corrupt cache entry {0}")]
    Corrupt(String),
}

/// 缓存集合，管理多个具名缓存
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// 打开指定名称的缓存，不存在则创建
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, StorageError>;

    /// 缓存是否存在，不会创建缓存
    async fn has(&self, name: &str) -> Result<bool, StorageError>;

    /// 列出所有缓存名称
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// 删除整个缓存，返回是否存在过
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;
}

/// 单个具名缓存：请求键到响应快照的映射
///
/// 同一个键的写入总是整体替换，并发写入时后写入者生效。
#[async_trait]
pub trait Cache: Send + Sync {
    async fn match_request(&self, key: &RequestKey)
    -> Result<Option<CachedResponse>, StorageError>;

    async fn put(&self, key: RequestKey, response: CachedResponse) -> Result<(), StorageError>;

    async fn add_all(
        &self,
        entries: Vec<(RequestKey, CachedResponse)>,
    ) -> Result<(), StorageError> {
        for (key, response) in entries {
            self.put(key, response).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, StorageError>;
}

/// 缓存名称会作为目录名使用，只允许常见的安全字符
pub fn validate_cache_name(name: &str) -> Result<(), StorageError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

/// 根据配置创建存储后端
pub fn from_settings(settings: &SettingStorage) -> Arc<dyn CacheStorage> {
    match settings.backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::Disk => Arc::new(DiskStorage::new(&settings.path)),
    }
}
