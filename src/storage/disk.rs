use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use super::{Cache, CacheStorage, StorageError, validate_cache_name};
use crate::fetch::{CachedResponse, RequestKey, ResponseKind};

/// 临时文件序号，保证同一进程内并发写入不会共用临时文件
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// 磁盘缓存存储
///
/// 目录结构：
/// ```text
/// <root>/
///   game-data-v2/
///     <md5(request key)>.json
/// ```
/// 每个条目是一个 JSON 文件，响应体以 base64 编码保存。
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn cache_dir(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_cache_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, StorageError> {
        let dir = self.cache_dir(name)?;
        fs::create_dir_all(&dir).await?;
        Ok(Arc::new(DiskCache {
            name: name.to_string(),
            dir,
        }))
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        let dir = self.cache_dir(name)?;
        match fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(err.into()),
        };
        let mut names = vec![];
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_cache_name(&name).is_ok() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let dir = self.cache_dir(name)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

pub struct DiskCache {
    name: String,
    dir: PathBuf,
}

/// 磁盘上的条目格式
///
/// 响应头的值可能不是合法的 UTF-8，与响应体一样以 base64 保存。
#[derive(Serialize, Deserialize)]
struct DiskRecord {
    key: RequestKey,
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
    kind: ResponseKind,
    stored_at: DateTime<Utc>,
}

impl DiskRecord {
    fn new(key: RequestKey, response: CachedResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), STANDARD.encode(value.as_bytes()))
            })
            .collect();
        Self {
            key,
            url: response.url,
            status: response.status.as_u16(),
            headers,
            body: STANDARD.encode(&response.body),
            kind: response.kind,
            stored_at: Utc::now(),
        }
    }

    fn into_response(self) -> Result<CachedResponse, StorageError> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|_| StorageError::Corrupt(format!("invalid status {}", self.status)))?;
        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| StorageError::Corrupt(format!("invalid header name {name}")))?;
            let value = HeaderValue::from_bytes(&STANDARD.decode(&value)?).map_err(|_| {
                StorageError::Corrupt(format!("invalid header value for {name}"))
            })?;
            headers.append(name, value);
        }
        Ok(CachedResponse {
            url: self.url,
            status,
            headers,
            body: STANDARD.decode(self.body)?.into(),
            kind: self.kind,
        })
    }
}

impl DiskCache {
    fn entry_path(&self, key: &RequestKey) -> PathBuf {
        let digest = md5::compute(key.to_string().as_bytes());
        self.dir.join(format!("{digest:x}.json"))
    }

    async fn read_record(path: &Path) -> Result<Option<DiskRecord>, StorageError> {
        match fs::read(path).await {
            Ok(content) => Ok(Some(serde_json::from_slice(&content)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn match_request(
        &self,
        key: &RequestKey,
    ) -> Result<Option<CachedResponse>, StorageError> {
        let path = self.entry_path(key);
        let Some(record) = Self::read_record(&path).await? else {
            return Ok(None);
        };
        if &record.key != key {
            warn!("Cache entry {:?} does not belong to {}", path, key);
            return Ok(None);
        }
        record.into_response().map(Some)
    }

    async fn put(&self, key: RequestKey, response: CachedResponse) -> Result<(), StorageError> {
        let path = self.entry_path(&key);
        let record = DiskRecord::new(key, response);
        let content = serde_json::to_vec(&record)?;

        // 先写临时文件再重命名，读取方不会看到写了一半的条目
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp-{}-{}", std::process::id(), seq));
        fs::write(&tmp, content).await?;
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        debug!("Cache {} stored {:?}", self.name, path);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, StorageError> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(err.into()),
        };
        let mut keys = vec![];
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(Some(record)) => keys.push(record.key),
                Ok(None) => {}
                Err(err) => warn!("Skip unreadable cache entry {:?}: {}", path, err),
            }
        }
        keys.sort();
        Ok(keys)
    }
}
