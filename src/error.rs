use std::io;

use http::uri::InvalidUri;

use crate::{network::NetworkError, storage::StorageError};

#[allow(clippy::enum_variant_names)]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // from
    #[error("failed io {0}")]
    Io(#[from] io::Error),
    #[error("failed to decode toml {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("failed to handle json {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to handle http {0}")]
    Http(#[from] http::Error),
    #[error("failed to convert url {0}")]
    InvalidUri(#[from] InvalidUri),
    #[error("cache storage {0}")]
    Storage(#[from] StorageError),
    #[error("network {0}")]
    Network(#[from] NetworkError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("install failed: {0}")]
    InstallFailed(String),
    #[error("invalid worker state: {0}")]
    InvalidState(String),

    #[error("internal server error {0}")]
    Any(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = anyhow::Result<T, E>;
