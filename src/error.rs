//! 错误类型定义 / Error types

use thiserror::Error;

/// OSS 存储错误 / OSS storage error
///
/// Callers can branch on the variant: configuration problems and a missing
/// bucket are fatal at construction, `NotFound` / `InvalidMode` are
/// per-operation, everything else is `Backend`.
#[derive(Debug, Error)]
pub enum OssError {
    /// 配置错误：必需项缺失或设置源损坏 / Required setting absent from
    /// both env and settings, or the settings source is malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// Bucket 不存在 / Configured bucket does not exist
    #[error("bucket '{0}' does not exist")]
    NoSuchBucket(String),

    /// 对象不存在 / Object does not exist
    #[error("'{0}' does not exist")]
    NotFound(String),

    /// 非法打开模式 / Open called with a non read-binary mode
    #[error("OSS files can only be opened in read-only mode, got '{0}'")]
    InvalidMode(String),

    /// 后端错误 / Transport or backend failure, wraps the original cause
    #[error("backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl OssError {
    /// 包装后端错误 / Wrap a backend failure with its cause
    pub fn backend<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        OssError::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// 无来源的后端错误 / Backend failure without an underlying cause
    pub fn backend_msg(message: impl Into<String>) -> Self {
        OssError::Backend {
            message: message.into(),
            source: None,
        }
    }
}

impl From<reqwest::Error> for OssError {
    fn from(err: reqwest::Error) -> Self {
        OssError::backend("http request failed", err)
    }
}

impl From<std::io::Error> for OssError {
    fn from(err: std::io::Error) -> Self {
        OssError::backend("io error", err)
    }
}

/// Result 类型别名 / Result alias
pub type Result<T> = std::result::Result<T, OssError>;
