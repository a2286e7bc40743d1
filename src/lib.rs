//! 阿里云OSS存储适配 / Aliyun OSS storage facade
//!
//! Exposes a flat-namespace object bucket through hierarchical path
//! operations: open/save/delete/exists/listdir/url plus directory-marker
//! helpers. The backend is reached only through the
//! [`ObjectStoreClient`] capability trait; [`client::OssClient`] is the
//! bundled production implementation.

pub mod client;
pub mod config;
pub mod error;
pub mod file;
pub mod key;
pub mod storage;

pub use client::{
    BucketAcl, GetObject, HeadInfo, ListPage, ObjectEntry, ObjectMeta, ObjectStoreClient,
    OssClient,
};
pub use config::{OssConfig, Settings, DEFAULT_EXPIRE_TIME};
pub use error::{OssError, Result};
pub use file::{SpooledBuffer, StorageFile, SPOOL_MAX_SIZE};
pub use key::{normalize_logical, resolve_key};
pub use storage::{OssStorage, Timestamp};
