//! OSS 存储门面 / OSS storage facade
//!
//! Maps hierarchical path operations onto the flat object-key namespace of
//! a bucket. One instance owns a resolved configuration snapshot and the
//! bucket ACL captured at construction; object content and metadata are
//! never cached, every call re-queries the backend.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use futures::StreamExt;
use tracing::{debug, info};

use crate::client::{BucketAcl, ObjectStoreClient, OssClient};
use crate::config::{OssConfig, Settings};
use crate::error::{OssError, Result};
use crate::file::{SpooledBuffer, StorageFile, SPOOL_MAX_SIZE};
use crate::key::{normalize_logical, resolve_key};

/// 时间戳，是否带时区由调用方显式选择 / A timestamp whose timezone
/// awareness is an explicit caller choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// UTC时间 / UTC-tagged
    Utc(DateTime<Utc>),
    /// 本地朴素时间 / Naive local time
    Naive(NaiveDateTime),
}

impl Timestamp {
    pub fn is_aware(&self) -> bool {
        matches!(self, Timestamp::Utc(_))
    }
}

/// OSS 存储 / OSS storage
///
/// Every operation is one independent call to the backend; concurrent
/// callers on the same key race at the backend level, last writer wins.
pub struct OssStorage {
    config: OssConfig,
    /// 本实例在bucket内的根前缀 / Root prefix inside the bucket
    location: String,
    client: Arc<dyn ObjectStoreClient>,
    /// 构造时抓取的ACL快照 / ACL snapshot captured at construction
    bucket_acl: BucketAcl,
}

impl std::fmt::Debug for OssStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssStorage")
            .field("config", &self.config)
            .field("location", &self.location)
            .field("bucket_acl", &self.bucket_acl)
            .finish_non_exhaustive()
    }
}

impl OssStorage {
    /// 按设置构造，内部创建生产客户端 / Construct from settings with the
    /// production OSS client
    pub async fn new(settings: &Settings, location: impl Into<String>) -> Result<Self> {
        let config = OssConfig::from_settings(settings)?;
        let client = Arc::new(OssClient::new(&config));
        Self::with_client(config, location, client).await
    }

    /// 注入客户端构造 / Construct with an injected client
    ///
    /// The ACL probe doubles as the bucket existence check: a missing
    /// bucket fails construction with `NoSuchBucket`.
    pub async fn with_client(
        config: OssConfig,
        location: impl Into<String>,
        client: Arc<dyn ObjectStoreClient>,
    ) -> Result<Self> {
        let location = location.into();
        let bucket_acl = client.get_bucket_acl().await?;
        debug!(
            "storage ready: bucket={}, location={}, acl={:?}",
            config.bucket_name, location, bucket_acl
        );
        Ok(Self {
            config,
            location,
            client,
            bucket_acl,
        })
    }

    /// 媒体文件存储 / Storage rooted at the media location
    pub async fn media(settings: &Settings) -> Result<Self> {
        let location = settings.media_location.clone();
        debug!("location: {}", location);
        Self::new(settings, location).await
    }

    /// 静态资源存储 / Storage rooted at the static-assets location
    pub async fn static_assets(settings: &Settings) -> Result<Self> {
        let location = settings.static_location.clone();
        info!("location: {}", location);
        Self::new(settings, location).await
    }

    /// 逻辑名到对象键 / Resolve a logical name to its object key
    fn key_name(&self, name: &str) -> String {
        resolve_key(&self.location, name)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn bucket_acl(&self) -> BucketAcl {
        self.bucket_acl
    }

    /// 打开对象，仅支持 "rb" / Open an object, read-binary only
    ///
    /// Content is buffered through a spooled buffer (10 MB in-memory
    /// threshold). When the backend reports a content length the copied
    /// byte count is verified against it.
    pub async fn open(&self, name: &str, mode: &str) -> Result<StorageFile> {
        debug!("name: {}, mode: {}", name, mode);
        if mode != "rb" {
            return Err(OssError::InvalidMode(mode.to_string()));
        }

        let key = self.key_name(name);
        debug!("target name: {}", key);
        let mut obj = self.client.get_object(&key).await.map_err(|e| match e {
            OssError::NotFound(_) => OssError::NotFound(name.to_string()),
            other => other,
        })?;
        info!(
            "content length: {:?}, request id: {}",
            obj.content_length, obj.request_id
        );

        let mut buf = SpooledBuffer::new(SPOOL_MAX_SIZE);
        let mut copied: u64 = 0;
        while let Some(chunk) = obj.body.next().await {
            let chunk = chunk?;
            buf.write_chunk(&chunk)?;
            copied += chunk.len() as u64;
        }
        if let Some(expected) = obj.content_length {
            if copied != expected {
                return Err(OssError::backend_msg(format!(
                    "truncated transfer for '{}': expected {} bytes, got {} (request id: {})",
                    key, expected, copied, obj.request_id
                )));
            }
        }
        buf.rewind()?;
        Ok(StorageFile::new(key, buf))
    }

    /// 保存对象，覆盖同名对象，返回规范化逻辑路径 / Save, overwriting any
    /// existing object, returns the normalized logical path
    pub async fn save(&self, name: &str, content: Bytes) -> Result<String> {
        let key = self.key_name(name);
        debug!("target name: {}, {} bytes", key, content.len());
        self.client.put_object(&key, content).await?;
        Ok(normalize_logical(name))
    }

    /// 删除对象，键按原样解析，不存在也成功 / Delete the exact key,
    /// idempotent for absent keys
    pub async fn delete(&self, name: &str) -> Result<()> {
        let key = self.key_name(name);
        debug!("delete name: {}", key);
        self.client.delete_object(&key).await
    }

    /// 删除目录标记，不级联删除子对象 / Delete the directory marker only,
    /// children are never cascaded and stay listable by prefix
    pub async fn delete_with_slash(&self, dirname: &str) -> Result<()> {
        let mut key = self.key_name(dirname);
        if !key.ends_with('/') {
            key.push('/');
        }
        debug!("delete name: {}", key);
        self.client.delete_object(&key).await
    }

    /// 创建目录标记（零字节对象），幂等 / Put a zero-byte directory marker,
    /// idempotent
    pub async fn create_dir(&self, dirname: &str) -> Result<()> {
        let mut key = self.key_name(dirname);
        if !key.ends_with('/') {
            key.push('/');
        }
        self.client.put_object(&key, Bytes::new()).await
    }

    /// 存在性检查 / Existence check
    ///
    /// A trailing slash queries the prefix (any match counts, marker or
    /// child). A bare name checks the exact key first and retries once
    /// with a slash appended, never deeper.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        let key = self.key_name(name);
        debug!("name: {}, target name: {}", name, key);
        if name.ends_with('/') {
            // OSS has no directories, a prefix hit is good enough / 前缀命中即存在
            let page = self.client.list_objects(&key, "", "", 1).await?;
            return Ok(!page.objects.is_empty());
        }

        if self.client.object_exists(&key).await? {
            return Ok(true);
        }
        // not a file, it may still be a directory with children / 可能是有子对象的目录
        let dir_key = format!("{}/", key);
        debug!("to check {}", dir_key);
        let page = self.client.list_objects(&dir_key, "", "", 1).await?;
        Ok(!page.objects.is_empty())
    }

    /// 对象大小 / Object size in bytes
    pub async fn size(&self, name: &str) -> Result<u64> {
        let key = self.key_name(name);
        let meta = self.client.get_object_meta(&key).await?;
        Ok(meta.content_length)
    }

    /// 对象Content-Type / Content type of an object
    pub async fn content_type(&self, name: &str) -> Result<String> {
        let key = self.key_name(name);
        let info = self.client.head_object(&key).await?;
        Ok(info.content_type)
    }

    /// 修改时间，总是本地朴素时间 / Modified time, always naive local
    pub async fn modified_time(&self, name: &str) -> Result<NaiveDateTime> {
        let key = self.key_name(name);
        let meta = self.client.get_object_meta(&key).await?;
        Ok(epoch_to_utc(meta.last_modified)?
            .with_timezone(&Local)
            .naive_local())
    }

    /// 创建时间，后端只记录一个时间戳，等同修改时间 / Created time, the
    /// backend tracks a single timestamp so this aliases modified time
    pub async fn created_time(&self, name: &str) -> Result<NaiveDateTime> {
        self.modified_time(name).await
    }

    /// 访问时间，等同修改时间 / Accessed time, aliases modified time
    pub async fn accessed_time(&self, name: &str) -> Result<NaiveDateTime> {
        self.modified_time(name).await
    }

    /// 修改时间，时区语义由 use_tz 显式指定 / Modified time with explicit
    /// timezone awareness: true yields UTC-tagged, false naive local
    pub async fn get_modified_time(&self, name: &str, use_tz: bool) -> Result<Timestamp> {
        let key = self.key_name(name);
        let meta = self.client.get_object_meta(&key).await?;
        let utc = epoch_to_utc(meta.last_modified)?;
        if use_tz {
            Ok(Timestamp::Utc(utc))
        } else {
            Ok(Timestamp::Naive(utc.with_timezone(&Local).naive_local()))
        }
    }

    pub async fn get_created_time(&self, name: &str, use_tz: bool) -> Result<Timestamp> {
        self.get_modified_time(name, use_tz).await
    }

    pub async fn get_accessed_time(&self, name: &str, use_tz: bool) -> Result<Timestamp> {
        self.get_modified_time(name, use_tz).await
    }

    /// 目录列表 / List one directory level
    ///
    /// `"."` means the root of this storage's location. Returns
    /// `(subdirectories, files)` as full object keys, in backend order.
    pub async fn listdir(&self, name: &str) -> Result<(Vec<String>, Vec<String>)> {
        let name = if name == "." { "" } else { name };
        let mut key = self.key_name(name);
        if !key.ends_with('/') {
            key.push('/');
        }
        debug!("name: {}", key);

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let mut marker = String::new();
        loop {
            let page = self.client.list_objects(&key, "/", &marker, 100).await?;
            dirs.extend(page.common_prefixes);
            files.extend(page.objects.into_iter().map(|o| o.key));
            match (page.is_truncated, page.next_marker) {
                (true, Some(next)) => marker = next,
                _ => break,
            }
        }
        debug!("dirs: {:?}", dirs);
        debug!("files: {:?}", files);
        Ok((dirs, files))
    }

    /// 签名URL / Signed URL for a logical name
    ///
    /// For a non-private bucket the signature query string is stripped and
    /// escaped path separators are restored, leaving a bare public URL.
    /// The policy uses the ACL snapshot from construction, no re-query.
    pub fn url(&self, name: &str, expire: Option<u64>) -> String {
        let key = self.key_name(name);
        let signed = self
            .client
            .sign_url("GET", &key, expire.unwrap_or(self.config.expire_time));
        if !self.bucket_acl.is_private() {
            if let Some(idx) = signed.find('?') {
                return signed[..idx].replace("%2F", "/");
            }
        }
        signed
    }
}

/// epoch秒转UTC时间 / Epoch seconds to a UTC datetime
fn epoch_to_utc(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| OssError::backend_msg(format!("invalid last-modified timestamp: {}", secs)))
}
