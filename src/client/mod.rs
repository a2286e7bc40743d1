//! 对象存储客户端能力接口 / Object store client capability
//!
//! The storage facade only talks to the backend through this trait; the
//! bundled [`OssClient`] is the production implementation and tests plug in
//! an in-memory one.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::Result;

pub mod oss;
pub use oss::OssClient;

/// Bucket 访问策略 / Bucket access policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketAcl {
    /// 私有 / Private read and write
    Private,
    /// 公共读 / Public read
    PublicRead,
    /// 公共读写 / Public read and write
    PublicReadWrite,
}

impl BucketAcl {
    /// 解析ACL字符串 / Parse the ACL grant string
    pub fn parse(value: &str) -> Self {
        match value {
            "public-read" => BucketAcl::PublicRead,
            "public-read-write" => BucketAcl::PublicReadWrite,
            _ => BucketAcl::Private,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, BucketAcl::Private)
    }
}

/// 对象体字节流 / Object body byte stream
pub type ByteStream = Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Unpin>;

/// get_object 返回结果 / Result of a get_object call
pub struct GetObject {
    /// 后端报告的内容长度，未知时为 None / Content length if the backend reports one
    pub content_length: Option<u64>,
    /// 请求ID，用于日志与排错 / Request id for logging
    pub request_id: String,
    pub body: ByteStream,
}

/// head_object 返回结果 / Result of a head_object call
#[derive(Debug, Clone)]
pub struct HeadInfo {
    pub content_type: String,
}

/// 对象元数据 / Object metadata (no body fetched)
#[derive(Debug, Clone, Copy)]
pub struct ObjectMeta {
    pub content_length: u64,
    /// 最后修改时间（Unix秒） / Last modified as epoch seconds
    pub last_modified: i64,
}

/// 列表中的对象条目 / One object entry in a listing page
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

/// 一页列表结果 / One page of a prefix listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectEntry>,
    /// delimiter 分组出的公共前缀 / Prefixes grouped by the delimiter
    pub common_prefixes: Vec<String>,
    pub next_marker: Option<String>,
    pub is_truncated: bool,
}

/// 远端对象存储客户端 / Remote object store client
///
/// put/delete are last-writer-wins with no conflict detection; retries and
/// connection pooling are the implementation's concern, never the facade's.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// 查询bucket ACL，bucket不存在时返回 NoSuchBucket / ACL probe,
    /// doubles as the bucket existence check
    async fn get_bucket_acl(&self) -> Result<BucketAcl>;

    /// 上传对象，覆盖同名对象 / Upload, unconditionally overwriting
    async fn put_object(&self, key: &str, body: Bytes) -> Result<()>;

    /// 获取对象，不存在时返回 NotFound / Fetch an object
    async fn get_object(&self, key: &str) -> Result<GetObject>;

    /// 删除对象，键不存在时也成功 / Delete, idempotent for absent keys
    async fn delete_object(&self, key: &str) -> Result<()>;

    /// 精确键存在性检查 / Exact-key existence check
    async fn object_exists(&self, key: &str) -> Result<bool>;

    /// 获取Content-Type / Content type of an object
    async fn head_object(&self, key: &str) -> Result<HeadInfo>;

    /// 元数据查询（不取对象体） / Metadata-only fetch
    async fn get_object_meta(&self, key: &str) -> Result<ObjectMeta>;

    /// 前缀列表 / Prefix listing with delimiter grouping
    async fn list_objects(
        &self,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        max_keys: u32,
    ) -> Result<ListPage>;

    /// 生成签名URL / Generate a signed URL for the given expiry
    fn sign_url(&self, method: &str, key: &str, expire_secs: u64) -> String;

    fn bucket_name(&self) -> &str;
}
