//! 阿里云OSS客户端 / Aliyun OSS client
//!
//! Header-signed REST calls against the virtual-hosted bucket endpoint.
//! Signature scheme: base64(hmac-sha1(secret, VERB\nContent-MD5\n
//! Content-Type\nDate\nCanonicalizedResource)).

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use chrono::Utc;
use futures::TryStreamExt;
use hmac::{Hmac, Mac};
use reqwest::{header, Client, Method, Response};
use serde::Deserialize;
use sha1::Sha1;
use tracing::debug;

use super::{BucketAcl, GetObject, HeadInfo, ListPage, ObjectEntry, ObjectMeta, ObjectStoreClient};
use crate::config::OssConfig;
use crate::error::{OssError, Result};

type HmacSha1 = Hmac<Sha1>;

/// OSS REST 客户端 / OSS REST client
pub struct OssClient {
    http: Client,
    access_key_id: String,
    access_key_secret: String,
    /// 协议部分 / Scheme part of the endpoint (http or https)
    scheme: String,
    /// 不带协议的端点主机 / Endpoint host without scheme
    host: String,
    bucket: String,
}

impl OssClient {
    pub fn new(config: &OssConfig) -> Self {
        let (scheme, host) = match config.endpoint.split_once("://") {
            Some((s, h)) => (s.to_string(), h.trim_end_matches('/').to_string()),
            None => ("https".to_string(), config.endpoint.clone()),
        };
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
            access_key_id: config.access_key_id.clone(),
            access_key_secret: config.access_key_secret.clone(),
            scheme,
            host,
            bucket: config.bucket_name.clone(),
        }
    }

    /// bucket 虚拟主机地址 / Virtual-hosted bucket base URL
    fn bucket_url(&self) -> String {
        format!("{}://{}.{}", self.scheme, self.bucket, self.host)
    }

    /// 对象请求地址，按段编码保留斜杠 / Object URL, per-segment encoding
    /// keeps `/` literal
    fn object_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!("{}/{}", self.bucket_url(), encoded.join("/"))
    }

    /// HTTP日期头 / GMT date header value
    fn http_date() -> String {
        Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }

    /// 计算签名 / Sign the canonical string
    fn sign(&self, string_to_sign: &str) -> String {
        let mut mac = HmacSha1::new_from_slice(self.access_key_secret.as_bytes())
            .expect("hmac accepts any key length");
        mac.update(string_to_sign.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    /// 头部签名 / Header signature for a request
    fn authorization(&self, verb: &str, content_type: &str, date: &str, resource: &str) -> String {
        let string_to_sign = format!("{}\n\n{}\n{}\n{}", verb, content_type, date, resource);
        format!("OSS {}:{}", self.access_key_id, self.sign(&string_to_sign))
    }

    /// 发送已签名请求 / Send a signed request against an object key
    async fn request(
        &self,
        method: Method,
        key: &str,
        content_type: &str,
        body: Option<Bytes>,
    ) -> Result<Response> {
        let date = Self::http_date();
        let resource = format!("/{}/{}", self.bucket, key);
        let auth = self.authorization(method.as_str(), content_type, &date, &resource);

        let mut req = self
            .http
            .request(method, self.object_url(key))
            .header(header::DATE, date)
            .header(header::AUTHORIZATION, auth);
        if !content_type.is_empty() {
            req = req.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = body {
            req = req.body(body);
        }
        Ok(req.send().await?)
    }

    /// 错误响应映射 / Map non-2xx responses to typed errors
    async fn check(&self, resp: Response, key: &str) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        debug!("oss error response: status={}, key={}", status, key);
        if status == reqwest::StatusCode::NOT_FOUND {
            if body.contains("<Code>NoSuchBucket</Code>") {
                return Err(OssError::NoSuchBucket(self.bucket.clone()));
            }
            return Err(OssError::NotFound(key.to_string()));
        }
        Err(OssError::backend_msg(format!(
            "oss request failed: status {}, key '{}'",
            status, key
        )))
    }
}

#[async_trait]
impl ObjectStoreClient for OssClient {
    async fn get_bucket_acl(&self) -> Result<BucketAcl> {
        let date = Self::http_date();
        let resource = format!("/{}/?acl", self.bucket);
        let auth = self.authorization("GET", "", &date, &resource);
        let resp = self
            .http
            .get(format!("{}/?acl", self.bucket_url()))
            .header(header::DATE, date)
            .header(header::AUTHORIZATION, auth)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(OssError::NoSuchBucket(self.bucket.clone()));
        }
        if !status.is_success() {
            return Err(OssError::backend_msg(format!(
                "get bucket acl failed: status {}",
                status
            )));
        }
        let policy: AccessControlPolicy = quick_xml::de::from_str(&body)
            .map_err(|e| OssError::backend("failed to parse bucket acl response", e))?;
        Ok(BucketAcl::parse(&policy.access_control_list.grant))
    }

    async fn put_object(&self, key: &str, body: Bytes) -> Result<()> {
        // 按扩展名推断Content-Type / Infer content type from the key extension
        let content_type = mime_guess::from_path(key)
            .first_raw()
            .unwrap_or("application/octet-stream");
        let resp = self
            .request(Method::PUT, key, content_type, Some(body))
            .await?;
        self.check(resp, key).await?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<GetObject> {
        let resp = self.request(Method::GET, key, "", None).await?;
        let resp = self.check(resp, key).await?;
        let content_length = resp.content_length();
        let request_id = resp
            .headers()
            .get("x-oss-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = resp
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(GetObject {
            content_length,
            request_id,
            body: Box::new(body),
        })
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let resp = self.request(Method::DELETE, key, "", None).await?;
        // deleting an absent key returns 204 on OSS, treat 404 the same way
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.check(resp, key).await?;
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> Result<bool> {
        let resp = self.request(Method::HEAD, key, "", None).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        self.check(resp, key).await?;
        Ok(true)
    }

    async fn head_object(&self, key: &str) -> Result<HeadInfo> {
        let resp = self.request(Method::HEAD, key, "", None).await?;
        let resp = self.check(resp, key).await?;
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok(HeadInfo { content_type })
    }

    async fn get_object_meta(&self, key: &str) -> Result<ObjectMeta> {
        let resp = self.request(Method::HEAD, key, "", None).await?;
        let resp = self.check(resp, key).await?;
        let content_length = resp
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let last_modified = resp
            .headers()
            .get(header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| chrono::DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.timestamp())
            .ok_or_else(|| {
                OssError::backend_msg(format!("missing last-modified header for '{}'", key))
            })?;
        Ok(ObjectMeta {
            content_length,
            last_modified,
        })
    }

    async fn list_objects(
        &self,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        max_keys: u32,
    ) -> Result<ListPage> {
        let date = Self::http_date();
        let resource = format!("/{}/", self.bucket);
        let auth = self.authorization("GET", "", &date, &resource);
        let resp = self
            .http
            .get(format!("{}/", self.bucket_url()))
            .query(&[
                ("prefix", prefix),
                ("delimiter", delimiter),
                ("marker", marker),
                ("max-keys", &max_keys.to_string()),
            ])
            .header(header::DATE, date)
            .header(header::AUTHORIZATION, auth)
            .send()
            .await?;
        let resp = self.check(resp, prefix).await?;
        let body = resp.text().await?;
        let result: ListBucketResult = quick_xml::de::from_str(&body)
            .map_err(|e| OssError::backend("failed to parse list response", e))?;

        Ok(ListPage {
            objects: result
                .contents
                .into_iter()
                .map(|c| ObjectEntry {
                    key: c.key,
                    size: c.size,
                })
                .collect(),
            common_prefixes: result
                .common_prefixes
                .into_iter()
                .map(|p| p.prefix)
                .collect(),
            next_marker: result.next_marker.filter(|m| !m.is_empty()),
            is_truncated: result.is_truncated,
        })
    }

    fn sign_url(&self, method: &str, key: &str, expire_secs: u64) -> String {
        let expires = Utc::now().timestamp() + expire_secs as i64;
        let string_to_sign = format!("{}\n\n\n{}\n/{}/{}", method, expires, self.bucket, key);
        let signature = self.sign(&string_to_sign);
        // the whole key is escaped here, slashes included / 整个key转义，包括斜杠
        format!(
            "{}/{}?OSSAccessKeyId={}&Expires={}&Signature={}",
            self.bucket_url(),
            urlencoding::encode(key),
            urlencoding::encode(&self.access_key_id),
            expires,
            urlencoding::encode(&signature)
        )
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessControlPolicy {
    access_control_list: AccessControlList,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessControlList {
    grant: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<ListContents>,
    #[serde(default)]
    common_prefixes: Vec<ListCommonPrefix>,
    #[serde(default)]
    is_truncated: bool,
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListContents {
    key: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListCommonPrefix {
    prefix: String,
}
