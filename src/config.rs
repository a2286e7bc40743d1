//! 配置模块 / Configuration module
//!
//! Settings can come from a host-wide settings object (loaded from JSON)
//! or from process environment variables; the environment always wins.
//! Resolution happens once when the storage is constructed and fails fast
//! on a missing required value.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{OssError, Result};

/// 签名URL默认有效期（30天） / Default signed-URL expiry (30 days)
pub const DEFAULT_EXPIRE_TIME: u64 = 60 * 60 * 24 * 30;

/// 宿主设置对象 / Host-wide settings object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// AccessKey ID
    #[serde(default)]
    pub oss_access_key_id: Option<String>,
    /// AccessKey Secret
    #[serde(default)]
    pub oss_access_key_secret: Option<String>,
    /// 服务端点 / Service endpoint, e.g. oss-cn-hangzhou.aliyuncs.com
    #[serde(default)]
    pub oss_endpoint: Option<String>,
    /// Bucket 名称 / Bucket name
    #[serde(default)]
    pub oss_bucket_name: Option<String>,
    /// 签名URL有效期（秒） / Signed-URL expiry in seconds
    #[serde(default)]
    pub oss_expire_time: Option<u64>,
    /// 媒体文件根前缀 / Media root prefix
    #[serde(default = "default_media_location")]
    pub media_location: String,
    /// 静态资源根前缀 / Static assets root prefix
    #[serde(default = "default_static_location")]
    pub static_location: String,
}

fn default_media_location() -> String {
    "/media/".to_string()
}

fn default_static_location() -> String {
    "/static/".to_string()
}

impl Settings {
    /// 从JSON文件加载设置 / Load settings from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| OssError::Config(format!("failed to parse settings file: {}", e)))
    }

    /// 按名称取设置值 / Look up a setting by its env-style name
    fn value_of(&self, name: &str) -> Option<String> {
        match name {
            "OSS_ACCESS_KEY_ID" => self.oss_access_key_id.clone(),
            "OSS_ACCESS_KEY_SECRET" => self.oss_access_key_secret.clone(),
            "OSS_ENDPOINT" => self.oss_endpoint.clone(),
            "OSS_BUCKET_NAME" => self.oss_bucket_name.clone(),
            "OSS_EXPIRE_TIME" => self.oss_expire_time.map(|v| v.to_string()),
            _ => None,
        }
    }
}

/// 解析配置项，环境变量优先 / Resolve a config value, env var takes precedence
pub fn get_config(name: &str, settings: &Settings) -> Result<String> {
    match std::env::var(name) {
        Ok(v) => Ok(v.trim().to_string()),
        Err(_) => settings
            .value_of(name)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| {
                OssError::Config(format!("'{}' not found in env variables or settings", name))
            }),
    }
}

/// 带默认值的配置解析 / Same resolution order, falling back to a default
pub fn get_config_or(name: &str, settings: &Settings, default: &str) -> String {
    get_config(name, settings).unwrap_or_else(|_| default.to_string())
}

/// 端点缺少协议时补全为 https / Prepend https:// when the scheme is missing
pub fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}

/// 已解析的OSS配置快照 / Resolved OSS configuration snapshot
#[derive(Debug, Clone)]
pub struct OssConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub endpoint: String,
    pub bucket_name: String,
    /// 签名URL有效期（秒） / Signed-URL expiry in seconds
    pub expire_time: u64,
}

impl OssConfig {
    /// 解析全部必需配置 / Resolve all required values, fail fast on absence
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let access_key_id = get_config("OSS_ACCESS_KEY_ID", settings)?;
        let access_key_secret = get_config("OSS_ACCESS_KEY_SECRET", settings)?;
        let endpoint = normalize_endpoint(&get_config("OSS_ENDPOINT", settings)?);
        let bucket_name = get_config("OSS_BUCKET_NAME", settings)?;
        let expire_time = get_config_or(
            "OSS_EXPIRE_TIME",
            settings,
            &DEFAULT_EXPIRE_TIME.to_string(),
        )
        .parse::<u64>()
        .map_err(|_| OssError::Config("'OSS_EXPIRE_TIME' must be an integer".to_string()))?;

        Ok(Self {
            access_key_id,
            access_key_secret,
            endpoint,
            bucket_name,
            expire_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_settings() -> Settings {
        Settings {
            oss_access_key_id: Some("ak-from-settings".to_string()),
            oss_access_key_secret: Some("sk-from-settings".to_string()),
            oss_endpoint: Some("oss-cn-hangzhou.aliyuncs.com".to_string()),
            oss_bucket_name: Some("bucket-from-settings".to_string()),
            oss_expire_time: None,
            ..Settings::default()
        }
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("oss-cn-hangzhou.aliyuncs.com"),
            "https://oss-cn-hangzhou.aliyuncs.com"
        );
        assert_eq!(
            normalize_endpoint("http://oss-cn-hangzhou.aliyuncs.com"),
            "http://oss-cn-hangzhou.aliyuncs.com"
        );
        assert_eq!(
            normalize_endpoint("https://oss-cn-hangzhou.aliyuncs.com"),
            "https://oss-cn-hangzhou.aliyuncs.com"
        );
    }

    #[test]
    fn test_settings_fallback_and_missing() {
        // no env var is set for these names in the test environment
        let settings = full_settings();
        assert_eq!(
            get_config("OSS_BUCKET_NAME", &settings).unwrap(),
            "bucket-from-settings"
        );

        let err = get_config("OSS_BUCKET_NAME", &Settings::default()).unwrap_err();
        assert!(matches!(err, OssError::Config(msg) if msg.contains("OSS_BUCKET_NAME")));
    }

    #[test]
    fn test_malformed_settings_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not valid json").unwrap();

        let err = Settings::from_json_file(&path).unwrap_err();
        assert!(matches!(err, OssError::Config(msg) if msg.contains("settings file")));
    }

    #[test]
    fn test_env_takes_precedence() {
        let settings = full_settings();
        std::env::set_var("OSS_ACCESS_KEY_ID", "ak-from-env");
        assert_eq!(
            get_config("OSS_ACCESS_KEY_ID", &settings).unwrap(),
            "ak-from-env"
        );
        std::env::remove_var("OSS_ACCESS_KEY_ID");
        assert_eq!(
            get_config("OSS_ACCESS_KEY_ID", &settings).unwrap(),
            "ak-from-settings"
        );
    }

    #[test]
    fn test_from_settings_resolves_and_defaults() {
        let config = OssConfig::from_settings(&full_settings()).unwrap();
        assert_eq!(config.endpoint, "https://oss-cn-hangzhou.aliyuncs.com");
        assert_eq!(config.expire_time, DEFAULT_EXPIRE_TIME);
    }

    #[test]
    fn test_default_locations() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.media_location, "/media/");
        assert_eq!(settings.static_location, "/static/");
    }
}
