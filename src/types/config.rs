use std::path::{Path, PathBuf};
use thiserror::Error;

/// 設定関連のエラー型
/// 環境変数から読み込んだ設定値の検証エラーを定義
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 設定値が不正
    #[error("設定値が不正です: {reason}")]
    InvalidValue { reason: String },
}

impl ConfigError {
    /// 不正な設定値エラーを作成
    pub fn invalid_value<R: Into<String>>(reason: R) -> Self {
        Self::InvalidValue {
            reason: reason.into(),
        }
    }
}

/// 設定エラーのResult型エイリアス
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub const ENV_DATA_DIR: &str = "XSWEEP_DATA_DIR";
pub const ENV_API_BASE_URL: &str = "XSWEEP_API_BASE_URL";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "XSWEEP_HTTP_TIMEOUT_SECS";

pub const DEFAULT_API_BASE_URL: &str = "https://api.twitter.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const ARCHIVE_FILE_NAME: &str = "tweets.js";
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";
pub const FILTERS_FILE_NAME: &str = "filters.json";

/// アプリケーション設定
///
/// データディレクトリ配下に `tweets.js`, `credentials.json`, `filters.json` を置く。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub api_base_url: String,
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// 環境変数から設定を読み込む（.envは呼び出し側で読み込み済みであること）
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の検索関数から設定を組み立てる
    ///
    /// 未設定の項目はデフォルト値を使用する。
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir.trim());
        }

        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            let url = url.trim().trim_end_matches('/');
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::invalid_value(format!(
                    "{}はhttp(s)のURLである必要があります: {}",
                    ENV_API_BASE_URL, url
                )));
            }
            config.api_base_url = url.to_string();
        }

        if let Some(raw) = lookup(ENV_HTTP_TIMEOUT_SECS) {
            config.http_timeout_secs = match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::invalid_value(format!(
                        "{}は1以上の整数である必要があります: {}",
                        ENV_HTTP_TIMEOUT_SECS, raw
                    )))
                }
            };
        }

        Ok(config)
    }

    /// データディレクトリを差し替えた設定を返す
    pub fn with_data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join(ARCHIVE_FILE_NAME)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join(CREDENTIALS_FILE_NAME)
    }

    pub fn filters_path(&self) -> PathBuf {
        self.data_dir.join(FILTERS_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.archive_path(), PathBuf::from("./tweets.js"));
    }

    #[test]
    fn test_values_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ENV_DATA_DIR, "/tmp/xsweep"),
            (ENV_API_BASE_URL, "http://127.0.0.1:8080/"),
            (ENV_HTTP_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/xsweep"));
        // 末尾のスラッシュは取り除かれる
        assert_eq!(config.api_base_url, "http://127.0.0.1:8080");
        assert_eq!(config.http_timeout_secs, 5);
        assert_eq!(
            config.filters_path(),
            PathBuf::from("/tmp/xsweep/filters.json")
        );
    }

    #[test]
    fn test_invalid_values() {
        let timeout = AppConfig::from_lookup(lookup_from(&[(ENV_HTTP_TIMEOUT_SECS, "abc")]));
        assert!(matches!(timeout, Err(ConfigError::InvalidValue { .. })));

        let zero = AppConfig::from_lookup(lookup_from(&[(ENV_HTTP_TIMEOUT_SECS, "0")]));
        assert!(zero.is_err(), "0秒のタイムアウトは拒否されるはず");

        let url = AppConfig::from_lookup(lookup_from(&[(ENV_API_BASE_URL, "ftp://example.com")]));
        assert!(url.is_err(), "http(s)以外のURLは拒否されるはず");
    }
}
