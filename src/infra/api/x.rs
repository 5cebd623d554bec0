use crate::domain::credentials::Credentials;
use crate::infra::api::oauth::{authorization_header, OAuthNonce};
use crate::infra::compute::generate_nonce;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// APIがエラーとして返した内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// HTTPステータスコード
    pub status: u16,
    /// レスポンス本文に含まれていた最初のエラーコード
    pub code: Option<i64>,
    /// 生のエラーテキスト
    pub message: String,
}

/// 投稿削除リクエストの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// 削除された
    Destroyed,
    /// 対象が見つからない（削除済みを含む）
    NotFound,
    /// APIがエラーを返した
    Rejected(ApiFailure),
}

/// Xプラットフォームの抽象化トレイト
///
/// 実際のAPI通信とモック実装の両方を統一的に扱えるようにするためのインターフェース。
/// 通信自体に失敗した場合（接続エラー・タイムアウトなど）は`Err`を返す。
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// 指定IDの投稿を削除する
    async fn destroy_status(&self, credentials: &Credentials, id: &str)
        -> Result<DestroyOutcome>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    code: Option<i64>,
    message: Option<String>,
}

/// エラーレスポンス本文から`ApiFailure`を組み立てる
///
/// `{"errors":[{"code":88,"message":"Rate limit exceeded"}]}` の形式を想定し、
/// それ以外の本文はテキストのまま残す。
pub fn parse_api_failure(status: u16, body: &str) -> ApiFailure {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("");
    let status_line = format!("{} {}", status, reason).trim().to_string();

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => {
            let details = parsed
                .errors
                .iter()
                .map(|e| match (e.code, &e.message) {
                    (Some(code), Some(msg)) => format!("{} - {}", code, msg),
                    (Some(code), None) => code.to_string(),
                    (None, Some(msg)) => msg.clone(),
                    (None, None) => String::new(),
                })
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            ApiFailure {
                status,
                code: parsed.errors.iter().find_map(|e| e.code),
                message: if details.is_empty() {
                    status_line
                } else {
                    format!("{}: {}", status_line, details)
                },
            }
        }
        _ => {
            let text = body.trim();
            ApiFailure {
                status,
                code: None,
                message: if text.is_empty() {
                    status_line
                } else {
                    format!("{}: {}", status_line, text)
                },
            }
        }
    }
}

/// `reqwest` を使用した本番用のクライアント実装
pub struct ReqwestPlatformClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl ReqwestPlatformClient {
    /// 新しいクライアントを作成
    ///
    /// # Arguments
    /// * `base_url` - APIのベースURL（例: `https://api.twitter.com`）
    /// * `timeout_secs` - タイムアウト時間（秒）
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        }
    }

    fn destroy_url(&self, id: &str) -> String {
        format!(
            "{}/1.1/statuses/destroy/{}.json",
            self.base_url,
            urlencoding::encode(id)
        )
    }
}

#[async_trait]
impl PlatformClient for ReqwestPlatformClient {
    async fn destroy_status(
        &self,
        credentials: &Credentials,
        id: &str,
    ) -> Result<DestroyOutcome> {
        let url = self.destroy_url(id);
        let nonce = OAuthNonce {
            nonce: generate_nonce(id),
            timestamp: chrono::Utc::now().timestamp(),
        };
        let auth = authorization_header("POST", &url, &[], credentials, &nonce)?;

        debug!(id = id, url = %url, "投稿削除リクエストを送信します");
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .with_context(|| format!("HTTPリクエストの送信に失敗: {}", url))?;

        let status = response.status();
        if status.is_success() {
            return Ok(DestroyOutcome::Destroyed);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(DestroyOutcome::NotFound);
        }

        let body = response
            .text()
            .await
            .context("レスポンステキストの取得に失敗")?;
        Ok(DestroyOutcome::Rejected(parse_api_failure(
            status.as_u16(),
            &body,
        )))
    }
}

/// テスト用のモッククライアント
///
/// 実際のリクエストを行わずに、IDごとに定義済みの結果を返す。
/// 未定義のIDは`Destroyed`を返す。
#[derive(Default)]
pub struct MockPlatformClient {
    /// IDごとの結果
    outcomes: HashMap<String, DestroyOutcome>,
    /// 通信エラーとして扱うIDとメッセージ
    transport_errors: HashMap<String, String>,
    /// 呼び出されたIDの記録
    calls: Mutex<Vec<String>>,
}

impl MockPlatformClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定IDに対する結果を設定する
    pub fn with_outcome(mut self, id: &str, outcome: DestroyOutcome) -> Self {
        self.outcomes.insert(id.to_string(), outcome);
        self
    }

    /// 指定IDで通信エラーを起こす
    pub fn with_transport_error(mut self, id: &str, message: &str) -> Self {
        self.transport_errors
            .insert(id.to_string(), message.to_string());
        self
    }

    /// これまでに呼び出されたIDを順番に返す
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PlatformClient for MockPlatformClient {
    async fn destroy_status(
        &self,
        _credentials: &Credentials,
        id: &str,
    ) -> Result<DestroyOutcome> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(id.to_string());
        }

        if let Some(message) = self.transport_errors.get(id) {
            return Err(anyhow::anyhow!("モックHTTPエラー: {}", message));
        }
        Ok(self
            .outcomes
            .get(id)
            .cloned()
            .unwrap_or(DestroyOutcome::Destroyed))
    }
}
