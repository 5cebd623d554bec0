use crate::infra::storage::file::{load_json_from_file, remove_file_if_exists, save_json_to_file};
use crate::types::{AppError, AppResult, InfraResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// XのAPIキー一式（OAuth 1.0aのユーザーコンテキスト）
///
/// 4つの値は全て揃っているか、全くないかのどちらか。
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl Credentials {
    /// 前後の空白を取り除き、空の項目があればエラーを返す
    pub fn new(
        consumer_key: &str,
        consumer_secret: &str,
        access_token: &str,
        access_token_secret: &str,
    ) -> AppResult<Self> {
        let fields = [
            ("consumer_key", consumer_key),
            ("consumer_secret", consumer_secret),
            ("access_token", access_token),
            ("access_token_secret", access_token_secret),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AppError::invalid_request(format!(
                "{}を入力してください",
                name
            )));
        }

        Ok(Self {
            consumer_key: consumer_key.trim().to_string(),
            consumer_secret: consumer_secret.trim().to_string(),
            access_token: access_token.trim().to_string(),
            access_token_secret: access_token_secret.trim().to_string(),
        })
    }

    /// 全ての項目が空でないか
    pub fn is_complete(&self) -> bool {
        [
            &self.consumer_key,
            &self.consumer_secret,
            &self.access_token,
            &self.access_token_secret,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }
}

// ログに秘密情報が出ないよう、キーの先頭数文字だけを表示する
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.consumer_key.chars().take(4).collect();
        f.debug_struct("Credentials")
            .field("consumer_key", &format!("{}***", head))
            .field("consumer_secret", &"***")
            .field("access_token", &"***")
            .field("access_token_secret", &"***")
            .finish()
    }
}

/// credentials.json への保存・読み込みを行う
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[cfg(test)]
    fn path(&self) -> &Path {
        &self.path
    }

    /// 保存済みの認証情報を読み込む
    ///
    /// ファイルがない、壊れている、項目が欠けている場合は`None`。
    pub fn load(&self) -> Option<Credentials> {
        if !self.path.exists() {
            return None;
        }
        match load_json_from_file::<Credentials>(&self.path) {
            Ok(creds) if creds.is_complete() => Some(creds),
            Ok(_) => {
                warn!(path = %self.path.display(), "認証情報ファイルに空の項目があるため無視します");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "認証情報ファイルを読み込めないため無視します");
                None
            }
        }
    }

    pub fn save(&self, credentials: &Credentials) -> InfraResult<()> {
        save_json_to_file(&self.path, credentials)?;
        debug!(path = %self.path.display(), "認証情報を保存しました");
        Ok(())
    }

    pub fn clear(&self) -> InfraResult<()> {
        remove_file_if_exists(&self.path)
    }
}
