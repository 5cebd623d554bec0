use crate::types::InfraError;
use thiserror::Error;

/// アーカイブ読み込みのエラー型
/// 失敗の原因ごとに別のバリアントを持つ
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// アーカイブファイルが存在しない
    #[error("tweets.jsが見つかりません。Xのアーカイブファイルを次の場所に配置してください: {path}")]
    NotFound { path: String },

    /// アーカイブファイルを読み込めない
    #[error("tweets.jsを読み込めませんでした: {path} - {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSONとして解析できない
    #[error("tweets.jsが正しいJSONではありません: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
    },

    /// JSONの構造が想定と異なる
    #[error("tweets.jsの形式が想定と異なります: {reason}")]
    UnexpectedShape { reason: String },
}

impl ArchiveError {
    pub fn not_found<P: Into<String>>(path: P) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn unreadable<P: Into<String>>(path: P, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    pub fn malformed_json(source: serde_json::Error) -> Self {
        Self::MalformedJson { source }
    }

    pub fn unexpected_shape<R: Into<String>>(reason: R) -> Self {
        Self::UnexpectedShape {
            reason: reason.into(),
        }
    }
}

/// アプリケーション層のエラー型
///
/// 呼び出し側へ返すときは `status_code()` でHTTPステータス相当の値に変換する。
/// - 503: アーカイブが未配置
/// - 400: 不正なアーカイブ・不正なリクエスト
/// - 401: 未認証
/// - 502: 外部APIのエラー
/// - 500: その他の内部エラー
#[derive(Error, Debug)]
pub enum AppError {
    /// アーカイブ関連のエラー
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// リクエスト内容の検証エラー
    #[error("{reason}")]
    InvalidRequest { reason: String },

    /// 認証情報が未設定のまま削除しようとした
    #[error("認証されていません。先に認証情報を登録してください。")]
    Unauthenticated,

    /// 外部プラットフォームAPIのエラー（利用者向けに翻訳済み）
    #[error("{message}")]
    Platform { message: String },

    /// インフラ層のエラー
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl AppError {
    /// リクエスト検証エラーを作成
    pub fn invalid_request<R: Into<String>>(reason: R) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// プラットフォームエラーを作成
    pub fn platform<M: Into<String>>(message: M) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }

    /// HTTPステータス相当のコードを返す
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Archive(ArchiveError::NotFound { .. }) => 503,
            AppError::Archive(ArchiveError::Unreadable { .. }) => 500,
            AppError::Archive(ArchiveError::MalformedJson { .. })
            | AppError::Archive(ArchiveError::UnexpectedShape { .. }) => 400,
            AppError::InvalidRequest { .. } => 400,
            AppError::Unauthenticated => 401,
            AppError::Platform { .. } => 502,
            AppError::Infra(_) => 500,
        }
    }
}

/// アプリケーションエラーのResult型エイリアス
pub type AppResult<T> = std::result::Result<T, AppError>;
