use crate::domain::credentials::Credentials;
use crate::infra::api::x::{ApiFailure, DestroyOutcome, PlatformClient};
use crate::types::{AppError, AppResult};
use serde::Serialize;
use tracing::{debug, info, warn};

/// XのAPIエラーコードと利用者向けメッセージの対応表
const API_ERROR_MESSAGES: &[(i64, &str)] = &[
    (32, "認証に失敗しました。APIキーを確認してください。"),
    (64, "アカウントが凍結されています。"),
    (88, "レート制限を超えました。15分ほど待ってから再試行してください。"),
    (89, "アクセストークンが期限切れか無効化されています。トークンを再発行してください。"),
    (135, "タイムスタンプが範囲外です。システムの時計を確認してください。"),
    (144, "投稿が見つかりません（既に削除されている可能性があります）。"),
    (179, "この投稿を閲覧する権限がありません。"),
    (185, "1日の投稿上限に達しました。"),
    (226, "自動化されたスパムと判定されました。時間をおいて再試行してください。"),
    (261, "アプリの書き込み権限が無効です。Developer PortalでRead+Writeを有効にしてください。"),
    (326, "アカウントがロックされています。先にXのサイトでアカウントを確認してください。"),
    (401, "認証されていません。APIキーが無効か期限切れの可能性があります。"),
    (403, "権限がありません。アプリにRead+Write権限があるか確認してください。"),
];

/// エラーコードに対応するメッセージを返す
pub fn known_error_message(code: i64) -> Option<&'static str> {
    API_ERROR_MESSAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, msg)| *msg)
}

/// APIのエラー内容を利用者向けメッセージに変換する
///
/// 対応表にないコード、またはコードがない場合は生のエラーテキストを返す。
pub fn friendly_error(failure: &ApiFailure) -> String {
    failure
        .code
        .and_then(known_error_message)
        .map(str::to_string)
        .unwrap_or_else(|| failure.message.clone())
}

/// 削除に失敗したID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDeletion {
    pub id: String,
    pub error: String,
}

/// 一括削除の結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// 削除できたID（既に存在しなかったものを含む）
    pub deleted: Vec<String>,
    /// 削除できなかったIDとエラーメッセージ
    pub failed: Vec<FailedDeletion>,
}

impl DeleteReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl std::fmt::Display for DeleteReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "削除完了: 成功{}件、失敗{}件",
            self.deleted.len(),
            self.failed.len()
        )
    }
}

/// 1件の投稿を削除する
///
/// 「見つからない」は削除済みとして成功扱いにする。
/// それ以外のAPIエラーは翻訳済みメッセージの`AppError::Platform`になる。
pub async fn delete_record<C: PlatformClient + ?Sized>(
    client: &C,
    credentials: &Credentials,
    id: &str,
) -> AppResult<()> {
    let outcome = client
        .destroy_status(credentials, id)
        .await
        .map_err(|e| AppError::platform(format!("予期しないエラー: {:#}", e)))?;

    match outcome {
        DestroyOutcome::Destroyed => {
            debug!(id = id, "投稿を削除しました");
            Ok(())
        }
        DestroyOutcome::NotFound => {
            debug!(id = id, "投稿が見つからないため削除済みとして扱います");
            Ok(())
        }
        DestroyOutcome::Rejected(failure) => {
            Err(AppError::platform(friendly_error(&failure)))
        }
    }
}

/// # 概要
/// 複数の投稿を順番に削除する。
///
/// ## 動作
/// - 各IDは独立して処理し、1件の失敗で全体を中断しない
/// - 削除できたIDは`on_deleted`に渡す
///
/// ## 戻り値
/// - `DeleteReport`: 成功・失敗したIDの内訳
pub async fn delete_batch<C, F>(
    client: &C,
    credentials: &Credentials,
    ids: &[String],
    mut on_deleted: F,
) -> DeleteReport
where
    C: PlatformClient + ?Sized,
    F: FnMut(&str),
{
    let mut report = DeleteReport::default();

    for id in ids {
        match delete_record(client, credentials, id).await {
            Ok(()) => {
                on_deleted(id);
                report.deleted.push(id.clone());
            }
            Err(e) => {
                warn!(id = %id, error = %e, "投稿の削除に失敗しました");
                report.failed.push(FailedDeletion {
                    id: id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    if report.is_complete_success() {
        info!(deleted = report.deleted.len(), "{}", report);
    } else {
        warn!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "{}",
            report
        );
    }
    report
}
