use crate::domain::archive::ArchiveCache;
use crate::domain::credentials::{CredentialStore, Credentials};
use crate::domain::deletion::{delete_batch, DeleteReport};
use crate::domain::filter::{compute_stats, filter_records, paginate, MatchStats, Page, PageQuery, RecordView};
use crate::domain::pattern::{PatternKind, PatternSet, PatternStore};
use crate::infra::api::x::PlatformClient;
use crate::types::{AppConfig, AppError, AppResult};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// 認証状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
}

/// アーカイブのアップロード結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub record_count: usize,
}

/// プロセス内で共有するセッション状態
///
/// 認証情報・パターン・アーカイブのキャッシュ・このセッションで削除したIDを保持し、
/// 各操作のハンドラには`&mut Session`を渡す。
/// 書き込みは1人の利用者から順番に行われる前提でロックを持たない。
pub struct Session<C> {
    client: C,
    credentials: Option<Credentials>,
    credential_store: CredentialStore,
    patterns: PatternSet,
    pattern_store: PatternStore,
    archive: ArchiveCache,
    deleted_ids: HashSet<String>,
}

impl<C: PlatformClient> Session<C> {
    /// 設定に従ってセッションを開始する
    ///
    /// 保存済みの認証情報とパターンがあれば読み込む。
    pub fn open(config: &AppConfig, client: C) -> Self {
        let credential_store = CredentialStore::new(config.credentials_path());
        let pattern_store = PatternStore::new(config.filters_path());

        let credentials = credential_store.load();
        let patterns = pattern_store.load().unwrap_or_default();
        info!(
            authenticated = credentials.is_some(),
            sites = patterns.sites.len(),
            keywords = patterns.keywords.len(),
            "セッションを開始しました"
        );

        Self {
            client,
            credentials,
            credential_store,
            patterns,
            pattern_store,
            archive: ArchiveCache::new(config.archive_path()),
            deleted_ids: HashSet::new(),
        }
    }

    #[cfg(test)]
    fn client(&self) -> &C {
        &self.client
    }

    // ── 認証 ───────────────────────────────────────────

    /// 認証情報を登録し、ファイルに保存する
    ///
    /// 空の項目がある場合は保存せずに検証エラーを返す。
    pub fn login(&mut self, credentials: Credentials) -> AppResult<AuthStatus> {
        if !credentials.is_complete() {
            return Err(AppError::invalid_request("APIキーの4項目を全て入力してください"));
        }
        self.credential_store.save(&credentials)?;
        self.credentials = Some(credentials);
        info!("認証情報を登録しました");
        Ok(self.status())
    }

    /// 認証情報を破棄し、保存ファイルも削除する
    pub fn logout(&mut self) -> AppResult<AuthStatus> {
        self.credentials = None;
        self.credential_store.clear()?;
        info!("認証情報を破棄しました");
        Ok(self.status())
    }

    pub fn status(&self) -> AuthStatus {
        AuthStatus {
            authenticated: self.credentials.is_some(),
        }
    }

    // ── パターン ─────────────────────────────────────────

    pub fn sites(&self) -> &[String] {
        self.patterns.get(PatternKind::Site)
    }

    pub fn keywords(&self) -> &[String] {
        self.patterns.get(PatternKind::Keyword)
    }

    pub fn add_site(&mut self, pattern: &str) -> AppResult<&[String]> {
        self.add_pattern(PatternKind::Site, pattern)
    }

    pub fn remove_site(&mut self, pattern: &str) -> AppResult<&[String]> {
        self.remove_pattern(PatternKind::Site, pattern)
    }

    pub fn add_keyword(&mut self, keyword: &str) -> AppResult<&[String]> {
        self.add_pattern(PatternKind::Keyword, keyword)
    }

    pub fn remove_keyword(&mut self, keyword: &str) -> AppResult<&[String]> {
        self.remove_pattern(PatternKind::Keyword, keyword)
    }

    /// パターンを追加する。追加された場合のみファイルを書き換える
    pub fn add_pattern(&mut self, kind: PatternKind, pattern: &str) -> AppResult<&[String]> {
        if self.patterns.add(kind, pattern)? {
            self.pattern_store.save(&self.patterns)?;
            info!(kind = kind.label(), pattern = pattern.trim(), "パターンを追加しました");
        }
        Ok(self.patterns.get(kind))
    }

    /// パターンを削除する。削除された場合のみファイルを書き換える
    pub fn remove_pattern(&mut self, kind: PatternKind, pattern: &str) -> AppResult<&[String]> {
        if self.patterns.remove(kind, pattern) {
            self.pattern_store.save(&self.patterns)?;
            info!(kind = kind.label(), pattern = pattern.trim(), "パターンを削除しました");
        }
        Ok(self.patterns.get(kind))
    }

    // ── アーカイブ ───────────────────────────────────────

    /// 新しいアーカイブに置き換える
    ///
    /// 検証に失敗した場合は現在のアーカイブとキャッシュをそのまま残す。
    pub fn upload_archive(&mut self, filename: &str, bytes: &[u8]) -> AppResult<UploadSummary> {
        let record_count = self.archive.replace(filename, bytes)?;
        Ok(UploadSummary { record_count })
    }

    /// パターンに一致する投稿をページ単位で返す
    pub fn list_records(&mut self, query: &PageQuery) -> AppResult<Page<RecordView>> {
        query.validate()?;
        if self.patterns.is_empty() {
            debug!("サイトパターンとキーワードが未登録のため一致する投稿はありません");
        }
        let records = self.archive.records()?;
        let matched = filter_records(
            records,
            &self.patterns,
            &self.deleted_ids,
            query.search.as_deref().unwrap_or(""),
        );

        let views: Vec<RecordView> = matched.iter().map(RecordView::from).collect();
        Ok(paginate(&views, query.page, query.limit))
    }

    /// 一致状況の集計を返す
    pub fn stats(&mut self) -> AppResult<MatchStats> {
        let records = self.archive.records()?;
        Ok(compute_stats(records, &self.patterns, &self.deleted_ids))
    }

    // ── 削除 ─────────────────────────────────────────────

    /// 指定IDの投稿を順番に削除する
    ///
    /// 認証情報が未登録の場合は何もせずにエラーを返す。
    /// 削除できたIDは以降の一覧から除外される（アーカイブファイルは変更しない）。
    pub async fn delete_records(&mut self, ids: &[String]) -> AppResult<DeleteReport> {
        let credentials = self.credentials.as_ref().ok_or(AppError::Unauthenticated)?;

        let ids: Vec<String> = ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(AppError::invalid_request("削除する投稿IDが指定されていません"));
        }

        let deleted_ids = &mut self.deleted_ids;
        let report = delete_batch(&self.client, credentials, &ids, |id| {
            deleted_ids.insert(id.to_string());
        })
        .await;
        Ok(report)
    }
}
