use crate::infra::storage::file::{load_json_from_file, save_json_to_file};
use crate::types::{AppError, AppResult, InfraResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// パターンの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// 本文または展開後URLに対して照合するサイトパターン
    Site,
    /// 本文に対して照合するキーワード
    Keyword,
}

impl PatternKind {
    pub fn label(&self) -> &'static str {
        match self {
            PatternKind::Site => "サイト",
            PatternKind::Keyword => "キーワード",
        }
    }
}

/// 絞り込みに使うサイトパターンとキーワードの組
///
/// どちらも追加順を保ち、重複を持たない。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSet {
    pub sites: Vec<String>,
    pub keywords: Vec<String>,
}

/// パターン文字列を正規化する（前後の空白を除去し、空なら検証エラー）
fn normalize(pattern: &str) -> AppResult<String> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_request("パターンを入力してください"));
    }
    Ok(trimmed.to_string())
}

impl PatternSet {
    /// 空白を除去し、空のパターンと重複を取り除いた組を作る
    pub fn new(sites: Vec<String>, keywords: Vec<String>) -> Self {
        let mut set = Self::default();
        for (kind, patterns) in [(PatternKind::Site, sites), (PatternKind::Keyword, keywords)] {
            for pattern in patterns.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
                set.insert(kind, pattern.to_string());
            }
        }
        set
    }

    pub fn get(&self, kind: PatternKind) -> &[String] {
        match kind {
            PatternKind::Site => &self.sites,
            PatternKind::Keyword => &self.keywords,
        }
    }

    fn get_mut(&mut self, kind: PatternKind) -> &mut Vec<String> {
        match kind {
            PatternKind::Site => &mut self.sites,
            PatternKind::Keyword => &mut self.keywords,
        }
    }

    /// パターンを追加する
    ///
    /// ## 戻り値
    /// - `Ok(true)`: 追加された
    /// - `Ok(false)`: 既に存在していた
    /// - `Err`: 空のパターン
    pub fn add(&mut self, kind: PatternKind, pattern: &str) -> AppResult<bool> {
        let pattern = normalize(pattern)?;
        Ok(self.insert(kind, pattern))
    }

    // 正規化済みのパターンを末尾に追加する（重複なら何もしない）
    fn insert(&mut self, kind: PatternKind, pattern: String) -> bool {
        let list = self.get_mut(kind);
        if list.contains(&pattern) {
            return false;
        }
        list.push(pattern);
        true
    }

    /// パターンを削除する。存在しなければ何もしない
    ///
    /// ## 戻り値
    /// - 削除された場合は`true`
    pub fn remove(&mut self, kind: PatternKind, pattern: &str) -> bool {
        let pattern = pattern.trim();
        let list = self.get_mut(kind);
        match list.iter().position(|p| p == pattern) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty() && self.keywords.is_empty()
    }
}

/// filters.json への保存・読み込みを行う
#[derive(Debug, Clone)]
pub struct PatternStore {
    path: PathBuf,
}

impl PatternStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[cfg(test)]
    fn path(&self) -> &Path {
        &self.path
    }

    /// 保存済みのパターンを読み込む
    ///
    /// ファイルがない、または形式が不正な場合は`None`。
    /// 読み込んだ値は正規化（空白除去・重複除去）される。
    pub fn load(&self) -> Option<PatternSet> {
        if !self.path.exists() {
            return None;
        }
        match load_json_from_file::<PatternSet>(&self.path) {
            Ok(set) => Some(PatternSet::new(set.sites, set.keywords)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "フィルターファイルを読み込めないため無視します");
                None
            }
        }
    }

    pub fn save(&self, patterns: &PatternSet) -> InfraResult<()> {
        save_json_to_file(&self.path, patterns)?;
        debug!(
            path = %self.path.display(),
            sites = patterns.sites.len(),
            keywords = patterns.keywords.len(),
            "フィルターを保存しました"
        );
        Ok(())
    }
}
