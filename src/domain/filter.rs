use crate::domain::archive::{Record, UrlEntity};
use crate::domain::pattern::PatternSet;
use crate::types::{AppError, AppResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

/// 絞り込みに一致した投稿と、一致したパターン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMatch<'a> {
    pub record: &'a Record,
    pub matched_sites: Vec<String>,
    pub matched_keywords: Vec<String>,
}

// 照合用に小文字化したパターン（元の表記も保持する）
struct LoweredPatterns<'p> {
    sites: Vec<(&'p str, String)>,
    keywords: Vec<(&'p str, String)>,
}

impl<'p> LoweredPatterns<'p> {
    fn new(sites: &'p [String], keywords: &'p [String]) -> Self {
        Self {
            sites: sites.iter().map(|p| (p.as_str(), p.to_lowercase())).collect(),
            keywords: keywords
                .iter()
                .map(|k| (k.as_str(), k.to_lowercase()))
                .collect(),
        }
    }

    fn matches(&self, record: &Record) -> (Vec<String>, Vec<String>) {
        let text = record.text.to_lowercase();
        let expanded_urls: Vec<String> = record
            .urls
            .iter()
            .map(|u| u.expanded_url.to_lowercase())
            .collect();

        let matched_sites = self
            .sites
            .iter()
            .filter(|(_, lower)| {
                text.contains(lower.as_str()) || expanded_urls.iter().any(|u| u.contains(lower.as_str()))
            })
            .map(|(original, _)| original.to_string())
            .collect();

        let matched_keywords = self
            .keywords
            .iter()
            .filter(|(_, lower)| text.contains(lower.as_str()))
            .map(|(original, _)| original.to_string())
            .collect();

        (matched_sites, matched_keywords)
    }
}

/// 1件の投稿に一致するサイトパターンとキーワードを返す
///
/// 大文字小文字は区別しない。サイトパターンは本文と展開後URLの両方、
/// キーワードは本文のみに対して部分一致で照合する。
pub fn match_record(record: &Record, sites: &[String], keywords: &[String]) -> (Vec<String>, Vec<String>) {
    LoweredPatterns::new(sites, keywords).matches(record)
}

/// # 概要
/// パターンに一致する投稿をアーカイブ順に抽出する。
///
/// ## 動作
/// - 削除済みIDの投稿は照合前に除外
/// - サイトパターンかキーワードのどれか1つ以上に一致した投稿のみ残す
/// - `search`が空でなければ、さらに本文に含むものだけに絞り込む
///
/// ## 引数
/// - `records`: アーカイブの投稿一覧
/// - `patterns`: サイトパターンとキーワード
/// - `deleted_ids`: このセッションで削除したID
/// - `search`: 追加の検索文字列（前後の空白は無視）
pub fn filter_records<'a>(
    records: &'a [Record],
    patterns: &PatternSet,
    deleted_ids: &HashSet<String>,
    search: &str,
) -> Vec<RecordMatch<'a>> {
    let lowered = LoweredPatterns::new(&patterns.sites, &patterns.keywords);
    let search = search.trim().to_lowercase();

    records
        .iter()
        .filter(|record| !deleted_ids.contains(&record.id))
        .filter_map(|record| {
            let (matched_sites, matched_keywords) = lowered.matches(record);
            if matched_sites.is_empty() && matched_keywords.is_empty() {
                return None;
            }
            if !search.is_empty() && !record.text.to_lowercase().contains(&search) {
                return None;
            }
            Some(RecordMatch {
                record,
                matched_sites,
                matched_keywords,
            })
        })
        .collect()
}

/// 一覧表示用の投稿
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordView {
    pub id: String,
    pub text: String,
    pub created_at: String,
    /// `created_at`をRFC 3339に変換したもの（解釈できない場合は`None`）
    pub timestamp: Option<String>,
    pub source: String,
    pub matched_sites: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub urls: Vec<UrlEntity>,
}

impl From<&RecordMatch<'_>> for RecordView {
    fn from(m: &RecordMatch<'_>) -> Self {
        Self {
            id: m.record.id.clone(),
            text: m.record.text.clone(),
            created_at: m.record.created_at.clone(),
            timestamp: m.record.timestamp().map(|t| t.to_rfc3339()),
            source: m.record.source_label(),
            matched_sites: m.matched_sites.clone(),
            matched_keywords: m.matched_keywords.clone(),
            urls: m.record.urls.clone(),
        }
    }
}

/// 一覧取得の条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// 1始まりのページ番号
    pub page: usize,
    /// 1ページあたりの件数（1〜200）
    pub limit: usize,
    pub search: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_SIZE,
            search: None,
        }
    }
}

impl PageQuery {
    pub fn validate(&self) -> AppResult<()> {
        if self.page < 1 {
            return Err(AppError::invalid_request("pageは1以上を指定してください"));
        }
        if self.limit < 1 || self.limit > MAX_PAGE_SIZE {
            return Err(AppError::invalid_request(format!(
                "limitは1以上{}以下を指定してください",
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }
}

/// ページ分割された結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub pages: usize,
    pub records: Vec<T>,
}

/// 総ページ数（最低1）
pub fn total_pages(total: usize, limit: usize) -> usize {
    if limit == 0 {
        return 1;
    }
    total.div_ceil(limit).max(1)
}

/// `(page-1)*limit`から`limit`件を切り出す
///
/// 範囲外のページは空の結果を返す。
pub fn paginate<T: Clone>(items: &[T], page: usize, limit: usize) -> Page<T> {
    let total = items.len();
    let start = page.saturating_sub(1).saturating_mul(limit).min(total);
    let end = start.saturating_add(limit).min(total);

    Page {
        total,
        page,
        limit,
        pages: total_pages(total, limit),
        records: items[start..end].to_vec(),
    }
}

/// パターンごとの一致件数などの集計結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub total_in_archive: usize,
    pub matched: usize,
    pub deleted_this_session: usize,
    pub by_site: BTreeMap<String, usize>,
    pub by_keyword: BTreeMap<String, usize>,
}

/// 一致状況を集計する（検索文字列による絞り込みは行わない）
pub fn compute_stats(
    records: &[Record],
    patterns: &PatternSet,
    deleted_ids: &HashSet<String>,
) -> MatchStats {
    let matched = filter_records(records, patterns, deleted_ids, "");

    let mut stats = MatchStats {
        total_in_archive: records.len(),
        matched: matched.len(),
        deleted_this_session: deleted_ids.len(),
        ..Default::default()
    };
    for m in &matched {
        for site in &m.matched_sites {
            *stats.by_site.entry(site.clone()).or_insert(0) += 1;
        }
        for keyword in &m.matched_keywords {
            *stats.by_keyword.entry(keyword.clone()).or_insert(0) += 1;
        }
    }
    stats
}
