use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// アーカイブ先頭の代入文 `window.YTD.tweets.part0 = `
static ARCHIVE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^window\.YTD\.tweets\.\w+\s*=\s*").expect("固定の正規表現"));

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("固定の正規表現"));

/// Xのアーカイブで使われる日付形式（例: "Wed Oct 10 20:19:24 +0000 2018"）
const ARCHIVE_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// アーカイブ本文から代入文のラッパーを取り除き、JSON部分だけを返す
///
/// 前後の空白は先に取り除く。ラッパーがない場合はそのまま返す。
pub fn strip_archive_prefix(content: &str) -> &str {
    let trimmed = content.trim();
    match ARCHIVE_PREFIX.find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        None => trimmed,
    }
}

/// HTMLタグを取り除いたテキストを返す
///
/// `source` フィールドは `<a href="...">Twitter Web App</a>` の形で入っているため、
/// 表示用にクライアント名だけを取り出す。
pub fn strip_html_tags(raw: &str) -> String {
    HTML_TAG.replace_all(raw, "").trim().to_string()
}

/// アーカイブの日付文字列を`DateTime<Utc>`に変換する
///
/// # 戻り値
/// - `Ok(DateTime<Utc>)`: 解析が成功した場合
/// - `Err(anyhow::Error)`: 解析に失敗した場合
pub fn parse_archive_date(date_str: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(date_str.trim(), ARCHIVE_DATE_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| anyhow!("不正な日付形式: {}", date_str))
}
