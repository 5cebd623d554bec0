use crate::infra::loader::load_text;
use crate::infra::parser::{parse_archive_date, strip_archive_prefix, strip_html_tags};
use crate::infra::storage::file::save_bytes_to_file;
use crate::types::{AppError, AppResult, ArchiveError, InfraError};
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// アーカイブ要素の中で投稿本体を持つキー
const RECORD_KEY: &str = "tweet";

/// 投稿に含まれるURL（短縮URL・展開後URL・表示用URL）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEntity {
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub expanded_url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_url: String,
}

/// アーカイブに含まれる1件の投稿
///
/// 読み込み後は変更しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub source: String,
    pub urls: Vec<UrlEntity>,
}

impl Record {
    /// `created_at`を日時として解釈する（解釈できない場合は`None`）
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_archive_date(&self.created_at).ok()
    }

    /// HTMLタグを取り除いた投稿元クライアント名
    pub fn source_label(&self) -> String {
        strip_html_tags(&self.source)
    }
}

/// 文字列フィールドを寛容に読み込む
///
/// `null`は空文字列、数値・真偽値は文字列表現として扱う。
/// オブジェクトや配列は形式エラーにする。
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(de::Error::custom(format!(
            "文字列が必要です: {}",
            other
        ))),
    }
}

// tweets.js内の投稿オブジェクトの構造に対応する型
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    id_str: String,
    #[serde(default, deserialize_with = "lenient_string")]
    full_text: String,
    #[serde(default, deserialize_with = "lenient_string")]
    created_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    source: String,
    #[serde(default)]
    entities: Option<RawEntities>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEntities {
    #[serde(default)]
    urls: Option<Vec<UrlEntity>>,
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        Self {
            id: raw.id_str,
            text: raw.full_text,
            created_at: raw.created_at,
            source: raw.source,
            urls: raw.entities.and_then(|e| e.urls).unwrap_or_default(),
        }
    }
}

/// ラッパーを取り除いた本文をJSON配列として解析する
fn parse_archive_array(content: &str) -> Result<Vec<serde_json::Value>, ArchiveError> {
    let value: serde_json::Value =
        serde_json::from_str(strip_archive_prefix(content)).map_err(ArchiveError::malformed_json)?;

    match value {
        serde_json::Value::Array(items) => Ok(items),
        _ => Err(ArchiveError::unexpected_shape(
            "JSON配列である必要があります",
        )),
    }
}

/// アーカイブ本文を解析して投稿の一覧を返す
///
/// `tweet`キーを持たない要素は読み飛ばす。
pub fn parse_archive(content: &str) -> Result<Vec<Record>, ArchiveError> {
    let items = parse_archive_array(content)?;

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if let Some(inner) = item.get(RECORD_KEY) {
            let raw = RawRecord::deserialize(inner).map_err(|e| {
                ArchiveError::unexpected_shape(format!("{}番目の要素を解釈できません: {}", index, e))
            })?;
            records.push(Record::from(raw));
        }
    }

    Ok(records)
}

/// アーカイブファイルを読み込んで解析する
pub fn load_archive(path: &Path) -> Result<Vec<Record>, ArchiveError> {
    let path_str = path.display().to_string();
    if !path.exists() {
        return Err(ArchiveError::not_found(path_str));
    }

    let content = load_text(path).map_err(|e| match e {
        e if e.is_not_found() => ArchiveError::not_found(path_str.clone()),
        InfraError::FileSystem { source, .. } => ArchiveError::unreadable(path_str.clone(), source),
        other => ArchiveError::unreadable(
            path_str.clone(),
            std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        ),
    })?;

    parse_archive(&content)
}

/// アップロードされたアーカイブを検証し、投稿件数を返す
///
/// ## 検証内容
/// - ファイル名が`.js`で終わる
/// - UTF-8としてデコードできる
/// - `load_archive`と同じ解析が全要素で成功する
pub fn validate_archive_upload(filename: &str, bytes: &[u8]) -> AppResult<usize> {
    if filename.trim().is_empty() || !filename.ends_with(".js") {
        return Err(AppError::invalid_request(
            ".jsファイル（アーカイブ内のtweets.js）をアップロードしてください",
        ));
    }

    let content = std::str::from_utf8(bytes)
        .map_err(|_| AppError::invalid_request("ファイルはUTF-8でエンコードされている必要があります"))?;

    let records = parse_archive(content)?;
    Ok(records.len())
}

struct CacheEntry {
    generation: u64,
    records: Vec<Record>,
}

/// 読み込んだアーカイブのキャッシュ
///
/// 初回アクセス時にファイルを読み込み、`invalidate`されるまで保持する。
/// 無効化のたびに世代番号が進む。
pub struct ArchiveCache {
    path: PathBuf,
    entry: Option<CacheEntry>,
    generation: u64,
}

impl ArchiveCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entry: None,
            generation: 0,
        }
    }

    #[cfg(test)]
    fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg(test)]
    fn is_loaded(&self) -> bool {
        self.entry.is_some()
    }

    /// キャッシュ済みの投稿一覧を返す（未読み込みならファイルから読み込む）
    ///
    /// 読み込みに失敗した場合はキャッシュを変更しない。
    pub fn records(&mut self) -> Result<&[Record], ArchiveError> {
        let stale = self
            .entry
            .as_ref()
            .map_or(true, |entry| entry.generation != self.generation);

        if stale {
            let records = load_archive(&self.path)?;
            info!(
                path = %self.path.display(),
                count = records.len(),
                generation = self.generation,
                "アーカイブを読み込みました"
            );
            self.entry = Some(CacheEntry {
                generation: self.generation,
                records,
            });
        }

        Ok(self
            .entry
            .as_ref()
            .map(|entry| entry.records.as_slice())
            .unwrap_or(&[]))
    }

    /// キャッシュを破棄し、次回アクセス時に読み込み直す
    pub fn invalidate(&mut self) {
        self.entry = None;
        self.generation += 1;
        debug!(generation = self.generation, "アーカイブのキャッシュを無効化しました");
    }

    /// アップロードされたアーカイブで置き換える
    ///
    /// 検証に失敗した場合はファイルもキャッシュも変更しない。
    ///
    /// ## 戻り値
    /// - アップロードされたアーカイブの投稿件数
    pub fn replace(&mut self, filename: &str, bytes: &[u8]) -> AppResult<usize> {
        let count = validate_archive_upload(filename, bytes)?;
        save_bytes_to_file(&self.path, bytes)?;
        self.invalidate();
        info!(path = %self.path.display(), count = count, "アーカイブを置き換えました");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_ARCHIVE: &str = r#"window.YTD.tweets.part0 = [
  {
    "tweet" : {
      "id_str" : "100",
      "full_text" : "Read this https://t.co/abc",
      "created_at" : "Wed Oct 10 20:19:24 +0000 2018",
      "source" : "<a href=\"https://mobile.twitter.com\" rel=\"nofollow\">Twitter Web App</a>",
      "entities" : {
        "urls" : [
          {
            "url" : "https://t.co/abc",
            "expanded_url" : "https://www.example.com/post/1",
            "display_url" : "example.com/post/1"
          }
        ]
      }
    }
  },
  { "like" : { "tweetId" : "5" } },
  {
    "tweet" : {
      "id_str" : "200",
      "full_text" : "Big SALE today"
    }
  }
]"#;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_sample_archive() {
            let records = parse_archive(SAMPLE_ARCHIVE).expect("アーカイブの解析に失敗");

            // tweetキーを持たない要素は読み飛ばされる
            assert_eq!(records.len(), 2, "2件の投稿が抽出されるはず");
            assert_eq!(records[0].id, "100");
            assert_eq!(records[0].urls.len(), 1);
            assert_eq!(records[0].urls[0].expanded_url, "https://www.example.com/post/1");
            assert_eq!(records[0].source_label(), "Twitter Web App");
            assert!(records[0].timestamp().is_some());

            // 欠けているフィールドは空になる
            assert_eq!(records[1].id, "200");
            assert!(records[1].urls.is_empty());
            assert_eq!(records[1].created_at, "");
            assert!(records[1].timestamp().is_none());
        }

        #[test]
        fn test_parse_without_prefix() {
            let records = parse_archive(r#"[{"tweet": {"id_str": "1"}}]"#).unwrap();
            assert_eq!(records.len(), 1);
        }

        #[test]
        fn test_parse_malformed_json() {
            let result = parse_archive("window.YTD.tweets.part0 = [{");
            assert!(matches!(result, Err(ArchiveError::MalformedJson { .. })));
        }

        #[test]
        fn test_parse_wrong_top_level_shape() {
            let result = parse_archive(r#"window.YTD.tweets.part0 = {"tweet": {}}"#);
            assert!(matches!(result, Err(ArchiveError::UnexpectedShape { .. })));
        }

        #[test]
        fn test_parse_wrong_inner_shape() {
            let result = parse_archive(r#"[{"tweet": "not an object"}]"#);
            assert!(matches!(result, Err(ArchiveError::UnexpectedShape { .. })));

            let nested = parse_archive(r#"[{"tweet": {"id_str": "1", "full_text": {"a": 1}}}]"#);
            assert!(matches!(nested, Err(ArchiveError::UnexpectedShape { .. })));
        }

        #[test]
        fn test_parse_tolerates_odd_scalar_values() {
            let records = parse_archive(
                r#"[{"tweet": {"id_str": 12, "full_text": null, "source": true,
                    "entities": {"urls": [{"url": null, "expanded_url": "https://example.com"}]}}},
                   {"tweet": {"id_str": "13", "entities": null}}]"#,
            )
            .unwrap();

            assert_eq!(records[0].id, "12");
            assert_eq!(records[0].text, "");
            assert_eq!(records[0].source, "true");
            assert_eq!(records[0].urls[0].url, "");
            assert_eq!(records[0].urls[0].expanded_url, "https://example.com");
            assert!(records[1].urls.is_empty());
        }
    }

    mod load_tests {
        use super::*;

        #[test]
        fn test_load_missing_file() {
            let dir = tempfile::tempdir().unwrap();
            let result = load_archive(&dir.path().join("tweets.js"));
            assert!(matches!(result, Err(ArchiveError::NotFound { .. })));
        }

        #[test]
        fn test_load_unreadable_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tweets.js");
            std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

            let result = load_archive(&path);
            assert!(matches!(result, Err(ArchiveError::Unreadable { .. })));
        }
    }

    mod upload_tests {
        use super::*;

        #[test]
        fn test_validate_upload_counts_records() {
            let count = validate_archive_upload("tweets.js", SAMPLE_ARCHIVE.as_bytes()).unwrap();
            assert_eq!(count, 2);
        }

        #[test]
        fn test_validate_upload_rejects_bad_input() {
            let wrong_name = validate_archive_upload("tweets.json", b"[]");
            assert!(matches!(wrong_name, Err(AppError::InvalidRequest { .. })));

            let not_utf8 = validate_archive_upload("tweets.js", &[0xff, 0xfe]);
            assert!(matches!(not_utf8, Err(AppError::InvalidRequest { .. })));

            let bad_json = validate_archive_upload("tweets.js", b"window.YTD.tweets.part0 = [");
            assert!(matches!(
                bad_json,
                Err(AppError::Archive(ArchiveError::MalformedJson { .. }))
            ));

            let not_array = validate_archive_upload("tweets.js", b"{}");
            assert_eq!(not_array.unwrap_err().status_code(), 400);
        }

        #[test]
        fn test_validate_upload_parses_every_record() {
            // 配列であっても読み込めない要素があれば受け付けない
            let bad_record = validate_archive_upload(
                "tweets.js",
                br#"window.YTD.tweets.part0 = [{"tweet": {"id_str": "1"}}, {"tweet": "x"}]"#,
            );
            assert!(matches!(
                bad_record,
                Err(AppError::Archive(ArchiveError::UnexpectedShape { .. }))
            ));

            // 受け付けたアーカイブは必ず読み込める
            let bytes = br#"[{"tweet": {"id_str": 12, "full_text": "sale"}}]"#;
            assert_eq!(validate_archive_upload("tweets.js", bytes).unwrap(), 1);
            let content = std::str::from_utf8(bytes).unwrap();
            assert_eq!(parse_archive(content).unwrap()[0].id, "12");
        }
    }

    mod cache_tests {
        use super::*;

        #[test]
        fn test_cache_loads_once_until_invalidated() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tweets.js");
            std::fs::write(&path, SAMPLE_ARCHIVE).unwrap();

            let mut cache = ArchiveCache::new(&path);
            assert!(!cache.is_loaded());
            assert_eq!(cache.records().unwrap().len(), 2);
            assert!(cache.is_loaded());

            // ファイルを書き換えてもキャッシュが使われる
            std::fs::write(&path, "[]").unwrap();
            assert_eq!(cache.records().unwrap().len(), 2);

            cache.invalidate();
            assert_eq!(cache.generation(), 1);
            assert_eq!(cache.records().unwrap().len(), 0);
        }

        #[test]
        fn test_malformed_upload_keeps_cache() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tweets.js");
            std::fs::write(&path, SAMPLE_ARCHIVE).unwrap();

            let mut cache = ArchiveCache::new(&path);
            assert_eq!(cache.records().unwrap().len(), 2);

            let result = cache.replace("tweets.js", b"window.YTD.tweets.part0 = {broken");
            assert!(result.is_err(), "不正なアーカイブでエラーにならなかった");

            // キャッシュ・世代・ファイル内容は変わらない
            assert_eq!(cache.generation(), 0);
            assert_eq!(cache.records().unwrap().len(), 2);
            assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE_ARCHIVE);
        }

        #[test]
        fn test_upload_with_unloadable_record_keeps_cache() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tweets.js");
            std::fs::write(&path, SAMPLE_ARCHIVE).unwrap();

            let mut cache = ArchiveCache::new(&path);
            assert_eq!(cache.records().unwrap().len(), 2);

            let result = cache.replace("tweets.js", br#"[{"tweet": {"id_str": "1", "entities": {"urls": "x"}}}]"#);
            assert_eq!(result.unwrap_err().status_code(), 400);

            assert_eq!(cache.generation(), 0);
            assert_eq!(cache.records().unwrap().len(), 2);
            assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE_ARCHIVE);
        }

        #[test]
        fn test_replace_swaps_archive() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tweets.js");

            let mut cache = ArchiveCache::new(&path);
            assert!(matches!(cache.records(), Err(ArchiveError::NotFound { .. })));

            let count = cache.replace("tweets.js", SAMPLE_ARCHIVE.as_bytes()).unwrap();
            assert_eq!(count, 2);
            assert_eq!(cache.records().unwrap()[1].text, "Big SALE today");
        }
    }
}
