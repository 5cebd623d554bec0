//! ドメイン層
//!
//! - archive: tweets.jsの解析とキャッシュ
//! - filter: パターン照合・ページ分割・集計
//! - pattern: サイトパターンとキーワードの管理
//! - credentials: APIキーの管理
//! - deletion: 投稿の削除とエラーメッセージの翻訳

pub mod archive;
pub mod credentials;
pub mod deletion;
pub mod filter;
pub mod pattern;
