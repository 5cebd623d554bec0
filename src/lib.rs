//! xsweep
//!
//! Xの全データアーカイブ（tweets.js）を読み込み、サイトパターンとキーワードで
//! 投稿を絞り込んで、一致した投稿をAPI経由で一括削除する。

pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;
pub mod types;
