//! インフラ層
//!
//! ファイル入出力、文字列の解析、ハッシュ計算、外部APIクライアントなど
//! ドメインに依存しない基盤機能をまとめる。

pub mod api;
pub mod compute;
pub mod loader;
pub mod parser;
pub mod storage;
