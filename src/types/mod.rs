//! 型定義モジュール
//!
//! アプリケーション全体で使用される共通的な型定義を管理します。
//! - インフラ層のエラー型: ファイル操作・シリアライゼーション
//! - アプリケーション層のエラー型: アーカイブ読み込みや認証状態のエラー
//! - 設定型: 環境変数から読み込む設定値

pub mod config;
pub mod error;
pub mod infra;

// 便利な再エクスポート
pub use config::{AppConfig, ConfigError, ConfigResult};
pub use error::{AppError, AppResult, ArchiveError};
pub use infra::{InfraError, InfraResult};
