//! コマンドライン／対話シェルの定義と実行
//!
//! 各サブコマンドは`Session`の操作に1対1で対応し、結果をJSONで出力する。
//! `shell`サブコマンドは1つのセッションを保ったまま複数のコマンドを実行できるため、
//! 削除した投稿がプロセス終了まで一覧から除外される。

use crate::app::session::Session;
use crate::domain::credentials::Credentials;
use crate::domain::filter::{PageQuery, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use crate::infra::api::x::PlatformClient;
use crate::types::{AppError, AppResult, InfraError};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "xsweep", version, about = "Xのアーカイブから条件に一致する投稿を探して一括削除する")]
pub struct Cli {
    /// tweets.js・credentials.json・filters.jsonを置くディレクトリ
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// デバッグログを出力する
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// APIキーを登録する
    Login {
        #[arg(long, env = "X_CONSUMER_KEY", hide_env_values = true)]
        consumer_key: String,
        #[arg(long, env = "X_CONSUMER_SECRET", hide_env_values = true)]
        consumer_secret: String,
        #[arg(long, env = "X_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
        #[arg(long, env = "X_ACCESS_TOKEN_SECRET", hide_env_values = true)]
        access_token_secret: String,
    },
    /// 登録済みのAPIキーを破棄する
    Logout,
    /// 認証状態を表示する
    Status,
    /// サイトパターンの一覧・追加・削除
    Sites {
        #[command(subcommand)]
        action: Option<PatternAction>,
    },
    /// キーワードの一覧・追加・削除
    Keywords {
        #[command(subcommand)]
        action: Option<PatternAction>,
    },
    /// 新しいtweets.jsを取り込む
    Upload { file: PathBuf },
    /// 条件に一致する投稿を表示する
    List {
        #[arg(long, default_value_t = DEFAULT_PAGE)]
        page: usize,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: usize,
        #[arg(long)]
        search: Option<String>,
    },
    /// 一致状況を集計する
    Stats,
    /// 指定IDの投稿を削除する
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// 対話シェルを起動する
    Shell,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum PatternAction {
    /// パターンを追加する
    Add { pattern: String },
    /// パターンを削除する
    Remove { pattern: String },
}

// 対話シェルの1行分
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

fn to_json<T: Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::from(InfraError::serialization("コマンド結果の変換", e)))
}

/// コマンドを実行し、結果をJSONで返す
pub async fn execute<C: PlatformClient>(
    session: &mut Session<C>,
    command: Command,
) -> AppResult<serde_json::Value> {
    match command {
        Command::Login {
            consumer_key,
            consumer_secret,
            access_token,
            access_token_secret,
        } => {
            let credentials = Credentials::new(
                &consumer_key,
                &consumer_secret,
                &access_token,
                &access_token_secret,
            )?;
            to_json(&session.login(credentials)?)
        }
        Command::Logout => to_json(&session.logout()?),
        Command::Status => to_json(&session.status()),
        Command::Sites { action } => {
            let sites = match action {
                None => session.sites(),
                Some(PatternAction::Add { pattern }) => session.add_site(&pattern)?,
                Some(PatternAction::Remove { pattern }) => session.remove_site(&pattern)?,
            };
            Ok(serde_json::json!({ "sites": sites }))
        }
        Command::Keywords { action } => {
            let keywords = match action {
                None => session.keywords(),
                Some(PatternAction::Add { pattern }) => session.add_keyword(&pattern)?,
                Some(PatternAction::Remove { pattern }) => session.remove_keyword(&pattern)?,
            };
            Ok(serde_json::json!({ "keywords": keywords }))
        }
        Command::Upload { file } => {
            let bytes = std::fs::read(&file)
                .map_err(|e| InfraError::file_system(file.display().to_string(), e))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            to_json(&session.upload_archive(&filename, &bytes)?)
        }
        Command::List {
            page,
            limit,
            search,
        } => {
            let query = PageQuery {
                page,
                limit,
                search,
            };
            to_json(&session.list_records(&query)?)
        }
        Command::Stats => to_json(&session.stats()?),
        Command::Delete { ids } => to_json(&session.delete_records(&ids).await?),
        Command::Shell => Err(AppError::invalid_request("シェルの中でshellは実行できません")),
    }
}

/// 対話シェルの入力行を引数に分割する
///
/// 空白で区切り、ダブルクォートで囲んだ部分は1つの引数として扱う。
pub fn split_line(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

/// 実行結果を標準出力・標準エラーに書き出す
pub fn print_result(result: &AppResult<serde_json::Value>) {
    match result {
        Ok(value) => match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("結果の表示に失敗しました: {}", e),
        },
        Err(e) => eprintln!("エラー({}): {}", e.status_code(), e),
    }
}

/// 対話シェルを実行する
///
/// `exit`・`quit`または入力の終端で終了する。
pub async fn run_shell<C: PlatformClient>(session: &mut Session<C>) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("xsweep> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let args = split_line(&line?);
        match args.first().map(String::as_str) {
            None => continue,
            Some("exit") | Some("quit") => break,
            _ => {}
        }

        match ShellLine::try_parse_from(&args) {
            Ok(parsed) => print_result(&execute(session, parsed.command).await),
            Err(e) => {
                // clapのヘルプ・エラー表示をそのまま使う
                let _ = e.print();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::api::x::MockPlatformClient;
    use crate::types::AppConfig;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_split_line() {
            assert_eq!(split_line("keywords add sale"), vec!["keywords", "add", "sale"]);
            assert_eq!(
                split_line(r#"keywords add "big sale"  "#),
                vec!["keywords", "add", "big sale"]
            );
            assert_eq!(split_line(r#"sites add """#), vec!["sites", "add", ""]);
            assert!(split_line("   ").is_empty());
        }

        #[test]
        fn test_parse_cli() {
            let cli = Cli::try_parse_from(["xsweep", "--data-dir", "/tmp/x", "list", "--page", "2"]).unwrap();
            assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
            assert_eq!(
                cli.command,
                Command::List {
                    page: 2,
                    limit: DEFAULT_PAGE_SIZE,
                    search: None
                }
            );

            let delete = Cli::try_parse_from(["xsweep", "delete"]);
            assert!(delete.is_err(), "IDなしのdeleteは拒否されるはず");
        }

        #[test]
        fn test_parse_shell_line() {
            let parsed = ShellLine::try_parse_from(split_line("sites remove example.com")).unwrap();
            assert_eq!(
                parsed.command,
                Command::Sites {
                    action: Some(PatternAction::Remove {
                        pattern: "example.com".to_string()
                    })
                }
            );
        }
    }

    mod execute_tests {
        use super::*;

        #[tokio::test]
        async fn test_execute_pattern_and_status_commands() {
            let dir = tempfile::tempdir().unwrap();
            let config = AppConfig::default().with_data_dir(dir.path());
            let mut session = Session::open(&config, MockPlatformClient::new());

            let value = execute(
                &mut session,
                Command::Keywords {
                    action: Some(PatternAction::Add {
                        pattern: "sale".to_string(),
                    }),
                },
            )
            .await
            .unwrap();
            assert_eq!(value, serde_json::json!({ "keywords": ["sale"] }));

            let status = execute(&mut session, Command::Status).await.unwrap();
            assert_eq!(status, serde_json::json!({ "authenticated": false }));

            let err = execute(&mut session, Command::Delete { ids: vec!["1".into()] })
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), 401);
        }

        #[tokio::test]
        async fn test_execute_upload_and_list() {
            let dir = tempfile::tempdir().unwrap();
            let upload = dir.path().join("upload").join("tweets.js");
            std::fs::create_dir_all(upload.parent().unwrap()).unwrap();
            std::fs::write(
                &upload,
                r#"window.YTD.tweets.part0 = [{"tweet": {"id_str": "1", "full_text": "sale"}}]"#,
            )
            .unwrap();

            let config = AppConfig::default().with_data_dir(dir.path());
            let mut session = Session::open(&config, MockPlatformClient::new());
            session.add_keyword("sale").unwrap();

            let summary = execute(&mut session, Command::Upload { file: upload }).await.unwrap();
            assert_eq!(summary["record_count"], 1);

            let listed = execute(
                &mut session,
                Command::List {
                    page: 1,
                    limit: 50,
                    search: None,
                },
            )
            .await
            .unwrap();
            assert_eq!(listed["total"], 1);
            assert_eq!(listed["pages"], 1);
            assert_eq!(listed["records"][0]["id"], "1");
        }
    }
}
