use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use xsweep::app::session::Session;
use xsweep::cli::{execute, print_result, run_shell, Cli, Command};
use xsweep::infra::api::x::ReqwestPlatformClient;
use xsweep::types::AppConfig;

const EVENT_FILTER_ENV_VAR: &str = "RUST_LOG";

/// ログ出力を初期化する（RUST_LOGが設定されていればそちらを優先）
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = std::env::var(EVENT_FILTER_ENV_VAR)
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("xsweep={}", level)));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_env_filter(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 環境変数を読み込み（.envファイルがあれば使用）
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AppConfig::from_env().context("設定の読み込みに失敗しました")?;
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    tracing::debug!(?config, "設定を読み込みました");

    let client = ReqwestPlatformClient::new(&config.api_base_url, config.http_timeout_secs);
    let mut session = Session::open(&config, client);

    match cli.command {
        Command::Shell => run_shell(&mut session).await,
        command => {
            let result = execute(&mut session, command).await;
            print_result(&result);
            if result.is_err() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
