//! アプリケーションのエントリポイントとランタイム初期化。

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;

mod app;
mod backend;
mod config;
mod error;
mod events;
mod files;
mod input;
mod jobs;
mod layout;
mod selection;
mod shortcuts;
mod submission;
mod surface;
#[cfg(test)]
mod testing;
mod ui;
mod worker;
mod workflow;

use config::Config;
use shortcuts::Shortcuts;

/// ログを`dir`内のファイルへ非同期で書き出す。返したガードが生きている間だけ書き込まれる。
fn init_logging(dir: &Path) -> Result<WorkerGuard> {
    const LOG_FILE: &str = "image_upload_tui.log";
    // TUIの画面を崩さないよう標準出力には出さない。
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));
    let level = if cfg!(debug_assertions) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    tracing::info!("logging to {}", dir.join(LOG_FILE).display());
    Ok(guard)
}

/// 設定ファイルのパスを引数から決める（省略時は config.toml）。
fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[tokio::main]
/// エントリポイント：ログ初期化→設定読み込み→UI開始→端末復元。
async fn main() -> Result<()> {
    // ログは設定ファイルと同じ場所に置く。
    let cfg_path = config_path();
    let log_dir = match cfg_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let _log_guard = init_logging(&log_dir)?;
    tracing::info!("app starting");

    // 端末を切り替える前に設定を検証し、エラーは通常の標準エラーに出す。
    let cfg = Config::load_or_default(&cfg_path)
        .with_context(|| format!("invalid config {}", cfg_path.display()))?;
    let shortcuts = Shortcuts::load_or_default(log_dir.join("shortcut.toml"))?;
    tracing::info!("config loaded from {}", cfg_path.display());

    // TUI用の端末状態へ切り替えてメインループを実行する。
    let mut terminal = ui::init_terminal()?;
    let res = app::run_app(&mut terminal, cfg, shortcuts).await;
    // 端末の状態を必ず元に戻す。
    ui::restore_terminal()?;
    if let Err(ref e) = res {
        tracing::error!("app error: {e:#}");
    }
    tracing::info!("app exiting");
    res
}
