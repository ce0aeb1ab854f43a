//! TUIのイベントループ、入力処理、状態管理。

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

use crate::{
    backend::HttpBackend,
    config::Config,
    events::{AppEvent, Disposer},
    input::PathInput,
    shortcuts::Shortcuts,
    surface::{SurfaceState, UiPhase},
    ui::Tui,
    workflow::Workflow,
};

use handlers::{handle_key, handle_paste, is_ctrl_c};
use render::draw;

/// ログパネルに保持する最大行数。
const LOG_CAPACITY: usize = 200;

/// 入力処理と描画で共有するアプリ状態。
pub struct App {
    /// メモリ上の現在設定。
    pub cfg: Config,
    /// コントローラが書き込むUIスロット。
    pub surface: SurfaceState,
    /// 選択・送信コントローラ。
    pub workflow: Workflow,
    /// 非同期タスクからの完了通知。
    pub events_rx: mpsc::Receiver<AppEvent>,
    /// 登録済みハンドラの解除ハンドル（dropで解除）。
    pub handlers: Vec<Disposer>,
    /// パス入力欄の状態（入力中はSome）。
    pub input_box: Option<PathInput>,
    /// ショートカットキー設定。
    pub shortcuts: Shortcuts,
    /// 右下パネルに表示するログ。
    pub log: Vec<String>,
    /// 画面下部のステータス文言。
    pub status: String,
    /// 直前に入力したパス（ファイル選択の初期値）。
    pub last_path: String,
    /// スピナー用のフレームカウンタ。
    pub frame: usize,
}

impl App {
    /// タイムスタンプ付きでログを追加する。
    pub fn push_log(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!("ui: {line}");
        // 表示用に時刻を付ける。
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.log.push(format!("{stamp} {line}"));
        // 古い行から捨てる。
        if self.log.len() > LOG_CAPACITY {
            let excess = self.log.len() - LOG_CAPACITY;
            self.log.drain(..excess);
        }
    }
}

/// ユーザーが終了するまでメインTUIループを回す。
pub async fn run_app(terminal: &mut Tui, cfg: Config, shortcuts: Shortcuts) -> Result<()> {
    // 非同期タスクの完了通知チャネルを作る。
    let (tx_ev, rx_ev) = mpsc::channel::<AppEvent>(256);

    // バックエンドとコントローラを構築し、ハンドラを登録する。
    let backend = Arc::new(HttpBackend::new(&cfg)?);
    tracing::info!("backend: {}", cfg.server.base_url);
    let workflow = Workflow::new(&cfg, backend, tx_ev);
    let handlers = workflow.attach();

    // アプリ状態を初期化する。
    let mut app = App {
        cfg,
        surface: SurfaceState::default(),
        workflow,
        events_rx: rx_ev,
        handlers,
        input_box: None,
        shortcuts,
        log: vec![],
        status: "Ready".into(),
        last_path: String::new(),
        frame: 0,
    };
    app.push_log(format!("server: {}", app.cfg.server.base_url));

    loop {
        // 現在の状態を描画する。
        terminal.draw(|f| draw(f, &app))?;
        app.frame = app.frame.wrapping_add(1);

        // 入力処理の前に完了通知を消化する。
        while let Ok(ev) = app.events_rx.try_recv() {
            handle_app_event(&mut app, ev);
        }

        // UIの応答性確保のため短いタイムアウトで入力をポーリングする。
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(k) if k.kind == KeyEventKind::Press => {
                    // どの状態でもCtrl+Cで終了できるようにする。
                    if is_ctrl_c(&k) {
                        break;
                    }
                    if handle_key(&mut app, k).await? {
                        break;
                    }
                }
                // ファイルのドロップはパスの貼り付けとして届く。
                Event::Paste(text) => handle_paste(&mut app, &text).await,
                _ => {}
            }
        }
    }

    // 終了前にハンドラ登録を解除し、ポーリングを止める。
    for handler in app.handlers.drain(..) {
        handler.dispose();
    }
    app.workflow.submission.cancel_polling();
    Ok(())
}

/// 完了通知をコントローラへ渡し、画面の変化をログに残す。
fn handle_app_event(app: &mut App, ev: AppEvent) {
    // ダウンロード結果はホスト側でだけ扱う。
    if let AppEvent::DownloadFinished { job_id, result } = &ev {
        match result {
            Ok(path) => {
                app.status = format!("Saved {}", path.display());
                app.push_log(format!("saved {job_id} to {}", path.display()));
            }
            Err(e) => {
                app.status = format!("Download failed: {e}");
                app.push_log(format!("download of {job_id} failed: {e}"));
            }
        }
    }

    // 処理前後のフェーズを比較する。
    let before = app.surface.phase();
    app.workflow.handle_app_event(&mut app.surface, ev);
    let after = app.surface.phase();
    if before != after {
        let line = describe_phase(&app.surface, after);
        app.status = line.clone();
        app.push_log(line);
    }
}

/// フェーズ変化を1行の文言にする。
pub fn describe_phase(surface: &SurfaceState, phase: UiPhase) -> String {
    match phase {
        UiPhase::Idle => "Idle".into(),
        UiPhase::PreviewReady => format!("Preview ready: {}", surface.file_label()),
        UiPhase::ErrorShown => match surface.error() {
            Some((_, msg)) => format!("Error: {msg}"),
            None => "Error".into(),
        },
        UiPhase::Submitting => "Processing...".into(),
        UiPhase::ResultShown => match surface.result() {
            Some(r) => format!("Result ready: {}", r.download_href),
            None => "Result ready".into(),
        },
    }
}
