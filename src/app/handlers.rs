//! キー入力・貼り付けのハンドラー関数。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{
    events::UiEvent,
    files,
    input::PathInput,
    shortcuts::{InputAction, MainAction},
};

use super::{App, describe_phase};

/// キー入力を1件処理し、終了すべきならtrueを返す。
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 入力欄が開いていれば最優先で処理する。
    if app.input_box.is_some() {
        handle_input_box_key(app, k).await;
        return Ok(false);
    }
    Ok(handle_main_key(app, k))
}

/// Ctrl+Cかどうかを判定する。
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// メイン画面のキー処理。
fn handle_main_key(app: &mut App, k: KeyEvent) -> bool {
    let Some(action) = app.shortcuts.main_action(&k) else {
        return false;
    };
    match action {
        MainAction::Quit => return true,
        MainAction::Browse => {
            // 直前のパスを初期値にして入力欄を開く。
            app.input_box = Some(PathInput::new("Image path (JPEG/PNG):", app.last_path.clone()));
        }
        MainAction::Submit => {
            // 送信可能かどうかはコントローラが判断する。
            if app.surface.submit_enabled() {
                app.workflow
                    .handle_ui_event(&mut app.surface, UiEvent::SubmitClicked);
                app.status = "Uploading...".into();
                app.push_log(format!("submitted {}", app.surface.file_label()));
            } else {
                app.status = "Select a valid image first".into();
            }
        }
        MainAction::OpenResult => open_result(app),
        MainAction::Download => {
            // 結果を出力フォルダへ保存する。
            let dir = app.cfg.download.output_dir.clone();
            let ext = app.cfg.processing.output_format.clone();
            app.status = match app.workflow.download_result(dir, &ext) {
                Some(_) => "Downloading result...".into(),
                None => "No result to download yet".into(),
            };
        }
    }
    false
}

/// 結果URLをシステムのブラウザで開く。
fn open_result(app: &mut App) {
    let Some(href) = app.surface.result().map(|r| r.download_href.clone()) else {
        app.status = "No result yet".into();
        return;
    };
    match webbrowser::open(&href) {
        Ok(()) => app.push_log(format!("opened {href}")),
        Err(e) => {
            tracing::error!("failed to open browser: {e}");
            app.status = format!("Cannot open browser: {e}");
        }
    }
}

/// 貼り付けを処理する。入力欄の外ではファイルのドロップとして扱う。
pub async fn handle_paste(app: &mut App, text: &str) {
    // 入力中ならそのまま文字として挿入する。
    if let Some(input) = &mut app.input_box {
        let clean: String = text.chars().filter(|c| !c.is_control()).collect();
        input.insert_str(&clean);
        return;
    }

    // ドラッグ開始からドロップまでを順に流す。
    app.workflow
        .handle_ui_event(&mut app.surface, UiEvent::DragEnter);
    app.workflow
        .handle_ui_event(&mut app.surface, UiEvent::DragOver);

    let file = match files::parse_dropped_path(text) {
        Some(path) => {
            app.last_path = path.display().to_string();
            match files::load_candidate(&path, app.cfg.upload.max_bytes).await {
                Ok(file) => Some(file),
                Err(e) => {
                    app.push_log(format!("cannot read {}: {e}", path.display()));
                    None
                }
            }
        }
        None => None,
    };

    // ドロップは既定動作を抑止して検証に回る。
    app.workflow
        .handle_ui_event(&mut app.surface, UiEvent::Drop(file));
    app.push_log(describe_phase(&app.surface, app.surface.phase()));
}

/// 入力欄のキー処理。
async fn handle_input_box_key(app: &mut App, k: KeyEvent) {
    let action = app.shortcuts.input_action(&k);
    let Some(input) = &mut app.input_box else {
        return;
    };

    match action {
        Some(InputAction::Confirm) => {
            // 入力欄を閉じてから値を選択として流す。
            let value = input.value.clone();
            app.input_box = None;
            choose_file(app, value).await;
        }
        Some(InputAction::Cancel) => app.input_box = None,
        Some(InputAction::Complete) => input.complete(&app.cfg.upload.accepted_types).await,
        Some(InputAction::Backspace) => input.backspace(),
        Some(InputAction::Delete) => input.delete(),
        Some(InputAction::Left) => input.move_left(),
        Some(InputAction::Right) => input.move_right(),
        Some(InputAction::Home) => input.move_home(),
        Some(InputAction::End) => input.move_end(),
        Some(InputAction::ClearLine) => input.clear_line(),
        None => {
            // 修飾キー付きの文字は入力しない。
            if let KeyCode::Char(c) = k.code
                && !k.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
            {
                input.insert_char(c);
            }
        }
    }
}

/// 入力されたパスを選択として検証に回す。空や読めないパスは「未選択」になる。
async fn choose_file(app: &mut App, value: String) {
    let file = files::choose(&value, app.cfg.upload.max_bytes).await;
    app.last_path = value;
    app.workflow
        .handle_ui_event(&mut app.surface, UiEvent::FileChosen(file));
    app.push_log(describe_phase(&app.surface, app.surface.phase()));
}
