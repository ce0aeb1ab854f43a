//! TUI描画関連の関数。

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::{
    input, layout,
    shortcuts::{Shortcuts, describe},
    submission::{Outcome, SubmissionController, SubmissionState},
    surface::{ErrorPanel, SurfaceState, UiPhase},
};

use super::App;

/// 処理中表示のスピナー。
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// プレビューに表示するデータURIの最大文字数。
const URI_HEAD: usize = 64;

/// 画面全体のレイアウトを描画する。
pub fn draw(f: &mut Frame, app: &App) {
    // メインレイアウト（DROP + Body + HELP + STATUS）を作る。
    let main_layout = layout::create_main_layout(f.area());
    let body_layout = layout::create_body_layout(main_layout.body);

    // ドロップ領域を描画する。
    f.render_widget(build_drop_zone(&app.surface), main_layout.drop_zone);

    // プレビューを描画する。
    f.render_widget(build_preview(app), body_layout.preview);

    // 処理状況・エラー・結果を描画する。
    f.render_widget(build_outcome(app), body_layout.outcome);

    // ログを描画する（末尾から表示できる分だけ）。
    let visible = body_layout.log.height.saturating_sub(2) as usize;
    let log_text = app
        .log
        .iter()
        .rev()
        .take(visible)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let log_panel = Paragraph::new(log_text)
        .block(Block::default().borders(Borders::ALL).title("LOG"))
        .wrap(Wrap { trim: true });
    f.render_widget(log_panel, body_layout.log);

    // HELPバーを描画する。
    let help_bar = Paragraph::new(get_help_text(&app.shortcuts))
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, main_layout.help_bar);

    // STATUSバーを描画する。
    f.render_widget(build_status_bar(app), main_layout.status_bar);

    // 入力欄が開いていれば重ねて描画する。
    if let Some(input) = &app.input_box {
        input::render_path_input(f, input, &get_input_help_text(&app.shortcuts));
    }
}

/// ドロップ領域を構築する。ドラッグ中は枠を強調する。
fn build_drop_zone(surface: &SurfaceState) -> Paragraph<'static> {
    let label = if surface.file_label().is_empty() {
        "No file selected".to_string()
    } else {
        surface.file_label().to_string()
    };
    let text = format!(
        "Drop an image onto this terminal, or browse for one.\nFile: {}",
        label
    );

    // ドラッグ中かどうかで枠のスタイルを切り替える。
    let border_style = if surface.drag_over() {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title("DROP"),
    )
}

/// プレビューパネルを構築する。
fn build_preview(app: &App) -> Paragraph<'static> {
    let text = match app.surface.preview() {
        Some(uri) => {
            // データURIの先頭部分とファイル情報を表示する。
            let head: String = uri.chars().take(URI_HEAD).collect();
            let info = app
                .workflow
                .selection
                .current()
                .map(|f| format!("{}\n{}\n{}", f.name, f.media_type, format_size(f.size)))
                .unwrap_or_default();
            format!("{info}\n\n{head}...\n({} chars)", uri.len())
        }
        None => "No preview".to_string(),
    };
    Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("PREVIEW"))
        .wrap(Wrap { trim: false })
}

/// 処理状況・エラー・結果のパネルを構築する。
fn build_outcome(app: &App) -> Paragraph<'static> {
    let s = &app.surface;
    let mut lines = Vec::new();

    // 処理中ならスピナーを出す。
    if s.busy() {
        lines.push(format!("{} Processing...", SPINNER[app.frame % SPINNER.len()]));
    }

    // エラーパネルは1つだけ表示される。
    if let Some((panel, msg)) = s.error() {
        lines.push(format!("[{}] {}", panel_title(panel), msg));
    }

    // 結果パネルを表示する。
    if let Some(result) = s.result() {
        lines.push("Result ready".to_string());
        lines.push(format!("Image: {}", result.image_src));
        lines.push(format!("Download: {}", result.download_href));
    }

    // 表示の色をフェーズで決める。
    let style = match s.phase() {
        UiPhase::ErrorShown => Style::default().fg(Color::Red),
        UiPhase::ResultShown => Style::default().fg(Color::Green),
        _ => Style::default(),
    };

    Paragraph::new(lines.join("\n"))
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("RESULT"))
        .wrap(Wrap { trim: true })
}

/// ステータスバーを構築する。
fn build_status_bar(app: &App) -> Paragraph<'static> {
    let submit = if app.surface.submit_enabled() {
        "ready"
    } else {
        "disabled"
    };
    let text = format!(
        "[{:?}] Submit: {} | Job: {} | {}",
        app.surface.phase(),
        submit,
        describe_submission(&app.workflow.submission),
        app.status
    );
    let mut status_bar = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true });

    // エラー時は赤色で強調表示する。
    if app.surface.error().is_some() {
        status_bar = status_bar.style(Style::default().fg(Color::Red));
    }
    status_bar
}

/// 送信トランザクションの状況を短く表す。
fn describe_submission(sub: &SubmissionController) -> String {
    match sub.state() {
        SubmissionState::Idle => "-".into(),
        SubmissionState::Submitting { .. } => "uploading".into(),
        // 次の確認を待っている間とその応答を処理する間を区別する。
        SubmissionState::Polling { job, .. } if sub.is_polling() => format!("{} checking", job.id),
        SubmissionState::Polling { job, .. } => format!("{} pending", job.id),
        SubmissionState::Resolved(Outcome::Succeeded(job)) => format!("{} done", job.id),
        SubmissionState::Resolved(Outcome::Failed(_)) => "failed".into(),
    }
}

/// エラーパネルの見出し。
fn panel_title(panel: ErrorPanel) -> &'static str {
    match panel {
        ErrorPanel::TooLarge => "Too large",
        ErrorPanel::UnsupportedType => "Unsupported type",
        ErrorPanel::Empty => "No file",
        ErrorPanel::Processing => "Error",
    }
}

/// ヘルプ文字列を返す。
fn get_help_text(shortcuts: &Shortcuts) -> String {
    let m = &shortcuts.main;
    format!(
        "{}: browse | drop/paste a path | {}: submit | {}: open result | {}: save result | {}: quit",
        describe(&m.browse),
        describe(&m.submit),
        describe(&m.open_result),
        describe(&m.download),
        describe(&m.quit),
    )
}

/// 入力欄のヘルプ文字列を返す。
fn get_input_help_text(shortcuts: &Shortcuts) -> String {
    let i = &shortcuts.input_box;
    format!(
        "{}=確定 | {}=キャンセル | {}=補完 | {}=クリア",
        describe(&i.confirm),
        describe(&i.cancel),
        describe(&i.complete),
        describe(&i.clear_line),
    )
}

/// バイト数を読みやすい単位にする。
fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / KIB / KIB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        // 単位の切り替わりを検証する。
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_help_lists_every_main_action() {
        // ヘルプに全ショートカットが含まれることを検証する。
        let sc = Shortcuts::default();
        let help = get_help_text(&sc);
        for keys in [&sc.main.browse, &sc.main.submit, &sc.main.quit] {
            assert!(help.contains(&describe(keys)));
        }
        assert!(get_input_help_text(&sc).contains("Tab=補完"));
    }
}
