//! レイアウト計算のヘルパー関数

use ratatui::prelude::*;

/// メインレイアウトの4つの領域
pub struct MainLayout {
    /// ドロップ領域（ファイル名ラベルを含む）
    pub drop_zone: Rect,
    /// PREVIEW + RESULT + LOGの領域
    pub body: Rect,
    /// HELPバーの領域
    pub help_bar: Rect,
    /// STATUSバーの領域
    pub status_bar: Rect,
}

/// ボディ部の3つの領域
pub struct BodyLayout {
    /// プレビューの領域
    pub preview: Rect,
    /// 処理状況・エラー・結果の領域
    pub outcome: Rect,
    /// ログの領域
    pub log: Rect,
}

/// メイン画面を4つの領域に分割（DROP + Body + HELP + STATUS）
pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // ドロップ領域
            Constraint::Min(1),    // Body
            Constraint::Length(3), // HELPバー
            Constraint::Length(3), // STATUSバー
        ])
        .split(area);

    MainLayout {
        drop_zone: chunks[0],
        body: chunks[1],
        help_bar: chunks[2],
        status_bar: chunks[3],
    }
}

/// Body領域を分割（左: PREVIEW、右上: RESULT、右下: LOG）
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50), // PREVIEW
            Constraint::Percentage(50), // RESULT + LOG
        ])
        .split(area);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(60), // RESULT
            Constraint::Percentage(40), // LOG
        ])
        .split(columns[1]);

    BodyLayout {
        preview: columns[0],
        outcome: right[0],
        log: right[1],
    }
}
