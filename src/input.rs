//! ファイル選択用のパス入力欄（ポップアップ）。

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use ratatui::{
    layout::{Alignment, Position},
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::files;

/// パス入力欄の状態。カーソルはバイト位置で持ち、常に文字境界に置く。
#[derive(Clone, Debug)]
pub struct PathInput {
    pub prompt: String,
    pub value: String,
    cursor: usize,
    /// 直前の補完で候補が複数あったときの一覧。
    pub candidates: Vec<String>,
}

impl PathInput {
    /// 初期値付きで開く（カーソルは末尾）。
    pub fn new(prompt: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            prompt: prompt.into(),
            cursor: value.len(),
            value,
            candidates: Vec::new(),
        }
    }

    /// カーソル位置（文字数）。
    pub fn cursor_chars(&self) -> usize {
        self.value[..self.cursor].chars().count()
    }

    pub fn insert_char(&mut self, c: char) {
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
        self.candidates.clear();
    }

    pub fn insert_str(&mut self, s: &str) {
        self.value.insert_str(self.cursor, s);
        self.cursor += s.len();
        self.candidates.clear();
    }

    pub fn backspace(&mut self) {
        if let Some((at, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.value.remove(at);
            self.cursor = at;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if let Some((at, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.cursor = at;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(c) = self.value[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.len();
    }

    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
        self.candidates.clear();
    }

    /// 入力中のパスを補完する。
    ///
    /// 候補はディレクトリと、拡張子から画像と判断できるファイルに限る。
    /// 候補が1つならそのまま確定し、複数なら共通部分まで伸ばして一覧を残す。
    pub async fn complete(&mut self, accepted_types: &[String]) {
        let (dir_part, stem) = match self.value.rfind(MAIN_SEPARATOR) {
            Some(i) => self.value.split_at(i + 1),
            None => ("", self.value.as_str()),
        };
        let stem = stem.to_string();
        let dir = if dir_part.is_empty() {
            PathBuf::from(".")
        } else {
            files::expand_home(dir_part)
        };

        let names = match list_candidates(&dir, &stem, accepted_types).await {
            Ok(names) => names,
            Err(e) => {
                tracing::debug!("no completion in {}: {e}", dir.display());
                self.candidates.clear();
                return;
            }
        };

        let common = common_prefix(&names);
        if common.len() > stem.len() {
            let tail = common[stem.len()..].to_string();
            self.move_end();
            self.insert_str(&tail);
        }
        self.candidates = if names.len() > 1 { names } else { Vec::new() };
    }
}

/// `dir`内で`stem`から始まるディレクトリと受け付け可能な画像を名前順に返す。
async fn list_candidates(
    dir: &Path,
    stem: &str,
    accepted_types: &[String],
) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        // 隠しファイルは"."から打ち始めたときだけ候補にする。
        if !name.starts_with(stem) || (name.starts_with('.') && !stem.starts_with('.')) {
            continue;
        }
        let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
        if is_dir {
            names.push(format!("{name}{MAIN_SEPARATOR}"));
        } else if accepted_types
            .iter()
            .any(|t| t == files::media_type_for(Path::new(&name)))
        {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// 文字境界を保った最長共通接頭辞。
fn common_prefix(names: &[String]) -> &str {
    let Some(first) = names.first() else {
        return "";
    };
    let mut end = first.len();
    for name in &names[1..] {
        end = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, a), _)| i + a.len_utf8())
            .min(end);
    }
    &first[..end]
}

/// 入力欄をポップアップとして描画し、端末のカーソルを入力位置に置く。
pub fn render_path_input(f: &mut Frame, state: &PathInput, help: &str) {
    let height = if state.candidates.is_empty() { 6 } else { 8 };
    let area = centered_popup(f.area(), 70, height);
    f.render_widget(Clear, area);
    f.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .title("Choose file")
            .style(Style::default().bg(Color::DarkGray)),
        area,
    );

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // プロンプト
            Constraint::Length(1), // 入力欄
            Constraint::Min(0),    // 補完候補
            Constraint::Length(1), // ヘルプ
        ])
        .split(area);

    f.render_widget(
        Paragraph::new(state.prompt.as_str())
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        rows[0],
    );

    // 長いパスはカーソルが見える位置まで横にずらす。
    let width = rows[1].width.saturating_sub(1) as usize;
    let cursor = state.cursor_chars();
    let offset = cursor.saturating_sub(width);
    let visible: String = state.value.chars().skip(offset).take(width + 1).collect();
    f.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Green)),
        rows[1],
    );
    f.set_cursor_position(Position::new(
        rows[1].x + (cursor - offset) as u16,
        rows[1].y,
    ));

    if !state.candidates.is_empty() {
        f.render_widget(
            Paragraph::new(state.candidates.join("  ")).style(Style::default().fg(Color::Gray)),
            rows[2],
        );
    }

    f.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center),
        rows[3],
    );
}

/// 画面中央に幅`width_percent`%、高さ`height`行の領域を取る。
fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [_, popup, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Percentage(width_percent),
        Constraint::Fill(1),
    ])
    .areas(middle);
    popup
}
