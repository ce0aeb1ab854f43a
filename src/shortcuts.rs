//! キー割り当ての読み込みと、キー入力から操作への解決。

use anyhow::{Result, anyhow, bail};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

/// 1つのキー割り当て（例: "Ctrl+u"、"Enter"、"s"）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    /// 押されたキーがこの割り当てと一致するか。
    pub fn matches(&self, key: &KeyEvent) -> bool {
        // 大文字は端末によってSHIFT付きで届くので修飾から外して比べる。
        let mods = match key.code {
            KeyCode::Char(c) if c.is_ascii_uppercase() => key.modifiers.difference(KeyModifiers::SHIFT),
            _ => key.modifiers,
        };
        self.code == key.code && self.modifiers == mods
    }
}

impl FromStr for KeyBinding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        // 末尾がキー本体、それより前は修飾キー。
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = parts.pop().filter(|k| !k.is_empty()).ok_or_else(|| anyhow!("empty key binding"))?;

        let mut modifiers = KeyModifiers::empty();
        for m in parts {
            modifiers |= match m.to_ascii_lowercase().as_str() {
                "ctrl" => KeyModifiers::CONTROL,
                "alt" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                other => bail!("unknown modifier {other:?} in {s:?}"),
            };
        }

        let code = match key.to_ascii_lowercase().as_str() {
            "enter" => KeyCode::Enter,
            "esc" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "backspace" => KeyCode::Backspace,
            "delete" => KeyCode::Delete,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "space" => KeyCode::Char(' '),
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => bail!("unknown key {key:?} in {s:?}"),
                }
            }
        };
        Ok(Self { code, modifiers })
    }
}

impl TryFrom<String> for KeyBinding {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<KeyBinding> for String {
    fn from(b: KeyBinding) -> Self {
        b.to_string()
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (KeyModifiers::CONTROL, "Ctrl"),
            (KeyModifiers::ALT, "Alt"),
            (KeyModifiers::SHIFT, "Shift"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Esc => f.write_str("Esc"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::Backspace => f.write_str("Backspace"),
            KeyCode::Delete => f.write_str("Delete"),
            KeyCode::Up => f.write_str("Up"),
            KeyCode::Down => f.write_str("Down"),
            KeyCode::Left => f.write_str("Left"),
            KeyCode::Right => f.write_str("Right"),
            KeyCode::Home => f.write_str("Home"),
            KeyCode::End => f.write_str("End"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// いずれかの割り当てが一致するか。
pub fn any_matches(bindings: &[KeyBinding], key: &KeyEvent) -> bool {
    bindings.iter().any(|b| b.matches(key))
}

/// 表示用に "s/Enter" の形へ連結する。
pub fn describe(bindings: &[KeyBinding]) -> String {
    bindings.iter().map(ToString::to_string).collect::<Vec<_>>().join("/")
}

/// メイン画面の操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainAction {
    Quit,
    Browse,
    Submit,
    OpenResult,
    Download,
}

/// パス入力欄の操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Confirm,
    Cancel,
    Complete,
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    ClearLine,
}

/// `shortcut.toml` の全体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcuts {
    pub main: MainKeys,
    pub input_box: InputKeys,
}

/// メイン画面のキー割り当て。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainKeys {
    pub quit: Vec<KeyBinding>,
    pub browse: Vec<KeyBinding>,
    pub submit: Vec<KeyBinding>,
    pub open_result: Vec<KeyBinding>,
    pub download: Vec<KeyBinding>,
}

/// パス入力欄のキー割り当て。英字はパスの入力に使うので割り当てない。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputKeys {
    pub confirm: Vec<KeyBinding>,
    pub cancel: Vec<KeyBinding>,
    pub complete: Vec<KeyBinding>,
    pub backspace: Vec<KeyBinding>,
    pub delete: Vec<KeyBinding>,
    pub left: Vec<KeyBinding>,
    pub right: Vec<KeyBinding>,
    pub home: Vec<KeyBinding>,
    pub end: Vec<KeyBinding>,
    pub clear_line: Vec<KeyBinding>,
}

impl Shortcuts {
    /// TOMLから読み込み、無ければデフォルトを書き出して返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            // 解釈できない割り当てはここでエラーにする。
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let shortcuts = Self::default();
            shortcuts.save(path)?;
            Ok(shortcuts)
        }
    }

    /// TOMLとして保存する。
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// メイン画面でのキーを操作に解決する。
    pub fn main_action(&self, key: &KeyEvent) -> Option<MainAction> {
        let m = &self.main;
        [
            (&m.quit, MainAction::Quit),
            (&m.browse, MainAction::Browse),
            (&m.submit, MainAction::Submit),
            (&m.open_result, MainAction::OpenResult),
            (&m.download, MainAction::Download),
        ]
        .into_iter()
        .find(|(keys, _)| any_matches(keys, key))
        .map(|(_, action)| action)
    }

    /// 入力欄でのキーを操作に解決する。一致しなければ文字入力として扱う。
    pub fn input_action(&self, key: &KeyEvent) -> Option<InputAction> {
        let i = &self.input_box;
        [
            (&i.confirm, InputAction::Confirm),
            (&i.cancel, InputAction::Cancel),
            (&i.complete, InputAction::Complete),
            (&i.backspace, InputAction::Backspace),
            (&i.delete, InputAction::Delete),
            (&i.left, InputAction::Left),
            (&i.right, InputAction::Right),
            (&i.home, InputAction::Home),
            (&i.end, InputAction::End),
            (&i.clear_line, InputAction::ClearLine),
        ]
        .into_iter()
        .find(|(keys, _)| any_matches(keys, key))
        .map(|(_, action)| action)
    }
}

/// 既定値の組み立て用。定数文字列なので失敗しない。
fn keys(specs: &[&str]) -> Vec<KeyBinding> {
    specs.iter().filter_map(|s| s.parse().ok()).collect()
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            main: MainKeys {
                quit: keys(&["q", "Esc"]),
                browse: keys(&["b", "f"]),
                submit: keys(&["s", "Enter"]),
                open_result: keys(&["o"]),
                download: keys(&["d"]),
            },
            input_box: InputKeys {
                confirm: keys(&["Enter"]),
                cancel: keys(&["Esc"]),
                complete: keys(&["Tab"]),
                backspace: keys(&["Backspace"]),
                delete: keys(&["Delete"]),
                left: keys(&["Left"]),
                right: keys(&["Right"]),
                home: keys(&["Home", "Ctrl+a"]),
                end: keys(&["End", "Ctrl+e"]),
                clear_line: keys(&["Ctrl+u"]),
            },
        }
    }
}
