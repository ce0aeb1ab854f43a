//! ユーザー操作イベント、非同期処理の完了イベント、ハンドラ登録。

use std::{
    cell::RefCell,
    collections::HashMap,
    path::PathBuf,
    rc::{Rc, Weak},
};

use uuid::Uuid;

use crate::{
    error::{BackendError, UploadError},
    jobs::{JobStatus, ProcessingJob, SelectedFile},
};

/// ユーザー操作から生まれるイベント。
#[derive(Clone, Debug)]
pub enum UiEvent {
    /// ファイル選択ダイアログの結果（未選択はNone）。
    FileChosen(Option<SelectedFile>),
    /// ドロップ領域へのドラッグ開始。
    DragEnter,
    /// ドロップ領域上でのドラッグ継続。
    DragOver,
    /// ドロップ領域からの離脱。
    DragLeave,
    /// ドロップされたファイル（空のドロップはNone）。
    Drop(Option<SelectedFile>),
    /// 送信ボタンの押下。
    SubmitClicked,
}

/// ハンドラ登録の単位となるイベント種別。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    FileChosen,
    DragEnter,
    DragOver,
    DragLeave,
    Drop,
    SubmitClicked,
}

impl UiEvent {
    /// イベントの種別を返す。
    pub fn kind(&self) -> EventKind {
        match self {
            UiEvent::FileChosen(_) => EventKind::FileChosen,
            UiEvent::DragEnter => EventKind::DragEnter,
            UiEvent::DragOver => EventKind::DragOver,
            UiEvent::DragLeave => EventKind::DragLeave,
            UiEvent::Drop(_) => EventKind::Drop,
            UiEvent::SubmitClicked => EventKind::SubmitClicked,
        }
    }
}

/// ハンドラ処理後に既定動作を止めるかどうか。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagation {
    /// 既定動作をそのまま続ける。
    Continue,
    /// 既定動作（ドロップ時の画面遷移など）を抑止する。
    PreventDefault,
}

/// 非同期タスクからイベントループへ返される完了通知。
#[derive(Debug)]
pub enum AppEvent {
    /// プレビュー用データURIの生成完了。
    PreviewDecoded { seq: u64, data_uri: String },
    /// アップロード呼び出しの完了。
    UploadFinished {
        txn: Uuid,
        result: Result<ProcessingJob, UploadError>,
    },
    /// 状態確認1回分の完了。
    StatusChecked {
        txn: Uuid,
        job_id: String,
        result: Result<JobStatus, BackendError>,
    },
    /// 成果物の保存完了。
    DownloadFinished {
        job_id: String,
        result: Result<PathBuf, String>,
    },
}

type Registry = RefCell<HashMap<EventKind, usize>>;

/// 登録済みのイベント種別を管理する。
#[derive(Clone, Default)]
pub struct Bindings {
    inner: Rc<Registry>,
}

impl Bindings {
    /// 種別を登録し、解除用のハンドルを返す。
    pub fn bind(&self, kind: EventKind) -> Disposer {
        // 同じ種別の複数登録は参照カウントで扱う。
        *self.inner.borrow_mut().entry(kind).or_insert(0) += 1;
        Disposer {
            kind,
            registry: Rc::downgrade(&self.inner),
            live: true,
        }
    }

    /// 種別に有効な登録があるか判定する。
    pub fn is_bound(&self, kind: EventKind) -> bool {
        self.inner.borrow().get(&kind).is_some_and(|n| *n > 0)
    }
}

/// 登録解除ハンドル。disposeするかdropすると登録が外れる。
#[must_use = "dropping a Disposer unbinds the handler immediately"]
pub struct Disposer {
    kind: EventKind,
    registry: Weak<Registry>,
    live: bool,
}

impl Disposer {
    /// 明示的に登録を解除する。
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        // 二重解除を防ぐ。
        if !self.live {
            return;
        }
        self.live = false;
        if let Some(registry) = self.registry.upgrade() {
            let mut map = registry.borrow_mut();
            if let Some(n) = map.get_mut(&self.kind) {
                *n = n.saturating_sub(1);
            }
        }
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.release();
    }
}
