//! 選択ファイル・処理ジョブ・ジョブ状態のモデル。

use serde::Deserialize;
use std::sync::Arc;

/// ユーザーが選んだ1件のファイル。選択のたびに丸ごと置き換える。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    /// 表示用のファイル名。
    pub name: String,
    /// 宣言されたメディアタイプ（例: "image/png"）。
    pub media_type: String,
    /// バイトサイズ（メタデータ上の値）。
    pub size: u64,
    /// プレビューとアップロードに使う生データ。
    pub bytes: Arc<[u8]>,
}

impl SelectedFile {
    /// メモリ上のバイト列からファイルを作成する。
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        // サイズはバイト列の長さから決める。
        let size = bytes.len() as u64;
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size,
            bytes: bytes.into(),
        }
    }

    /// 中身を読み込まずにサイズだけを持つファイルを作成する（上限超過時に使う）。
    pub fn unread(name: impl Into<String>, media_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size,
            bytes: Arc::from(Vec::new()),
        }
    }
}

/// サーバーが払い出した処理ジョブ。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessingJob {
    /// 不透明なジョブID。
    pub id: String,
}

impl ProcessingJob {
    /// IDからジョブを作成する。
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// ポーリングで取得するジョブ状態。Pendingのみが非終端。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    /// 処理中。
    Pending,
    /// 正常完了。
    Completed,
    /// 失敗。
    Failed,
}

impl JobStatus {
    /// 終端状態かどうか。
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// `POST /process` のレスポンス本文。
#[derive(Debug, Deserialize)]
pub struct UploadResp {
    pub processing_id: String,
}

/// `GET /status/{id}` のレスポンス本文。
#[derive(Debug, Deserialize)]
pub struct StatusResp {
    pub status: WireStatus,
}

/// 通信上の状態文字列。想定外の値はUnrecognizedに落とす。
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WireStatus {
    Pending,
    Completed,
    Failed,
    #[serde(other)]
    Unrecognized,
}

impl From<WireStatus> for JobStatus {
    fn from(s: WireStatus) -> Self {
        match s {
            WireStatus::Completed => JobStatus::Completed,
            WireStatus::Failed => JobStatus::Failed,
            // 未知の値は非終端として扱う。
            WireStatus::Pending | WireStatus::Unrecognized => JobStatus::Pending,
        }
    }
}
