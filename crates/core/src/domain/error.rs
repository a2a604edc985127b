use serde::Serialize;

/// 文字起こし処理の共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_REQUEST")]
    Request,
    #[serde(rename = "E_JOB_FAILED")]
    JobFailed,
    #[serde(rename = "E_TIMEOUT")]
    Timeout,
    #[serde(rename = "E_CONTENT_FETCH")]
    ContentFetch,
    #[serde(rename = "E_EMPTY_RESULT")]
    EmptyResult,
    #[serde(rename = "E_TRANSPORT")]
    Transport,
    #[serde(rename = "E_DECODE")]
    Decode,
}

/// どの API 呼び出しで失敗したか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStage {
    /// ジョブ作成 (POST, 201 を期待)
    CreateJob,
    /// ステータス取得 (GET, 200 を期待)
    JobStatus,
    /// 結果ファイル一覧の取得 (GET, 200 を期待)
    ResultFiles,
}

impl RequestStage {
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreateJob => "job creation",
            Self::JobStatus => "job status request",
            Self::ResultFiles => "result files request",
        }
    }
}

impl std::fmt::Display for RequestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speech サービスとのやり取りで発生するエラー
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("{stage} failed ({status}): {body}")]
    Request {
        stage: RequestStage,
        status: u16,
        body: String,
    },
    #[error("Transcription job failed: {status}")]
    JobFailed { status: String },
    #[error("Transcription job timed out after {attempts} polls (exceeded 2-hour budget)")]
    JobTimeout { attempts: u32 },
    #[error("Failed to fetch contentUrl ({status}): {body}")]
    ContentFetch { status: u16, body: String },
    #[error("Transcription result contains no files")]
    EmptyResult,
    #[error("HTTP request failed: {0}")]
    Transport(String),
    #[error("Transport is already closed")]
    TransportClosed,
    #[error("Response parse error: {0}")]
    Decode(String),
}

impl TranscriptionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Request { .. } => ErrorCode::Request,
            Self::JobFailed { .. } => ErrorCode::JobFailed,
            Self::JobTimeout { .. } => ErrorCode::Timeout,
            Self::ContentFetch { .. } => ErrorCode::ContentFetch,
            Self::EmptyResult => ErrorCode::EmptyResult,
            Self::Transport(_) | Self::TransportClosed => ErrorCode::Transport,
            Self::Decode(_) => ErrorCode::Decode,
        }
    }

    /// 呼び出し元に返す HTTP 相当のステータスコード。
    /// サービスが返したステータスがあればそれを、なければ 500 を返す。
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Request { status, .. } | Self::ContentFetch { status, .. } => *status,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for TranscriptionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// エラー通知用ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
}

impl From<&TranscriptionError> for ErrorReport {
    fn from(e: &TranscriptionError) -> Self {
        Self {
            code: e.code(),
            status: e.status_code(),
            message: e.to_string(),
        }
    }
}
