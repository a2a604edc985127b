use serde::{Deserialize, Serialize};

// ─── Locators ────────────────────────────────────────────────────

/// ジョブ作成レスポンスの `self`。ステータス取得のキーになる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 成功したジョブの `links.files`。結果ファイル一覧を指す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultLocator(String);

impl ResultLocator {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResultLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── JobStatus ───────────────────────────────────────────────────

/// ジョブ状態（ポーリングごとに読み取る。最新値のみ意味を持つ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    /// 上記以外の値。未完了として扱う。
    #[serde(other)]
    Pending,
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Pending => "Pending",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }
}

// ─── TranscriptionJobConfig ──────────────────────────────────────

/// 句読点の付与方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PunctuationMode {
    None,
    Dictated,
    Automatic,
    DictatedAndAutomatic,
}

/// ジョブ作成リクエストの `properties`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionProperties {
    pub audio_locale: String,
    pub default_language_code: String,
    pub diarization_enabled: bool,
    pub punctuation_mode: PunctuationMode,
    pub word_level_timestamps_enabled: bool,
}

/// ジョブ作成リクエスト。送信ごとに一度だけ組み立て、変更しない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionJobConfig {
    pub display_name: String,
    pub locale: String,
    pub content_urls: Vec<String>,
    pub properties: TranscriptionProperties,
}

impl TranscriptionJobConfig {
    /// 既定値 (ja-JP, 話者分離あり, DictatedAndAutomatic, 単語タイムスタンプあり)
    pub fn new(content_url: impl Into<String>) -> Self {
        Self::with_options(
            content_url,
            "Transcription",
            "ja-JP",
            PunctuationMode::DictatedAndAutomatic,
            true,
            true,
        )
    }

    pub fn with_options(
        content_url: impl Into<String>,
        display_name: impl Into<String>,
        locale: impl Into<String>,
        punctuation_mode: PunctuationMode,
        diarization_enabled: bool,
        word_level_timestamps_enabled: bool,
    ) -> Self {
        let locale = locale.into();
        Self {
            display_name: display_name.into(),
            locale: locale.clone(),
            content_urls: vec![content_url.into()],
            properties: TranscriptionProperties {
                audio_locale: locale.clone(),
                default_language_code: locale,
                diarization_enabled,
                punctuation_mode,
                word_level_timestamps_enabled,
            },
        }
    }
}
