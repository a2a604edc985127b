use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::job::PunctuationMode;
use super::poll::PollPolicy;

/// Speech サービス接続・文字起こし設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// サービスエンドポイント (例: "https://japaneast.api.cognitive.microsoft.com")
    pub endpoint: String,
    /// サブスクリプションキー
    pub subscription_key: String,
    /// 音声ロケール（デフォルト "ja-JP"）
    pub locale: String,
    /// ジョブ表示名
    pub display_name: String,
    pub punctuation_mode: PunctuationMode,
    /// 話者分離
    pub diarization_enabled: bool,
    /// 単語レベルのタイムスタンプ
    pub word_level_timestamps_enabled: bool,
    /// speaker が無いフレーズに付けるラベル
    pub unknown_speaker_label: String,
    /// 1リクエストあたりのタイムアウト秒数
    pub request_timeout_secs: u64,
    pub poll: PollSettings,
}

/// ポーリング設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub initial_interval_secs: u64,
    pub max_interval_secs: u64,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            subscription_key: String::new(),
            locale: "ja-JP".to_string(),
            display_name: "Transcription".to_string(),
            punctuation_mode: PunctuationMode::DictatedAndAutomatic,
            diarization_enabled: true,
            word_level_timestamps_enabled: true,
            unknown_speaker_label: "unknown".to_string(),
            request_timeout_secs: 30,
            poll: PollSettings::default(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 240,
            initial_interval_secs: 30,
            max_interval_secs: 60,
        }
    }
}

impl From<PollSettings> for PollPolicy {
    fn from(s: PollSettings) -> Self {
        Self {
            max_attempts: s.max_attempts,
            initial_interval: Duration::from_secs(s.initial_interval_secs),
            max_interval: Duration::from_secs(s.max_interval_secs),
        }
    }
}

/// 環境変数から設定を読めなかった
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);

impl SpeechSettings {
    /// `AZ_SPEECH_KEY` と `AZ_SPEECH_ENDPOINT` を読み、残りはデフォルト値を使う。
    pub fn from_env() -> Result<Self, MissingEnvVar> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MissingEnvVar> {
        let subscription_key =
            lookup("AZ_SPEECH_KEY").ok_or(MissingEnvVar("AZ_SPEECH_KEY"))?;
        let endpoint =
            lookup("AZ_SPEECH_ENDPOINT").ok_or(MissingEnvVar("AZ_SPEECH_ENDPOINT"))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            subscription_key,
            ..Default::default()
        })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll.into()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
