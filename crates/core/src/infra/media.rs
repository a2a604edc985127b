use async_trait::async_trait;
use std::path::Path;

/// 動画/音声ファイルから取り出した音声
#[derive(Debug, Clone)]
pub struct ExtractedAudio {
    pub file_name: String,
    pub data: Vec<u8>,
}

pub type MediaError = Box<dyn std::error::Error + Send + Sync>;

/// メディアファイルから文字起こし用の音声を取り出す
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<ExtractedAudio, MediaError>;
}
