use std::path::Path;
use std::sync::Arc;

use crate::domain::error::TranscriptionError;
use crate::infra::media::MediaExtractor;
use crate::infra::storage::BlobStore;
use crate::usecase::transcription::Transcriber;

/// 音声処理のエラー。呼び出し元には常に 500 として返す。
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Audio extraction failed: {0}")]
    Media(String),
    #[error("Blob upload failed: {0}")]
    Upload(String),
    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),
}

impl ProcessingError {
    pub fn status_code(&self) -> u16 {
        500
    }
}

/// アップロード済み音声
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAudio {
    pub file_name: String,
    pub blob_url: String,
}

/// 音声処理サービス: 音声抽出 → アップロード → 文字起こし → Blob 削除
pub struct AudioProcessingService {
    media: Arc<dyn MediaExtractor>,
    blobs: Arc<dyn BlobStore>,
    transcriber: Arc<dyn Transcriber>,
}

impl AudioProcessingService {
    pub fn new(
        media: Arc<dyn MediaExtractor>,
        blobs: Arc<dyn BlobStore>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            media,
            blobs,
            transcriber,
        }
    }

    /// メディアファイルを文字起こしする。アップロードした Blob は成否にかかわらず削除する。
    pub async fn process_audio(&self, path: &Path) -> Result<String, ProcessingError> {
        let uploaded = self.process_audio_file(path).await?;
        let result = self.transcribe_audio(&uploaded.blob_url).await;

        if let Err(e) = self.blobs.delete(&uploaded.file_name).await {
            log::warn!("Failed to delete blob {}: {e}", uploaded.file_name);
        }

        result
    }

    /// 音声を取り出して Blob にアップロードする。
    pub async fn process_audio_file(&self, path: &Path) -> Result<UploadedAudio, ProcessingError> {
        let audio = self
            .media
            .extract(path)
            .await
            .map_err(|e| ProcessingError::Media(e.to_string()))?;

        log::info!("Uploading {} ({} bytes)", audio.file_name, audio.data.len());
        let blob_url = self
            .blobs
            .upload(audio.data, &audio.file_name)
            .await
            .map_err(|e| ProcessingError::Upload(e.to_string()))?;

        Ok(UploadedAudio {
            file_name: audio.file_name,
            blob_url,
        })
    }

    pub async fn transcribe_audio(&self, blob_url: &str) -> Result<String, ProcessingError> {
        Ok(self.transcriber.transcribe(blob_url).await?)
    }
}
