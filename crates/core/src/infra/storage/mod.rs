use async_trait::async_trait;

/// ストレージ操作のエラー（実装側のエラーをそのまま包む）
pub type StorageError = Box<dyn std::error::Error + Send + Sync>;

/// 音声ファイルを一時的に置く Blob ストレージ。
/// `upload` が返す URL は Speech サービスから読める必要がある。
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, data: Vec<u8>, name: &str) -> Result<String, StorageError>;

    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}
