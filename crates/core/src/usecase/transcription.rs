use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;

use crate::domain::error::TranscriptionError;
use crate::domain::poll::PollPolicy;
use crate::domain::settings::SpeechSettings;
use crate::infra::metrics::{MetricsSummary, Phase, TranscriptionMetrics};
use crate::infra::speech::{ReqwestTransport, SpeechClient};

/// Blob URL の音声を文字起こしする trait
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, blob_url: &str) -> Result<String, TranscriptionError>;
}

/// 文字起こしサービス: ジョブ作成 → ポーリング → 結果取得 → 整形
pub struct TranscriptionService {
    client: SpeechClient,
    policy: PollPolicy,
    metrics: TranscriptionMetrics,
}

impl TranscriptionService {
    pub fn new(client: SpeechClient, policy: PollPolicy) -> Self {
        Self {
            client,
            policy,
            metrics: TranscriptionMetrics::new(),
        }
    }

    /// 設定から reqwest トランスポート付きで組み立てる。
    pub fn from_settings(settings: SpeechSettings) -> Result<Self, TranscriptionError> {
        let transport = ReqwestTransport::new(settings.request_timeout())?;
        let policy = settings.poll_policy();
        let client = SpeechClient::new(Arc::new(transport), settings);
        Ok(Self::new(client, policy))
    }

    pub fn client(&self) -> &SpeechClient {
        &self.client
    }

    pub fn metrics(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    /// 1件のジョブを最後まで処理し、話者ごとに整形したテキストを返す。
    pub async fn transcribe_audio(&self, content_url: &str) -> Result<String, TranscriptionError> {
        let result = self.run(content_url).await;
        if let Err(e) = &result {
            log::warn!("Transcription failed: {e}");
            self.metrics.record_error(e);
        }
        result
    }

    async fn run(&self, content_url: &str) -> Result<String, TranscriptionError> {
        let started = Instant::now();
        let job = self.client.create_transcription_job(content_url).await?;
        self.metrics.inc_jobs_submitted();
        self.metrics.record_latency(Phase::Submit, elapsed_ms(started));

        let started = Instant::now();
        let outcome = self.client.poll_until_done(&job, &self.policy).await?;
        self.metrics.add_status_polls(outcome.attempts);
        self.metrics.record_latency(Phase::Poll, elapsed_ms(started));

        let started = Instant::now();
        let result_url = self.client.get_transcription_result(&outcome.files).await?;
        let text = self.client.fetch_transcription_display(&result_url).await?;
        self.metrics.record_latency(Phase::Fetch, elapsed_ms(started));
        self.metrics.inc_jobs_succeeded();

        log::info!("Transcription finished: {} chars", text.chars().count());
        Ok(text)
    }

    pub async fn close(&self) {
        self.client.close().await;
    }

    /// 1回だけ処理してトランスポートを閉じる。成否にかかわらず close する。
    pub async fn transcribe_once(self, content_url: &str) -> Result<String, TranscriptionError> {
        let result = self.transcribe_audio(content_url).await;
        self.close().await;
        result
    }
}

#[async_trait]
impl Transcriber for TranscriptionService {
    async fn transcribe(&self, blob_url: &str) -> Result<String, TranscriptionError> {
        self.transcribe_audio(blob_url).await
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}
