use serde::Deserialize;
use std::sync::Arc;

use super::{SpeechTransport, TransportRequest, TransportResponse};
use crate::domain::error::{RequestStage, TranscriptionError};
use crate::domain::job::{JobHandle, JobStatus, ResultLocator, TranscriptionJobConfig};
use crate::domain::poll::PollPolicy;
use crate::domain::settings::SpeechSettings;
use crate::domain::transcript::{self, FormatOptions, RecognizedPhrase, TranscriptionPayload};

// ─── Wire types ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct JobCreatedResponse {
    #[serde(rename = "self")]
    self_url: String,
}

#[derive(Deserialize)]
struct JobStatusResponse {
    status: JobStatus,
    #[serde(default)]
    links: Option<JobLinks>,
}

#[derive(Deserialize)]
struct JobLinks {
    files: Option<String>,
}

#[derive(Deserialize)]
struct FilesResponse {
    #[serde(default)]
    values: Vec<ResultFile>,
}

#[derive(Deserialize)]
struct ResultFile {
    links: ResultFileLinks,
}

#[derive(Deserialize)]
struct ResultFileLinks {
    #[serde(rename = "contentUrl")]
    content_url: String,
}

// ─── SpeechClient ────────────────────────────────────────────────

/// ポーリングの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub files: ResultLocator,
    /// 終端状態を読むまでに行ったステータス取得の回数
    pub attempts: u32,
}

/// Speech サービス (batch transcription v3.2) のクライアント。
///
/// トランスポートは構築時に受け取り、`close` で明示的に解放する。
pub struct SpeechClient {
    transport: Arc<dyn SpeechTransport>,
    settings: SpeechSettings,
    headers: Vec<(String, String)>,
}

impl SpeechClient {
    pub fn new(transport: Arc<dyn SpeechTransport>, settings: SpeechSettings) -> Self {
        let headers = Self::create_headers(&settings);
        Self {
            transport,
            settings,
            headers,
        }
    }

    fn create_headers(settings: &SpeechSettings) -> Vec<(String, String)> {
        [
            ("Ocp-Apim-Subscription-Key", settings.subscription_key.as_str()),
            ("Content-Type", "application/json"),
            ("Accept", "application/json"),
            ("Accept-Language", settings.locale.as_str()),
            ("X-Japan-Force", "True"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    pub fn settings(&self) -> &SpeechSettings {
        &self.settings
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    pub async fn close(&self) {
        self.transport.close().await;
    }

    /// 送信するジョブ設定を組み立てる。
    pub fn job_config(&self, content_url: &str) -> TranscriptionJobConfig {
        TranscriptionJobConfig::with_options(
            content_url,
            self.settings.display_name.as_str(),
            self.settings.locale.as_str(),
            self.settings.punctuation_mode,
            self.settings.diarization_enabled,
            self.settings.word_level_timestamps_enabled,
        )
    }

    fn transcriptions_url(&self) -> String {
        format!(
            "{}/speechtotext/v3.2/transcriptions",
            self.settings.endpoint.trim_end_matches('/')
        )
    }

    /// 文字起こしジョブを作成し、ジョブの `self` を返す。
    pub async fn create_transcription_job(
        &self,
        content_url: &str,
    ) -> Result<JobHandle, TranscriptionError> {
        let body = serde_json::to_value(self.job_config(content_url))?;
        let response = self
            .execute(
                TransportRequest::post(self.transcriptions_url(), body),
                RequestStage::CreateJob,
            )
            .await?;
        let created: JobCreatedResponse = response.json()?;

        log::info!("Transcription job created: {}", created.self_url);
        Ok(JobHandle::new(created.self_url))
    }

    /// 終端状態になるまでステータスを取得し、結果ファイル一覧の URL を返す。
    pub async fn poll_transcription_status(
        &self,
        job: &JobHandle,
        policy: &PollPolicy,
    ) -> Result<ResultLocator, TranscriptionError> {
        self.poll_until_done(job, policy)
            .await
            .map(|outcome| outcome.files)
    }

    /// `poll_transcription_status` と同じだが、試行回数も返す。
    pub async fn poll_until_done(
        &self,
        job: &JobHandle,
        policy: &PollPolicy,
    ) -> Result<PollOutcome, TranscriptionError> {
        let mut backoff = policy.backoff();

        for attempt in 1..=policy.max_attempts {
            let response = self
                .execute(TransportRequest::get(job.as_str()), RequestStage::JobStatus)
                .await?;
            let status: JobStatusResponse = response.json()?;

            match status.status {
                JobStatus::Succeeded => {
                    let files = status
                        .links
                        .and_then(|links| links.files)
                        .ok_or_else(|| {
                            TranscriptionError::Decode("Succeeded job has no links.files".into())
                        })?;
                    log::info!("Transcription job succeeded after {attempt} polls");
                    return Ok(PollOutcome {
                        files: ResultLocator::new(files),
                        attempts: attempt,
                    });
                }
                s if s.is_failure() => {
                    log::warn!("Transcription job {}: {}", s.as_str(), job);
                    return Err(TranscriptionError::JobFailed {
                        status: s.as_str().to_string(),
                    });
                }
                s => {
                    let wait = backoff.next().unwrap_or(policy.max_interval);
                    log::debug!(
                        "Job {} is {} (attempt {}/{}), next poll in {:?}",
                        job,
                        s.as_str(),
                        attempt,
                        policy.max_attempts,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        Err(TranscriptionError::JobTimeout {
            attempts: policy.max_attempts,
        })
    }

    /// 結果ファイル一覧から先頭ファイルの contentUrl を返す。
    pub async fn get_transcription_result(
        &self,
        files: &ResultLocator,
    ) -> Result<String, TranscriptionError> {
        let response = self
            .execute(TransportRequest::get(files.as_str()), RequestStage::ResultFiles)
            .await?;
        let listing: FilesResponse = response.json()?;

        listing
            .values
            .into_iter()
            .next()
            .map(|file| file.links.content_url)
            .ok_or(TranscriptionError::EmptyResult)
    }

    /// contentUrl から認識フレーズ列を取得する。
    ///
    /// contentUrl は署名付きストレージ URL なので、サービス用ヘッダーは付けない。
    pub async fn fetch_recognized_phrases(
        &self,
        content_url: &str,
    ) -> Result<Vec<RecognizedPhrase>, TranscriptionError> {
        let response = self.transport.send(TransportRequest::get(content_url)).await?;
        if response.status != 200 {
            return Err(TranscriptionError::ContentFetch {
                status: response.status,
                body: response.body,
            });
        }
        let payload: TranscriptionPayload = response.json()?;
        Ok(payload.recognized_phrases)
    }

    /// contentUrl の認識結果を話者ごとのテキストに整形して返す。
    pub async fn fetch_transcription_display(
        &self,
        content_url: &str,
    ) -> Result<String, TranscriptionError> {
        let phrases = self.fetch_recognized_phrases(content_url).await?;
        let options = FormatOptions {
            unknown_speaker_label: self.settings.unknown_speaker_label.clone(),
        };
        Ok(transcript::format_transcript(&phrases, &options))
    }

    /// サービスヘッダーを付けて送信し、期待ステータス（POST は 201, GET は 200）を検査する。
    async fn execute(
        &self,
        request: TransportRequest,
        stage: RequestStage,
    ) -> Result<TransportResponse, TranscriptionError> {
        let expected = match stage {
            RequestStage::CreateJob => 201,
            RequestStage::JobStatus | RequestStage::ResultFiles => 200,
        };
        log::debug!("{:?} {}", request.method, request.url);

        let response = self
            .transport
            .send(request.with_headers(&self.headers))
            .await?;

        if response.status != expected {
            return Err(TranscriptionError::Request {
                stage,
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::speech::scripted::ScriptedTransport;
    use crate::infra::speech::Method;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    const JOB_URL: &str = "https://svc/speechtotext/v3.2/transcriptions/job-1";
    const FILES_URL: &str = "https://svc/speechtotext/v3.2/transcriptions/job-1/files";

    fn settings() -> SpeechSettings {
        SpeechSettings {
            endpoint: "https://svc".into(),
            subscription_key: "test-key".into(),
            ..Default::default()
        }
    }

    fn client(transport: ScriptedTransport) -> (SpeechClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        (SpeechClient::new(transport.clone(), settings()), transport)
    }

    fn status(s: &str) -> serde_json::Value {
        json!({ "status": s })
    }

    fn succeeded() -> serde_json::Value {
        json!({ "status": "Succeeded", "links": { "files": FILES_URL } })
    }

    #[tokio::test]
    async fn create_job_posts_config_with_headers() {
        let (client, transport) = client(
            ScriptedTransport::new().respond_json(201, json!({ "self": JOB_URL, "status": "NotStarted" })),
        );

        let handle = client
            .create_transcription_job("https://blob/audio.wav")
            .await
            .unwrap();
        assert_eq!(handle.as_str(), JOB_URL);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url, "https://svc/speechtotext/v3.2/transcriptions");
        assert_eq!(req.header("Ocp-Apim-Subscription-Key"), Some("test-key"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("Accept"), Some("application/json"));
        assert_eq!(req.header("Accept-Language"), Some("ja-JP"));
        assert_eq!(req.header("X-Japan-Force"), Some("True"));

        let body = req.body.as_ref().unwrap();
        assert_eq!(body["contentUrls"], json!(["https://blob/audio.wav"]));
        assert_eq!(body["properties"]["punctuationMode"], "DictatedAndAutomatic");
        assert_eq!(body["properties"]["diarizationEnabled"], true);
    }

    #[tokio::test]
    async fn create_job_rejects_non_201() {
        let (client, _) = client(ScriptedTransport::new().respond_text(200, "{\"self\":\"x\"}"));
        let err = client
            .create_transcription_job("https://blob/audio.wav")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TranscriptionError::Request {
                stage: RequestStage::CreateJob,
                status: 200,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn create_job_error_embeds_body() {
        let (client, _) =
            client(ScriptedTransport::new().respond_text(400, "InvalidUri: contentUrls"));
        let err = client
            .create_transcription_job("bad")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("InvalidUri: contentUrls"));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_returns_files_on_first_success_without_sleeping() {
        let (client, transport) = client(ScriptedTransport::new().respond_json(200, succeeded()));
        let start = Instant::now();

        let outcome = client
            .poll_until_done(&JobHandle::new(JOB_URL), &PollPolicy::default())
            .await
            .unwrap();

        assert_eq!(outcome.files.as_str(), FILES_URL);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::Get);
        assert_eq!(requests[0].url, JOB_URL);
        assert_eq!(requests[0].header("Ocp-Apim-Subscription-Key"), Some("test-key"));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_backs_off_30_then_60() {
        let (client, _) = client(
            ScriptedTransport::new()
                .respond_json(200, status("NotStarted"))
                .respond_json(200, status("Running"))
                .respond_json(200, status("Running"))
                .respond_json(200, succeeded()),
        );
        let start = Instant::now();

        let files = client
            .poll_transcription_status(&JobHandle::new(JOB_URL), &PollPolicy::default())
            .await
            .unwrap();

        assert_eq!(files.as_str(), FILES_URL);
        // 3回の待機: 30 + 60 + 60
        assert_eq!(start.elapsed(), Duration::from_secs(150));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failed_on_first_attempt_does_not_sleep() {
        let (client, _) = client(ScriptedTransport::new().respond_json(200, status("Failed")));
        let start = Instant::now();

        let err = client
            .poll_transcription_status(&JobHandle::new(JOB_URL), &PollPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TranscriptionError::JobFailed { ref status } if status == "Failed"));
        assert!(err.to_string().contains("Failed"));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_cancelled_is_failure() {
        let (client, _) = client(
            ScriptedTransport::new()
                .respond_json(200, status("Running"))
                .respond_json(200, status("Cancelled")),
        );
        let err = client
            .poll_transcription_status(&JobHandle::new(JOB_URL), &PollPolicy::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_times_out_after_max_attempts() {
        let mut transport = ScriptedTransport::new();
        for _ in 0..4 {
            transport = transport.respond_json(200, status("Running"));
        }
        // 上限を超えたら読まれないはず
        transport = transport.respond_json(200, succeeded());
        let (client, transport) = client(transport);

        let policy = PollPolicy {
            max_attempts: 4,
            ..Default::default()
        };
        let err = client
            .poll_transcription_status(&JobHandle::new(JOB_URL), &policy)
            .await
            .unwrap_err();

        assert!(matches!(err, TranscriptionError::JobTimeout { attempts: 4 }));
        assert_eq!(transport.requests().len(), 4);
        assert_eq!(transport.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_unknown_status_keeps_waiting() {
        let (client, _) = client(
            ScriptedTransport::new()
                .respond_json(200, status(""))
                .respond_json(200, succeeded()),
        );
        let start = Instant::now();
        client
            .poll_transcription_status(&JobHandle::new(JOB_URL), &PollPolicy::default())
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_request_error_is_not_retried() {
        let (client, transport) = client(
            ScriptedTransport::new()
                .respond_text(503, "Service Unavailable")
                .respond_json(200, succeeded()),
        );
        let err = client
            .poll_transcription_status(&JobHandle::new(JOB_URL), &PollPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TranscriptionError::Request {
                stage: RequestStage::JobStatus,
                status: 503,
                ..
            }
        ));
        assert_eq!(transport.remaining(), 1);
    }

    #[tokio::test]
    async fn result_returns_first_content_url() {
        let (client, _) = client(ScriptedTransport::new().respond_json(
            200,
            json!({
                "values": [
                    { "kind": "Transcription", "links": { "contentUrl": "https://blob/contenturl_0.json" } },
                    { "kind": "TranscriptionReport", "links": { "contentUrl": "https://blob/report.json" } }
                ]
            }),
        ));
        let url = client
            .get_transcription_result(&ResultLocator::new(FILES_URL))
            .await
            .unwrap();
        assert_eq!(url, "https://blob/contenturl_0.json");
    }

    #[tokio::test]
    async fn result_with_no_files_is_empty_result() {
        let (client, _) = client(ScriptedTransport::new().respond_json(200, json!({ "values": [] })));
        let err = client
            .get_transcription_result(&ResultLocator::new(FILES_URL))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::EmptyResult));
    }

    #[tokio::test]
    async fn display_is_fetched_without_service_headers() {
        let (client, transport) = client(ScriptedTransport::new().respond_json(
            200,
            json!({
                "recognizedPhrases": [
                    { "speaker": 1, "nBest": [{ "display": "こんにちは。元気？" }] },
                    { "speaker": 2, "nBest": [{ "display": "元気です。" }] }
                ]
            }),
        ));
        let text = client
            .fetch_transcription_display("https://blob/contenturl_0.json")
            .await
            .unwrap();
        assert_eq!(
            text,
            "[speaker 1]\nこんにちは。\n元気？\n\n[speaker 2]\n元気です。"
        );

        let requests = transport.requests();
        assert!(requests[0].header("Ocp-Apim-Subscription-Key").is_none());
    }

    #[tokio::test]
    async fn display_fetch_error_carries_body() {
        let (client, _) = client(ScriptedTransport::new().respond_text(403, "AuthenticationFailed"));
        let err = client
            .fetch_transcription_display("https://blob/contenturl_0.json")
            .await
            .unwrap_err();
        match err {
            TranscriptionError::ContentFetch { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "AuthenticationFailed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn close_releases_transport() {
        let (client, transport) = client(ScriptedTransport::new());
        client.close().await;
        assert!(transport.is_closed());
        let err = client
            .create_transcription_job("https://blob/audio.wav")
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::TransportClosed));
    }
}
