use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{Method, SpeechTransport, TransportRequest, TransportResponse};
use crate::domain::error::TranscriptionError;

/// reqwest を使ったトランスポート
pub struct ReqwestTransport {
    client: RwLock<Option<reqwest::Client>>,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TranscriptionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranscriptionError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::from_client(client))
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client: RwLock::new(Some(client)),
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.client.read().await.is_none()
    }
}

#[async_trait]
impl SpeechTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TranscriptionError> {
        // ロックは Client の clone 取得の間だけ保持する
        let client = self
            .client
            .read()
            .await
            .clone()
            .ok_or(TranscriptionError::TransportClosed)?;

        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TranscriptionError::Transport(format!("HTTP request timed out: {e}"))
            } else {
                TranscriptionError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TranscriptionError::Transport(format!("Failed to read response body: {e}")))?;

        Ok(TransportResponse { status, body })
    }

    async fn close(&self) {
        if self.client.write().await.take().is_some() {
            log::debug!("HTTP transport closed");
        }
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}
