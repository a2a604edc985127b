pub mod client;
pub mod reqwest_transport;
#[cfg(test)]
pub(crate) mod scripted;

pub use client::{PollOutcome, SpeechClient};
pub use reqwest_transport::ReqwestTransport;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::domain::error::TranscriptionError;

/// HTTP メソッド（このサービスで使うものだけ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// トランスポートに渡すリクエスト
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl TransportRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_headers(mut self, headers: &[(String, String)]) -> Self {
        self.headers.extend_from_slice(headers);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// ステータスコードと生のボディ
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TranscriptionError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Speech サービスとの通信路。
///
/// 所有者が明示的に `close` する。close 後の `send` は
/// `TranscriptionError::TransportClosed` を返す。
#[async_trait]
pub trait SpeechTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TranscriptionError>;

    async fn close(&self);

    fn name(&self) -> &str;
}
