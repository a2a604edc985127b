//! テスト用: 決められた順にレスポンスを返すトランスポート。

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{SpeechTransport, TransportRequest, TransportResponse};
use crate::domain::error::TranscriptionError;

pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<TransportRequest>>,
    closed: AtomicBool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn respond_json(self, status: u16, body: serde_json::Value) -> Self {
        self.respond_text(status, &body.to_string())
    }

    pub fn respond_text(self, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().push_back(TransportResponse {
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TranscriptionError> {
        if self.is_closed() {
            return Err(TranscriptionError::TransportClosed);
        }
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TranscriptionError::Transport("no scripted response left".into()))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
