//! Recording transport for adapter tests.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, PoisonError},
};

use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;

use crate::{
    error::{AdapterError, Result},
    transport::{HttpMethod, RequestContext, Transport, TransportResponse},
};

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: HttpMethod,
    pub ctx: RequestContext,
    pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
    pub fn json_body(&self) -> Value {
        serde_json::from_slice(self.body.as_deref().unwrap_or(b"null")).unwrap()
    }

    pub fn query(&self, key: &str) -> Option<String> {
        self.ctx.url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned())
    }
}

/// Replays queued responses in order and records every request.
///
/// When the queue is empty, requests fail with `TransportError`.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Result<TransportResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, status: u16, body: &Value) -> Self {
        self.with_response(status, serde_json::to_vec(body).unwrap(), vec![])
    }

    pub fn with_json_headers(self, status: u16, body: &Value, headers: &[(&str, &str)]) -> Self {
        let headers =
            headers.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        self.with_response(status, serde_json::to_vec(body).unwrap(), headers)
    }

    pub fn with_response(self, status: u16, body: Vec<u8>, headers: Vec<(String, String)>) -> Self {
        self.push(Ok(TransportResponse { status, body, headers }));
        self
    }

    pub fn with_error(self, error: AdapterError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, response: Result<TransportResponse>) {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner).push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Runs a future to completion on a fresh single-threaded runtime.
///
/// For async assertions inside `proptest!` bodies.
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(future)
}

impl Transport for MockTransport {
    async fn execute<'a>(
        &'a self,
        method: HttpMethod,
        ctx: RequestContext,
        body: Option<Vec<u8>>,
    ) -> Result<TransportResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest { method, ctx, body });

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(AdapterError::TransportError("no mocked response".to_owned())))
    }

    fn protocol_name(&self) -> &'static str {
        "mock"
    }
}

/// In-memory log sink for asserting on emitted events.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Installs a capturing subscriber for the current thread.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap_or_else(PoisonError::into_inner)).into_owned()
    }

    pub fn lines_containing(&self, needle: &str) -> usize {
        self.contents().lines().filter(|line| line.contains(needle)).count()
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(Arc::clone(&self.0))
    }
}

#[derive(Debug)]
pub(crate) struct LogWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
