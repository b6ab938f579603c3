//! SSE-backed implementation of the `StreamSource` trait.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{header, StatusCode};
use url::Url;

use super::traits::{EventSubscription, StreamSource, StreamSourceError};

/// User agent sent with each subscription request, as required by the
/// Wikimedia EventStreams usage policy.
const USER_AGENT: &str = concat!("wikiwatch/", env!("CARGO_PKG_VERSION"));

/// A stream source backed by a Server-Sent Events HTTP endpoint.
pub struct SseStreamSource {
    client: reqwest::Client,
    url: Url,
}

impl SseStreamSource {
    /// Creates a new SSE stream source for the given endpoint.
    pub fn new(url: Url, connect_timeout: Duration) -> Result<Self, StreamSourceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl StreamSource for SseStreamSource {
    async fn connect(&self) -> Result<Box<dyn EventSubscription>, StreamSourceError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(StreamSourceError::Rejected(status.as_u16()));
        }
        if status.is_client_error() {
            return Err(StreamSourceError::InvalidSubscription(status.as_u16()));
        }

        Ok(Box::new(SseSubscription {
            stream: response.bytes_stream().boxed(),
            frames: SseFrameBuffer::default(),
        }))
    }
}

/// A live SSE subscription, decoding the chunked byte stream into event
/// payloads.
struct SseSubscription {
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
    frames: SseFrameBuffer,
}

#[async_trait]
impl EventSubscription for SseSubscription {
    async fn next_event(&mut self) -> Result<String, StreamSourceError> {
        loop {
            if let Some(payload) = self.frames.next_payload() {
                return Ok(payload);
            }
            match self.stream.next().await {
                Some(Ok(chunk)) => self.frames.push_bytes(&chunk),
                Some(Err(e)) => return Err(e.into()),
                None => return Err(StreamSourceError::StreamEnded),
            }
        }
    }
}

/// Incremental decoder for the SSE wire format.
///
/// Collects `data:` lines until the blank line that terminates a message and
/// yields their joined body. Other fields (`event:`, `id:`, `retry:`) and
/// comment lines are ignored; chunk boundaries may fall anywhere.
#[derive(Debug, Default)]
struct SseFrameBuffer {
    buf: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseFrameBuffer {
    fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Returns the next complete event payload, if the buffer holds one.
    fn next_payload(&mut self) -> Option<String> {
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line_bytes: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data_lines.is_empty() {
                    return Some(self.data_lines.drain(..).collect::<Vec<_>>().join("\n"));
                }
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data_lines.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
            // Non-data fields and comment lines are dropped.
        }
        None
    }
}
