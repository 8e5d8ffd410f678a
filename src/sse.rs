//! Pull-based stream of server-sent events read off an HTTP response body.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use eventsource_stream::{EventStream as SseDecoder, EventStreamError, Eventsource};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;

use crate::error::ProbeError;

/// Event name used when the server omits the `event:` field
pub const DEFAULT_EVENT_NAME: &str = "message";

/// One decoded server-sent event.
///
/// `id` is the stream's last event id: an event without an `id:` field carries the
/// id of the most recent event that had one, and is empty until the first such event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
    pub id: String,
}

impl SseEvent {
    pub fn new(event: impl Into<String>, data: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: id.into(),
        }
    }
}

impl From<eventsource_stream::Event> for SseEvent {
    fn from(event: eventsource_stream::Event) -> Self {
        let name = if event.event.is_empty() {
            DEFAULT_EVENT_NAME.to_string()
        } else {
            event.event
        };
        Self {
            event: name,
            data: event.data,
            id: event.id,
        }
    }
}

fn stream_error(error: EventStreamError<reqwest::Error>) -> ProbeError {
    match error {
        EventStreamError::Transport(e) => ProbeError::Http(e),
        other => ProbeError::Sse(other.to_string()),
    }
}

pin_project! {
    /// Unbounded, non-restartable sequence of events from one SSE response.
    ///
    /// Each item is yielded as soon as its terminating blank line arrives. Dropping
    /// the stream drops the underlying response body and releases the connection.
    pub struct EventStream {
        #[pin]
        inner: SseDecoder<BoxStream<'static, reqwest::Result<Bytes>>>,
    }
}

impl EventStream {
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::from_byte_stream(response.bytes_stream())
    }

    /// Decode events from any byte-chunk stream shaped like a response body
    pub fn from_byte_stream<S>(bytes: S) -> Self
    where
        S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: bytes.boxed().eventsource(),
        }
    }
}

impl Stream for EventStream {
    type Item = Result<SseEvent, ProbeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project()
            .inner
            .poll_next(cx)
            .map(|item| item.map(|result| result.map(SseEvent::from).map_err(stream_error)))
    }
}
