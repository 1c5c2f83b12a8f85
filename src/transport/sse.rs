//! Server-sent events framing.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use tracing::warn;

use super::{RunEventStream, StreamFrame};

/// SSE `event:` name of the end-of-stream record.
pub const SSE_DONE_EVENT: &str = "done";
/// SSE `data:` of the end-of-stream record.
pub const SSE_DONE_DATA: &str = "[DONE]";

/// Encodes one frame. Run events use their type as the SSE event name and
/// their `{"type", "data"}` JSON as the payload.
pub fn sse_event(frame: &StreamFrame) -> Event {
    match frame {
        StreamFrame::Event(event) => Event::default()
            .event(event.kind())
            .json_data(event)
            .unwrap_or_else(|err| {
                warn!(%err, kind = event.kind(), "failed to encode event");
                Event::default()
                    .event("error")
                    .data(r#"{"type":"error","data":{"message":"event encoding failed"}}"#)
            }),
        StreamFrame::End => Event::default().event(SSE_DONE_EVENT).data(SSE_DONE_DATA),
    }
}

/// Wraps a run's stream as an axum SSE response body.
pub fn into_sse(stream: RunEventStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(stream.map(|frame| Ok(sse_event(&frame)))).keep_alive(KeepAlive::default())
}
