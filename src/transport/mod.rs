//! Streaming transport: hands a run's events to exactly one subscriber.
//!
//! [`RunEventStream`] turns a [`RunHandle`] into a [`Stream`] of
//! [`StreamFrame`]s. After the run's `finish` or `error` it yields a final
//! [`StreamFrame::End`]; a cancelled run just ends. Dropping the stream,
//! which is what happens when an HTTP client disconnects, cancels the run.

mod ndjson;
mod sse;

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::Stream;

use crate::run::{RunEvent, RunHandle, RunId};

pub use ndjson::{write_ndjson, NDJSON_DONE_LINE};
pub use sse::{into_sse, sse_event, SSE_DONE_DATA, SSE_DONE_EVENT};

/// One item of a subscriber's stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Event(RunEvent),
    /// End-of-stream marker, sent once after a terminal event.
    End,
}

impl StreamFrame {
    /// Single-line JSON form used by the line-delimited transport.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        match self {
            StreamFrame::Event(event) => serde_json::to_string(event),
            StreamFrame::End => Ok(NDJSON_DONE_LINE.to_string()),
        }
    }
}

/// Subscriber stream over one run.
#[derive(Debug)]
pub struct RunEventStream {
    handle: RunHandle,
    terminal_seen: bool,
    done: bool,
}

impl RunEventStream {
    pub fn new(handle: RunHandle) -> Self {
        Self {
            handle,
            terminal_seen: false,
            done: false,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.handle.id()
    }
}

impl From<RunHandle> for RunEventStream {
    fn from(handle: RunHandle) -> Self {
        Self::new(handle)
    }
}

impl Stream for RunEventStream {
    type Item = StreamFrame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamFrame>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match ready!(this.handle.poll_recv(cx)) {
            Some(event) => {
                this.terminal_seen |= event.is_terminal();
                Poll::Ready(Some(StreamFrame::Event(event)))
            }
            None => {
                this.done = true;
                if this.terminal_seen {
                    Poll::Ready(Some(StreamFrame::End))
                } else {
                    Poll::Ready(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::Task;
    use crate::run::{RunController, RunSettings};
    use crate::sa::{CoolingSchedule, SaConfig};
    use futures_util::StreamExt;
    use std::time::Duration;

    fn endless() -> RunController {
        RunController::new(RunSettings {
            annealing: SaConfig::default()
                .with_initial_temperature(1e9)
                .with_min_temperature(1e-9)
                .with_cooling(CoolingSchedule::Geometric { alpha: 0.999_999 })
                .with_iterations_per_temperature(500)
                .with_progress_interval(500)
                .with_seed(8),
            ..RunSettings::default()
        })
    }

    fn three_tasks() -> Vec<Task> {
        vec![
            Task::new("x", 1.0, 1.0, 2),
            Task::new("y", 2.0, 2.0, 4),
            Task::new("z", 0.5, 3.0, 1),
        ]
    }

    #[tokio::test]
    async fn test_end_marker_follows_finish() {
        let controller = RunController::new(RunSettings::default());
        let frames: Vec<StreamFrame> =
            RunEventStream::new(controller.start(vec![]).unwrap()).collect().await;

        assert_eq!(frames.len(), 3);
        assert!(matches!(&frames[0], StreamFrame::Event(RunEvent::Start(_))));
        assert!(matches!(&frames[1], StreamFrame::Event(RunEvent::Finish(_))));
        assert_eq!(frames[2], StreamFrame::End);
    }

    #[tokio::test]
    async fn test_end_marker_follows_error() {
        let controller = RunController::new(RunSettings::default());
        let bad = vec![Task::new("negative", -1.0, 2.0, 1)];
        let frames: Vec<StreamFrame> =
            RunEventStream::new(controller.start(bad).unwrap()).collect().await;

        assert_eq!(frames.len(), 2);
        assert!(matches!(&frames[0], StreamFrame::Event(RunEvent::Error { .. })));
        assert_eq!(frames[1], StreamFrame::End);
    }

    #[tokio::test]
    async fn test_cancelled_stream_has_no_end_marker() {
        let controller = endless();
        let handle = controller.start(three_tasks()).unwrap();
        let token = handle.cancel_token();
        let mut stream = RunEventStream::new(handle);

        assert!(matches!(
            stream.next().await,
            Some(StreamFrame::Event(RunEvent::Start(_)))
        ));
        token.cancel();

        let rest: Vec<StreamFrame> = stream.collect().await;
        assert!(rest
            .iter()
            .all(|f| matches!(f, StreamFrame::Event(e) if !e.is_terminal())));
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_run() {
        let controller = endless();
        let mut stream = RunEventStream::new(controller.start(three_tasks()).unwrap());
        let _ = stream.next().await;
        drop(stream);

        for _ in 0..500 {
            if !controller.is_busy() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run kept going after its subscriber went away");
    }

    #[tokio::test]
    async fn test_ndjson_lines() {
        let controller = RunController::new(RunSettings {
            annealing: SaConfig::default().with_seed(4).with_progress_interval(25),
            ..RunSettings::default()
        });
        let stream = RunEventStream::new(controller.start(three_tasks()).unwrap());
        let mut out: Vec<u8> = Vec::new();

        write_ndjson(stream, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.last(), Some(&NDJSON_DONE_LINE));
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "start");
        let finish: serde_json::Value = serde_json::from_str(lines[lines.len() - 2]).unwrap();
        assert_eq!(finish["type"], "finish");
        assert_eq!(finish["data"]["detailed_schedule"].as_array().unwrap().len(), 3);
        assert!(lines.iter().any(|l| l.contains("\"progress\"")));
        assert!(lines.iter().any(|l| l.contains("\"temp_change\"")));
    }
}
