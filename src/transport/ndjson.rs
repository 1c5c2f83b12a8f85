//! Line-delimited JSON framing, one event per line.

use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::RunEventStream;

/// Line written after the run's terminal event.
pub const NDJSON_DONE_LINE: &str = r#"{"type":"done"}"#;

/// Writes every frame of `stream` to `out`, flushing after each line.
///
/// A write failure drops the stream and with it cancels the run.
pub async fn write_ndjson<W>(mut stream: RunEventStream, out: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = stream.next().await {
        let mut line = frame.to_json_line()?;
        line.push('\n');
        out.write_all(line.as_bytes()).await?;
        out.flush().await?;
    }
    Ok(())
}
