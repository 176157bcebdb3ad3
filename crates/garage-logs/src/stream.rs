use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::pipeline::LogPipeline;

/// Bytes requested per read from the child's stdout
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Counters for one streaming session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub chunks: u64,
    pub lines_seen: u64,
    pub lines_written: u64,
    /// Stopped by the cancellation token rather than end of stream
    pub cancelled: bool,
}

/// Pump `reader` through `pipeline` into `writer`, one line per selected
/// log line, until end of stream or cancellation.
///
/// Output is flushed after every chunk so lines show up as they arrive.
/// A buffered partial line is flushed before returning.
pub async fn stream_lines<R, W>(
    mut reader: R,
    writer: &mut W,
    pipeline: &mut LogPipeline,
    cancel: &CancellationToken,
) -> io::Result<StreamSummary>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut summary = StreamSummary::default();

    loop {
        let n = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                summary.cancelled = true;
                break;
            }

            result = reader.read(&mut buf) => result?,
        };

        if n == 0 {
            break;
        }

        summary.chunks += 1;
        let lines = pipeline.process_chunk(&buf[..n]);
        summary.lines_written += write_lines(writer, &lines).await?;
    }

    let rest = pipeline.finish();
    summary.lines_written += write_lines(writer, &rest).await?;
    summary.lines_seen = pipeline.lines_seen();

    tracing::debug!(
        chunks = summary.chunks,
        lines_seen = summary.lines_seen,
        lines_written = summary.lines_written,
        cancelled = summary.cancelled,
        "log stream ended"
    );
    Ok(summary)
}

async fn write_lines<W>(writer: &mut W, lines: &[String]) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    if lines.is_empty() {
        return Ok(0);
    }
    for line in lines {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await?;
    Ok(lines.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::LineFilter;
    use crate::pipeline::Chunking;

    const OUTPUT: &str = "Retrieving logs for app my-app...\n\n   2018-12-21T09:45:49.73-0500 [RTR/18] OUT GET /x 200\n   2018-12-21T09:45:49.73-0500 [APP/PROC/WEB/0] OUT {\"msg\":\"hi\"}\n    at <anonymous>:1:11\n";

    #[tokio::test]
    async fn test_stream_whole_output() {
        let mut pipeline = LogPipeline::new(LineFilter::new().app_only(true), Chunking::buffered());
        let mut out = Vec::new();

        let summary = stream_lines(OUTPUT.as_bytes(), &mut out, &mut pipeline, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Retrieving logs for app my-app...\n\n{\"msg\":\"hi\"}\n    at <anonymous>:1:11\n"
        );
        assert_eq!(summary.lines_seen, 5);
        assert_eq!(summary.lines_written, 4);
        assert!(!summary.cancelled);
    }

    #[tokio::test]
    async fn test_stream_in_small_chunks() {
        let (mut tx, rx) = tokio::io::duplex(16);
        let writer = tokio::spawn(async move {
            for piece in OUTPUT.as_bytes().chunks(7) {
                tx.write_all(piece).await.unwrap();
            }
        });

        let mut pipeline = LogPipeline::new(LineFilter::new().json_only(true), Chunking::buffered());
        let mut out = Vec::new();
        let summary = stream_lines(rx, &mut out, &mut pipeline, &CancellationToken::new())
            .await
            .unwrap();
        writer.await.unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Retrieving logs for app my-app...\n\n{\"msg\":\"hi\"}\n"
        );
        assert!(summary.chunks > 1);
        assert_eq!(summary.lines_seen, 5);
    }

    #[tokio::test]
    async fn test_stream_flushes_unterminated_last_line() {
        let mut pipeline = LogPipeline::new(LineFilter::new(), Chunking::buffered());
        let mut out = Vec::new();
        stream_lines(&b"h1\nh2\n    tail"[..], &mut out, &mut pipeline, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "h1\nh2\n    tail\n");
    }

    #[tokio::test]
    async fn test_stream_stops_on_cancel() {
        let (_tx, rx) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut pipeline = LogPipeline::new(LineFilter::new(), Chunking::buffered());
        let mut out = Vec::new();
        let summary = stream_lines(rx, &mut out, &mut pipeline, &cancel).await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.chunks, 0);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_stream_empty_input() {
        let mut pipeline = LogPipeline::new(LineFilter::new(), Chunking::PerChunk);
        let mut out = Vec::new();
        let summary = stream_lines(&b""[..], &mut out, &mut pipeline, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary, StreamSummary::default());
    }
}
