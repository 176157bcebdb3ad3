use anyhow::{Context, Result};
use async_trait::async_trait;
use garage_logs::{Chunking, LineFilter, LogPipeline, stream_lines};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use super::{AppContext, Command};

/// Exit code reported when streaming is interrupted with Ctrl-C
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// `cfutil logs`: tail or dump an app's logs, filtered and trimmed
pub struct LogsCommand {
    pub app: String,
    pub recent: bool,
    pub filter: LineFilter,
    /// Overrides `logs.buffer_partial_lines` from the config
    pub per_chunk: bool,
}

impl LogsCommand {
    fn chunking(&self, ctx: &AppContext) -> Chunking {
        Chunking::from_buffering(ctx.config.logs.buffer_partial_lines && !self.per_chunk)
    }

    /// Stream filtered logs into `writer` until cf exits or `cancel` fires
    pub async fn run<W>(&self, ctx: &AppContext, writer: &mut W, cancel: &CancellationToken) -> Result<i32>
    where
        W: AsyncWrite + Unpin,
    {
        ctx.cf.check().await?;

        let stream = ctx.cf.logs(&self.app, self.recent).await?;
        let mut pipeline = LogPipeline::new(self.filter, self.chunking(ctx));

        let summary = stream_lines(stream.stdout, writer, &mut pipeline, cancel)
            .await
            .context("Failed to copy cf logs output")?;

        if summary.cancelled {
            // Dropping the exit future kills cf
            return Ok(INTERRUPTED_EXIT_CODE);
        }

        let code = stream.exit.await?;
        if code != 0 {
            tracing::debug!(code, app = %self.app, "cf logs exited");
        }
        Ok(code)
    }
}

#[async_trait]
impl Command for LogsCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<i32> {
        let cancel = CancellationToken::new();
        let ctrl_c = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        let mut stdout = tokio::io::stdout();
        let result = self.run(ctx, &mut stdout, &cancel).await;
        ctrl_c.abort();
        result
    }
}
