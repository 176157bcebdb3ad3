use crate::chunker::{LineSplitter, split_lines};
use crate::filter::LineFilter;

/// Lines at the start of `cf logs` output that are status messages from the
/// CLI itself, not log entries
pub const HEADER_LINES: u64 = 2;

/// How chunk boundaries are handled
#[derive(Debug)]
pub enum Chunking {
    /// Buffer a trailing partial line until the next chunk
    Buffered(LineSplitter),
    /// Split every chunk on its own; a line cut by a chunk boundary comes
    /// out as two lines
    PerChunk,
}

impl Chunking {
    pub fn buffered() -> Self {
        Self::Buffered(LineSplitter::new())
    }

    pub fn from_buffering(buffer_partial_lines: bool) -> Self {
        if buffer_partial_lines {
            Self::buffered()
        } else {
            Self::PerChunk
        }
    }
}

/// Turns chunks of `cf logs` output into the lines to print.
///
/// Owns the only state of a log session: the line counter that lets the
/// header lines through and, when buffering, the partial line.
#[derive(Debug)]
pub struct LogPipeline {
    filter: LineFilter,
    chunking: Chunking,
    lines_seen: u64,
}

impl LogPipeline {
    pub fn new(filter: LineFilter, chunking: Chunking) -> Self {
        Self {
            filter,
            chunking,
            lines_seen: 0,
        }
    }

    /// Process one chunk, returning the lines to print in order
    pub fn process_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        let lines = match &mut self.chunking {
            Chunking::Buffered(splitter) => splitter.push(chunk),
            Chunking::PerChunk => split_lines(chunk),
        };
        self.route_all(lines)
    }

    /// Flush a buffered partial line at end of stream
    pub fn finish(&mut self) -> Vec<String> {
        let rest = match &mut self.chunking {
            Chunking::Buffered(splitter) => splitter.finish(),
            Chunking::PerChunk => None,
        };
        self.route_all(rest.into_iter().collect())
    }

    /// Number of lines received so far, header lines included
    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    fn route_all(&mut self, lines: Vec<String>) -> Vec<String> {
        lines
            .into_iter()
            .filter_map(|line| self.route(line))
            .collect()
    }

    fn route(&mut self, line: String) -> Option<String> {
        let is_header = self.lines_seen < HEADER_LINES;
        self.lines_seen = self.lines_seen.saturating_add(1);

        if is_header {
            return Some(line);
        }
        self.filter.select(&line).text().map(str::to_string)
    }
}
