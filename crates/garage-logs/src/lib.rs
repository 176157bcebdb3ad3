//! Log processing for garage
//!
//! This crate turns the raw output of `cf logs` into filtered lines:
//! chunking, structured-line parsing, selection and streaming.

mod chunker;
mod filter;
mod parser;
mod pipeline;
mod stream;

pub use chunker::{LineSplitter, MAX_LINE_BYTES, split_lines};
pub use filter::LineFilter;
pub use parser::LogParser;
pub use pipeline::{Chunking, HEADER_LINES, LogPipeline};
pub use stream::{StreamSummary, stream_lines};

// Re-export types used in our public API
pub use garage_types::{LineSelection, ParsedLogLine};
