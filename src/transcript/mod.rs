//! Session transcripts: append-only JSONL files, one event per line.

mod reader;
mod types;

#[cfg(test)]
pub(crate) use reader::MAX_LINE_BYTES;
pub use reader::TranscriptReader;
pub use types::{ContentBlock, EventKind, RawEvent, Usage};

/// Failure reading a transcript. Malformed lines are not errors.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("transcript line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
