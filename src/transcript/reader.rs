use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use super::types::RawEvent;
use super::TranscriptError;

/// Longest transcript line accepted. Tool output can make single lines huge.
pub const MAX_LINE_BYTES: usize = 32 * 1024 * 1024;

const READ_BUFFER_BYTES: usize = 256 * 1024;

/// Streams the events of one JSONL transcript.
///
/// Blank and undecodable lines are skipped. An I/O failure or a line longer
/// than the limit is yielded once as an error, after which the iterator ends.
pub struct TranscriptReader<R> {
    reader: R,
    buf: Vec<u8>,
    limit: usize,
    malformed: usize,
    finished: bool,
}

impl TranscriptReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, TranscriptError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(READ_BUFFER_BYTES, file)))
    }
}

impl<R: BufRead> TranscriptReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            limit: MAX_LINE_BYTES,
            malformed: 0,
            finished: false,
        }
    }

    #[cfg(test)]
    pub fn with_line_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Lines dropped so far because they were not valid events
    pub fn malformed_lines(&self) -> usize {
        self.malformed
    }

    /// Read the next raw line into `buf` without its terminator.
    /// Returns `Ok(false)` at end of input.
    fn read_line(&mut self) -> Result<bool, TranscriptError> {
        self.buf.clear();
        let cap = self.limit as u64 + 1;
        let n = (&mut self.reader).take(cap).read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(false);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        } else if self.buf.len() > self.limit {
            return Err(TranscriptError::LineTooLong { limit: self.limit });
        }
        Ok(true)
    }
}

impl<R: BufRead> Iterator for TranscriptReader<R> {
    type Item = Result<RawEvent, TranscriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.read_line() {
                Ok(false) => self.finished = true,
                Ok(true) => {
                    if self.buf.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    match serde_json::from_slice::<RawEvent>(&self.buf) {
                        Ok(event) => return Some(Ok(event)),
                        Err(_) => self.malformed += 1,
                    }
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::EventKind;
    use std::io::Cursor;

    fn reader(input: &str) -> TranscriptReader<Cursor<Vec<u8>>> {
        TranscriptReader::new(Cursor::new(input.as_bytes().to_vec()))
    }

    #[test]
    fn test_skips_blank_and_malformed_lines() {
        let input = concat!(
            "{\"type\":\"user\"}\n",
            "\n",
            "{not json\n",
            "   \n",
            "{\"type\":\"assistant\"}\r\n",
            "{\"type\":\"user\"}",
        );
        let mut r = reader(input);
        let kinds: Vec<EventKind> = r.by_ref().map(|e| e.unwrap().kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::User, EventKind::Assistant, EventKind::User]
        );
        assert_eq!(r.malformed_lines(), 1);
    }

    #[test]
    fn test_truncated_last_line_is_dropped() {
        let input = "{\"type\":\"user\"}\n{\"type\":\"assis";
        let events: Vec<_> = reader(input).collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_line_over_limit_is_error() {
        let long = format!("{{\"type\":\"user\",\"pad\":\"{}\"}}\n", "x".repeat(100));
        let input = format!("{{\"type\":\"user\"}}\n{}{{\"type\":\"user\"}}\n", long);
        let items: Vec<_> = reader(&input).with_line_limit(64).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(TranscriptError::LineTooLong { limit: 64 })
        ));
    }

    #[test]
    fn test_line_exactly_at_limit_is_accepted() {
        let line = "{\"type\":\"user\"}";
        let input = format!("{}\n", line);
        let items: Vec<_> = reader(&input).with_line_limit(line.len()).collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_ok());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(TranscriptReader::open(&dir.path().join("nope.jsonl")).is_err());
    }
}
