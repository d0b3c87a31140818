//! Streaming JSONL decoding
//!
//! [`JsonlDecoder`] accepts output fragments of any size and alignment and
//! hands each complete, non-blank line to a sink as a deserialized value.
//! Bytes are buffered rather than text, so a multi-byte character split
//! across two reads still decodes.

use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use thiserror::Error;

/// A line that could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to parse JSONL line: {message}")]
pub struct DecodeError {
    /// The offending line, trimmed
    pub line: String,
    /// The parser's explanation
    pub message: String,
}

/// Incremental newline-delimited JSON decoder
///
/// One decoder belongs to exactly one stream. Values decoded before a bad
/// line in the same fragment have already been delivered when
/// [`feed`](Self::feed) returns the error; the bad line itself is consumed.
#[derive(Debug)]
pub struct JsonlDecoder<T> {
    buffer: Vec<u8>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> JsonlDecoder<T> {
    /// Create a decoder with an empty pending buffer
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Feed one fragment, passing every completed value to `sink`
    pub fn feed<F>(&mut self, chunk: impl AsRef<[u8]>, mut sink: F) -> Result<(), DecodeError>
    where
        F: FnMut(T),
    {
        let chunk = chunk.as_ref();
        if chunk.is_empty() {
            return Ok(());
        }
        self.buffer.extend_from_slice(chunk);

        let mut consumed = 0;
        let mut result = Ok(());
        while let Some(offset) = self.buffer[consumed..].iter().position(|b| *b == b'\n') {
            let end = consumed + offset;
            let line = &self.buffer[consumed..end];
            consumed = end + 1;

            match parse_line(line) {
                Ok(Some(value)) => sink(value),
                Ok(None) => {}
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        self.buffer.drain(..consumed);
        result
    }

    /// Treat any buffered residue as a final line and clear the buffer
    pub fn flush<F>(&mut self, mut sink: F) -> Result<(), DecodeError>
    where
        F: FnMut(T),
    {
        let residue = std::mem::take(&mut self.buffer);
        if let Some(value) = parse_line(&residue)? {
            sink(value);
        }
        Ok(())
    }

    /// Number of bytes waiting for a line terminator
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

impl<T: DeserializeOwned> Default for JsonlDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_line<T: DeserializeOwned>(raw: &[u8]) -> Result<Option<T>, DecodeError> {
    let line = match std::str::from_utf8(raw) {
        Ok(text) => text.trim(),
        Err(err) => {
            return Err(DecodeError {
                line: String::from_utf8_lossy(raw).trim().to_string(),
                message: err.to_string(),
            });
        }
    };

    if line.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(line).map(Some).map_err(|err| DecodeError {
        line: line.to_string(),
        message: err.to_string(),
    })
}
