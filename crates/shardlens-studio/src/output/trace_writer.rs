//! Streaming writer for trace artifacts.
//!
//! Entries are appended as they are recorded. Until [`TraceWriter::finish`]
//! runs the output is a valid prefix ending inside the `queries` array.

use crate::trace::TraceQuery;
use crate::utils::error::OutputError;
use std::io::Write;

const HEAD: &[u8] = br#"{"fileType":"trace","queries":["#;
const TAIL: &[u8] = b"]}";

pub struct TraceWriter<W: Write> {
    inner: W,
    entries: usize,
}

impl<W: Write> TraceWriter<W> {
    /// Write the envelope head
    pub fn new(mut inner: W) -> Result<Self, OutputError> {
        inner.write_all(HEAD)?;
        Ok(Self { inner, entries: 0 })
    }

    /// Append one traced query
    pub fn write_entry(&mut self, entry: &TraceQuery) -> Result<(), OutputError> {
        if self.entries > 0 {
            self.inner.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.inner, entry)?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Close the array and the envelope, returning the writer
    pub fn finish(mut self) -> Result<W, OutputError> {
        self.inner.write_all(TAIL)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}
