//! Writing documents as frames.

use crate::{frame, Document, Error, Result};
use std::{borrow::Borrow, io::Write};
use tracing::trace;

/// Encodes documents and writes each one to a sink as a single frame, flushing after every frame.
///
/// Each document is encoded completely in memory before anything is written, so a document that
/// fails to encode leaves the sink untouched. Write failures come back as [`Error::Sink`] and are
/// not retried.
///
/// ```
/// # use bson_streaming::{doc, FrameWriter};
/// let mut writer = FrameWriter::new(Vec::new());
/// writer.write(&doc! { "_id": 1 }).unwrap();
/// assert_eq!(writer.frames_written(), 1);
/// assert_eq!(writer.into_inner().len(), 14);
/// ```
#[derive(Debug)]
pub struct FrameWriter<W> {
    sink: W,
    buf: Vec<u8>,
    require_key: bool,
    frames_written: usize,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            buf: Vec::new(),
            require_key: false,
            frames_written: 0,
        }
    }

    /// Reject documents without an `_id` field with [`Error::MissingKey`]. Off by default.
    pub fn require_key(mut self, require_key: bool) -> Self {
        self.require_key = require_key;
        self
    }

    /// Encode one document and write it out, then flush the sink.
    pub fn write(&mut self, doc: &Document) -> Result<()> {
        if self.require_key && doc.id().is_none() {
            return Err(Error::MissingKey);
        }
        self.buf.clear();
        frame::encode_into(&mut self.buf, doc)?;
        self.sink.write_all(&self.buf).map_err(Error::Sink)?;
        self.sink.flush().map_err(Error::Sink)?;
        self.frames_written += 1;
        trace!(len = self.buf.len(), "wrote frame");
        Ok(())
    }

    /// Write a sequence of documents, stopping at the first failure.
    pub fn write_all<I>(&mut self, docs: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<Document>,
    {
        for doc in docs {
            self.write(doc.borrow())?;
        }
        Ok(())
    }

    /// How many frames have been written successfully.
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
