//! Turning a chunked byte source into a sequence of documents.
//!
//! Bytes rarely arrive one frame at a time: a pipe read may hand back half a frame, or three and
//! a bit. [`FrameDecoder`] buffers whatever it's fed and hands out each frame as soon as all of
//! its bytes are present. [`FrameReader`] drives a decoder from any blocking
//! [`Read`][std::io::Read] source as an [`Iterator`], and [`FrameStream`] drives one from an
//! asynchronous [`Stream`] of byte chunks.
//!
//! Both are lazy. Nothing is read from the source until the first document is requested, and
//! the source is only read again once every whole frame already buffered has been handed out.
//! A slow consumer therefore holds back the source instead of growing the buffer.
//!
//! Errors are final. After a malformed frame, a truncated stream, or a source error, the reader
//! yields that one error and then ends; there's no attempt to find the next frame boundary.

use crate::{frame, Document, Error, Result, MAX_DOC_SIZE};
use futures_core::{ready, FusedStream, Stream};
use pin_project_lite::pin_project;
use std::{
    io::{self, ErrorKind, Read},
    iter::FusedIterator,
    pin::Pin,
    task::{Context, Poll},
};
use tracing::{trace, warn};

/// The default number of bytes requested from a source per read.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Push-driven frame extraction.
///
/// Feed it byte chunks as they arrive with [`feed`][FrameDecoder::feed], then call
/// [`next_frame`][FrameDecoder::next_frame] until it returns `Ok(None)`. When the source ends,
/// call [`finish`][FrameDecoder::finish] to check that no partial frame was left behind.
///
/// ```
/// # use bson_streaming::{doc, FrameDecoder};
/// let bytes = doc! { "_id": 1 }.to_frame().unwrap();
/// let mut decoder = FrameDecoder::new();
/// decoder.feed(&bytes[..3]);
/// assert!(decoder.next_frame().unwrap().is_none());
/// decoder.feed(&bytes[3..]);
/// assert_eq!(decoder.next_frame().unwrap(), Some(doc! { "_id": 1 }));
/// assert!(decoder.finish().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    // Start of the unconsumed bytes in `buf`
    pos: usize,
    max_frame_len: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
            max_frame_len: MAX_DOC_SIZE,
        }
    }

    /// Set the largest frame that will be accepted. Values above [`MAX_DOC_SIZE`] are lowered to
    /// it.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len.min(MAX_DOC_SIZE);
        self
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Number of bytes held that don't yet form a whole frame (or haven't been extracted yet).
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Append a chunk of bytes from the source.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Extract the next whole frame, if one is buffered.
    ///
    /// A bad length prefix is reported as soon as its 4 bytes are present, without waiting for
    /// the rest of the frame. After an error the decoder's state is unspecified and it should be
    /// dropped.
    pub fn next_frame(&mut self) -> Result<Option<Document>> {
        let pending = &self.buf[self.pos..];
        let declared = match frame::declared_len(pending) {
            Some(declared) => declared,
            None => return Ok(None),
        };
        let len = frame::check_len(declared, self.max_frame_len)?;
        if pending.len() < len {
            return Ok(None);
        }
        let doc = frame::decode(&pending[..len])?;
        self.pos += len;
        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        }
        trace!(len, fields = doc.len(), "extracted frame");
        Ok(Some(doc))
    }

    /// Call when the source has ended. Fails with [`Error::TruncatedStream`] if a partial frame
    /// is still buffered.
    pub fn finish(&self) -> Result<()> {
        let buffered = self.buffered();
        if buffered == 0 {
            return Ok(());
        }
        let expected = frame::declared_len(&self.buf[self.pos..]).and_then(|l| usize::try_from(l).ok());
        warn!(buffered, ?expected, "input ended partway through a frame");
        Err(Error::TruncatedStream { buffered, expected })
    }
}

/// An iterator over the documents in a blocking byte source.
///
/// Yields `Result<Document>`, one per frame, in arrival order. `ErrorKind::Interrupted` reads are
/// retried; any other read error ends the iterator with [`Error::Source`].
///
/// ```
/// # use bson_streaming::{doc, FrameReader};
/// let mut bytes = doc! { "_id": 1 }.to_frame().unwrap();
/// bytes.extend(doc! { "_id": 2 }.to_frame().unwrap());
/// let ids: Vec<i32> = FrameReader::new(bytes.as_slice())
///     .map(|doc| doc.unwrap().get_i32("_id").unwrap())
///     .collect();
/// assert_eq!(ids, vec![1, 2]);
/// ```
#[derive(Debug)]
pub struct FrameReader<R> {
    source: R,
    decoder: FrameDecoder,
    chunk: Vec<u8>,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            decoder: FrameDecoder::new(),
            chunk: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            done: false,
        }
    }

    /// Set how many bytes are requested from the source per read. The minimum is 1.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the largest frame that will be accepted. See [`FrameDecoder::with_max_frame_len`].
    pub fn max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.decoder = self.decoder.with_max_frame_len(max_frame_len);
        self
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Give back the source. Any bytes already read but not yet decoded are lost.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn read_chunk(&mut self) -> Result<usize> {
        if self.chunk.len() != self.chunk_size {
            self.chunk.resize(self.chunk_size, 0);
        }
        loop {
            match self.source.read(&mut self.chunk) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Source(e)),
            }
        }
    }

    fn next_doc(&mut self) -> Result<Option<Document>> {
        loop {
            if let Some(doc) = self.decoder.next_frame()? {
                return Ok(Some(doc));
            }
            let n = self.read_chunk()?;
            if n == 0 {
                self.decoder.finish()?;
                return Ok(None);
            }
            self.decoder.feed(&self.chunk[..n]);
        }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.next_doc();
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result.transpose()
    }
}

impl<R: Read> FusedIterator for FrameReader<R> {}

pin_project! {
    /// A stream of the documents in an asynchronous source of byte chunks.
    ///
    /// The source can be any stream of `io::Result` chunks, such as a channel receiver or a
    /// framed reader over an async pipe. It's polled only when no whole frame is buffered.
    #[must_use = "streams do nothing unless polled"]
    #[derive(Debug)]
    pub struct FrameStream<St> {
        #[pin]
        stream: St,
        decoder: FrameDecoder,
        done: bool,
    }
}

impl<St, B> FrameStream<St>
where
    St: Stream<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    pub fn new(stream: St) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
            done: false,
        }
    }

    /// Set the largest frame that will be accepted. See [`FrameDecoder::with_max_frame_len`].
    pub fn max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.decoder = self.decoder.with_max_frame_len(max_frame_len);
        self
    }
}

impl<St, B> FusedStream for FrameStream<St>
where
    St: Stream<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    fn is_terminated(&self) -> bool {
        self.done
    }
}

impl<St, B> Stream for FrameStream<St>
where
    St: Stream<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    type Item = Result<Document>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Document>>> {
        let mut this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        Poll::Ready(loop {
            // Hand out everything already buffered before asking for more
            match this.decoder.next_frame() {
                Ok(Some(doc)) => break Some(Ok(doc)),
                Ok(None) => (),
                Err(e) => {
                    *this.done = true;
                    break Some(Err(e));
                }
            }
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.decoder.feed(chunk.as_ref()),
                Some(Err(e)) => {
                    *this.done = true;
                    break Some(Err(Error::Source(e)));
                }
                None => {
                    *this.done = true;
                    break this.decoder.finish().err().map(Err);
                }
            }
        })
    }
}
