//! Streaming BSON document pipes for external map/reduce tasks.
//!
//! A host map/reduce runtime can hand work to an external process by piping it a stream of
//! length-prefixed BSON documents on standard input, and reading the results back the same way on
//! standard output. This crate is everything such a process needs between the pipes and the
//! user's logic:
//!
//! - [`Document`] and [`Value`], an ordered document model over the supported BSON value set.
//! - [`frame`], which encodes and decodes single frames.
//! - [`FrameReader`], which turns any [`Read`][std::io::Read] source delivering bytes in arbitrary
//!   chunks into a lazy iterator of documents. [`FrameStream`] does the same over an asynchronous
//!   stream of byte chunks, and [`FrameDecoder`] is the push-driven core both are built on.
//! - [`FrameWriter`], which writes each document as a frame and flushes it immediately.
//! - [`map`] and [`reduce`], the adapters that drive a user function over a reader and writer.
//!   `reduce` groups contiguous runs of documents with equal `_id` keys; see [`Groups`].
//! - [`kv`], the key/value form of the same adapters, and [`update`], for emitting update
//!   descriptions instead of plain documents.
//!
//! A reducer that averages a field per key:
//!
//! ```
//! use bson_streaming::{doc, reduce, Document, FrameReader, FrameWriter, Value};
//!
//! let mut input = Vec::new();
//! for (key, n) in [(1990, 7.94), (1990, 8.0), (1991, 7.8)] {
//!     input.extend(doc! { "_id": key, "n": n }.to_frame().unwrap());
//! }
//!
//! let mut output = Vec::new();
//! let stats = reduce(
//!     |key: Value, docs: Vec<Document>| {
//!         let sum: f64 = docs.iter().filter_map(|d| d.get_f64("n")).sum();
//!         Ok(doc! { "_id": key, "avg": sum / docs.len() as f64 })
//!     },
//!     FrameReader::new(input.as_slice()),
//!     FrameWriter::new(&mut output),
//! )
//! .unwrap();
//! assert_eq!(stats.groups, 2);
//!
//! let results: Vec<Document> = FrameReader::new(output.as_slice())
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(results[1], doc! { "_id": 1991, "avg": 7.8 });
//! ```
//!
//! Logging goes through [`tracing`]; the library never installs a subscriber.

#[macro_use]
mod document;

mod datetime;
mod element;
mod error;
mod marker;
mod object_id;
mod value;

#[cfg(test)]
mod sample;

pub mod frame;
pub mod kv;
pub mod mapper;
pub mod reader;
pub mod reducer;
pub mod update;
pub mod writer;

pub use self::datetime::DateTime;
pub use self::document::Document;
pub use self::error::{Error, Result};
pub use self::mapper::{map, MapStats};
pub use self::object_id::ObjectId;
pub use self::reader::{FrameDecoder, FrameReader, FrameStream};
pub use self::reducer::{reduce, AsyncGroups, Group, GroupState, Groups, Keyed, ReduceStats};
pub use self::value::{Binary, Value};
pub use self::writer::FrameWriter;

/// The maximum allowed size of a single frame, including its length prefix: 16 MiB.
pub const MAX_DOC_SIZE: usize = 1usize << 24;

/// The maximum nesting depth of embedded documents and arrays.
pub const MAX_DEPTH: usize = 100;

/// The reserved field holding a document's key.
pub const ID_FIELD: &str = "_id";

/// The field a scalar payload is stored under in the key/value form.
pub const VALUE_FIELD: &str = "value";
