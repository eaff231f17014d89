//! Count messages between each sender and recipient in a mail archive.
//!
//! Every recipient in a message's comma-separated `headers.To` gets one
//! `{ _id: { f: <from>, t: <to> }, count: 1 }` document. Messages missing either header are
//! skipped.

use bson_streaming::{doc, map, Document, FrameReader, FrameWriter};
use std::error::Error;
use std::io;
use tracing_subscriber::EnvFilter;

fn pairs(doc: Document) -> anyhow::Result<Vec<Document>> {
    let headers = match doc.get_document("headers") {
        Some(headers) => headers,
        None => return Ok(Vec::new()),
    };
    let (from, to) = match (headers.get_str("From"), headers.get_str("To")) {
        (Some(from), Some(to)) => (from, to),
        _ => return Ok(Vec::new()),
    };
    Ok(to
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| doc! { "_id": doc! { "f": from, "t": r }, "count": 1 })
        .collect())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    map(
        pairs,
        FrameReader::new(io::stdin().lock()),
        FrameWriter::new(io::stdout().lock()),
    )?;
    Ok(())
}
