//! Map daily treasury yield records to `{ _id: <year>, bc10Year: <rate> }`.
//!
//! Reads frames on stdin and writes frames on stdout. Set `RUST_LOG` to adjust logging, which
//! goes to stderr.

use bson_streaming::{doc, map, FrameReader, FrameWriter};
use std::error::Error;
use std::io;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let stats = map(
        |doc| {
            let year = doc
                .get_datetime("_id")
                .and_then(|when| when.year())
                .ok_or_else(|| anyhow::anyhow!("record _id is not a date: {:?}", doc.id()))?;
            Ok(Some(doc! { "_id": year, "bc10Year": doc["bc10Year"].clone() }))
        },
        FrameReader::new(io::stdin().lock()),
        FrameWriter::new(io::stdout().lock()),
    )?;
    tracing::info!(?stats, "treasury mapper done");
    Ok(())
}
