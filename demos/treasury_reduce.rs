//! Average the 10-year treasury rate per year, reading the output of `treasury_map` after it has
//! been sorted by key.

use bson_streaming::{doc, reduce, Document, FrameReader, FrameWriter, Value};
use std::error::Error;
use std::io;
use tracing_subscriber::EnvFilter;

fn yearly(key: Value, docs: Vec<Document>) -> anyhow::Result<Document> {
    tracing::debug!(?key, "processing key");
    let mut sum = 0.0;
    for doc in &docs {
        sum += doc
            .get("bc10Year")
            .and_then(Value::as_floating)
            .ok_or_else(|| anyhow::anyhow!("record under {:?} has no numeric bc10Year", key))?;
    }
    let count = docs.len() as i64;
    Ok(doc! {
        "_id": key,
        "avg": sum / count as f64,
        "count": count,
        "sum": sum,
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    reduce(
        yearly,
        FrameReader::new(io::stdin().lock()),
        FrameWriter::new(io::stdout().lock()),
    )?;
    Ok(())
}
