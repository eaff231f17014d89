//! The treasury mapper in key/value form: emits `(year, rate)` pairs.

use bson_streaming::{kv::{self, KeyValue}, FrameReader, FrameWriter, Value};
use std::error::Error;
use std::io;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    kv::map_kv(
        |key, record| {
            let year = key
                .as_datetime()
                .and_then(|when| when.year())
                .ok_or_else(|| anyhow::anyhow!("key is not a date: {:?}", key))?;
            let rate = record.get("bc10Year").cloned().unwrap_or(Value::Null);
            Ok(Some(KeyValue::new(year, rate)))
        },
        FrameReader::new(io::stdin().lock()),
        FrameWriter::new(io::stdout().lock()),
    )?;
    Ok(())
}
