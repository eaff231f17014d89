//! The treasury reducer in key/value form: one `(year, average)` pair per year.

use bson_streaming::{kv, FrameReader, FrameWriter, Value};
use std::error::Error;
use std::io;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    kv::reduce_kv(
        |key, values| {
            tracing::debug!(?key, "processing key");
            let mut sum = 0.0;
            for v in &values {
                sum += v
                    .scalar()
                    .and_then(Value::as_floating)
                    .ok_or_else(|| anyhow::anyhow!("non-numeric value under {:?}", key))?;
            }
            let avg = sum / values.len() as f64;
            Ok((key, avg))
        },
        FrameReader::new(io::stdin().lock()),
        FrameWriter::new(io::stdout().lock()),
    )?;
    Ok(())
}
