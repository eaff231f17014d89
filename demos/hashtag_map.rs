//! Emit `{ _id: <hashtag>, count: 1 }` for every hashtag in a stream of tweets.
//!
//! Tags come from `entities.hashtags` when the tweet carries them, and are otherwise pulled out
//! of the tweet `text`.

use bson_streaming::{doc, map, Document, FrameReader, FrameWriter, Value};
use regex::Regex;
use std::error::Error;
use std::io;
use tracing_subscriber::EnvFilter;

fn hashtags(re: &Regex, tweet: &Document) -> Vec<String> {
    if let Some(tags) = tweet
        .get_document("entities")
        .and_then(|e| e.get_array("hashtags"))
    {
        return tags
            .iter()
            .filter_map(|tag| tag["text"].as_str().map(String::from))
            .collect();
    }
    let text = tweet.get_str("text").unwrap_or_default();
    re.captures_iter(text).map(|c| c[1].to_string()).collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let re = Regex::new(r"#(\w+)")?;
    map(
        |tweet| {
            Ok(hashtags(&re, &tweet)
                .into_iter()
                .map(|tag| doc! { "_id": Value::from(tag), "count": 1 }))
        },
        FrameReader::new(io::stdin().lock()),
        FrameWriter::new(io::stdout().lock()),
    )?;
    Ok(())
}
