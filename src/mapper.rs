//! The map side: one user transform call per input document.

use crate::{Document, Error, FrameWriter, Result};
use std::io::Write;
use tracing::{debug, info};

/// Counts from one [`map`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MapStats {
    pub documents_in: usize,
    pub documents_out: usize,
}

/// Run `transform` over every document from `reader`, writing its results to `writer`.
///
/// The transform returns any iterable of results for each input: a `Vec<Document>`, an
/// `Option<Document>`, a lazy iterator, and so on. Items may also be `Option<Document>`, in
/// which case `None` items are dropped. Returning nothing at all filters the input out.
///
/// Documents are processed strictly in order, and all of one input's results are written before
/// the next input is pulled from the reader. The first error from the reader, the transform, or
/// the writer ends the run; transform errors come back as [`Error::User`].
///
/// ```
/// # use bson_streaming::{doc, map, FrameReader, FrameWriter};
/// let mut input = Vec::new();
/// input.extend(doc! { "_id": 1, "text": "a b" }.to_frame().unwrap());
/// let mut output = Vec::new();
/// let stats = map(
///     |doc| {
///         let text = doc.get_str("text").unwrap_or_default().to_string();
///         Ok(text
///             .split_whitespace()
///             .map(|word| doc! { "_id": word, "count": 1 })
///             .collect::<Vec<_>>())
///     },
///     FrameReader::new(input.as_slice()),
///     FrameWriter::new(&mut output),
/// )
/// .unwrap();
/// assert_eq!((stats.documents_in, stats.documents_out), (1, 2));
/// ```
pub fn map<F, I, R, W>(transform: F, reader: R, writer: FrameWriter<W>) -> Result<MapStats>
where
    F: FnMut(Document) -> anyhow::Result<I>,
    I: IntoIterator,
    I::Item: Into<Option<Document>>,
    R: IntoIterator<Item = Result<Document>>,
    W: Write,
{
    map_with(transform, reader, writer, |doc| doc)
}

/// The map loop over any input item type, with `into_doc` turning each result into the document
/// that gets written.
pub(crate) fn map_with<T, O, F, I, R, W, C>(
    mut transform: F,
    reader: R,
    mut writer: FrameWriter<W>,
    mut into_doc: C,
) -> Result<MapStats>
where
    F: FnMut(T) -> anyhow::Result<I>,
    I: IntoIterator,
    I::Item: Into<Option<O>>,
    R: IntoIterator<Item = Result<T>>,
    W: Write,
    C: FnMut(O) -> Document,
{
    let mut stats = MapStats::default();
    for item in reader {
        let item = item?;
        stats.documents_in += 1;
        let results = transform(item).map_err(Error::User)?;
        let before = stats.documents_out;
        for result in results {
            if let Some(out) = result.into() {
                writer.write(&into_doc(out))?;
                stats.documents_out += 1;
            }
        }
        debug!(
            input = stats.documents_in,
            emitted = stats.documents_out - before,
            "mapped document"
        );
    }
    info!(
        documents_in = stats.documents_in,
        documents_out = stats.documents_out,
        "map finished"
    );
    Ok(stats)
}
