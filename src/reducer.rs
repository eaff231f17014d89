//! The reduce side: grouping a key-sorted stream and aggregating each group.
//!
//! Input is assumed to be sorted by key already, so every document with a given key arrives in
//! one contiguous run. Grouping only ever compares a document's key with the key of the run
//! before it. If the same key shows up again after a different one, it starts a second,
//! separate group; nothing here can tell that the input wasn't sorted.
//!
//! Keys are compared with [`Value::key_eq`], so `1` and `1i64` are the same key, as are two
//! composite keys holding the same fields in a different order.

use crate::{Document, Error, FrameWriter, Result, Value};
use futures_core::{ready, FusedStream, Stream};
use pin_project_lite::pin_project;
use std::{
    io::Write,
    iter::FusedIterator,
    mem,
    pin::Pin,
    task::{Context, Poll},
};
use tracing::{debug, info};

/// Anything that carries its own grouping key.
pub trait Keyed {
    fn key(&self) -> Result<Value>;
}

impl Keyed for Document {
    /// The `_id` field. Fails with [`Error::MissingKey`] if there isn't one.
    fn key(&self) -> Result<Value> {
        self.id().cloned().ok_or(Error::MissingKey)
    }
}

/// One contiguous run of items sharing a key.
#[derive(Clone, Debug, PartialEq)]
pub struct Group<T = Document> {
    pub key: Value,
    pub items: Vec<T>,
}

impl<T> Group<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The grouping state machine.
///
/// Starts `Idle`. The first pushed item moves it to `Accumulating` under that item's key; each
/// later item either joins the current group or, if its key differs, completes the current group
/// and starts a new one. [`finish`][GroupState::finish] hands out the last group, if any, and
/// moves to `Terminal`.
#[derive(Clone, Debug)]
pub enum GroupState<T = Document> {
    Idle,
    Accumulating {
        key: Value,
        items: Vec<T>,
    },
    Terminal,
}

impl<T> Default for GroupState<T> {
    fn default() -> Self {
        GroupState::Idle
    }
}

impl<T> GroupState<T> {
    pub fn new() -> Self {
        GroupState::Idle
    }

    /// Add an item under `key`, returning the previous group if this item's key ends it.
    /// Pushing after [`finish`][GroupState::finish] starts over as if from `Idle`.
    pub fn push(&mut self, key: Value, item: T) -> Option<Group<T>> {
        if let GroupState::Accumulating {
            key: current,
            items,
        } = self
        {
            if current.key_eq(&key) {
                items.push(item);
                return None;
            }
        }
        let next = GroupState::Accumulating {
            key,
            items: vec![item],
        };
        match mem::replace(self, next) {
            GroupState::Accumulating { key, items } => Some(Group { key, items }),
            GroupState::Idle | GroupState::Terminal => None,
        }
    }

    /// End the input, returning the final group if there is one.
    pub fn finish(&mut self) -> Option<Group<T>> {
        match mem::replace(self, GroupState::Terminal) {
            GroupState::Accumulating { key, items } => Some(Group { key, items }),
            GroupState::Idle | GroupState::Terminal => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, GroupState::Idle)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GroupState::Terminal)
    }

    // Shared step for the sync and async adapters: None means keep pulling.
    fn step(&mut self, next: Option<Result<T>>, done: &mut bool) -> Option<Option<Result<Group<T>>>>
    where
        T: Keyed,
    {
        let item = match next {
            Some(Ok(item)) => item,
            Some(Err(e)) => {
                *done = true;
                return Some(Some(Err(e)));
            }
            None => {
                *done = true;
                return Some(self.finish().map(|group| {
                    debug!(items = group.len(), "flushed final group");
                    Ok(group)
                }));
            }
        };
        let key = match item.key() {
            Ok(key) => key,
            Err(e) => {
                *done = true;
                return Some(Some(Err(e)));
            }
        };
        self.push(key, item).map(|group| {
            debug!(items = group.len(), "flushed group");
            Some(Ok(group))
        })
    }
}

/// An iterator adapter that groups contiguous runs of equal keys.
///
/// ```
/// # use bson_streaming::{doc, Groups};
/// let docs = vec![doc! { "_id": "a" }, doc! { "_id": "a" }, doc! { "_id": "b" }];
/// let sizes: Vec<usize> = Groups::new(docs.into_iter().map(Ok))
///     .map(|group| group.unwrap().len())
///     .collect();
/// assert_eq!(sizes, vec![2, 1]);
/// ```
#[derive(Clone, Debug)]
pub struct Groups<I, T = Document> {
    iter: I,
    state: GroupState<T>,
    done: bool,
}

impl<I, T> Groups<I, T>
where
    I: Iterator<Item = Result<T>>,
    T: Keyed,
{
    pub fn new(iter: I) -> Self {
        Self {
            iter,
            state: GroupState::new(),
            done: false,
        }
    }
}

impl<I, T> Iterator for Groups<I, T>
where
    I: Iterator<Item = Result<T>>,
    T: Keyed,
{
    type Item = Result<Group<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let next = self.iter.next();
            if let Some(out) = self.state.step(next, &mut self.done) {
                return out;
            }
        }
        None
    }
}

impl<I, T> FusedIterator for Groups<I, T>
where
    I: Iterator<Item = Result<T>>,
    T: Keyed,
{
}

pin_project! {
    /// A stream adapter that groups contiguous runs of equal keys.
    ///
    /// For the synchronous version that works on iterators, see [`Groups`].
    #[must_use = "streams do nothing unless polled"]
    #[derive(Debug)]
    pub struct AsyncGroups<St, T = Document> {
        #[pin]
        stream: St,
        state: GroupState<T>,
        done: bool,
    }
}

impl<St, T> AsyncGroups<St, T>
where
    St: Stream<Item = Result<T>>,
    T: Keyed,
{
    pub fn new(stream: St) -> Self {
        Self {
            stream,
            state: GroupState::new(),
            done: false,
        }
    }
}

impl<St, T> FusedStream for AsyncGroups<St, T>
where
    St: Stream<Item = Result<T>>,
    T: Keyed,
{
    fn is_terminated(&self) -> bool {
        self.done
    }
}

impl<St, T> Stream for AsyncGroups<St, T>
where
    St: Stream<Item = Result<T>>,
    T: Keyed,
{
    type Item = Result<Group<T>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        while !*this.done {
            let next = ready!(this.stream.as_mut().poll_next(cx));
            if let Some(out) = this.state.step(next, this.done) {
                return Poll::Ready(out);
            }
        }
        Poll::Ready(None)
    }
}

/// Counts from one [`reduce`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReduceStats {
    pub documents_in: usize,
    pub documents_out: usize,
    pub groups: usize,
}

/// Group the documents from `reader` by their `_id` key, call `aggregate` once per group, and
/// write each result to `writer`.
///
/// The input must already be sorted by key; see the [module docs][self]. `aggregate` gets the
/// group's key and all of its documents in arrival order. Each group's result is written as soon
/// as the group ends, before the rest of the input is read. The first error from the reader, a
/// document without a key ([`Error::MissingKey`]), `aggregate`, or the writer ends the run.
pub fn reduce<F, R, W>(aggregate: F, reader: R, writer: FrameWriter<W>) -> Result<ReduceStats>
where
    F: FnMut(Value, Vec<Document>) -> anyhow::Result<Document>,
    R: IntoIterator<Item = Result<Document>>,
    W: Write,
{
    reduce_with(aggregate, reader, writer, |doc| doc)
}

/// The reduce loop over any keyed item type, with `into_doc` turning each aggregate into the
/// document that gets written.
pub(crate) fn reduce_with<T, O, F, R, W, C>(
    mut aggregate: F,
    reader: R,
    mut writer: FrameWriter<W>,
    mut into_doc: C,
) -> Result<ReduceStats>
where
    T: Keyed,
    F: FnMut(Value, Vec<T>) -> anyhow::Result<O>,
    R: IntoIterator<Item = Result<T>>,
    W: Write,
    C: FnMut(O) -> Document,
{
    let mut stats = ReduceStats::default();
    for group in Groups::new(reader.into_iter()) {
        let group = group?;
        stats.groups += 1;
        stats.documents_in += group.len();
        let out = aggregate(group.key, group.items).map_err(Error::User)?;
        writer.write(&into_doc(out))?;
        stats.documents_out += 1;
    }
    info!(
        documents_in = stats.documents_in,
        documents_out = stats.documents_out,
        groups = stats.groups,
        "reduce finished"
    );
    Ok(stats)
}
