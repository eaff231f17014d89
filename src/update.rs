//! Emitting update descriptions instead of plain documents.
//!
//! A task can ask the host to update existing records rather than insert new ones by emitting a
//! document of the form
//!
//! ```text
//! { _id: <query document>, modifiers: <update document>, options: { upsert, multi, replace } }
//! ```
//!
//! [`Update`] builds these, and [`Output::from_document`] tells them apart from plain documents
//! on the reading side. Any emitted document that lacks either `modifiers` or `_id` is a plain
//! document.
//!
//! ```
//! # use bson_streaming::{doc, update::{Output, Update}};
//! let update = Update::new(doc! { "i": 42 }, doc! { "$set": doc! { "a": "b" } }).multi(true);
//! let doc = update.clone().into_document();
//! assert_eq!(Output::from_document(doc).unwrap(), Output::Update(update));
//!
//! let plain = doc! { "_id": 42 };
//! assert_eq!(Output::from_document(plain.clone()).unwrap(), Output::Document(plain));
//! ```

use crate::{Document, Error, Result, Value, ID_FIELD};

const MODIFIERS_FIELD: &str = "modifiers";
const OPTIONS_FIELD: &str = "options";

/// An update of the records matching `query`.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub query: Document,
    /// Either update operators or a whole replacement document, depending on `replace`.
    pub modifiers: Document,
    /// Insert a new record if nothing matches. Defaults to `true`.
    pub upsert: bool,
    /// Update every matching record, not just the first. Defaults to `false`.
    pub multi: bool,
    /// Treat `modifiers` as a replacement document. Defaults to `false`.
    pub replace: bool,
}

impl Update {
    pub fn new(query: Document, modifiers: Document) -> Self {
        Self {
            query,
            modifiers,
            upsert: true,
            multi: false,
            replace: false,
        }
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// The document to emit for this update.
    pub fn into_document(self) -> Document {
        doc! {
            "_id": self.query,
            "modifiers": self.modifiers,
            "options": doc! {
                "upsert": self.upsert,
                "multi": self.multi,
                "replace": self.replace,
            },
        }
    }
}

impl From<Update> for Document {
    fn from(update: Update) -> Self {
        update.into_document()
    }
}

/// One emitted document, interpreted.
#[derive(Clone, Debug, PartialEq)]
pub enum Output {
    Document(Document),
    Update(Update),
}

impl Output {
    /// Interpret an emitted document. It's an update if it has both `_id` and `modifiers`; in
    /// that case `_id` and `modifiers` must both be documents, and `options` must be missing,
    /// null, or a document of booleans. Anything else fails with [`Error::InvalidUpdate`].
    pub fn from_document(mut doc: Document) -> Result<Output> {
        if !(doc.contains_key(MODIFIERS_FIELD) && doc.contains_key(ID_FIELD)) {
            return Ok(Output::Document(doc));
        }
        let query = match doc.remove(ID_FIELD) {
            Some(Value::Document(query)) => query,
            other => {
                return Err(Error::InvalidUpdate(format!(
                    "_id must be a document describing the query of the update, not {:?}",
                    other
                )))
            }
        };
        let modifiers = match doc.remove(MODIFIERS_FIELD) {
            Some(Value::Document(modifiers)) => modifiers,
            other => {
                return Err(Error::InvalidUpdate(format!(
                    "modifiers must be a replacement or update document, not {:?}",
                    other
                )))
            }
        };
        let mut update = Update::new(query, modifiers);
        match doc.remove(OPTIONS_FIELD) {
            None | Some(Value::Null) => (),
            Some(Value::Document(options)) => {
                update.upsert = option_flag(&options, "upsert", true)?;
                update.multi = option_flag(&options, "multi", false)?;
                update.replace = option_flag(&options, "replace", false)?;
            }
            Some(other) => {
                return Err(Error::InvalidUpdate(format!(
                    "options must either be null or a document providing update options, not {}",
                    other.type_name()
                )))
            }
        }
        Ok(Output::Update(update))
    }

    pub fn into_document(self) -> Document {
        match self {
            Output::Document(doc) => doc,
            Output::Update(update) => update.into_document(),
        }
    }
}

fn option_flag(options: &Document, name: &str, default: bool) -> Result<bool> {
    match options.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(Error::InvalidUpdate(format!(
            "update option {:?} must be a boolean, not {}",
            name,
            other.type_name()
        ))),
    }
}
