//! Random documents for tests, covering every value type with some nesting.

use rand::Rng;

use crate::{Binary, DateTime, Document, ObjectId, Value};

const MAX_NEST: usize = 4;

pub(crate) fn document<R: Rng>(rng: &mut R) -> Document {
    document_at(rng, 0)
}

fn document_at<R: Rng>(rng: &mut R, nest: usize) -> Document {
    let fields = rng.gen_range(0..8);
    let mut doc = Document::with_capacity(fields);
    for _ in 0..fields {
        doc.insert(key(rng), value(rng, nest));
    }
    doc
}

fn key<R: Rng>(rng: &mut R) -> String {
    let len = rng.gen_range(1..6);
    (0..len).map(|_| rng.gen_range('a'..='z')).collect()
}

fn value<R: Rng>(rng: &mut R, nest: usize) -> Value {
    // Containers stop showing up once the nesting cap is reached
    let kinds = if nest < MAX_NEST { 11 } else { 9 };
    match rng.gen_range(0..kinds) {
        0 => Value::Null,
        1 => Value::Bool(rng.gen()),
        2 => Value::Int32(rng.gen()),
        3 => Value::Int64(rng.gen()),
        4 => Value::Double(double(rng)),
        5 => {
            let len = rng.gen_range(0..24);
            Value::Str((0..len).map(|_| rng.gen::<char>()).collect())
        }
        6 => {
            let len = rng.gen_range(0..48);
            let bytes = (0..len).map(|_| rng.gen()).collect();
            Value::Binary(Binary::with_subtype(rng.gen_range(0..6), bytes))
        }
        7 => Value::ObjectId(ObjectId::from_bytes(rng.gen())),
        8 => Value::DateTime(DateTime::from_millis(rng.gen())),
        9 => Value::Document(document_at(rng, nest + 1)),
        _ => {
            let len = rng.gen_range(0..6);
            Value::Array((0..len).map(|_| value(rng, nest + 1)).collect())
        }
    }
}

// NaN never equals itself, so it stays out of equality-checked samples.
fn double<R: Rng>(rng: &mut R) -> f64 {
    match rng.gen_range(0..6) {
        0 => 0.0,
        1 => -0.0,
        2 => f64::INFINITY,
        3 => f64::MIN_POSITIVE,
        _ => rng.gen_range(-1e12..1e12),
    }
}
