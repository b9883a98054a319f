//! Dotted-path access into a JSON document (`meta.summary` reads
//! `doc["meta"]["summary"]`).

use serde_json::{Map, Value};

pub type Document = Map<String, Value>;

pub fn get_field<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = doc.get(segments.next()?)?;
    segments.try_fold(first, |node, segment| node.as_object()?.get(segment))
}

/// Sets `path`, creating missing intermediate objects. Returns `false` when
/// an intermediate value exists but is not an object.
pub fn set_field(doc: &mut Document, path: &str, value: Value) -> bool {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };

    let mut target = doc;
    if let Some(parents) = parents {
        for segment in parents.split('.') {
            let next = target
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let Some(object) = next.as_object_mut() else {
                return false;
            };
            target = object;
        }
    }
    target.insert(leaf.to_string(), value);
    true
}
