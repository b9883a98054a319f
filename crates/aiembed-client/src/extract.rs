use serde_json::Value;

use crate::error::ProviderError;

/// Dotted path locating the embeddings inside a provider response, e.g.
/// `data.0.embedding`.
///
/// Items are always read from the top-level `data` array, one object per
/// input. The first segment of the path stands for that array and is not
/// looked up; everything after it is resolved relative to each item. A path
/// without a dot is resolved whole against each item. An index segment
/// right after the first marks the per-item position and stands for every
/// entry, so `data.0.embedding` reads `data[i].embedding` for each `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePath {
    raw: String,
    item_segments: Vec<String>,
}

const ITEMS_FIELD: &str = "data";

impl ResponsePath {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let item_path = raw.split_once('.').map_or(raw.as_str(), |(_, rest)| rest);
        let mut item_segments: Vec<String> = item_path.split('.').map(str::to_string).collect();
        if item_segments.len() > 1 && item_segments.first().is_some_and(|s| is_index(s)) {
            item_segments.remove(0);
        }
        Self { raw, item_segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn extract(&self, root: &Value) -> Result<Vec<Vec<f32>>, ProviderError> {
        let items = root
            .get(ITEMS_FIELD)
            .and_then(Value::as_array)
            .ok_or_else(|| self.not_found("top-level data array not found"))?;

        items
            .iter()
            .map(|item| {
                resolve(item, &self.item_segments)
                    .and_then(as_vector)
                    .ok_or_else(|| self.not_found("item did not resolve to a numeric array"))
            })
            .collect()
    }

    pub(crate) fn not_found(&self, reason: &'static str) -> ProviderError {
        ProviderError::Extraction {
            path: self.raw.clone(),
            reason,
        }
    }
}

/// Walks `segments` from `node`. An all-digit segment indexes an array; any
/// other segment looks up an object field.
pub fn resolve<'a, S: AsRef<str>>(node: &'a Value, segments: &[S]) -> Option<&'a Value> {
    segments.iter().try_fold(node, |current, segment| {
        let segment = segment.as_ref();
        if is_index(segment) {
            let index = segment.parse::<usize>().ok()?;
            current.as_array()?.get(index)
        } else {
            current.as_object()?.get(segment)
        }
    })
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn as_vector(node: &Value) -> Option<Vec<f32>> {
    node.as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn one_vector_per_data_item() {
        let body = json!({"data":[{"embedding":[0.1,0.2]},{"embedding":[0.3,0.4]}]});
        let vectors = ResponsePath::new("data.0.embedding")
            .extract(&body)
            .expect("extract");
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn missing_field_fails_naming_path() {
        let body = json!({"data":[{"emb":[1]}]});
        let err = ResponsePath::new("data.0.embedding")
            .extract(&body)
            .expect_err("should fail");
        match err {
            ProviderError::Extraction { path, .. } => assert_eq!(path, "data.0.embedding"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_data_array_is_an_extraction_error() {
        for body in [json!({"embeddings": []}), json!({"data": {"embedding": [1.0]}})] {
            let err = ResponsePath::new("data.0.embedding")
                .extract(&body)
                .expect_err("should fail");
            assert!(matches!(err, ProviderError::Extraction { .. }));
        }
    }

    #[test]
    fn one_bad_item_fails_the_whole_response() {
        let body = json!({"data":[{"embedding":[1.0]},{"embedding":"oops"}]});
        assert!(ResponsePath::new("data.0.embedding").extract(&body).is_err());

        let non_numeric = json!({"data":[{"embedding":[1.0, "x"]}]});
        assert!(ResponsePath::new("data.0.embedding").extract(&non_numeric).is_err());
    }

    #[test]
    fn numeric_segments_index_arrays() {
        let body = json!({"data":[{"outputs":[{"values":[1, 2.5]}]}]});
        let vectors = ResponsePath::new("data.0.outputs.0.values")
            .extract(&body)
            .expect("extract");
        assert_eq!(vectors, vec![vec![1.0, 2.5]]);

        let out_of_range = ResponsePath::new("data.0.outputs.3.values");
        assert!(out_of_range.extract(&body).is_err());
    }

    #[test]
    fn first_segment_always_stands_for_data() {
        let body = json!({"data":[{"embedding":[0.1]},{"embedding":[0.2]}]});
        let vectors = ResponsePath::new("result.embedding")
            .extract(&body)
            .expect("extract");
        assert_eq!(vectors, vec![vec![0.1], vec![0.2]]);

        let other_root = json!({"embeddings":[{"values":[0.5]}]});
        assert!(ResponsePath::new("embeddings.0.values").extract(&other_root).is_err());
    }

    #[test]
    fn dotless_path_is_the_whole_item_path() {
        let body = json!({"data":[{"embedding":[0.1, 0.2]},{"embedding":[0.3]}]});
        let vectors = ResponsePath::new("embedding")
            .extract(&body)
            .expect("extract");
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3]]);

        let nested = json!({"data":[{"data":[1.0]}]});
        let vectors = ResponsePath::new("data").extract(&nested).expect("extract");
        assert_eq!(vectors, vec![vec![1.0]]);
    }

    #[test]
    fn empty_data_yields_no_vectors() {
        let body = json!({"data": []});
        let vectors = ResponsePath::new("data.0.embedding")
            .extract(&body)
            .expect("extract");
        assert!(vectors.is_empty());
    }

    #[test]
    fn resolve_walks_mixed_segments() {
        let tree = json!({"a":[{"b":{"c":[7]}}]});
        assert_eq!(resolve(&tree, &["a", "0", "b", "c", "0"]), Some(&json!(7)));
        assert_eq!(resolve(&tree, &["a", "b"]), None);
        assert_eq!(resolve(&tree, &["a", "99999999999999999999999"]), None);
    }
}
