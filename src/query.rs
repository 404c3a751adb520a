//! Query parameter helpers: sort specifications and the bracket encoding of
//! nested arguments.

use serde_json::{Map, Value};
use std::fmt;

/// Sort direction for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// 1, 2, 3
    #[default]
    Ascending,
    /// 3, 2, 1
    Descending,
}

/// An ordered list of sort fields.
///
/// Renders as `id,-name`: fields joined by commas, descending fields
/// prefixed with `-`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    fields: Vec<(String, SortDirection)>,
}

impl SortSpec {
    /// Create an empty sort specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ascending field.
    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), SortDirection::Ascending));
        self
    }

    /// Append a descending field.
    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), SortDirection::Descending));
        self
    }

    /// The fields in order.
    pub fn fields(&self) -> &[(String, SortDirection)] {
        &self.fields
    }

    /// Whether no field was added.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, SortDirection)> for SortSpec {
    fn from_iter<I: IntoIterator<Item = (S, SortDirection)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(f, d)| (f.into(), d)).collect(),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, direction)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if *direction == SortDirection::Descending {
                f.write_str("-")?;
            }
            f.write_str(field)?;
        }
        Ok(())
    }
}

/// Flatten an argument mapping into query pairs.
///
/// Nested mappings and lists use bracket keys, so
/// `{"filter": {"and": [{"lang_id": 1}]}}` becomes
/// `filter[and][0][lang_id]=1`. Booleans are sent as `1`/`0` and nulls are
/// skipped.
///
/// ```rust
/// use headless_admin::encode_query;
/// use serde_json::json;
///
/// let args = json!({"page": 2, "filter": {"id": {"in": [1, 2]}}});
/// let pairs = encode_query(args.as_object().unwrap());
///
/// assert_eq!(
///     pairs,
///     vec![
///         ("filter[id][in][0]".to_string(), "1".to_string()),
///         ("filter[id][in][1]".to_string(), "2".to_string()),
///         ("page".to_string(), "2".to_string()),
///     ]
/// );
/// ```
pub fn encode_query(args: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in args {
        push_pairs(key.clone(), value, &mut pairs);
    }
    pairs
}

fn push_pairs(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => pairs.push((prefix, if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => pairs.push((prefix, n.to_string())),
        Value::String(s) => pairs.push((prefix, s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                push_pairs(format!("{prefix}[{i}]"), item, pairs);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                push_pairs(format!("{prefix}[{key}]"), item, pairs);
            }
        }
    }
}
