//! Filter conditions for list endpoints.
//!
//! The admin API understands filters as nested mappings:
//!
//! - `{"lang_id": 1}` compares a field for equality,
//! - `{"publication_date": {"lt": 100, "gt": 10}}` applies several operators
//!   to one field (all must hold),
//! - `{"or": [cond, cond]}`, `{"and": [...]}` and `{"not": [...]}` combine
//!   conditions, nested to any depth,
//! - a mapping with several keys is an implicit `and` of its entries.
//!
//! [`FilterCondition`] is the typed form of that mapping. It is turned into
//! the wire shape only when serialized.
//!
//! ```rust
//! use headless_admin::{FilterCondition, Operator};
//! use serde_json::json;
//!
//! # fn main() -> headless_admin::Result<()> {
//! let filter = FilterCondition::and([
//!     FilterCondition::eq("lang_id", 1)?,
//!     FilterCondition::field("publication_date", [(Operator::Lt, 100), (Operator::Gt, 10)])?,
//! ])?;
//!
//! assert_eq!(
//!     filter.to_value(),
//!     json!({"and": [{"lang_id": 1}, {"publication_date": {"lt": 100, "gt": 10}}]})
//! );
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Comparison operators understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Lte,
    /// `>=`
    Gte,
    /// `IN (...)`
    In,
    /// `NOT IN (...)`
    Nin,
    /// `LIKE`
    Like,
}

impl Operator {
    /// Returns the wire name of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Lte => "lte",
            Self::Gte => "gte",
            Self::In => "in",
            Self::Nin => "nin",
            Self::Like => "like",
        }
    }

    /// Whether the operator takes a list of values.
    #[must_use]
    pub const fn takes_list(&self) -> bool {
        matches!(self, Self::In | Self::Nin)
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eq" => Ok(Self::Eq),
            "neq" => Ok(Self::Neq),
            "lt" => Ok(Self::Lt),
            "gt" => Ok(Self::Gt),
            "lte" => Ok(Self::Lte),
            "gte" => Ok(Self::Gte),
            "in" => Ok(Self::In),
            "nin" => Ok(Self::Nin),
            "like" => Ok(Self::Like),
            other => Err(Error::InvalidFilter(format!("unknown operator '{other}'"))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalKind {
    /// All children hold.
    And,
    /// At least one child holds.
    Or,
    /// The children do not hold.
    Not,
}

impl LogicalKind {
    /// Returns the wire name of the combinator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            _ => None,
        }
    }
}

/// A filter condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    /// `field <operator> value`.
    Comparison {
        /// Attribute name.
        field: String,
        /// Comparison operator.
        operator: Operator,
        /// A scalar, or a list for [`Operator::In`] and [`Operator::Nin`].
        value: Value,
    },
    /// Children combined with an explicit combinator.
    Logical {
        /// The combinator.
        kind: LogicalKind,
        /// At least one child.
        children: Vec<FilterCondition>,
    },
    /// Children combined by sharing one mapping (implicit and).
    ///
    /// This is how several operators on the same field, or several fields
    /// side by side, are expressed on the wire.
    Conjunction(Vec<FilterCondition>),
}

impl FilterCondition {
    /// Build a comparison, checking the value shape against the operator.
    pub fn compare(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Result<Self> {
        let field = field.into();
        let value = value.into();
        check_value(&field, operator, &value)?;
        Ok(Self::Comparison {
            field,
            operator,
            value,
        })
    }

    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, Operator::Eq, value)
    }

    /// `field != value`
    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, Operator::Neq, value)
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, Operator::Lt, value)
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, Operator::Gt, value)
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, Operator::Lte, value)
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, Operator::Gte, value)
    }

    /// `field LIKE value`
    pub fn like(field: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, Operator::Like, value)
    }

    /// `field IN (values)`
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Comparison {
            field: field.into(),
            operator: Operator::In,
            value: Value::Array(values.into_iter().map(Into::into).collect()),
        }
    }

    /// `field NOT IN (values)`
    pub fn not_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Comparison {
            field: field.into(),
            operator: Operator::Nin,
            value: Value::Array(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Several operators on one field, e.g. an open range with `lt` and `gt`.
    pub fn field<I, V>(field: impl Into<String>, operators: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Operator, V)>,
        V: Into<Value>,
    {
        let field = field.into();
        let mut comparisons = operators
            .into_iter()
            .map(|(op, value)| Self::compare(field.clone(), op, value))
            .collect::<Result<Vec<_>>>()?;

        match comparisons.len() {
            0 => Err(Error::InvalidFilter(format!(
                "field '{field}' needs at least one operator"
            ))),
            1 => Ok(comparisons.remove(0)),
            _ => Ok(Self::Conjunction(comparisons)),
        }
    }

    /// All children hold.
    pub fn and(children: impl IntoIterator<Item = Self>) -> Result<Self> {
        Self::logical(LogicalKind::And, children)
    }

    /// At least one child holds.
    pub fn or(children: impl IntoIterator<Item = Self>) -> Result<Self> {
        Self::logical(LogicalKind::Or, children)
    }

    /// The children do not hold.
    pub fn not(children: impl IntoIterator<Item = Self>) -> Result<Self> {
        Self::logical(LogicalKind::Not, children)
    }

    /// Combine children in a single mapping (implicit and).
    pub fn all(children: impl IntoIterator<Item = Self>) -> Result<Self> {
        let children: Vec<_> = children.into_iter().collect();
        if children.is_empty() {
            return Err(Error::InvalidFilter("empty condition list".into()));
        }
        Ok(Self::Conjunction(children))
    }

    fn logical(kind: LogicalKind, children: impl IntoIterator<Item = Self>) -> Result<Self> {
        let children: Vec<_> = children.into_iter().collect();
        if children.is_empty() {
            return Err(Error::InvalidFilter(format!(
                "'{}' needs at least one condition",
                kind.as_str()
            )));
        }
        Ok(Self::Logical { kind, children })
    }

    /// Serialize into the nested wire mapping.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Comparison {
                field,
                operator: Operator::Eq,
                value,
            } => single(field, value.clone()),
            Self::Comparison {
                field,
                operator,
                value,
            } => single(field, single(operator.as_str(), value.clone())),
            Self::Logical { kind, children } => single(
                kind.as_str(),
                Value::Array(children.iter().map(Self::to_value).collect()),
            ),
            Self::Conjunction(children) => {
                let values: Vec<Value> = children.iter().map(Self::to_value).collect();
                merge_conjunction(&values)
                    .unwrap_or_else(|| single(LogicalKind::And.as_str(), Value::Array(values)))
            }
        }
    }

    /// Parse a wire mapping back into a condition tree.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| Error::InvalidFilter(format!("expected a mapping, got {value}")))?;

        let mut conditions = map
            .iter()
            .map(|(key, value)| parse_entry(key, value))
            .collect::<Result<Vec<_>>>()?;

        match conditions.len() {
            0 => Err(Error::InvalidFilter("empty condition mapping".into())),
            1 => Ok(conditions.remove(0)),
            _ => Ok(Self::Conjunction(conditions)),
        }
    }
}

impl Serialize for FilterCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn check_value(field: &str, operator: Operator, value: &Value) -> Result<()> {
    let ok = if operator.takes_list() {
        value.is_array()
    } else {
        !value.is_array() && !value.is_object()
    };

    if ok {
        Ok(())
    } else if operator.takes_list() {
        Err(Error::InvalidFilter(format!(
            "'{operator}' on '{field}' needs a list of values"
        )))
    } else {
        Err(Error::InvalidFilter(format!(
            "'{operator}' on '{field}' needs a scalar value"
        )))
    }
}

/// Merge serialized children into one mapping.
///
/// Returns `None` when two children claim the same key in a way a single
/// mapping cannot express (same logical key, same operator on one field).
fn merge_conjunction(values: &[Value]) -> Option<Value> {
    let mut merged = Map::new();

    for value in values {
        let Value::Object(entries) = value else {
            return None;
        };
        for (key, entry) in entries {
            if !merged.contains_key(key) {
                merged.insert(key.clone(), entry.clone());
                continue;
            }
            if LogicalKind::from_key(key).is_some() {
                return None;
            }

            let existing = merged.get_mut(key)?;

            let mut operators = operator_map(existing.clone());
            for (op, v) in operator_map(entry.clone()) {
                if operators.contains_key(&op) {
                    return None;
                }
                operators.insert(op, v);
            }
            *existing = Value::Object(operators);
        }
    }

    Some(Value::Object(merged))
}

fn operator_map(field_value: Value) -> Map<String, Value> {
    match field_value {
        Value::Object(map) => map,
        scalar => {
            let mut map = Map::new();
            map.insert(Operator::Eq.as_str().to_string(), scalar);
            map
        }
    }
}

fn parse_entry(key: &str, value: &Value) -> Result<FilterCondition> {
    if let Some(kind) = LogicalKind::from_key(key) {
        let children = match value {
            Value::Array(items) => items
                .iter()
                .map(FilterCondition::from_value)
                .collect::<Result<Vec<_>>>()?,
            Value::Object(_) if kind == LogicalKind::Not => vec![FilterCondition::from_value(value)?],
            other => {
                return Err(Error::InvalidFilter(format!(
                    "'{key}' needs a list of conditions, got {other}"
                )))
            }
        };
        return FilterCondition::logical(kind, children);
    }

    match value {
        Value::Object(operators) => {
            let pairs = operators
                .iter()
                .map(|(op, v)| -> Result<(Operator, Value)> { Ok((op.parse()?, v.clone())) })
                .collect::<Result<Vec<_>>>()?;
            FilterCondition::field(key, pairs)
        }
        Value::Array(_) => Err(Error::InvalidFilter(format!(
            "field '{key}' needs a scalar or an operator mapping"
        ))),
        scalar => FilterCondition::eq(key, scalar.clone()),
    }
}
