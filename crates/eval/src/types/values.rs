//! Runtime values and specimen records.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::EvalError;

// ──────────────────────────────────────────────
// Runtime values
// ──────────────────────────────────────────────

/// A primitive trait value. Numeric values are `Decimal`, never `f64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Null,
    /// An array or object carried by a record field. Kept so the record
    /// still loads; any condition that reads it faults.
    Nested(serde_json::Value),
}

impl Value {
    /// Returns a human-readable type name for fault messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Decimal(_) => "Decimal",
            Value::Text(_) => "Text",
            Value::Null => "Null",
            Value::Nested(v) => json_kind(v),
        }
    }

    /// Convert a JSON scalar. Arrays and objects are rejected: records
    /// are flat mappings of primitives.
    pub fn from_json(v: &serde_json::Value) -> Result<Value, EvalError> {
        match v {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Value::Int(i));
                }
                parse_decimal(&n.to_string())
                    .map(Value::Decimal)
                    .ok_or_else(|| EvalError::InvalidRecord {
                        message: format!("number {} is not representable as a decimal", n),
                    })
            }
            other => Err(EvalError::InvalidRecord {
                message: format!(
                    "expected a number, string, boolean or null, got {}",
                    json_kind(other)
                ),
            }),
        }
    }

    /// Serialize back to a JSON scalar.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::json!(i),
            Value::Decimal(d) => crate::numeric::decimal_to_json(*d),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Null => serde_json::Value::Null,
            Value::Nested(v) => v.clone(),
        }
    }

    /// Numeric view of the value. Booleans count as 1 and 0; text must
    /// parse as a number.
    pub fn coerce_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            Value::Bool(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
            Value::Text(s) => parse_decimal(s.trim()),
            Value::Null | Value::Nested(_) => None,
        }
    }

    /// Integer view of the value. Decimals truncate toward zero; text
    /// must be an integer literal.
    pub fn coerce_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Decimal(d) => d.trunc().to_i64(),
            Value::Text(s) => s.trim().parse::<i64>().ok(),
            Value::Null | Value::Nested(_) => None,
        }
    }

    /// Boolean view of the value: booleans, 0/1 integers and
    /// "true"/"false"/"1"/"0" text.
    pub fn coerce_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            Value::Decimal(d) if *d == Decimal::ZERO => Some(false),
            Value::Decimal(d) if *d == Decimal::ONE => Some(true),
            Value::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Text rendering used for case-insensitive comparisons.
    pub fn display_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Decimal(d) => Some(d.normalize().to_string()),
            Value::Null | Value::Nested(_) => None,
        }
    }

    /// Loose equality between a stored species trait and an expected
    /// value. Numeric expectations compare numerically, text compares
    /// case-insensitively, null never matches.
    pub fn loosely_equals(&self, expected: &Value) -> bool {
        match expected {
            Value::Null | Value::Nested(_) => false,
            Value::Int(_) | Value::Bool(_) => match (self.coerce_int(), expected.coerce_int()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            Value::Decimal(e) => self.coerce_decimal() == Some(*e),
            Value::Text(e) => self
                .display_text()
                .map(|s| s.to_lowercase() == e.to_lowercase())
                .unwrap_or(false),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ──────────────────────────────────────────────
// Records
// ──────────────────────────────────────────────

/// Observed traits of one specimen, keyed by trait name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(pub BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Record(BTreeMap::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a record from a JSON object. Array and object fields are
    /// kept as [`Value::Nested`] so only the conditions reading them fault.
    pub fn from_json(v: &serde_json::Value) -> Result<Record, EvalError> {
        let obj = v.as_object().ok_or_else(|| EvalError::InvalidRecord {
            message: format!("record must be a JSON object, got {}", json_kind(v)),
        })?;
        let mut record = Record::new();
        for (field, raw) in obj {
            let value = match raw {
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    Value::Nested(raw.clone())
                }
                scalar => Value::from_json(scalar).map_err(|e| EvalError::InvalidRecord {
                    message: format!("field '{}': {}", field, e),
                })?,
            };
            record.0.insert(field.clone(), value);
        }
        Ok(record)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let obj: serde_json::Map<String, serde_json::Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(obj)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_split_into_int_and_decimal() {
        assert_eq!(Value::from_json(&json!(3)).unwrap(), Value::Int(3));
        assert_eq!(
            Value::from_json(&json!(0.35)).unwrap(),
            Value::Decimal(Decimal::from_str("0.35").unwrap())
        );
    }

    #[test]
    fn nested_json_fields_are_kept_opaque() {
        assert!(Value::from_json(&json!([1, 2])).is_err());
        assert!(Record::from_json(&json!([1])).is_err());

        let raw = json!({ "x": { "y": 1 }, "tags": ["a"], "n": 2 });
        let record = Record::from_json(&raw).unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record.get("tags"), Some(&Value::Nested(json!(["a"]))));
        assert_eq!(record.get("x").map(Value::type_name), Some("object"));
        assert_eq!(record.to_json(), raw);
    }

    #[test]
    fn nested_values_never_coerce() {
        let v = Value::Nested(json!([1]));
        assert_eq!(v.coerce_decimal(), None);
        assert_eq!(v.coerce_int(), None);
        assert_eq!(v.coerce_bool(), None);
        assert_eq!(v.display_text(), None);
        assert!(!Value::Int(1).loosely_equals(&v));
    }

    #[test]
    fn decimal_coercion() {
        assert_eq!(
            Value::Text(" 2.25 ".into()).coerce_decimal(),
            Some(Decimal::from_str("2.25").unwrap())
        );
        assert_eq!(Value::Bool(true).coerce_decimal(), Some(Decimal::ONE));
        assert_eq!(Value::Text("robusta".into()).coerce_decimal(), None);
        assert_eq!(Value::Null.coerce_decimal(), None);
    }

    #[test]
    fn int_coercion_truncates() {
        assert_eq!(
            Value::Decimal(Decimal::from_str("1.7").unwrap()).coerce_int(),
            Some(1)
        );
        assert_eq!(Value::Text("1".into()).coerce_int(), Some(1));
        assert_eq!(Value::Text("1.0".into()).coerce_int(), None);
        assert_eq!(Value::Bool(false).coerce_int(), Some(0));
    }

    #[test]
    fn bool_coercion() {
        assert_eq!(Value::Int(1).coerce_bool(), Some(true));
        assert_eq!(Value::Text("False".into()).coerce_bool(), Some(false));
        assert_eq!(Value::Int(2).coerce_bool(), None);
    }

    #[test]
    fn loose_equality() {
        assert!(Value::Int(1).loosely_equals(&Value::Int(1)));
        assert!(Value::Bool(true).loosely_equals(&Value::Int(1)));
        assert!(Value::Text("Lisa".into()).loosely_equals(&Value::Text("lisa".into())));
        assert!(!Value::Null.loosely_equals(&Value::Int(0)));
        assert!(!Value::Text("x".into()).loosely_equals(&Value::Int(0)));
    }

    #[test]
    fn record_round_trips_through_json() {
        let raw = json!({ "ratio_rostro": 0.25, "forma_quela": "robusta", "presencia_setas": 1 });
        let record = Record::from_json(&raw).unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record.to_json(), raw);
    }
}
