use indexmap::IndexMap;
use serde::Serialize;
use serde_json as json;

use crate::names::FieldName;

/// A scalar or structured value flowing through filters, mutation
/// inputs and materialized rows.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Object(IndexMap<FieldName, Value>),
    Json(json::Value),
}

impl Value {
    pub fn as_json(&self) -> json::Value {
        match self {
            Value::Null => json::Value::Null,
            Value::Boolean(b) => json::Value::Bool(*b),
            Value::Integer(i) => json::Value::from(*i),
            Value::Float(f) => json::Value::from(*f),
            Value::String(s) => json::Value::from(s.clone()),
            Value::List(xs) => json::Value::from(xs.iter().map(Value::as_json).collect::<Vec<_>>()),
            Value::Object(fields) => json::Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.as_json()))
                    .collect(),
            ),
            Value::Json(j) => j.clone(),
        }
    }

    pub fn from_json(value: &json::Value) -> Value {
        match value {
            json::Value::Null => Value::Null,
            json::Value::Bool(b) => Value::Boolean(*b),
            json::Value::Number(n) => n
                .as_i64()
                .map(Value::Integer)
                .or_else(|| n.as_f64().map(Value::Float))
                .unwrap_or_else(|| Value::Json(value.clone())),
            json::Value::String(s) => Value::String(s.clone()),
            json::Value::Array(xs) => Value::List(xs.iter().map(Value::from_json).collect()),
            json::Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (FieldName::new(name), Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<FieldName, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }
}

/// A materialized relation on a fetched row.
#[derive(Clone, Debug, PartialEq)]
pub enum Related {
    /// A single-valued relation, eagerly joined (`None` when the
    /// foreign key is null).
    One(Option<Box<Row>>),
    /// A collection relation, fetched through an eager-load.
    Many(Vec<Row>),
}

/// One object fetched from the datastore. `related` carries rows the
/// eager-load specifications of the plan pulled in alongside it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    pub values: IndexMap<FieldName, Value>,
    pub related: IndexMap<FieldName, Related>,
}

impl Row {
    pub fn new(values: IndexMap<FieldName, Value>) -> Row {
        Row {
            values,
            related: IndexMap::new(),
        }
    }

    /// Plain attribute read; a missing attribute yields `Null` rather
    /// than an error.
    pub fn attribute(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn id(&self) -> Value {
        self.attribute("id")
    }
}
