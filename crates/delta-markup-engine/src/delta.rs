//! # Delta Model
//!
//! Serde types for the editor change-log format: an ordered list of
//! operations, each either an insert (text or embed), a retain, or a delete.
//!
//! Only inserts can be rendered. Retain and delete ops still deserialize so
//! that conversion can reject them with a descriptive error instead of a
//! JSON shape error.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ConvertError;

/// Attribute name → value, as attached to a single op.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A formatting attribute value: `true`, a string, or a number.
///
/// Editors also attach metadata (authorship, comments) as objects or
/// arrays; those land in `Other` and render as JSON text if a format
/// ever picks them up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Other(Value),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Number(n) => write!(f, "{n}"),
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Other(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Number(value.into())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value.into())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

/// What an insert puts into the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsertContent {
    Text(String),
    /// Any non-string value: an image index, `{"image": url}`, etc.
    Embed(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOp {
    pub insert: InsertContent,
    #[serde(
        default,
        skip_serializing_if = "Attributes::is_empty",
        deserialize_with = "deserialize_attributes"
    )]
    pub attributes: Attributes,
}

impl InsertOp {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            insert: InsertContent::Text(text.into()),
            attributes: Attributes::new(),
        }
    }

    pub fn embed(value: impl Into<Value>) -> Self {
        Self {
            insert: InsertContent::Embed(value.into()),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainOp {
    pub retain: Value,
    #[serde(
        default,
        skip_serializing_if = "Attributes::is_empty",
        deserialize_with = "deserialize_attributes"
    )]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteOp {
    pub delete: u64,
}

/// A single delta operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Op {
    Insert(InsertOp),
    Retain(RetainOp),
    Delete(DeleteOp),
}

impl Op {
    pub fn kind(&self) -> &'static str {
        match self {
            Op::Insert(_) => "insert",
            Op::Retain(_) => "retain",
            Op::Delete(_) => "delete",
        }
    }
}

impl From<InsertOp> for Op {
    fn from(op: InsertOp) -> Self {
        Op::Insert(op)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub ops: Vec<Op>,
}

impl Delta {
    pub fn new(ops: impl IntoIterator<Item = Op>) -> Self {
        Self {
            ops: ops.into_iter().collect(),
        }
    }

    pub fn from_inserts(ops: impl IntoIterator<Item = InsertOp>) -> Self {
        Self::new(ops.into_iter().map(Op::Insert))
    }

    pub fn from_json(json: &str) -> Result<Self, ConvertError> {
        Ok(serde_json::from_str(json)?)
    }

    /// All ops as inserts, or an error naming the first op that is not one.
    ///
    /// The whole delta is checked before anything is returned, so callers
    /// never see a partially accepted delta.
    pub fn inserts(&self) -> Result<Vec<&InsertOp>, ConvertError> {
        self.ops
            .iter()
            .enumerate()
            .map(|(index, op)| match op {
                Op::Insert(insert) => Ok(insert),
                other => Err(ConvertError::NonInsertOperation {
                    index,
                    kind: other.kind(),
                }),
            })
            .collect()
    }
}

/// `null` attribute values mean "unset" in the editor format; drop them.
fn deserialize_attributes<'de, D>(deserializer: D) -> Result<Attributes, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<AttributeValue>>> =
        Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect())
}
