use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a stream attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Int,
    Long,
    Double,
    Bool,
}

impl AttributeType {
    /// Returns the canonical uppercase representation.
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeType::String => "STRING",
            AttributeType::Int => "INT",
            AttributeType::Long => "LONG",
            AttributeType::Double => "DOUBLE",
            AttributeType::Bool => "BOOL",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime value of a single stream attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Long(i64),
    Int(i32),
    Double(f64),
    String(String),
}

impl AttributeValue {
    /// Reads the value as a signed priority delta; only integral values qualify.
    pub fn as_priority(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(value) => Some(i64::from(*value)),
            AttributeValue::Long(value) => Some(*value),
            _ => None,
        }
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

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Long(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

/// Hashable projection of a non-null attribute used to partition events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Str(String),
    Int(i64),
    Bool(bool),
    /// Doubles group by bit pattern.
    Double(u64),
}

impl GroupKey {
    /// Projects an attribute into a key; `Null` belongs to no group.
    pub fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Null => None,
            AttributeValue::Bool(v) => Some(GroupKey::Bool(*v)),
            AttributeValue::Int(v) => Some(GroupKey::Int(i64::from(*v))),
            AttributeValue::Long(v) => Some(GroupKey::Int(*v)),
            AttributeValue::Double(v) => Some(GroupKey::Double(v.to_bits())),
            AttributeValue::String(v) => Some(GroupKey::Str(v.clone())),
        }
    }

    /// Converts the key back into an attribute of the declared key type.
    pub fn to_attribute(&self, declared: AttributeType) -> AttributeValue {
        match (self, declared) {
            (GroupKey::Str(v), _) => AttributeValue::String(v.clone()),
            (GroupKey::Bool(v), _) => AttributeValue::Bool(*v),
            (GroupKey::Double(bits), _) => AttributeValue::Double(f64::from_bits(*bits)),
            (GroupKey::Int(v), AttributeType::Int) => match i32::try_from(*v) {
                Ok(narrow) => AttributeValue::Int(narrow),
                Err(_) => AttributeValue::Long(*v),
            },
            (GroupKey::Int(v), _) => AttributeValue::Long(*v),
        }
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        GroupKey::Str(value.to_string())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Str(v) => f.write_str(v),
            GroupKey::Int(v) => write!(f, "{v}"),
            GroupKey::Bool(v) => write!(f, "{v}"),
            GroupKey::Double(bits) => write!(f, "{}", f64::from_bits(*bits)),
        }
    }
}

/// Width of the priority attribute as declared on the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityWidth {
    Int,
    #[default]
    Long,
}

impl PriorityWidth {
    /// Largest score representable at this width.
    pub fn max_score(self) -> i64 {
        match self {
            PriorityWidth::Int => i64::from(i32::MAX),
            PriorityWidth::Long => i64::MAX,
        }
    }

    /// Floors at zero and saturates at the width's maximum.
    pub fn clamp(self, raw: i64) -> i64 {
        raw.clamp(0, self.max_score())
    }

    /// Wraps a clamped score as an attribute of this width.
    pub fn to_attribute(self, score: i64) -> AttributeValue {
        match self {
            PriorityWidth::Int => AttributeValue::Int(score.min(self.max_score()) as i32),
            PriorityWidth::Long => AttributeValue::Long(score),
        }
    }

    pub fn attribute_type(self) -> AttributeType {
        match self {
            PriorityWidth::Int => AttributeType::Int,
            PriorityWidth::Long => AttributeType::Long,
        }
    }

    pub fn from_attribute_type(ty: AttributeType) -> Option<Self> {
        match ty {
            AttributeType::Int => Some(PriorityWidth::Int),
            AttributeType::Long => Some(PriorityWidth::Long),
            _ => None,
        }
    }
}
