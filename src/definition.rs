//! Binds the window's three logical parameters against an input stream schema.
//!
//! A window is declared as `priority(key, priority, period)`: the first two
//! parameters reference stream attributes, the third is a constant decay
//! period. Binding happens once, before any event reaches the processor, and
//! yields a [`BoundWindow`] that projects raw attribute rows into the
//! `(key, priority, passthrough)` triple the processor consumes.

use crate::config::WindowConfig;
use crate::event_model::{AttributeType, AttributeValue, GroupKey, PriorityWidth};
use std::time::Duration;
use thiserror::Error;

/// Name of the appended attribute carrying the group key.
pub const PRIORITY_KEY_ATTRIBUTE: &str = "priorityKey";
/// Name of the appended attribute carrying the current score.
pub const CURRENT_PRIORITY_ATTRIBUTE: &str = "currentPriority";

/// Ordered attribute list of an input stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamSchema {
    attributes: Vec<(String, AttributeType)>,
}

impl StreamSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>, ty: AttributeType) -> Self {
        self.attributes.push((name.into(), ty));
        self
    }

    pub fn attributes(&self) -> &[(String, AttributeType)] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    fn position(&self, name: &str) -> Option<(usize, AttributeType)> {
        self.attributes
            .iter()
            .position(|(attr, _)| attr == name)
            .map(|idx| (idx, self.attributes[idx].1))
    }
}

/// One parameter expression passed to the window.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowParameter {
    /// Reference to a stream attribute by name.
    Attribute(String),
    /// Constant value of the given type.
    Constant(AttributeValue),
    /// Time constant such as `1 sec` or `500 milliseconds`.
    Time(Duration),
}

impl WindowParameter {
    pub fn attribute(name: impl Into<String>) -> Self {
        WindowParameter::Attribute(name.into())
    }

    fn describe(&self) -> String {
        match self {
            WindowParameter::Attribute(name) => format!("attribute '{name}'"),
            WindowParameter::Constant(value) => format!("constant {value:?}"),
            WindowParameter::Time(period) => format!("time constant {} ms", period.as_millis()),
        }
    }
}

/// Parameter binding failures raised at window creation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("priority window expects 3 parameters (key, priority, period) but found {found}")]
    ParameterCount { found: usize },
    #[error("priority window key must be a stream attribute, found {found}")]
    InvalidKeyParameter { found: String },
    #[error("priority window priority must be an INT or LONG attribute, found {found}")]
    InvalidPriorityParameter { found: String },
    #[error("priority window period must be an INT, LONG or time constant, found {found}")]
    InvalidPeriodParameter { found: String },
    #[error("priority window period must be positive, found {period_ms} ms")]
    NonPositivePeriod { period_ms: i64 },
    #[error("attribute '{name}' is not defined on the input stream")]
    UnknownAttribute { name: String },
}

/// Validated parameter roles for a priority window over one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundWindow {
    schema: StreamSchema,
    key_index: usize,
    key_type: AttributeType,
    priority_index: usize,
    width: PriorityWidth,
    period: Duration,
}

/// Raw event projected into the processor's inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEvent {
    pub key: Option<GroupKey>,
    pub priority: Option<i64>,
    pub passthrough: Vec<AttributeValue>,
}

impl BoundWindow {
    /// Validates `params` against `schema`.
    pub fn bind(schema: &StreamSchema, params: &[WindowParameter]) -> Result<Self, DefinitionError> {
        if params.len() != 3 {
            return Err(DefinitionError::ParameterCount {
                found: params.len(),
            });
        }
        let (key_index, key_type) = match &params[0] {
            WindowParameter::Attribute(name) => resolve(schema, name)?,
            other => {
                return Err(DefinitionError::InvalidKeyParameter {
                    found: other.describe(),
                })
            }
        };
        let (priority_index, width) = match &params[1] {
            WindowParameter::Attribute(name) => {
                let (idx, ty) = resolve(schema, name)?;
                let width = PriorityWidth::from_attribute_type(ty).ok_or_else(|| {
                    DefinitionError::InvalidPriorityParameter {
                        found: format!("attribute '{name}' of type {ty}"),
                    }
                })?;
                (idx, width)
            }
            other => {
                return Err(DefinitionError::InvalidPriorityParameter {
                    found: other.describe(),
                })
            }
        };
        let period = period_from(&params[2])?;
        Ok(Self {
            schema: schema.clone(),
            key_index,
            key_type,
            priority_index,
            width,
            period,
        })
    }

    pub fn key_index(&self) -> usize {
        self.key_index
    }

    pub fn priority_index(&self) -> usize {
        self.priority_index
    }

    pub fn width(&self) -> PriorityWidth {
        self.width
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Window config carrying the bound period and priority width.
    pub fn config(&self) -> WindowConfig {
        WindowConfig::with_period(self.period).width(self.width)
    }

    /// Input attributes followed by `priorityKey` and `currentPriority`.
    pub fn output_schema(&self) -> StreamSchema {
        self.schema
            .clone()
            .attribute(PRIORITY_KEY_ATTRIBUTE, self.key_type)
            .attribute(CURRENT_PRIORITY_ATTRIBUTE, self.width.attribute_type())
    }

    /// Projects a raw row; missing or non-integral values become `None`.
    pub fn extract(&self, row: &[AttributeValue]) -> ExtractedEvent {
        let key = row.get(self.key_index).and_then(GroupKey::from_attribute);
        let priority = row
            .get(self.priority_index)
            .and_then(AttributeValue::as_priority);
        ExtractedEvent {
            key,
            priority,
            passthrough: row.to_vec(),
        }
    }

    /// Rebuilds the key attribute with the declared key type.
    pub fn key_attribute(&self, key: &GroupKey) -> AttributeValue {
        key.to_attribute(self.key_type)
    }
}

fn resolve(schema: &StreamSchema, name: &str) -> Result<(usize, AttributeType), DefinitionError> {
    schema
        .position(name)
        .ok_or_else(|| DefinitionError::UnknownAttribute {
            name: name.to_string(),
        })
}

fn period_from(param: &WindowParameter) -> Result<Duration, DefinitionError> {
    let period_ms = match param {
        WindowParameter::Time(period) => i64::try_from(period.as_millis()).unwrap_or(i64::MAX),
        WindowParameter::Constant(value) => {
            value
                .as_priority()
                .ok_or_else(|| DefinitionError::InvalidPeriodParameter {
                    found: param.describe(),
                })?
        }
        WindowParameter::Attribute(_) => {
            return Err(DefinitionError::InvalidPeriodParameter {
                found: param.describe(),
            })
        }
    };
    if period_ms <= 0 {
        return Err(DefinitionError::NonPositivePeriod { period_ms });
    }
    Ok(Duration::from_millis(period_ms as u64))
}
