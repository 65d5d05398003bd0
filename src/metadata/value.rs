//! Metadata values and the transforms applied to raw values

use std::fmt;

use serde_json::Value;

use super::schema::{ClassProperty, ComponentType};
use crate::error::{Tiles3dError, Tiles3dResult};

/// A decoded metadata value. Numbers of every component type are `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<MetadataValue>),
}

impl MetadataValue {
    pub fn from_json(value: &Value) -> Tiles3dResult<Self> {
        match value {
            Value::Bool(b) => Ok(Self::Boolean(*b)),
            Value::Number(n) => n
                .as_f64()
                .map(Self::Number)
                .ok_or_else(|| Tiles3dError::invalid_metadata(format!("invalid number {n}"))),
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Array(values) => values.iter().map(Self::from_json).collect::<Tiles3dResult<_>>().map(Self::Array),
            Value::Null | Value::Object(_) => Err(Tiles3dError::invalid_metadata(format!(
                "{value} is not a metadata value"
            ))),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[MetadataValue]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    /// The numbers of a flat numeric array
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        self.as_array()?.iter().map(Self::as_f64).collect()
    }

    fn map_numbers(self, f: &impl Fn(f64) -> f64) -> Self {
        match self {
            Self::Number(n) => Self::Number(f(n)),
            Self::Array(values) => Self::Array(values.into_iter().map(|v| v.map_numbers(f)).collect()),
            other => other,
        }
    }

    /// Combine with `factor`, zipping arrays and broadcasting a single number
    fn combine(self, factor: &MetadataValue, op: fn(f64, f64) -> f64) -> Self {
        match (self, factor) {
            (Self::Number(n), Self::Number(f)) => Self::Number(op(n, *f)),
            (Self::Array(values), Self::Number(_)) => {
                Self::Array(values.into_iter().map(|v| v.combine(factor, op)).collect())
            }
            (Self::Array(values), Self::Array(factors)) => Self::Array(
                values
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| match factors.get(i) {
                        Some(f) => v.combine(f, op),
                        None => v,
                    })
                    .collect(),
            ),
            (value, _) => value,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Array(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

fn normalize(value: f64, component_type: ComponentType) -> f64 {
    match component_type.normalization_divisor() {
        Some(max) if component_type.is_signed() => (value / max).max(-1.0),
        Some(max) => value / max,
        None => value,
    }
}

/// Turn a raw value into the final value of `property`.
///
/// A raw value equal to `noData` becomes the property default (or `None`).
/// Otherwise normalization, then `scale` and `offset` are applied; the given
/// overrides take precedence over the values of the class property.
pub fn process_value(
    property: &ClassProperty,
    raw: MetadataValue,
    offset_override: Option<&Value>,
    scale_override: Option<&Value>,
) -> Tiles3dResult<Option<MetadataValue>> {
    if let Some(no_data) = &property.no_data {
        if raw == MetadataValue::from_json(no_data)? {
            return property.default.as_ref().map(MetadataValue::from_json).transpose();
        }
    }

    let mut value = raw;
    if property.normalized {
        let component_type = property.component()?.ok_or_else(|| {
            Tiles3dError::invalid_metadata("normalized property without component type")
        })?;
        value = value.map_numbers(&|n| normalize(n, component_type));
    }
    if let Some(scale) = scale_override.or(property.scale.as_ref()) {
        value = value.combine(&MetadataValue::from_json(scale)?, |v, s| v * s);
    }
    if let Some(offset) = offset_override.or(property.offset.as_ref()) {
        value = value.combine(&MetadataValue::from_json(offset)?, |v, o| v + o);
    }
    Ok(Some(value))
}
