//! Metadata schema: classes, class properties and enums

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Tiles3dError, Tiles3dResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub classes: BTreeMap<String, MetadataClass>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enums: BTreeMap<String, MetadataEnum>,
}

impl Schema {
    pub fn class(&self, name: &str) -> Tiles3dResult<&MetadataClass> {
        self.classes
            .get(name)
            .ok_or_else(|| Tiles3dError::invalid_metadata(format!("schema has no class '{name}'")))
    }

    pub fn enumeration(&self, name: &str) -> Tiles3dResult<&MetadataEnum> {
        self.enums
            .get(name)
            .ok_or_else(|| Tiles3dError::invalid_metadata(format!("schema has no enum '{name}'")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataClass {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ClassProperty>,
}

impl MetadataClass {
    /// Name and definition of the first property with the given semantic
    pub fn property_by_semantic(&self, semantic: &str) -> Option<(&str, &ClassProperty)> {
        self.properties
            .iter()
            .find(|(_, property)| property.semantic.as_deref() == Some(semantic))
            .map(|(name, property)| (name.as_str(), property))
    }
}

/// Element type of a class property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    String,
    Boolean,
    Enum,
}

impl PropertyType {
    pub fn parse(value: &str) -> Tiles3dResult<Self> {
        Ok(match value {
            "SCALAR" => Self::Scalar,
            "VEC2" => Self::Vec2,
            "VEC3" => Self::Vec3,
            "VEC4" => Self::Vec4,
            "MAT2" => Self::Mat2,
            "MAT3" => Self::Mat3,
            "MAT4" => Self::Mat4,
            "STRING" => Self::String,
            "BOOLEAN" => Self::Boolean,
            "ENUM" => Self::Enum,
            other => {
                return Err(Tiles3dError::invalid_metadata(format!(
                    "unknown property type '{other}'"
                )))
            }
        })
    }

    /// Number of components of one element
    pub fn component_count(self) -> usize {
        match self {
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
            Self::Scalar | Self::String | Self::Boolean | Self::Enum => 1,
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::String | Self::Boolean | Self::Enum)
    }
}

/// Binary component type of numeric values, enums and offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
}

impl ComponentType {
    pub fn parse(value: &str) -> Tiles3dResult<Self> {
        Ok(match value {
            "INT8" => Self::Int8,
            "UINT8" => Self::Uint8,
            "INT16" => Self::Int16,
            "UINT16" => Self::Uint16,
            "INT32" => Self::Int32,
            "UINT32" => Self::Uint32,
            "INT64" => Self::Int64,
            "UINT64" => Self::Uint64,
            "FLOAT32" => Self::Float32,
            "FLOAT64" => Self::Float64,
            other => {
                return Err(Tiles3dError::invalid_metadata(format!(
                    "unknown component type '{other}'"
                )))
            }
        })
    }

    pub fn byte_size(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int64 | Self::Uint64 | Self::Float64 => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Float32 | Self::Float64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
        )
    }

    /// Largest value of an integer type, the divisor for normalization
    pub fn normalization_divisor(self) -> Option<f64> {
        Some(match self {
            Self::Int8 => f64::from(i8::MAX),
            Self::Uint8 => f64::from(u8::MAX),
            Self::Int16 => f64::from(i16::MAX),
            Self::Uint16 => f64::from(u16::MAX),
            Self::Int32 => f64::from(i32::MAX),
            Self::Uint32 => f64::from(u32::MAX),
            Self::Int64 => i64::MAX as f64,
            Self::Uint64 => u64::MAX as f64,
            Self::Float32 | Self::Float64 => return None,
        })
    }

    /// Read one little-endian value from the start of `bytes`.
    ///
    /// 64-bit integers lose precision beyond 2^53.
    pub fn read(self, bytes: &[u8]) -> Option<f64> {
        let bytes = bytes.get(..self.byte_size())?;
        Some(match self {
            Self::Int8 => f64::from(i8::from_le_bytes(bytes.try_into().ok()?)),
            Self::Uint8 => f64::from(bytes[0]),
            Self::Int16 => f64::from(i16::from_le_bytes(bytes.try_into().ok()?)),
            Self::Uint16 => f64::from(u16::from_le_bytes(bytes.try_into().ok()?)),
            Self::Int32 => f64::from(i32::from_le_bytes(bytes.try_into().ok()?)),
            Self::Uint32 => f64::from(u32::from_le_bytes(bytes.try_into().ok()?)),
            Self::Int64 => i64::from_le_bytes(bytes.try_into().ok()?) as f64,
            Self::Uint64 => u64::from_le_bytes(bytes.try_into().ok()?) as f64,
            Self::Float32 => f64::from(f32::from_le_bytes(bytes.try_into().ok()?)),
            Self::Float64 => f64::from_le_bytes(bytes.try_into().ok()?),
        })
    }
}

/// A property of a metadata class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassProperty {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_type: Option<String>,
    #[serde(default)]
    pub array: bool,
    /// Fixed array length; variable-length arrays have none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default)]
    pub normalized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ClassProperty {
    pub fn kind(&self) -> Tiles3dResult<PropertyType> {
        PropertyType::parse(&self.property_type)
    }

    /// Component type of numeric properties
    pub fn component(&self) -> Tiles3dResult<Option<ComponentType>> {
        self.component_type.as_deref().map(ComponentType::parse).transpose()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEnum {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Integer type of the stored values (UINT16 when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    pub values: Vec<EnumValue>,
}

impl MetadataEnum {
    pub fn value_component_type(&self) -> Tiles3dResult<ComponentType> {
        match self.value_type.as_deref() {
            Some(value_type) => ComponentType::parse(value_type),
            None => Ok(ComponentType::Uint16),
        }
    }

    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.value == value)
            .map(|v| v.name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema() {
        let schema: Schema = serde_json::from_str(
            r#"{
                "id": "example",
                "classes": {
                    "tile": {
                        "properties": {
                            "height": { "type": "SCALAR", "componentType": "FLOAT32", "semantic": "TILE_GEOMETRIC_ERROR" },
                            "kind": { "type": "ENUM", "enumType": "kinds" }
                        }
                    }
                },
                "enums": {
                    "kinds": { "values": [{ "name": "A", "value": 0 }, { "name": "B", "value": 7 }] }
                }
            }"#,
        )
        .unwrap();

        let class = schema.class("tile").unwrap();
        let (name, property) = class.property_by_semantic("TILE_GEOMETRIC_ERROR").unwrap();
        assert_eq!(name, "height");
        assert_eq!(property.component().unwrap(), Some(ComponentType::Float32));
        assert!(class.property_by_semantic("TILE_REFINE").is_none());

        let kinds = schema.enumeration("kinds").unwrap();
        assert_eq!(kinds.value_component_type().unwrap(), ComponentType::Uint16);
        assert_eq!(kinds.name_of(7), Some("B"));
        assert!(schema.class("missing").is_err());
    }

    #[test]
    fn test_component_types() {
        assert_eq!(ComponentType::Int16.read(&[0xFF, 0xFF]), Some(-1.0));
        assert_eq!(ComponentType::Uint16.read(&[0x01, 0x01]), Some(257.0));
        assert_eq!(ComponentType::Float32.read(&1.5f32.to_le_bytes()), Some(1.5));
        assert_eq!(ComponentType::Uint32.read(&[1, 2]), None);
        assert_eq!(ComponentType::Uint8.normalization_divisor(), Some(255.0));
        assert_eq!(ComponentType::Float64.normalization_divisor(), None);
        assert_eq!(PropertyType::parse("MAT3").unwrap().component_count(), 9);
        assert!(PropertyType::parse("VEC5").is_err());
    }
}
