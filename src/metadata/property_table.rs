//! Binary property tables

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::MetadataEntityModel;
use super::schema::{ClassProperty, ComponentType, MetadataClass, PropertyType, Schema};
use super::value::{process_value, MetadataValue};
use crate::error::{Tiles3dError, Tiles3dResult};
use crate::implicit::BufferViewData;

/// Property table as declared in a subtree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub class: String,
    pub count: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyTableProperty>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTableProperty {
    /// Buffer view with the values
    pub values: usize,
    /// Buffer view with element offsets of variable-length arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_offsets: Option<usize>,
    /// Buffer view with byte offsets of strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_offsets: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_offset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_offset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
}

/// Offsets buffer and the integer type it is stored as
#[derive(Debug, Clone)]
struct Offsets {
    data: BufferViewData,
    component_type: ComponentType,
}

impl Offsets {
    fn new(
        index: Option<usize>,
        offset_type: Option<&str>,
        buffer_views: &[BufferViewData],
        what: &str,
    ) -> Tiles3dResult<Option<Self>> {
        let Some(index) = index else {
            return Ok(None);
        };
        let component_type = match offset_type {
            Some(offset_type) => ComponentType::parse(offset_type)?,
            None => ComponentType::Uint32,
        };
        if !component_type.is_integer() || component_type.is_signed() {
            return Err(Tiles3dError::invalid_metadata(format!(
                "{what} offsets must be unsigned integers"
            )));
        }
        Ok(Some(Self {
            data: buffer_view(buffer_views, index)?,
            component_type,
        }))
    }

    fn get(&self, index: usize) -> Tiles3dResult<usize> {
        let size = self.component_type.byte_size();
        let value = index
            .checked_mul(size)
            .and_then(|start| self.data.get(start..))
            .and_then(|bytes| self.component_type.read(bytes))
            .ok_or_else(|| {
                Tiles3dError::invalid_metadata(format!("offset {index} out of range"))
            })?;
        Ok(value as usize)
    }
}

fn buffer_view(buffer_views: &[BufferViewData], index: usize) -> Tiles3dResult<BufferViewData> {
    buffer_views.get(index).cloned().ok_or_else(|| {
        Tiles3dError::invalid_metadata(format!("property refers to missing buffer view {index}"))
    })
}

/// Decoded layout of one property of a table
#[derive(Debug, Clone)]
struct PropertyModel {
    property: ClassProperty,
    kind: PropertyType,
    /// Component type of numbers, or of the stored enum values
    component_type: Option<ComponentType>,
    enum_names: BTreeMap<i64, String>,
    values: BufferViewData,
    array_offsets: Option<Offsets>,
    string_offsets: Option<Offsets>,
    offset: Option<Value>,
    scale: Option<Value>,
}

impl PropertyModel {
    fn new(
        name: &str,
        property: &ClassProperty,
        table_property: &PropertyTableProperty,
        schema: &Schema,
        buffer_views: &[BufferViewData],
    ) -> Tiles3dResult<Self> {
        let kind = property.kind()?;
        let mut enum_names = BTreeMap::new();
        let component_type = match kind {
            PropertyType::Enum => {
                let enum_type = property.enum_type.as_deref().ok_or_else(|| {
                    Tiles3dError::invalid_metadata(format!("enum property '{name}' without enumType"))
                })?;
                let enumeration = schema.enumeration(enum_type)?;
                enum_names = enumeration
                    .values
                    .iter()
                    .map(|v| (v.value, v.name.clone()))
                    .collect();
                Some(enumeration.value_component_type()?)
            }
            PropertyType::String | PropertyType::Boolean => None,
            _ => Some(property.component()?.ok_or_else(|| {
                Tiles3dError::invalid_metadata(format!("property '{name}' without componentType"))
            })?),
        };

        let array_offsets = if property.array && property.count.is_none() {
            let offsets = Offsets::new(
                table_property.array_offsets,
                table_property.array_offset_type.as_deref(),
                buffer_views,
                "array",
            )?;
            Some(offsets.ok_or_else(|| {
                Tiles3dError::invalid_metadata(format!(
                    "variable-length array property '{name}' without arrayOffsets"
                ))
            })?)
        } else {
            None
        };
        let string_offsets = if kind == PropertyType::String {
            let offsets = Offsets::new(
                table_property.string_offsets,
                table_property.string_offset_type.as_deref(),
                buffer_views,
                "string",
            )?;
            Some(offsets.ok_or_else(|| {
                Tiles3dError::invalid_metadata(format!("string property '{name}' without stringOffsets"))
            })?)
        } else {
            None
        };

        Ok(Self {
            property: property.clone(),
            kind,
            component_type,
            enum_names,
            values: buffer_view(buffer_views, table_property.values)?,
            array_offsets,
            string_offsets,
            offset: table_property.offset.clone(),
            scale: table_property.scale.clone(),
        })
    }

    /// Element index range of `row`
    fn elements(&self, row: usize) -> Tiles3dResult<(usize, usize)> {
        if !self.property.array {
            return Ok((row, 1));
        }
        if let Some(count) = self.property.count {
            let start = row.checked_mul(count).ok_or_else(|| out_of_range(row))?;
            return Ok((start, count));
        }
        // Variable-length arrays always have offsets
        let offsets = self
            .array_offsets
            .as_ref()
            .ok_or_else(|| Tiles3dError::invalid_metadata("missing array offsets"))?;
        let start = offsets.get(row)?;
        let end = offsets.get(row.checked_add(1).ok_or_else(|| out_of_range(row))?)?;
        if end < start {
            return Err(Tiles3dError::invalid_metadata(format!(
                "array offsets of row {row} decrease"
            )));
        }
        Ok((start, end - start))
    }

    fn element(&self, index: usize) -> Tiles3dResult<MetadataValue> {
        match self.kind {
            PropertyType::Boolean => {
                let byte = self.values.get(index / 8).ok_or_else(|| out_of_range(index))?;
                Ok(MetadataValue::Boolean((byte >> (index % 8)) & 1 == 1))
            }
            PropertyType::String => {
                let offsets = self
                    .string_offsets
                    .as_ref()
                    .ok_or_else(|| Tiles3dError::invalid_metadata("missing string offsets"))?;
                let start = offsets.get(index)?;
                let end = offsets.get(index.checked_add(1).ok_or_else(|| out_of_range(index))?)?;
                let bytes = self.values.get(start..end).ok_or_else(|| out_of_range(index))?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| Tiles3dError::invalid_metadata(format!("invalid string: {e}")))?;
                Ok(MetadataValue::String(text.to_string()))
            }
            PropertyType::Enum => {
                let value = self.read_component(index)?;
                let name = self.enum_names.get(&(value as i64)).ok_or_else(|| {
                    Tiles3dError::invalid_metadata(format!("{value} is not a value of the enum"))
                })?;
                Ok(MetadataValue::String(name.clone()))
            }
            kind => {
                let components = kind.component_count();
                if components == 1 {
                    return Ok(MetadataValue::Number(self.read_component(index)?));
                }
                let first = index.checked_mul(components).ok_or_else(|| out_of_range(index))?;
                (0..components)
                    .map(|c| {
                        let component = first.checked_add(c).ok_or_else(|| out_of_range(index))?;
                        self.read_component(component).map(MetadataValue::Number)
                    })
                    .collect::<Tiles3dResult<_>>()
                    .map(MetadataValue::Array)
            }
        }
    }

    fn read_component(&self, index: usize) -> Tiles3dResult<f64> {
        let component_type = self
            .component_type
            .ok_or_else(|| Tiles3dError::invalid_metadata("missing component type"))?;
        index
            .checked_mul(component_type.byte_size())
            .and_then(|start| self.values.get(start..))
            .and_then(|bytes| component_type.read(bytes))
            .ok_or_else(|| out_of_range(index))
    }

    fn raw_value(&self, row: usize) -> Tiles3dResult<MetadataValue> {
        let (start, length) = self.elements(row)?;
        if !self.property.array {
            return self.element(start);
        }
        let end = start.checked_add(length).ok_or_else(|| out_of_range(start))?;
        (start..end)
            .map(|index| self.element(index))
            .collect::<Tiles3dResult<_>>()
            .map(MetadataValue::Array)
    }
}

fn out_of_range(index: usize) -> Tiles3dError {
    Tiles3dError::invalid_metadata(format!("property value {index} is out of range"))
}

/// A property table with its class, ready for per-row access
#[derive(Debug, Clone)]
pub struct PropertyTableModel {
    class_name: String,
    class: MetadataClass,
    count: usize,
    properties: BTreeMap<String, PropertyModel>,
}

impl PropertyTableModel {
    pub fn new(
        table: &PropertyTable,
        schema: &Schema,
        buffer_views: &[BufferViewData],
    ) -> Tiles3dResult<Self> {
        let class = schema.class(&table.class)?;
        let mut properties = BTreeMap::new();
        for (name, table_property) in &table.properties {
            let property = class.properties.get(name).ok_or_else(|| {
                Tiles3dError::invalid_metadata(format!(
                    "class '{}' has no property '{name}'",
                    table.class
                ))
            })?;
            let model = PropertyModel::new(name, property, table_property, schema, buffer_views)?;
            properties.insert(name.clone(), model);
        }
        Ok(Self {
            class_name: table.class.clone(),
            class: class.clone(),
            count: table.count,
            properties,
        })
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn class(&self) -> &MetadataClass {
        &self.class
    }

    /// Number of rows
    pub fn count(&self) -> usize {
        self.count
    }

    /// Final value of `name` in `row`. Properties of the class that the table
    /// does not store yield their default.
    pub fn property_value(&self, name: &str, row: usize) -> Tiles3dResult<Option<MetadataValue>> {
        if row >= self.count {
            return Err(Tiles3dError::invalid_metadata(format!(
                "row {row} out of range for property table with {} rows",
                self.count
            )));
        }
        match self.properties.get(name) {
            Some(model) => {
                let raw = model.raw_value(row)?;
                process_value(&model.property, raw, model.offset.as_ref(), model.scale.as_ref())
            }
            None => match self.class.properties.get(name) {
                Some(property) => property.default.as_ref().map(MetadataValue::from_json).transpose(),
                None => Ok(None),
            },
        }
    }

    /// Entity view of one row
    pub fn entity(&self, row: usize) -> Tiles3dResult<TableMetadataEntityModel<'_>> {
        if row >= self.count {
            return Err(Tiles3dError::invalid_metadata(format!(
                "row {row} out of range for property table with {} rows",
                self.count
            )));
        }
        Ok(TableMetadataEntityModel { table: self, row })
    }
}

/// One row of a property table
#[derive(Debug, Clone, Copy)]
pub struct TableMetadataEntityModel<'a> {
    table: &'a PropertyTableModel,
    row: usize,
}

impl TableMetadataEntityModel<'_> {
    pub fn row(&self) -> usize {
        self.row
    }
}

impl MetadataEntityModel for TableMetadataEntityModel<'_> {
    fn class(&self) -> &MetadataClass {
        self.table.class()
    }

    fn property_value(&self, name: &str) -> Tiles3dResult<Option<MetadataValue>> {
        self.table.property_value(name, self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        serde_json::from_value(json!({
            "classes": {
                "tile": {
                    "properties": {
                        "error": { "type": "SCALAR", "componentType": "FLOAT32", "semantic": "TILE_GEOMETRIC_ERROR" },
                        "center": { "type": "VEC3", "componentType": "INT16", "normalized": true, "scale": [2, 2, 2] },
                        "name": { "type": "STRING" },
                        "flag": { "type": "BOOLEAN" },
                        "kind": { "type": "ENUM", "enumType": "kind" },
                        "samples": { "type": "SCALAR", "componentType": "UINT8", "array": true },
                        "pair": { "type": "SCALAR", "componentType": "UINT8", "array": true, "count": 2 },
                        "label": { "type": "STRING", "default": "none" }
                    }
                }
            },
            "enums": {
                "kind": { "valueType": "UINT8", "values": [{ "name": "LOW", "value": 0 }, { "name": "HIGH", "value": 1 }] }
            }
        }))
        .unwrap()
    }

    fn views() -> Vec<BufferViewData> {
        let mut error = Vec::new();
        for v in [1.5f32, 8.0] {
            error.extend_from_slice(&v.to_le_bytes());
        }
        let mut center = Vec::new();
        for v in [32767i16, 0, -32767, 0, 0, 0] {
            center.extend_from_slice(&v.to_le_bytes());
        }
        let names = b"ab".to_vec();
        let mut string_offsets = Vec::new();
        for v in [0u32, 1, 2] {
            string_offsets.extend_from_slice(&v.to_le_bytes());
        }
        vec![
            BufferViewData::from_bytes(error),
            BufferViewData::from_bytes(center),
            BufferViewData::from_bytes(names),
            BufferViewData::from_bytes(string_offsets),
            BufferViewData::from_bytes(vec![0b10u8]),
            BufferViewData::from_bytes(vec![1u8, 0]),
            BufferViewData::from_bytes(vec![5u8, 6, 7]),
            BufferViewData::from_bytes(vec![0u8, 2, 3]),
            BufferViewData::from_bytes(vec![1u8, 2, 3, 4]),
        ]
    }

    fn table() -> PropertyTable {
        serde_json::from_value(json!({
            "class": "tile",
            "count": 2,
            "properties": {
                "error": { "values": 0 },
                "center": { "values": 1 },
                "name": { "values": 2, "stringOffsets": 3 },
                "flag": { "values": 4 },
                "kind": { "values": 5 },
                "samples": { "values": 6, "arrayOffsets": 7, "arrayOffsetType": "UINT8" },
                "pair": { "values": 8, "offset": [10, 20] }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_rows() {
        let model = PropertyTableModel::new(&table(), &schema(), &views()).unwrap();
        assert_eq!(model.count(), 2);
        assert_eq!(model.class_name(), "tile");

        assert_eq!(model.property_value("error", 1).unwrap(), Some(8.0.into()));
        assert_eq!(
            model.property_value("center", 0).unwrap().unwrap().to_f64_vec(),
            Some(vec![2.0, 0.0, -2.0])
        );
        assert_eq!(model.property_value("name", 1).unwrap(), Some("b".into()));
        assert_eq!(model.property_value("flag", 0).unwrap(), Some(MetadataValue::Boolean(false)));
        assert_eq!(model.property_value("flag", 1).unwrap(), Some(MetadataValue::Boolean(true)));
        assert_eq!(model.property_value("kind", 0).unwrap(), Some("HIGH".into()));
        assert_eq!(
            model.property_value("samples", 0).unwrap().unwrap().to_f64_vec(),
            Some(vec![5.0, 6.0])
        );
        assert_eq!(
            model.property_value("samples", 1).unwrap().unwrap().to_f64_vec(),
            Some(vec![7.0])
        );
        assert_eq!(
            model.property_value("pair", 1).unwrap().unwrap().to_f64_vec(),
            Some(vec![13.0, 24.0])
        );
        assert_eq!(model.property_value("label", 0).unwrap(), Some("none".into()));
        assert_eq!(model.property_value("unknown", 0).unwrap(), None);
        assert!(model.property_value("error", 2).is_err());
    }

    #[test]
    fn test_entity_by_semantic() {
        let model = PropertyTableModel::new(&table(), &schema(), &views()).unwrap();
        let entity = model.entity(0).unwrap();
        assert_eq!(
            entity.property_value_by_semantic("TILE_GEOMETRIC_ERROR").unwrap(),
            Some(1.5.into())
        );
        assert_eq!(entity.property_value_by_semantic("TILE_REFINE").unwrap(), None);
        assert!(model.entity(5).is_err());
    }

    #[test]
    fn test_rejects_inconsistent_tables() {
        let mut missing_offsets = table();
        missing_offsets.properties.get_mut("name").unwrap().string_offsets = None;
        assert!(PropertyTableModel::new(&missing_offsets, &schema(), &views()).is_err());

        let mut unknown_property = table();
        unknown_property
            .properties
            .insert("nope".into(), PropertyTableProperty { values: 0, ..Default::default() });
        assert!(PropertyTableModel::new(&unknown_property, &schema(), &views()).is_err());

        let mut short = table();
        short.count = 4;
        let model = PropertyTableModel::new(&short, &schema(), &views()).unwrap();
        assert!(model.property_value("error", 3).is_err());
    }

    #[test]
    fn test_oversized_counts_are_errors() {
        let schema: Schema = serde_json::from_value(json!({
            "classes": { "huge": { "properties": {
                "values": { "type": "SCALAR", "componentType": "UINT8", "array": true, "count": u64::MAX },
                "vectors": { "type": "VEC3", "componentType": "UINT8", "array": true, "count": u64::MAX }
            } } }
        }))
        .unwrap();
        let table: PropertyTable = serde_json::from_value(json!({
            "class": "huge",
            "count": 3,
            "properties": { "values": { "values": 0 }, "vectors": { "values": 0 } }
        }))
        .unwrap();
        let views = vec![BufferViewData::from_bytes(vec![1u8, 2, 3])];
        let model = PropertyTableModel::new(&table, &schema, &views).unwrap();

        for row in 0..3 {
            assert!(model.property_value("values", row).is_err());
            assert!(model.property_value("vectors", row).is_err());
        }
    }
}
