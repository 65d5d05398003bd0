//! Metadata entities and property lookup by semantic

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::{MetadataClass, Schema};
use super::value::{process_value, MetadataValue};
use crate::error::Tiles3dResult;

/// Metadata entity stored as JSON (tile, content, group or subtree metadata)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntity {
    pub class: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

/// Access to the property values of one metadata entity
pub trait MetadataEntityModel {
    fn class(&self) -> &MetadataClass;

    /// Final (processed) value of a property, `None` if there is none
    fn property_value(&self, name: &str) -> Tiles3dResult<Option<MetadataValue>>;

    /// Final value of the property carrying `semantic`, if the class has one
    fn property_value_by_semantic(&self, semantic: &str) -> Tiles3dResult<Option<MetadataValue>> {
        match self.class().property_by_semantic(semantic) {
            Some((name, _)) => self.property_value(name),
            None => Ok(None),
        }
    }
}

/// Entity model over a JSON metadata entity
#[derive(Debug, Clone, Copy)]
pub struct JsonMetadataEntityModel<'a> {
    class: &'a MetadataClass,
    entity: &'a MetadataEntity,
}

impl<'a> JsonMetadataEntityModel<'a> {
    pub fn new(schema: &'a Schema, entity: &'a MetadataEntity) -> Tiles3dResult<Self> {
        Ok(Self {
            class: schema.class(&entity.class)?,
            entity,
        })
    }
}

impl MetadataEntityModel for JsonMetadataEntityModel<'_> {
    fn class(&self) -> &MetadataClass {
        self.class
    }

    fn property_value(&self, name: &str) -> Tiles3dResult<Option<MetadataValue>> {
        let Some(property) = self.class.properties.get(name) else {
            return Ok(None);
        };
        match self.entity.properties.get(name) {
            Some(value) => process_value(property, MetadataValue::from_json(value)?, None, None),
            None => property.default.as_ref().map(MetadataValue::from_json).transpose(),
        }
    }
}
