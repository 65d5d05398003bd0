//! 3D Tiles metadata
//!
//! Schemas, JSON metadata entities and binary property tables, and the
//! semantics through which metadata overrides tile and content properties.

mod entity;
mod property_table;
mod schema;
pub mod semantics;
mod value;

pub use entity::{JsonMetadataEntityModel, MetadataEntity, MetadataEntityModel};
pub use property_table::{
    PropertyTable, PropertyTableModel, PropertyTableProperty, TableMetadataEntityModel,
};
pub use schema::{
    ClassProperty, ComponentType, EnumValue, MetadataClass, MetadataEnum, PropertyType, Schema,
};
pub use semantics::{apply_content_semantics, apply_tile_semantics};
pub use value::{process_value, MetadataValue};
