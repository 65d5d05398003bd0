//! Tileset parsing for 3D Tiles

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::tile::Tile;
use crate::error::{Tiles3dError, Tiles3dResult};
use crate::io::ResourceResolver;
use crate::metadata::{MetadataEntity, Schema};

/// Asset metadata for the tileset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesetAsset {
    /// 3D Tiles version
    pub version: String,
    /// Application-specific version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileset_version: Option<String>,
}

/// Root tileset.json structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tileset {
    /// Asset metadata
    pub asset: TilesetAsset,
    /// Geometric error of the tileset
    pub geometric_error: f64,
    /// Root tile
    pub root: Rc<Tile>,
    /// Inline metadata schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    /// External metadata schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
    /// Metadata entity of the tileset itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataEntity>,
    /// Content group metadata, referenced by `TileContent::group`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<MetadataEntity>>,
    /// Optional extensions used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions_used: Option<Vec<String>>,
    /// Optional extensions required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions_required: Option<Vec<String>>,
}

impl Tileset {
    /// Parse and validate a tileset from a JSON string
    pub fn from_json(json_str: &str) -> Tiles3dResult<Self> {
        let tileset: Self = serde_json::from_str(json_str)?;
        tileset.validate()?;
        Ok(tileset)
    }

    /// Parse and validate a tileset from raw JSON bytes
    pub fn from_slice(data: &[u8]) -> Tiles3dResult<Self> {
        let tileset: Self = serde_json::from_slice(data)?;
        tileset.validate()?;
        Ok(tileset)
    }

    /// Check what traversal relies on: an asset version, and explicit tiles
    /// with a bounding volume and a finite, non-negative geometric error.
    pub fn validate(&self) -> Tiles3dResult<()> {
        if self.asset.version.is_empty() {
            return Err(Tiles3dError::invalid_tileset("asset.version is empty"));
        }
        check_geometric_error(self.geometric_error, "tileset")?;
        let mut pending = vec![(self.root.as_ref(), "/root".to_string())];
        while let Some((tile, path)) = pending.pop() {
            check_geometric_error(tile.geometric_error, &path)?;
            if tile.bounding_volume.kinds().is_empty() {
                return Err(Tiles3dError::invalid_tileset(format!(
                    "tile {path} has no bounding volume"
                )));
            }
            for (index, child) in tile.children.iter().enumerate() {
                pending.push((child.as_ref(), format!("{path}/children/{index}")));
            }
        }
        Ok(())
    }

    /// Get the root tile
    pub fn root(&self) -> &Rc<Tile> {
        &self.root
    }

    /// Get the tileset version
    pub fn version(&self) -> &str {
        &self.asset.version
    }

    /// Get total explicit tile count
    pub fn tile_count(&self) -> usize {
        self.root.count_tiles()
    }

    /// Get maximum depth of the explicit tile hierarchy
    pub fn max_depth(&self) -> usize {
        self.root.max_depth()
    }

    /// Get list of required extensions
    pub fn required_extensions(&self) -> &[String] {
        self.extensions_required.as_deref().unwrap_or(&[])
    }

    /// Resolve the metadata schema, either inline or through `schemaUri`.
    ///
    /// An unresolvable `schemaUri` is a resource error.
    pub async fn resolve_schema(
        &self,
        resolver: &dyn ResourceResolver,
    ) -> Tiles3dResult<Option<Schema>> {
        if let Some(schema) = &self.schema {
            return Ok(Some(schema.clone()));
        }
        let Some(schema_uri) = &self.schema_uri else {
            return Ok(None);
        };
        let data = resolver
            .resolve_data(schema_uri)
            .await
            .ok_or_else(|| Tiles3dError::not_found(resolver.resolve_uri(schema_uri)))?;
        let schema: Schema = serde_json::from_slice(&data)?;
        Ok(Some(schema))
    }
}

fn check_geometric_error(value: f64, owner: &str) -> Tiles3dResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Tiles3dError::invalid_tileset(format!(
            "geometric error of {owner} must be finite and non-negative, but is {value}"
        )))
    }
}
