//! Overrides of tile and content properties from metadata semantics

use super::entity::MetadataEntityModel;
use super::value::MetadataValue;
use crate::error::{Tiles3dError, Tiles3dResult};
use crate::tiles3d::{BoundingVolume, Tile, TileContent, TileRefine};

pub const TILE_BOUNDING_BOX: &str = "TILE_BOUNDING_BOX";
pub const TILE_BOUNDING_REGION: &str = "TILE_BOUNDING_REGION";
pub const TILE_BOUNDING_SPHERE: &str = "TILE_BOUNDING_SPHERE";
pub const TILE_MINIMUM_HEIGHT: &str = "TILE_MINIMUM_HEIGHT";
pub const TILE_MAXIMUM_HEIGHT: &str = "TILE_MAXIMUM_HEIGHT";
pub const TILE_GEOMETRIC_ERROR: &str = "TILE_GEOMETRIC_ERROR";
pub const TILE_REFINE: &str = "TILE_REFINE";
pub const TILE_TRANSFORM: &str = "TILE_TRANSFORM";

pub const CONTENT_BOUNDING_BOX: &str = "CONTENT_BOUNDING_BOX";
pub const CONTENT_BOUNDING_REGION: &str = "CONTENT_BOUNDING_REGION";
pub const CONTENT_BOUNDING_SPHERE: &str = "CONTENT_BOUNDING_SPHERE";
pub const CONTENT_MINIMUM_HEIGHT: &str = "CONTENT_MINIMUM_HEIGHT";
pub const CONTENT_MAXIMUM_HEIGHT: &str = "CONTENT_MAXIMUM_HEIGHT";
pub const CONTENT_URI: &str = "CONTENT_URI";
pub const CONTENT_GROUP_ID: &str = "CONTENT_GROUP_ID";

fn number(value: &MetadataValue, semantic: &str) -> Tiles3dResult<f64> {
    value.as_f64().ok_or_else(|| {
        Tiles3dError::invalid_metadata(format!("{semantic} must be a number, but is {value}"))
    })
}

fn numbers<const N: usize>(value: &MetadataValue, semantic: &str) -> Tiles3dResult<[f64; N]> {
    value
        .to_f64_vec()
        .and_then(|values| <[f64; N]>::try_from(values).ok())
        .ok_or_else(|| {
            Tiles3dError::invalid_metadata(format!(
                "{semantic} must be {N} numbers, but is {value}"
            ))
        })
}

/// Bounding volume overrides shared by tiles and contents
fn apply_volume_semantics(
    volume: &mut BoundingVolume,
    entity: &dyn MetadataEntityModel,
    semantics: [&str; 5],
) -> Tiles3dResult<bool> {
    let [box_semantic, region_semantic, sphere_semantic, min_semantic, max_semantic] = semantics;
    let mut changed = false;
    if let Some(value) = entity.property_value_by_semantic(box_semantic)? {
        volume.bounding_box = Some(numbers(&value, box_semantic)?);
        changed = true;
    }
    if let Some(value) = entity.property_value_by_semantic(region_semantic)? {
        volume.region = Some(numbers(&value, region_semantic)?);
        changed = true;
    }
    if let Some(value) = entity.property_value_by_semantic(sphere_semantic)? {
        volume.sphere = Some(numbers(&value, sphere_semantic)?);
        changed = true;
    }
    // Heights only refine an existing region
    if let Some(region) = volume.region.as_mut() {
        if let Some(value) = entity.property_value_by_semantic(min_semantic)? {
            region[4] = number(&value, min_semantic)?;
            changed = true;
        }
        if let Some(value) = entity.property_value_by_semantic(max_semantic)? {
            region[5] = number(&value, max_semantic)?;
            changed = true;
        }
    }
    Ok(changed)
}

/// Apply the `TILE_*` semantics of `entity` to `tile`
pub fn apply_tile_semantics(tile: &mut Tile, entity: &dyn MetadataEntityModel) -> Tiles3dResult<()> {
    apply_volume_semantics(
        &mut tile.bounding_volume,
        entity,
        [
            TILE_BOUNDING_BOX,
            TILE_BOUNDING_REGION,
            TILE_BOUNDING_SPHERE,
            TILE_MINIMUM_HEIGHT,
            TILE_MAXIMUM_HEIGHT,
        ],
    )?;
    if let Some(value) = entity.property_value_by_semantic(TILE_GEOMETRIC_ERROR)? {
        tile.geometric_error = number(&value, TILE_GEOMETRIC_ERROR)?;
    }
    if let Some(value) = entity.property_value_by_semantic(TILE_REFINE)? {
        let refine = number(&value, TILE_REFINE)?;
        tile.refine = Some(if refine == 0.0 {
            TileRefine::Add
        } else if refine == 1.0 {
            TileRefine::Replace
        } else {
            return Err(Tiles3dError::invalid_metadata(format!(
                "{TILE_REFINE} must be 0 or 1, but is {refine}"
            )));
        });
    }
    if let Some(value) = entity.property_value_by_semantic(TILE_TRANSFORM)? {
        tile.transform = Some(numbers(&value, TILE_TRANSFORM)?);
    }
    Ok(())
}

/// Apply the `CONTENT_*` semantics of `entity` to `content`
pub fn apply_content_semantics(
    content: &mut TileContent,
    entity: &dyn MetadataEntityModel,
) -> Tiles3dResult<()> {
    let mut volume = content.bounding_volume.clone().unwrap_or_default();
    let changed = apply_volume_semantics(
        &mut volume,
        entity,
        [
            CONTENT_BOUNDING_BOX,
            CONTENT_BOUNDING_REGION,
            CONTENT_BOUNDING_SPHERE,
            CONTENT_MINIMUM_HEIGHT,
            CONTENT_MAXIMUM_HEIGHT,
        ],
    )?;
    if changed {
        content.bounding_volume = Some(volume);
    }
    if let Some(value) = entity.property_value_by_semantic(CONTENT_URI)? {
        let uri = value.as_str().ok_or_else(|| {
            Tiles3dError::invalid_metadata(format!("{CONTENT_URI} must be a string, but is {value}"))
        })?;
        content.uri = uri.to_string();
    }
    if let Some(value) = entity.property_value_by_semantic(CONTENT_GROUP_ID)? {
        let group = number(&value, CONTENT_GROUP_ID)?;
        if group < 0.0 || group.fract() != 0.0 || group > f64::from(u32::MAX) {
            return Err(Tiles3dError::invalid_metadata(format!(
                "{CONTENT_GROUP_ID} must be a group index, but is {group}"
            )));
        }
        content.group = Some(group as u32);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{JsonMetadataEntityModel, MetadataEntity, Schema};
    use serde_json::json;

    fn schema() -> Schema {
        serde_json::from_value(json!({
            "classes": {
                "tile": {
                    "properties": {
                        "region": { "type": "SCALAR", "componentType": "FLOAT64", "array": true, "count": 6, "semantic": "TILE_BOUNDING_REGION" },
                        "minHeight": { "type": "SCALAR", "componentType": "FLOAT32", "semantic": "TILE_MINIMUM_HEIGHT" },
                        "error": { "type": "SCALAR", "componentType": "FLOAT32", "semantic": "TILE_GEOMETRIC_ERROR" },
                        "refine": { "type": "SCALAR", "componentType": "UINT8", "semantic": "TILE_REFINE" }
                    }
                },
                "placement": {
                    "properties": {
                        "box": { "type": "SCALAR", "componentType": "FLOAT64", "array": true, "count": 12, "semantic": "TILE_BOUNDING_BOX" },
                        "maxHeight": { "type": "SCALAR", "componentType": "FLOAT64", "semantic": "TILE_MAXIMUM_HEIGHT" },
                        "transform": { "type": "MAT4", "componentType": "FLOAT64", "semantic": "TILE_TRANSFORM" }
                    }
                },
                "content": {
                    "properties": {
                        "uri": { "type": "STRING", "semantic": "CONTENT_URI" },
                        "group": { "type": "SCALAR", "componentType": "UINT32", "semantic": "CONTENT_GROUP_ID" },
                        "sphere": { "type": "SCALAR", "componentType": "FLOAT64", "array": true, "count": 4, "semantic": "CONTENT_BOUNDING_SPHERE" }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_tile_semantics() {
        let schema = schema();
        let entity: MetadataEntity = serde_json::from_value(json!({
            "class": "tile",
            "properties": {
                "region": [0, 0, 1, 1, 0, 100],
                "minHeight": 5,
                "error": 12.5,
                "refine": 0
            }
        }))
        .unwrap();
        let model = JsonMetadataEntityModel::new(&schema, &entity).unwrap();

        let mut tile = Tile::default();
        apply_tile_semantics(&mut tile, &model).unwrap();
        assert_eq!(tile.bounding_volume.region, Some([0.0, 0.0, 1.0, 1.0, 5.0, 100.0]));
        assert_eq!(tile.geometric_error, 12.5);
        assert_eq!(tile.refine, Some(TileRefine::Add));
        assert!(tile.transform.is_none());
    }

    #[test]
    fn test_tile_placement_semantics() {
        let schema = schema();
        let entity: MetadataEntity = serde_json::from_value(json!({
            "class": "placement",
            "properties": {
                "box": [1, 2, 3, 4, 0, 0, 0, 4, 0, 0, 0, 4],
                "maxHeight": 250,
                "transform": [2, 0, 0, 0, 0, 2, 0, 0, 0, 0, 2, 0, 10, 20, 30, 1]
            }
        }))
        .unwrap();
        let model = JsonMetadataEntityModel::new(&schema, &entity).unwrap();

        // Without a region the maximum height has nothing to refine
        let mut tile = Tile::default();
        apply_tile_semantics(&mut tile, &model).unwrap();
        assert_eq!(
            tile.bounding_volume.bounding_box,
            Some([1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 4.0])
        );
        assert!(tile.bounding_volume.region.is_none());
        let transform = tile.transform.unwrap();
        assert_eq!(transform[0], 2.0);
        assert_eq!(&transform[12..], &[10.0, 20.0, 30.0, 1.0]);

        let mut tile = Tile::default();
        tile.bounding_volume.region = Some([0.0, 0.0, 1.0, 1.0, 0.0, 100.0]);
        apply_tile_semantics(&mut tile, &model).unwrap();
        assert_eq!(tile.bounding_volume.region, Some([0.0, 0.0, 1.0, 1.0, 0.0, 250.0]));
    }

    #[test]
    fn test_invalid_tile_semantics() {
        let schema = schema();
        let entity: MetadataEntity =
            serde_json::from_value(json!({ "class": "tile", "properties": { "refine": 3 } })).unwrap();
        let model = JsonMetadataEntityModel::new(&schema, &entity).unwrap();
        assert!(apply_tile_semantics(&mut Tile::default(), &model).is_err());

        let entity: MetadataEntity =
            serde_json::from_value(json!({ "class": "tile", "properties": { "region": [1, 2] } })).unwrap();
        let model = JsonMetadataEntityModel::new(&schema, &entity).unwrap();
        assert!(matches!(
            apply_tile_semantics(&mut Tile::default(), &model),
            Err(Tiles3dError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_content_semantics() {
        let schema = schema();
        let entity: MetadataEntity = serde_json::from_value(json!({
            "class": "content",
            "properties": { "uri": "override.glb", "group": 2, "sphere": [0, 0, 0, 10] }
        }))
        .unwrap();
        let model = JsonMetadataEntityModel::new(&schema, &entity).unwrap();

        let mut content = TileContent::new("original.glb");
        apply_content_semantics(&mut content, &model).unwrap();
        assert_eq!(content.uri, "override.glb");
        assert_eq!(content.group, Some(2));
        assert_eq!(content.bounding_volume.unwrap().sphere, Some([0.0, 0.0, 0.0, 10.0]));
    }
}
