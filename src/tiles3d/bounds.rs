//! Bounding volume types for 3D Tiles

use serde::{Deserialize, Serialize};

/// Bounding volume of a tile or tile content.
///
/// The document may carry more than one representation at once, and metadata
/// semantics overwrite them individually, so each one is an optional field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingVolume {
    /// 12 numbers: center (3) + x half-axis (3) + y half-axis (3) + z half-axis (3)
    #[serde(rename = "box", default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<[f64; 12]>,
    /// 6 numbers: [west, south, east, north, min_height, max_height]
    /// Longitude/latitude in radians, heights in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<[f64; 6]>,
    /// 4 numbers: [cx, cy, cz, radius]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sphere: Option<[f64; 4]>,
    /// Extension volumes (e.g. 3DTILES_bounding_volume_S2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

impl BoundingVolume {
    pub fn from_box(data: [f64; 12]) -> Self {
        Self {
            bounding_box: Some(data),
            ..Default::default()
        }
    }

    pub fn from_region(data: [f64; 6]) -> Self {
        Self {
            region: Some(data),
            ..Default::default()
        }
    }

    pub fn from_sphere(data: [f64; 4]) -> Self {
        Self {
            sphere: Some(data),
            ..Default::default()
        }
    }

    /// Names of the representations present, for diagnostics
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds = Vec::new();
        if self.bounding_box.is_some() {
            kinds.push("box");
        }
        if self.region.is_some() {
            kinds.push("region");
        }
        if self.sphere.is_some() {
            kinds.push("sphere");
        }
        if let Some(extensions) = &self.extensions {
            kinds.extend(extensions.keys().map(String::as_str));
        }
        kinds
    }
}
