//! Tile structure for 3D Tiles

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::bounds::BoundingVolume;
use crate::metadata::MetadataEntity;

/// Refinement strategy for child tiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TileRefine {
    /// Replace parent tile with children
    #[default]
    Replace,
    /// Add children to parent tile
    Add,
}

/// Content description for a tile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileContent {
    /// URI to the tile content (b3dm, pnts, glb, external tileset, ...).
    /// For implicit tilesets this is a template URI.
    pub uri: String,
    /// Optional bounding volume for the content (tighter than tile bounds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_volume: Option<BoundingVolume>,
    /// Index into the tileset's groups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<u32>,
    /// Metadata entity attached to this content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataEntity>,
}

impl TileContent {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }
}

/// `subtrees` property of an implicit tiling description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImplicitSubtrees {
    /// Template URI of the subtree files
    pub uri: String,
}

/// Implicit tiling description as it appears in the document.
///
/// Values are kept as written; `implicit::ImplicitTiling` validates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileImplicitTiling {
    /// `QUADTREE` or `OCTREE`
    pub subdivision_scheme: String,
    /// Number of levels in each subtree
    pub subtree_levels: i64,
    /// Number of levels with available tiles
    pub available_levels: i64,
    /// Location of the subtree files
    pub subtrees: ImplicitSubtrees,
}

/// A single tile in the 3D Tiles hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    /// Bounding volume enclosing the tile
    pub bounding_volume: BoundingVolume,
    /// Viewer request volume (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_request_volume: Option<BoundingVolume>,
    /// Geometric error in meters (controls LOD selection)
    pub geometric_error: f64,
    /// Optional refinement strategy (inherited from parent if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refine: Option<TileRefine>,
    /// Optional 4x4 transform matrix (column-major)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<[f64; 16]>,
    /// Single content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<TileContent>,
    /// Multiple contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<TileContent>>,
    /// Child tiles
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Rc<Tile>>,
    /// Makes this tile the root of an implicit tileset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_tiling: Option<TileImplicitTiling>,
    /// Metadata entity attached to this tile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataEntity>,
}

impl Tile {
    /// The content list, whether declared as `content` or `contents`
    pub fn content_list(&self) -> Vec<TileContent> {
        if let Some(content) = &self.content {
            return vec![content.clone()];
        }
        self.contents.clone().unwrap_or_default()
    }

    /// Store `contents` back using the field the tile already used,
    /// falling back to `content` for exactly one entry.
    pub fn set_content_list(&mut self, contents: Vec<TileContent>) {
        let use_list = self.contents.is_some() || contents.len() > 1;
        self.content = None;
        self.contents = None;
        if contents.is_empty() {
            return;
        }
        if use_list {
            self.contents = Some(contents);
        } else {
            self.content = contents.into_iter().next();
        }
    }

    /// Count total tiles in this subtree
    pub fn count_tiles(&self) -> usize {
        1 + self.children.iter().map(|c| c.count_tiles()).sum::<usize>()
    }

    /// Get maximum depth of this subtree
    pub fn max_depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.max_depth()).max().unwrap_or(0)
    }
}
