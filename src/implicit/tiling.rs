//! Validated implicit tiling configuration and template URIs

use std::fmt;

use super::coordinates::{CoordinatesIterator, OctreeCoordinates, QuadtreeCoordinates, TreeCoordinates};
use crate::error::{Tiles3dError, Tiles3dResult};
use crate::tiles3d::TileImplicitTiling;

/// Subdivision scheme of an implicit tileset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubdivisionScheme {
    Quadtree,
    Octree,
}

impl SubdivisionScheme {
    /// Number of children per node
    pub fn branching_factor(self) -> u64 {
        match self {
            Self::Quadtree => 4,
            Self::Octree => 8,
        }
    }

    pub fn root_coordinates(self) -> TreeCoordinates {
        match self {
            Self::Quadtree => TreeCoordinates::Quadtree(QuadtreeCoordinates::root()),
            Self::Octree => TreeCoordinates::Octree(OctreeCoordinates::root()),
        }
    }

    fn matches(self, coordinates: &TreeCoordinates) -> bool {
        matches!(
            (self, coordinates),
            (Self::Quadtree, TreeCoordinates::Quadtree(_)) | (Self::Octree, TreeCoordinates::Octree(_))
        )
    }
}

impl TryFrom<&str> for SubdivisionScheme {
    type Error = Tiles3dError;

    fn try_from(value: &str) -> Tiles3dResult<Self> {
        match value {
            "QUADTREE" => Ok(Self::Quadtree),
            "OCTREE" => Ok(Self::Octree),
            other => Err(Tiles3dError::implicit_tiling(format!(
                "unknown subdivision scheme: {other}"
            ))),
        }
    }
}

impl fmt::Display for SubdivisionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quadtree => f.write_str("QUADTREE"),
            Self::Octree => f.write_str("OCTREE"),
        }
    }
}

/// Number of nodes in a full subtree with `subtree_levels` levels:
/// `(b^L - 1) / (b - 1)`
pub fn nodes_per_subtree(scheme: SubdivisionScheme, subtree_levels: i64) -> Tiles3dResult<u64> {
    if subtree_levels <= 0 {
        return Err(Tiles3dError::implicit_tiling(format!(
            "subtree levels must be positive, but is {subtree_levels}"
        )));
    }
    let b = scheme.branching_factor();
    let power = u32::try_from(subtree_levels)
        .ok()
        .and_then(|levels| b.checked_pow(levels))
        .ok_or_else(|| {
            Tiles3dError::implicit_tiling(format!("subtree levels {subtree_levels} are too large"))
        })?;
    Ok((power - 1) / (b - 1))
}

/// Number of nodes in one level of a tree: `b^level`
pub fn nodes_in_level(scheme: SubdivisionScheme, level: i64) -> Tiles3dResult<u64> {
    if level < 0 {
        return Err(Tiles3dError::implicit_tiling(format!(
            "level must not be negative, but is {level}"
        )));
    }
    u32::try_from(level)
        .ok()
        .and_then(|level| scheme.branching_factor().checked_pow(level))
        .ok_or_else(|| Tiles3dError::implicit_tiling(format!("level {level} is too large")))
}

/// Replace `{level}`, `{x}`, `{y}` and (octree) `{z}` in a template URI.
///
/// Fails if the coordinates do not belong to the given subdivision scheme.
pub fn substitute_template_uri(
    scheme: SubdivisionScheme,
    template: &str,
    coordinates: &TreeCoordinates,
) -> Tiles3dResult<String> {
    if !scheme.matches(coordinates) {
        return Err(Tiles3dError::implicit_tiling(format!(
            "coordinates {coordinates} do not match subdivision scheme {scheme}"
        )));
    }
    let uri = match coordinates {
        TreeCoordinates::Quadtree(c) => template
            .replace("{level}", &c.level.to_string())
            .replace("{x}", &c.x.to_string())
            .replace("{y}", &c.y.to_string()),
        TreeCoordinates::Octree(c) => template
            .replace("{level}", &c.level.to_string())
            .replace("{x}", &c.x.to_string())
            .replace("{y}", &c.y.to_string())
            .replace("{z}", &c.z.to_string()),
    };
    Ok(uri)
}

/// Implicit tiling description with validated values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitTiling {
    pub scheme: SubdivisionScheme,
    pub subtree_levels: u32,
    pub available_levels: u32,
    pub subtrees_uri: String,
}

impl ImplicitTiling {
    pub fn from_document(tiling: &TileImplicitTiling) -> Tiles3dResult<Self> {
        let scheme = SubdivisionScheme::try_from(tiling.subdivision_scheme.as_str())?;
        let subtree_levels = u32::try_from(tiling.subtree_levels)
            .ok()
            .filter(|levels| *levels > 0)
            .ok_or_else(|| {
                Tiles3dError::implicit_tiling(format!(
                    "subtree levels must be positive, but is {}",
                    tiling.subtree_levels
                ))
            })?;
        let available_levels = u32::try_from(tiling.available_levels).map_err(|_| {
            Tiles3dError::implicit_tiling(format!(
                "available levels must not be negative, but is {}",
                tiling.available_levels
            ))
        })?;
        // Rejects subtrees whose node count overflows
        nodes_per_subtree(scheme, i64::from(subtree_levels))?;
        Ok(Self {
            scheme,
            subtree_levels,
            available_levels,
            subtrees_uri: tiling.subtrees.uri.clone(),
        })
    }

    pub fn root_coordinates(&self) -> TreeCoordinates {
        self.scheme.root_coordinates()
    }

    /// Length of tile and content availability
    pub fn nodes_per_subtree(&self) -> Tiles3dResult<u64> {
        nodes_per_subtree(self.scheme, i64::from(self.subtree_levels))
    }

    /// Length of child subtree availability: the level below the last subtree level
    pub fn child_subtree_count(&self) -> Tiles3dResult<u64> {
        nodes_in_level(self.scheme, i64::from(self.subtree_levels))
    }

    pub fn subtree_uri(&self, coordinates: &TreeCoordinates) -> Tiles3dResult<String> {
        substitute_template_uri(self.scheme, &self.subtrees_uri, coordinates)
    }

    pub fn substitute(&self, template: &str, coordinates: &TreeCoordinates) -> Tiles3dResult<String> {
        substitute_template_uri(self.scheme, template, coordinates)
    }

    /// All local coordinates of one subtree, in availability index order
    pub fn subtree_coordinates(&self) -> CoordinatesIterator {
        self.root_coordinates().descendants(self.subtree_levels)
    }
}
