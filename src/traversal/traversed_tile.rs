//! Uniform view over explicit and implicit tiles

use std::rc::Rc;

use super::explicit::ExplicitTraversedTile;
use super::implicit::ImplicitTraversedTile;
use crate::error::Tiles3dResult;
use crate::implicit::TreeCoordinates;
use crate::io::ResourceResolver;
use crate::metadata::Schema;
use crate::tiles3d::{Tile, TileContent};

/// A tile met during traversal, either from the document or synthesized
/// from subtree availability.
///
/// Parents are referenced weakly; a parent stays reachable as long as the
/// traversal holds on to it, which it does while any descendant is queued.
#[derive(Debug)]
pub enum TraversedTile {
    Explicit(ExplicitTraversedTile),
    Implicit(ImplicitTraversedTile),
}

impl TraversedTile {
    /// The root tile of a tileset
    pub fn explicit_root(
        root: Rc<Tile>,
        schema: Option<Rc<Schema>>,
        resolver: Rc<dyn ResourceResolver>,
    ) -> Self {
        Self::Explicit(ExplicitTraversedTile::new(
            root,
            0,
            "/root".to_string(),
            None,
            schema,
            resolver,
        ))
    }

    /// The root of an external tileset referenced by the content `uri` of `parent`
    pub fn external_root(
        root: Rc<Tile>,
        parent: &Rc<TraversedTile>,
        uri: &str,
        schema: Option<Rc<Schema>>,
        resolver: Rc<dyn ResourceResolver>,
    ) -> Self {
        Self::Explicit(ExplicitTraversedTile::new(
            root,
            parent.level() + 1,
            format!("{}/[external:{uri}]/root", parent.path()),
            Some(Rc::downgrade(parent)),
            schema,
            resolver,
        ))
    }

    /// The tile before metadata overrides
    pub fn as_raw_tile(&self) -> Tiles3dResult<Tile> {
        match self {
            Self::Explicit(tile) => Ok(tile.as_raw_tile()),
            Self::Implicit(tile) => tile.as_raw_tile(),
        }
    }

    /// The tile with metadata semantics applied to it and its contents
    pub fn as_final_tile(&self) -> Tiles3dResult<Tile> {
        match self {
            Self::Explicit(tile) => tile.as_final_tile(),
            Self::Implicit(tile) => tile.as_final_tile(),
        }
    }

    /// Depth in the traversal; external tileset roots continue their parent's levels
    pub fn level(&self) -> u32 {
        match self {
            Self::Explicit(tile) => tile.level(),
            Self::Implicit(tile) => tile.level(),
        }
    }

    /// Diagnostic identifier, not a stable format
    pub fn path(&self) -> &str {
        match self {
            Self::Explicit(tile) => tile.path(),
            Self::Implicit(tile) => tile.path(),
        }
    }

    pub fn parent(&self) -> Option<Rc<TraversedTile>> {
        match self {
            Self::Explicit(tile) => tile.parent().and_then(|parent| parent.upgrade()),
            Self::Implicit(tile) => tile.parent().upgrade(),
        }
    }

    /// Resolve the children. Implicit tiles may resolve subtree files here.
    pub async fn children(self: Rc<Self>) -> Tiles3dResult<Vec<Rc<TraversedTile>>> {
        let children = match self.as_ref() {
            Self::Explicit(tile) => tile.children(&self).await?,
            Self::Implicit(tile) => tile.children(&self).await?,
        };
        Ok(children.into_iter().map(Rc::new).collect())
    }

    pub fn raw_contents(&self) -> Tiles3dResult<Vec<TileContent>> {
        match self {
            Self::Explicit(tile) => Ok(tile.raw_contents()),
            Self::Implicit(tile) => tile.raw_contents(),
        }
    }

    pub fn final_contents(&self) -> Tiles3dResult<Vec<TileContent>> {
        match self {
            Self::Explicit(tile) => tile.final_contents(),
            Self::Implicit(tile) => tile.final_contents(),
        }
    }

    /// Whether this document tile declares implicit tiling
    pub fn is_implicit_tileset_root(&self) -> bool {
        match self {
            Self::Explicit(tile) => tile.is_implicit_tileset_root(),
            Self::Implicit(_) => false,
        }
    }

    /// URI of the subtree file, for implicit tiles that root a subtree
    pub fn subtree_uri(&self) -> Option<String> {
        match self {
            Self::Explicit(_) => None,
            Self::Implicit(tile) => tile.subtree_uri(),
        }
    }

    /// Global coordinates of implicit tiles
    pub fn coordinates(&self) -> Option<&TreeCoordinates> {
        match self {
            Self::Explicit(_) => None,
            Self::Implicit(tile) => Some(tile.coordinates()),
        }
    }

    /// The resolver for content URIs of this tile
    pub fn resolver(&self) -> &Rc<dyn ResourceResolver> {
        match self {
            Self::Explicit(tile) => tile.resolver(),
            Self::Implicit(tile) => tile.resolver(),
        }
    }
}
