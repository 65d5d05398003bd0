//! Traversed tiles backed by a tile of the tileset document

use std::rc::{Rc, Weak};
use std::sync::Arc;

use super::implicit::{ImplicitContext, ImplicitTraversedTile};
use super::traversed_tile::TraversedTile;
use crate::error::Tiles3dResult;
use crate::implicit::{ImplicitTiling, SubtreeInfo};
use crate::io::ResourceResolver;
use crate::metadata::{apply_content_semantics, apply_tile_semantics, JsonMetadataEntityModel, Schema};
use crate::tiles3d::{Tile, TileContent};

#[derive(Debug)]
pub struct ExplicitTraversedTile {
    tile: Rc<Tile>,
    level: u32,
    path: String,
    parent: Option<Weak<TraversedTile>>,
    schema: Option<Rc<Schema>>,
    resolver: Rc<dyn ResourceResolver>,
}

impl ExplicitTraversedTile {
    pub(crate) fn new(
        tile: Rc<Tile>,
        level: u32,
        path: String,
        parent: Option<Weak<TraversedTile>>,
        schema: Option<Rc<Schema>>,
        resolver: Rc<dyn ResourceResolver>,
    ) -> Self {
        Self {
            tile,
            level,
            path,
            parent,
            schema,
            resolver,
        }
    }

    /// The document tile
    pub fn tile(&self) -> &Rc<Tile> {
        &self.tile
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(super) fn parent(&self) -> Option<&Weak<TraversedTile>> {
        self.parent.as_ref()
    }

    pub fn schema(&self) -> Option<&Rc<Schema>> {
        self.schema.as_ref()
    }

    pub fn resolver(&self) -> &Rc<dyn ResourceResolver> {
        &self.resolver
    }

    pub fn is_implicit_tileset_root(&self) -> bool {
        self.tile.implicit_tiling.is_some()
    }

    pub fn as_raw_tile(&self) -> Tile {
        Tile::clone(&self.tile)
    }

    pub fn raw_contents(&self) -> Vec<TileContent> {
        self.tile.content_list()
    }

    pub fn as_final_tile(&self) -> Tiles3dResult<Tile> {
        let mut tile = self.as_raw_tile();
        if let (Some(schema), Some(metadata)) = (&self.schema, &self.tile.metadata) {
            let entity = JsonMetadataEntityModel::new(schema, metadata)?;
            apply_tile_semantics(&mut tile, &entity)?;
        }
        let contents = self.final_contents()?;
        tile.set_content_list(contents);
        Ok(tile)
    }

    pub fn final_contents(&self) -> Tiles3dResult<Vec<TileContent>> {
        let mut contents = self.raw_contents();
        let Some(schema) = &self.schema else {
            return Ok(contents);
        };
        for content in &mut contents {
            if let Some(metadata) = content.metadata.clone() {
                let entity = JsonMetadataEntityModel::new(schema, &metadata)?;
                apply_content_semantics(content, &entity)?;
            }
        }
        Ok(contents)
    }

    /// The implicit root for implicit tileset roots, otherwise the document
    /// children in document order
    pub(super) async fn children(
        &self,
        this: &Rc<TraversedTile>,
    ) -> Tiles3dResult<Vec<TraversedTile>> {
        if let Some(implicit_tiling) = &self.tile.implicit_tiling {
            let tiling = ImplicitTiling::from_document(implicit_tiling)?;
            return self.implicit_root(tiling, this).await;
        }
        let children = self
            .tile
            .children
            .iter()
            .enumerate()
            .map(|(index, child)| {
                TraversedTile::Explicit(Self::new(
                    Rc::clone(child),
                    self.level + 1,
                    format!("{}/children/{index}", self.path),
                    Some(Rc::downgrade(this)),
                    self.schema.clone(),
                    Rc::clone(&self.resolver),
                ))
            })
            .collect();
        Ok(children)
    }

    async fn implicit_root(
        &self,
        tiling: ImplicitTiling,
        this: &Rc<TraversedTile>,
    ) -> Tiles3dResult<Vec<TraversedTile>> {
        if tiling.available_levels == 0 {
            return Ok(Vec::new());
        }
        let root = tiling.root_coordinates();
        let subtree = SubtreeInfo::resolve(
            &tiling,
            self.schema.as_deref(),
            self.resolver.as_ref(),
            &root,
        )
        .await?;
        if !subtree.tile_availability().is_available(0)? {
            log::debug!("Implicit root at {} is not available", self.path);
            return Ok(Vec::new());
        }
        let context = Rc::new(ImplicitContext {
            root: Rc::clone(&self.tile),
            tiling,
            schema: self.schema.clone(),
            resolver: Rc::clone(&self.resolver),
            root_path: self.path.clone(),
            root_level: self.level,
        });
        let tile = ImplicitTraversedTile::subtree_root(context, Arc::new(subtree), root, Rc::downgrade(this));
        Ok(vec![TraversedTile::Implicit(tile)])
    }
}
