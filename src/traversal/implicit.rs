//! Traversed tiles synthesized from subtree availability

use std::rc::{Rc, Weak};
use std::sync::Arc;

use super::traversed_tile::TraversedTile;
use crate::error::{Tiles3dError, Tiles3dResult};
use crate::implicit::{
    derive_bounding_volume, derive_geometric_error, ImplicitTiling, SubtreeInfo, TreeCoordinates,
};
use crate::io::ResourceResolver;
use crate::metadata::{apply_content_semantics, apply_tile_semantics, Schema};
use crate::tiles3d::{Tile, TileContent};

/// What all implicit tiles below one implicit tileset root share
#[derive(Debug)]
pub(crate) struct ImplicitContext {
    /// The document tile declaring the implicit tiling
    pub(crate) root: Rc<Tile>,
    pub(crate) tiling: ImplicitTiling,
    pub(crate) schema: Option<Rc<Schema>>,
    pub(crate) resolver: Rc<dyn ResourceResolver>,
    pub(crate) root_path: String,
    /// Traversal level of the document tile
    pub(crate) root_level: u32,
}

#[derive(Debug)]
pub struct ImplicitTraversedTile {
    context: Rc<ImplicitContext>,
    subtree: Arc<SubtreeInfo>,
    /// Relative to the implicit root
    coordinates: TreeCoordinates,
    /// Global coordinates of the root of `subtree`
    subtree_root: TreeCoordinates,
    /// Relative to `subtree_root`
    local: TreeCoordinates,
    parent: Weak<TraversedTile>,
    path: String,
}

impl ImplicitTraversedTile {
    /// The root tile of a freshly resolved subtree
    pub(crate) fn subtree_root(
        context: Rc<ImplicitContext>,
        subtree: Arc<SubtreeInfo>,
        coordinates: TreeCoordinates,
        parent: Weak<TraversedTile>,
    ) -> Self {
        Self::new(context, subtree, coordinates, coordinates, coordinates.tree_root(), parent)
    }

    fn new(
        context: Rc<ImplicitContext>,
        subtree: Arc<SubtreeInfo>,
        coordinates: TreeCoordinates,
        subtree_root: TreeCoordinates,
        local: TreeCoordinates,
        parent: Weak<TraversedTile>,
    ) -> Self {
        let path = format!("{}/[{}]", context.root_path, coordinates);
        Self {
            context,
            subtree,
            coordinates,
            subtree_root,
            local,
            parent,
            path,
        }
    }

    pub fn coordinates(&self) -> &TreeCoordinates {
        &self.coordinates
    }

    pub fn subtree_root_coordinates(&self) -> &TreeCoordinates {
        &self.subtree_root
    }

    pub fn local_coordinates(&self) -> &TreeCoordinates {
        &self.local
    }

    pub fn subtree(&self) -> &Arc<SubtreeInfo> {
        &self.subtree
    }

    pub fn level(&self) -> u32 {
        self.context.root_level + 1 + self.coordinates.level()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(super) fn parent(&self) -> &Weak<TraversedTile> {
        &self.parent
    }

    pub fn resolver(&self) -> &Rc<dyn ResourceResolver> {
        &self.context.resolver
    }

    /// URI of the subtree file, for tiles that are the root of a subtree
    pub fn subtree_uri(&self) -> Option<String> {
        if self.local.level() != 0 {
            return None;
        }
        self.context.tiling.subtree_uri(&self.coordinates).ok()
    }

    fn local_index(&self) -> u64 {
        self.local.to_index()
    }

    pub fn as_raw_tile(&self) -> Tiles3dResult<Tile> {
        let root = &self.context.root;
        let mut tile = Tile {
            bounding_volume: derive_bounding_volume(&root.bounding_volume, &self.coordinates)?,
            geometric_error: derive_geometric_error(root.geometric_error, self.coordinates.level()),
            refine: root.refine,
            // Keeps the root's choice between `content` and `contents`
            contents: root.contents.as_ref().map(|_| Vec::new()),
            ..Default::default()
        };
        tile.set_content_list(self.raw_contents()?);
        Ok(tile)
    }

    /// Contents with their content set index
    fn indexed_raw_contents(&self) -> Tiles3dResult<Vec<(usize, TileContent)>> {
        let templates = self.context.root.content_list();
        let index = self.local_index();
        let mut contents = Vec::new();
        for (content_set, availability) in self.subtree.content_availability().iter().enumerate() {
            if !availability.is_available(index)? {
                continue;
            }
            let template = templates.get(content_set).ok_or_else(|| {
                Tiles3dError::implicit_tiling(format!(
                    "content {content_set} of {} is available, but the implicit root has no content template for it",
                    self.coordinates
                ))
            })?;
            let uri = self.context.tiling.substitute(&template.uri, &self.coordinates)?;
            contents.push((
                content_set,
                TileContent {
                    uri,
                    group: template.group,
                    ..Default::default()
                },
            ));
        }
        Ok(contents)
    }

    pub fn raw_contents(&self) -> Tiles3dResult<Vec<TileContent>> {
        Ok(self
            .indexed_raw_contents()?
            .into_iter()
            .map(|(_, content)| content)
            .collect())
    }

    pub fn final_contents(&self) -> Tiles3dResult<Vec<TileContent>> {
        let contents = self.indexed_raw_contents()?;
        let Some(metadata) = self.subtree.metadata() else {
            return Ok(contents.into_iter().map(|(_, content)| content).collect());
        };
        let index = self.local_index();
        let mut result = Vec::with_capacity(contents.len());
        for (content_set, mut content) in contents {
            if let Some(table) = metadata.content_metadata(content_set) {
                if let Some(entity) = table.entity(index)? {
                    apply_content_semantics(&mut content, &entity)?;
                }
            }
            result.push(content);
        }
        Ok(result)
    }

    pub fn as_final_tile(&self) -> Tiles3dResult<Tile> {
        let mut tile = self.as_raw_tile()?;
        if let Some(table) = self.subtree.metadata().and_then(|m| m.tile_metadata()) {
            if let Some(entity) = table.entity(self.local_index())? {
                apply_tile_semantics(&mut tile, &entity)?;
            }
        }
        tile.set_content_list(self.final_contents()?);
        Ok(tile)
    }

    /// Available children. Tiles on the last level of a subtree have their
    /// children in child subtrees, which are resolved here.
    pub(super) async fn children(&self, this: &Rc<TraversedTile>) -> Tiles3dResult<Vec<TraversedTile>> {
        let tiling = &self.context.tiling;
        let global_children = self.coordinates.children();
        let local_children = self.local.children();
        let crossing = self.local.level() + 1 == tiling.subtree_levels;

        let mut children = Vec::new();
        for (global, local) in global_children.into_iter().zip(local_children) {
            if global.level() >= tiling.available_levels {
                continue;
            }
            if crossing {
                let available = self
                    .subtree
                    .child_subtree_availability()
                    .is_available(local.to_index_in_level())?;
                if !available {
                    continue;
                }
                let subtree = SubtreeInfo::resolve(
                    tiling,
                    self.context.schema.as_deref(),
                    self.context.resolver.as_ref(),
                    &global,
                )
                .await?;
                children.push(TraversedTile::Implicit(Self::subtree_root(
                    Rc::clone(&self.context),
                    Arc::new(subtree),
                    global,
                    Rc::downgrade(this),
                )));
            } else {
                if !self.subtree.tile_availability().is_available(local.to_index())? {
                    continue;
                }
                children.push(TraversedTile::Implicit(Self::new(
                    Rc::clone(&self.context),
                    Arc::clone(&self.subtree),
                    global,
                    self.subtree_root,
                    local,
                    Rc::downgrade(this),
                )));
            }
        }
        Ok(children)
    }
}
