//! Tileset traversal over a work queue

use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::traversed_tile::TraversedTile;
use crate::error::{Tiles3dError, Tiles3dResult};
use crate::io::{uri_directory, ContentDataType, ContentTypeDetector, MagicContentTypeDetector, ResourceResolver};
use crate::tiles3d::Tileset;

/// Number of bytes read from content to decide whether it is a tileset
const SNIFF_BYTES: usize = 64;

/// Traversal configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TraversalOptions {
    /// Visit the most recently discovered tiles first
    pub depth_first: bool,
    /// Continue into tilesets referenced by the contents of leaf tiles
    pub traverse_external_tilesets: bool,
    /// Do not descend below this level
    pub max_depth: Option<u32>,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            depth_first: false,
            traverse_external_tilesets: true,
            max_depth: None,
        }
    }
}

/// Counters collected while traversing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Tiles passed to the visitor
    pub visited: usize,
    pub explicit: usize,
    pub implicit: usize,
    /// External tilesets whose roots were queued
    pub external_tilesets: usize,
    /// Deepest level visited
    pub max_level: u32,
}

impl TraversalStats {
    fn record(&mut self, tile: &TraversedTile) {
        self.visited += 1;
        match tile {
            TraversedTile::Explicit(_) => self.explicit += 1,
            TraversedTile::Implicit(_) => self.implicit += 1,
        }
        self.max_level = self.max_level.max(tile.level());
    }
}

/// Strong references to the ancestors of queued tiles
#[derive(Debug)]
struct Ancestry {
    _tile: Rc<TraversedTile>,
    _parent: Option<Rc<Ancestry>>,
}

#[derive(Debug)]
struct QueueEntry {
    tile: Rc<TraversedTile>,
    ancestry: Option<Rc<Ancestry>>,
}

/// Walks explicit, implicit and external tiles of a tileset
#[derive(Debug, Clone)]
pub struct TilesetTraverser {
    resolver: Rc<dyn ResourceResolver>,
    detector: Rc<dyn ContentTypeDetector>,
    options: TraversalOptions,
}

impl TilesetTraverser {
    /// Create a traverser resolving URIs relative to the tileset's location
    pub fn new(resolver: Rc<dyn ResourceResolver>) -> Self {
        Self {
            resolver,
            detector: Rc::new(MagicContentTypeDetector),
            options: TraversalOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TraversalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_depth_first(mut self, depth_first: bool) -> Self {
        self.options.depth_first = depth_first;
        self
    }

    pub fn with_traverse_external_tilesets(mut self, enabled: bool) -> Self {
        self.options.traverse_external_tilesets = enabled;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<u32>) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    pub fn with_content_type_detector(mut self, detector: Rc<dyn ContentTypeDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    /// Traverse `tileset`, calling `visitor` for every tile. The visitor
    /// returns whether to descend into the children of the tile.
    pub async fn traverse<F>(&self, tileset: &Tileset, visitor: F) -> Tiles3dResult<TraversalStats>
    where
        F: FnMut(&TraversedTile) -> bool,
    {
        self.run(tileset, Rc::clone(&self.resolver), visitor).await
    }

    /// Load the tileset at `uri` through the resolver and traverse it
    pub async fn traverse_uri<F>(&self, uri: &str, visitor: F) -> Tiles3dResult<TraversalStats>
    where
        F: FnMut(&TraversedTile) -> bool,
    {
        let data = self
            .resolver
            .resolve_data(uri)
            .await
            .ok_or_else(|| Tiles3dError::not_found(self.resolver.resolve_uri(uri)))?;
        let tileset = Tileset::from_slice(&data)?;
        let resolver = self.resolver.derive(uri_directory(uri));
        self.run(&tileset, resolver, visitor).await
    }

    async fn run<F>(
        &self,
        tileset: &Tileset,
        resolver: Rc<dyn ResourceResolver>,
        mut visitor: F,
    ) -> Tiles3dResult<TraversalStats>
    where
        F: FnMut(&TraversedTile) -> bool,
    {
        let schema = tileset.resolve_schema(resolver.as_ref()).await?.map(Rc::new);
        let root = TraversedTile::explicit_root(Rc::clone(&tileset.root), schema, resolver);

        let mut stats = TraversalStats::default();
        let mut queue = VecDeque::new();
        queue.push_back(QueueEntry {
            tile: Rc::new(root),
            ancestry: None,
        });

        loop {
            let entry = if self.options.depth_first {
                queue.pop_back()
            } else {
                queue.pop_front()
            };
            let Some(QueueEntry { tile, ancestry }) = entry else {
                break;
            };

            stats.record(&tile);
            if !visitor(&tile) {
                continue;
            }
            if self.options.max_depth.is_some_and(|max| tile.level() >= max) {
                continue;
            }

            let mut children = Rc::clone(&tile).children().await?;
            if children.is_empty() && self.options.traverse_external_tilesets {
                children = self.external_tileset_roots(&tile).await;
                stats.external_tilesets += children.len();
            }
            if children.is_empty() {
                continue;
            }

            let ancestry = Some(Rc::new(Ancestry {
                _tile: tile,
                _parent: ancestry,
            }));
            let entries = children.into_iter().map(|child| QueueEntry {
                tile: child,
                ancestry: ancestry.clone(),
            });
            if self.options.depth_first {
                // Reversed, so that the first child is popped first
                let entries: Vec<_> = entries.collect();
                queue.extend(entries.into_iter().rev());
            } else {
                queue.extend(entries);
            }
        }
        Ok(stats)
    }

    /// Roots of the external tilesets referenced by the contents of `tile`.
    /// Failures are logged and skipped.
    async fn external_tileset_roots(&self, tile: &Rc<TraversedTile>) -> Vec<Rc<TraversedTile>> {
        let contents = match tile.raw_contents() {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("Skipping contents of {}: {e}", tile.path());
                return Vec::new();
            }
        };
        let mut roots = Vec::new();
        for content in contents {
            match self.external_tileset_root(tile, &content.uri).await {
                Ok(Some(root)) => roots.push(root),
                Ok(None) => {}
                Err(e) => log::warn!(
                    "Skipping external tileset {} of {}: {e}",
                    tile.resolver().resolve_uri(&content.uri),
                    tile.path()
                ),
            }
        }
        roots
    }

    async fn external_tileset_root(
        &self,
        tile: &Rc<TraversedTile>,
        uri: &str,
    ) -> Tiles3dResult<Option<Rc<TraversedTile>>> {
        let resolver = tile.resolver();
        let head = resolver
            .resolve_data_partial(uri, SNIFF_BYTES)
            .await
            .ok_or_else(|| Tiles3dError::not_found(resolver.resolve_uri(uri)))?;
        let kind = self.detector.detect(uri, &head);
        if kind.is_package() {
            log::warn!(
                "Skipping {kind} package {}: packages are not traversed",
                resolver.resolve_uri(uri)
            );
            return Ok(None);
        }
        if !kind.may_be_tileset() {
            return Ok(None);
        }

        let data = resolver
            .resolve_data(uri)
            .await
            .ok_or_else(|| Tiles3dError::not_found(resolver.resolve_uri(uri)))?;
        if self.detector.detect(uri, &data) != ContentDataType::Tileset {
            return Ok(None);
        }
        let tileset = Tileset::from_slice(&data)?;
        let external_resolver = resolver.derive(uri_directory(uri));
        let schema = tileset
            .resolve_schema(external_resolver.as_ref())
            .await?
            .map(Rc::new);
        log::debug!("Entering external tileset {}", resolver.resolve_uri(uri));
        Ok(Some(Rc::new(TraversedTile::external_root(
            Rc::clone(&tileset.root),
            tile,
            uri,
            schema,
            external_resolver,
        ))))
    }
}
