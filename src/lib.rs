//! Traversal of 3D Tiles tilesets.
//!
//! A [`TilesetTraverser`] walks the tiles of a tileset, including tiles
//! defined through implicit tiling (quadtrees and octrees backed by subtree
//! files) and tiles of external tilesets. Resources are loaded through a
//! [`ResourceResolver`], so the same traversal works on files, in-memory
//! data or any other source.
//!
//! ```no_run
//! use std::rc::Rc;
//! use tiles3d_traversal::{FileResourceResolver, TilesetTraverser};
//!
//! # async fn run() -> tiles3d_traversal::Tiles3dResult<()> {
//! let resolver = Rc::new(FileResourceResolver::new("data/city"));
//! let traverser = TilesetTraverser::new(resolver).with_depth_first(true);
//! let stats = traverser
//!     .traverse_uri("tileset.json", |tile| {
//!         println!("{} at level {}", tile.path(), tile.level());
//!         true
//!     })
//!     .await?;
//! println!("visited {} tiles", stats.visited);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod implicit;
pub mod io;
pub mod metadata;
pub mod tiles3d;
pub mod traversal;

pub use error::{Tiles3dError, Tiles3dResult};
pub use implicit::{ImplicitTiling, SubdivisionScheme, SubtreeInfo, TreeCoordinates};
pub use io::{FileResourceResolver, MemoryResourceResolver, ResourceResolver};
pub use metadata::{MetadataValue, Schema};
pub use tiles3d::{BoundingVolume, Tile, TileContent, TileRefine, Tileset};
pub use traversal::{TilesetTraverser, TraversalOptions, TraversalStats, TraversedTile};
