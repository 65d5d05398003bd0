//! 3D Tiles document model
//!
//! Plain serde structures for `tileset.json`: tiles, contents, bounding
//! volumes and the implicit tiling description of implicit tileset roots.

mod bounds;
mod tile;
mod tileset;

pub use bounds::BoundingVolume;
pub use tile::{ImplicitSubtrees, Tile, TileContent, TileImplicitTiling, TileRefine};
pub use tileset::{Tileset, TilesetAsset};
