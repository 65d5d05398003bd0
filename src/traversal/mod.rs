//! Tileset traversal
//!
//! Explicit tiles come from the tileset document, implicit tiles are
//! synthesized from subtree availability while walking down. Both are
//! handed to the visitor as [`TraversedTile`]s.

mod explicit;
mod implicit;
mod traversed_tile;
mod traverser;

pub use explicit::ExplicitTraversedTile;
pub use implicit::ImplicitTraversedTile;
pub use traversed_tile::TraversedTile;
pub use traverser::{TilesetTraverser, TraversalOptions, TraversalStats};
