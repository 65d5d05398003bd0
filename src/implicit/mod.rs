//! Implicit tiling
//!
//! Coordinates of quadtree and octree nodes, subtree files with their
//! availability bitstreams, and the bounding volumes of implicit tiles.

mod availability;
mod binary;
mod bounds;
mod coordinates;
mod subtree;
mod subtree_info;
mod tiling;

pub use availability::{AvailabilityIndexing, AvailabilityInfo};
pub use binary::{resolve_buffer_views, BufferViewData};
pub use bounds::{derive_bounding_volume, derive_geometric_error};
pub use coordinates::{CoordinatesIterator, OctreeCoordinates, QuadtreeCoordinates, TreeCoordinates};
pub use subtree::{
    parse_subtree, Availability, Buffer, BufferView, Subtree, SubtreeHeader, SUBTREE_HEADER_LENGTH,
    SUBTREE_MAGIC,
};
pub use subtree_info::{IndexedPropertyTable, SubtreeInfo, SubtreeMetadataModel};
pub use tiling::{
    nodes_in_level, nodes_per_subtree, substitute_template_uri, ImplicitTiling, SubdivisionScheme,
};
