//! Quadtree and octree node coordinates
//!
//! Children are enumerated in Morton order: bit 0 of the child index selects
//! `x`, bit 1 selects `y` and (octree only) bit 2 selects `z`. The same order
//! defines `to_index_in_level`, which interleaves the axis bits with `x` as
//! the least significant one.

use std::collections::VecDeque;
use std::fmt;

use crate::error::{Tiles3dError, Tiles3dResult};

/// Interleave the bits of two axis values (x in the low bit)
fn morton2(x: u32, y: u32) -> u64 {
    let mut index = 0u64;
    for bit in 0..32 {
        index |= (u64::from(x >> bit) & 1) << (2 * bit);
        index |= (u64::from(y >> bit) & 1) << (2 * bit + 1);
    }
    index
}

/// Interleave the bits of three axis values (x in the low bit)
fn morton3(x: u32, y: u32, z: u32) -> u64 {
    let mut index = 0u64;
    for bit in 0..21 {
        index |= (u64::from(x >> bit) & 1) << (3 * bit);
        index |= (u64::from(y >> bit) & 1) << (3 * bit + 1);
        index |= (u64::from(z >> bit) & 1) << (3 * bit + 2);
    }
    index
}

/// Quadtree node position: level and x/y in `[0, 2^level)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuadtreeCoordinates {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}

impl QuadtreeCoordinates {
    pub fn root() -> Self {
        Self { level: 0, x: 0, y: 0 }
    }

    /// Axis values are not checked against the level; offsets used with
    /// `globalize` may exceed `2^level`. See `is_within_level`.
    pub fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    /// Whether x and y are below `2^level`
    pub fn is_within_level(&self) -> bool {
        let size = 1u64 << self.level;
        u64::from(self.x) < size && u64::from(self.y) < size
    }

    /// Get child coordinates for the given Morton child index (0-3)
    pub fn child(&self, index: u8) -> Self {
        Self {
            level: self.level + 1,
            x: (self.x << 1) | u32::from(index & 1),
            y: (self.y << 1) | u32::from((index >> 1) & 1),
        }
    }

    pub fn children(&self) -> [Self; 4] {
        [self.child(0), self.child(1), self.child(2), self.child(3)]
    }

    pub fn parent(&self) -> Option<Self> {
        if self.level == 0 {
            return None;
        }
        Some(Self {
            level: self.level - 1,
            x: self.x >> 1,
            y: self.y >> 1,
        })
    }

    pub fn to_index_in_level(&self) -> u64 {
        morton2(self.x, self.y)
    }

    /// Breadth-first index relative to the root: (4^level - 1) / 3 + Morton index
    pub fn to_index(&self) -> u64 {
        let level_offset = ((1u64 << (2 * self.level)) - 1) / 3;
        level_offset + self.to_index_in_level()
    }

    /// Shift `local` (relative to `self`) into the coordinate frame of `self`'s root
    pub fn globalize(&self, local: &Self) -> Self {
        Self {
            level: self.level + local.level,
            x: (self.x << local.level) + local.x,
            y: (self.y << local.level) + local.y,
        }
    }
}

/// Octree node position: level and x/y/z in `[0, 2^level)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OctreeCoordinates {
    pub level: u32,
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl OctreeCoordinates {
    pub fn root() -> Self {
        Self {
            level: 0,
            x: 0,
            y: 0,
            z: 0,
        }
    }

    /// Axis values are not checked against the level, as for quadtrees
    pub fn new(level: u32, x: u32, y: u32, z: u32) -> Self {
        Self { level, x, y, z }
    }

    /// Whether x, y and z are below `2^level`
    pub fn is_within_level(&self) -> bool {
        u64::from(self.x.max(self.y).max(self.z)) < 1u64 << self.level
    }

    /// Get child coordinates for the given octant (0-7)
    pub fn child(&self, octant: u8) -> Self {
        Self {
            level: self.level + 1,
            x: (self.x << 1) | u32::from(octant & 1),
            y: (self.y << 1) | u32::from((octant >> 1) & 1),
            z: (self.z << 1) | u32::from((octant >> 2) & 1),
        }
    }

    pub fn children(&self) -> [Self; 8] {
        std::array::from_fn(|octant| self.child(octant as u8))
    }

    pub fn parent(&self) -> Option<Self> {
        if self.level == 0 {
            return None;
        }
        Some(Self {
            level: self.level - 1,
            x: self.x >> 1,
            y: self.y >> 1,
            z: self.z >> 1,
        })
    }

    pub fn to_index_in_level(&self) -> u64 {
        morton3(self.x, self.y, self.z)
    }

    /// Breadth-first index relative to the root: (8^level - 1) / 7 + Morton index
    pub fn to_index(&self) -> u64 {
        let level_offset = ((1u64 << (3 * self.level)) - 1) / 7;
        level_offset + self.to_index_in_level()
    }

    pub fn globalize(&self, local: &Self) -> Self {
        Self {
            level: self.level + local.level,
            x: (self.x << local.level) + local.x,
            y: (self.y << local.level) + local.y,
            z: (self.z << local.level) + local.z,
        }
    }
}

/// Coordinates of a node in either kind of tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeCoordinates {
    Quadtree(QuadtreeCoordinates),
    Octree(OctreeCoordinates),
}

impl TreeCoordinates {
    pub fn quadtree(level: u32, x: u32, y: u32) -> Self {
        Self::Quadtree(QuadtreeCoordinates::new(level, x, y))
    }

    pub fn octree(level: u32, x: u32, y: u32, z: u32) -> Self {
        Self::Octree(OctreeCoordinates::new(level, x, y, z))
    }

    pub fn level(&self) -> u32 {
        match self {
            Self::Quadtree(c) => c.level,
            Self::Octree(c) => c.level,
        }
    }

    /// The root coordinates of the same kind of tree
    pub fn tree_root(&self) -> Self {
        match self {
            Self::Quadtree(_) => Self::Quadtree(QuadtreeCoordinates::root()),
            Self::Octree(_) => Self::Octree(OctreeCoordinates::root()),
        }
    }

    /// The 4 or 8 children, in Morton order
    pub fn children(&self) -> Vec<Self> {
        match self {
            Self::Quadtree(c) => c.children().into_iter().map(Self::Quadtree).collect(),
            Self::Octree(c) => c.children().into_iter().map(Self::Octree).collect(),
        }
    }

    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Quadtree(c) => c.parent().map(Self::Quadtree),
            Self::Octree(c) => c.parent().map(Self::Octree),
        }
    }

    pub fn to_index(&self) -> u64 {
        match self {
            Self::Quadtree(c) => c.to_index(),
            Self::Octree(c) => c.to_index(),
        }
    }

    pub fn to_index_in_level(&self) -> u64 {
        match self {
            Self::Quadtree(c) => c.to_index_in_level(),
            Self::Octree(c) => c.to_index_in_level(),
        }
    }

    /// Whether the axis values address a node on this level
    pub fn is_within_level(&self) -> bool {
        match self {
            Self::Quadtree(c) => c.is_within_level(),
            Self::Octree(c) => c.is_within_level(),
        }
    }

    /// `[level, x, y]` or `[level, x, y, z]`
    pub fn to_array(&self) -> Vec<u32> {
        match self {
            Self::Quadtree(c) => vec![c.level, c.x, c.y],
            Self::Octree(c) => vec![c.level, c.x, c.y, c.z],
        }
    }

    /// Convert `local` coordinates, relative to `self` as a subtree root, into
    /// coordinates relative to the root of the whole tree.
    pub fn globalize(&self, local: &Self) -> Tiles3dResult<Self> {
        match (self, local) {
            (Self::Quadtree(root), Self::Quadtree(local)) => {
                Ok(Self::Quadtree(root.globalize(local)))
            }
            (Self::Octree(root), Self::Octree(local)) => Ok(Self::Octree(root.globalize(local))),
            _ => Err(Tiles3dError::implicit_tiling(format!(
                "cannot combine coordinates {self} and {local} of different tree kinds"
            ))),
        }
    }

    /// Iterate over this node and all of its descendants with a level below
    /// `end_level`, in level order.
    pub fn descendants(&self, end_level: u32) -> CoordinatesIterator {
        let mut queue = VecDeque::new();
        if self.level() < end_level {
            queue.push_back(*self);
        }
        CoordinatesIterator { queue, end_level }
    }
}

impl fmt::Display for TreeCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quadtree(c) => write!(f, "{}-{}-{}", c.level, c.x, c.y),
            Self::Octree(c) => write!(f, "{}-{}-{}-{}", c.level, c.x, c.y, c.z),
        }
    }
}

/// Level-order iterator over a coordinate and its descendants
#[derive(Debug, Clone)]
pub struct CoordinatesIterator {
    queue: VecDeque<TreeCoordinates>,
    end_level: u32,
}

impl Iterator for CoordinatesIterator {
    type Item = TreeCoordinates;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.queue.pop_front()?;
        if current.level() + 1 < self.end_level {
            self.queue.extend(current.children());
        }
        Some(current)
    }
}
