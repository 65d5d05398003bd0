// tests/common/mod.rs
// Fixture builders shared by the traversal integration tests

#![allow(dead_code)]

use serde_json::{json, Value};
use tiles3d_traversal::implicit::SUBTREE_MAGIC;

/// Pad `data` to a multiple of 8 bytes with `fill`
fn pad8(mut data: Vec<u8>, fill: u8) -> Vec<u8> {
    while data.len() % 8 != 0 {
        data.push(fill);
    }
    data
}

/// Binary `.subtree` file from its JSON part and binary chunk
pub fn binary_subtree(json: &Value, binary: &[u8]) -> Vec<u8> {
    let json = pad8(json.to_string().into_bytes(), b' ');
    let binary = pad8(binary.to_vec(), 0);
    let mut data = Vec::with_capacity(24 + json.len() + binary.len());
    data.extend_from_slice(&SUBTREE_MAGIC);
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&(json.len() as u64).to_le_bytes());
    data.extend_from_slice(&(binary.len() as u64).to_le_bytes());
    data.extend_from_slice(&json);
    data.extend_from_slice(&binary);
    data
}

/// A JSON subtree where every tile, content and child subtree is available
pub fn fully_available_subtree() -> String {
    json!({
        "tileAvailability": { "constant": 1 },
        "contentAvailability": [{ "constant": 1 }],
        "childSubtreeAvailability": { "constant": 1 }
    })
    .to_string()
}

/// A tileset whose root is an implicit quadtree root
pub fn implicit_quadtree_tileset(subtree_levels: u32, available_levels: u32, subtrees_uri: &str) -> Value {
    json!({
        "asset": { "version": "1.1" },
        "geometricError": 128,
        "root": {
            "boundingVolume": { "box": [0, 0, 0, 64, 0, 0, 0, 64, 0, 0, 0, 8] },
            "geometricError": 64,
            "refine": "REPLACE",
            "content": { "uri": "content/{level}/{x}/{y}.glb" },
            "implicitTiling": {
                "subdivisionScheme": "QUADTREE",
                "subtreeLevels": subtree_levels,
                "availableLevels": available_levels,
                "subtrees": { "uri": subtrees_uri }
            }
        }
    })
}

/// A tileset whose root is an implicit octree root
pub fn implicit_octree_tileset(subtree_levels: u32, available_levels: u32, subtrees_uri: &str) -> Value {
    json!({
        "asset": { "version": "1.1" },
        "geometricError": 32,
        "root": {
            "boundingVolume": { "box": [0, 0, 0, 8, 0, 0, 0, 8, 0, 0, 0, 8] },
            "geometricError": 16,
            "refine": "ADD",
            "content": { "uri": "c/{level}/{x}/{y}/{z}.glb" },
            "implicitTiling": {
                "subdivisionScheme": "OCTREE",
                "subtreeLevels": subtree_levels,
                "availableLevels": available_levels,
                "subtrees": { "uri": subtrees_uri }
            }
        }
    })
}

/// Number of tiles on `level` of a quadtree
pub fn quadtree_level_size(level: u32) -> usize {
    1 << (2 * level)
}

/// Number of tiles on `level` of an octree
pub fn octree_level_size(level: u32) -> usize {
    1 << (3 * level)
}
