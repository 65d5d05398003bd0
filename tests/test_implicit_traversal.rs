// tests/test_implicit_traversal.rs
// Traversal of implicit quadtrees backed by JSON and binary subtree files

mod common;

use std::rc::Rc;

use common::*;
use serde_json::json;
use tiles3d_traversal::io::MemoryResourceResolver;
use tiles3d_traversal::{
    Tiles3dError, TilesetTraverser, Tileset, TreeCoordinates, TraversedTile,
};

fn tileset(value: serde_json::Value) -> Tileset {
    serde_json::from_value(value).unwrap()
}

/// Quadtree with subtreeLevels 2 and availableLevels 4, all subtrees present
fn full_quadtree_resolver() -> MemoryResourceResolver {
    let mut resolver = MemoryResourceResolver::new();
    resolver.insert("subtrees/0/0/0.json", fully_available_subtree());
    for x in 0..4 {
        for y in 0..4 {
            resolver.insert(&format!("subtrees/2/{x}/{y}.json"), fully_available_subtree());
        }
    }
    resolver
}

#[tokio::test]
async fn test_full_quadtree_visits_every_tile() {
    let tileset = tileset(implicit_quadtree_tileset(2, 4, "subtrees/{level}/{x}/{y}.json"));
    let traverser = TilesetTraverser::new(Rc::new(full_quadtree_resolver()));

    let mut per_level = vec![0usize; 5];
    let mut subtree_roots = 0;
    let stats = traverser
        .traverse(&tileset, |tile| {
            per_level[tile.level() as usize] += 1;
            if tile.subtree_uri().is_some() {
                subtree_roots += 1;
            }
            true
        })
        .await
        .unwrap();

    let implicit: usize = (0..4).map(quadtree_level_size).sum();
    assert_eq!(stats.visited, 1 + implicit);
    assert_eq!(stats.explicit, 1);
    assert_eq!(stats.implicit, implicit);
    assert_eq!(stats.max_level, 4);
    assert_eq!(per_level, vec![1, 1, 4, 16, 64]);
    assert_eq!(subtree_roots, 1 + 16);
}

#[tokio::test]
async fn test_single_subtree_quadtree_visits_every_level() {
    let resolver = MemoryResourceResolver::new().with_entry("subtrees/0/0/0.json", fully_available_subtree());
    let tileset = tileset(implicit_quadtree_tileset(3, 3, "subtrees/{level}/{x}/{y}.json"));

    let stats = TilesetTraverser::new(Rc::new(resolver))
        .traverse(&tileset, |_| true)
        .await
        .unwrap();
    assert_eq!(stats.visited, 1 + 1 + 4 + 16);
    assert_eq!(stats.implicit, 21);
    assert_eq!(stats.max_level, 3);
}

#[tokio::test]
async fn test_octree_with_one_level_subtrees() {
    // Every tile is the root of its own subtree
    let mut resolver = MemoryResourceResolver::new();
    for level in 0..3u32 {
        let dim = 1u32 << level;
        for x in 0..dim {
            for y in 0..dim {
                for z in 0..dim {
                    resolver.insert(
                        &format!("subtrees/{level}/{x}/{y}/{z}.json"),
                        fully_available_subtree(),
                    );
                }
            }
        }
    }
    let tileset = tileset(implicit_octree_tileset(1, 3, "subtrees/{level}/{x}/{y}/{z}.json"));

    let mut found = None;
    let mut subtree_roots = 0;
    let stats = TilesetTraverser::new(Rc::new(resolver))
        .traverse(&tileset, |tile| {
            if tile.subtree_uri().is_some() {
                subtree_roots += 1;
            }
            if tile.coordinates() == Some(&TreeCoordinates::octree(2, 3, 1, 2)) {
                found = Some(tile.as_raw_tile().unwrap());
            }
            true
        })
        .await
        .unwrap();

    let implicit: usize = (0..3).map(octree_level_size).sum();
    assert_eq!(implicit, 73);
    assert_eq!(stats.visited, 1 + implicit);
    assert_eq!(stats.max_level, 3);
    assert_eq!(subtree_roots, implicit);

    let tile = found.unwrap();
    assert_eq!(tile.content_list()[0].uri, "c/2/3/1/2.glb");
    assert_eq!(
        tile.bounding_volume.bounding_box,
        Some([6.0, -2.0, 2.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0])
    );
}

#[tokio::test]
async fn test_implicit_tiles_have_derived_properties() {
    let tileset = tileset(implicit_quadtree_tileset(2, 4, "subtrees/{level}/{x}/{y}.json"));
    let traverser = TilesetTraverser::new(Rc::new(full_quadtree_resolver()));

    let mut found = None;
    traverser
        .traverse(&tileset, |tile| {
            if tile.coordinates() == Some(&TreeCoordinates::quadtree(3, 5, 2)) {
                found = Some((
                    tile.path().to_string(),
                    tile.as_raw_tile().unwrap(),
                    tile.parent().and_then(|p| p.coordinates().copied()),
                ));
            }
            true
        })
        .await
        .unwrap();

    let (path, tile, parent) = found.unwrap();
    assert_eq!(path, "/root/[3-5-2]");
    assert_eq!(parent, Some(TreeCoordinates::quadtree(2, 2, 1)));
    assert_eq!(tile.geometric_error, 8.0);
    assert_eq!(tile.content_list()[0].uri, "content/3/5/2.glb");
    // 8 tiles per axis of size 16, the sixth along x and third along y
    let bounding_box = tile.bounding_volume.bounding_box.unwrap();
    assert_eq!(&bounding_box[..6], &[24.0, -24.0, 0.0, 8.0, 0.0, 0.0]);
    assert_eq!(&bounding_box[6..], &[0.0, 8.0, 0.0, 0.0, 0.0, 8.0]);
}

#[tokio::test]
async fn test_binary_subtree_bitstreams() {
    // Tiles 0, 1, 4, 5 and 8 are available, contents only on 5 and 8
    let binary = [0x33u8, 0x01, 0x00, 0, 0, 0, 0, 0, 0x20, 0x01, 0x00];
    let subtree = json!({
        "buffers": [{ "byteLength": 16 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 3 },
            { "buffer": 0, "byteOffset": 8, "byteLength": 3 }
        ],
        "tileAvailability": { "bitstream": 0, "availableCount": 5 },
        "contentAvailability": [{ "bitstream": 1, "availableCount": 2 }],
        "childSubtreeAvailability": { "constant": 0 }
    });
    let resolver = MemoryResourceResolver::new()
        .with_entry("subtrees/0.0.0.subtree", binary_subtree(&subtree, &binary));
    let tileset = tileset(implicit_quadtree_tileset(3, 3, "subtrees/{level}.{x}.{y}.subtree"));

    let mut visited = Vec::new();
    let stats = TilesetTraverser::new(Rc::new(resolver))
        .traverse(&tileset, |tile| {
            let contents: Vec<String> = tile
                .final_contents()
                .unwrap()
                .into_iter()
                .map(|content| content.uri)
                .collect();
            visited.push((tile.path().to_string(), contents));
            true
        })
        .await
        .unwrap();

    assert_eq!(stats.visited, 6);
    let paths: Vec<&str> = visited.iter().map(|(path, _)| path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["/root", "/root/[0-0-0]", "/root/[1-0-0]", "/root/[1-1-1]", "/root/[2-0-0]", "/root/[2-1-1]"]
    );
    assert!(visited[1].1.is_empty());
    assert_eq!(visited[4].1, vec!["content/2/0/0.glb".to_string()]);
    assert_eq!(visited[5].1, vec!["content/2/1/1.glb".to_string()]);
}

#[tokio::test]
async fn test_tile_metadata_overrides_geometric_error() {
    // Tiles 0, 2 and 3 are available, with errors 10, 20 and 30
    let subtree = json!({
        "buffers": [{ "uri": "data:application/octet-stream;base64,DQoUHg==", "byteLength": 4 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 1 },
            { "buffer": 0, "byteOffset": 1, "byteLength": 3 }
        ],
        "propertyTables": [{ "class": "tile", "count": 3, "properties": { "error": { "values": 1 } } }],
        "tileAvailability": { "bitstream": 0 },
        "contentAvailability": [{ "constant": 0 }],
        "childSubtreeAvailability": { "constant": 0 },
        "tileMetadata": 0
    });
    let resolver = MemoryResourceResolver::new().with_entry("subtrees/0/0/0.json", subtree.to_string());
    let mut tileset_json = implicit_quadtree_tileset(2, 2, "subtrees/{level}/{x}/{y}.json");
    tileset_json["schema"] = json!({
        "id": "errors",
        "classes": { "tile": { "properties": {
            "error": { "type": "SCALAR", "componentType": "UINT8", "semantic": "TILE_GEOMETRIC_ERROR" }
        } } }
    });
    let tileset = tileset(tileset_json);

    let mut errors = Vec::new();
    TilesetTraverser::new(Rc::new(resolver))
        .traverse(&tileset, |tile| {
            if let TraversedTile::Implicit(implicit) = tile {
                errors.push((
                    implicit.coordinates().to_string(),
                    tile.as_raw_tile().unwrap().geometric_error,
                    tile.as_final_tile().unwrap().geometric_error,
                ));
            }
            true
        })
        .await
        .unwrap();

    assert_eq!(
        errors,
        vec![
            ("0-0-0".to_string(), 64.0, 10.0),
            ("1-1-0".to_string(), 32.0, 20.0),
            ("1-0-1".to_string(), 32.0, 30.0),
        ]
    );
}

#[tokio::test]
async fn test_content_metadata_overrides_content_uri() {
    // Contents on tiles 0, 2 and 3, named by a string property
    let subtree = json!({
        "buffers": [{ "uri": "data:application/octet-stream;base64,DXh5egAAAAABAAAAAgAAAAMAAAA=", "byteLength": 20 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 1 },
            { "buffer": 0, "byteOffset": 1, "byteLength": 3 },
            { "buffer": 0, "byteOffset": 4, "byteLength": 16 }
        ],
        "propertyTables": [{
            "class": "content",
            "count": 3,
            "properties": { "uri": { "values": 1, "stringOffsets": 2 } }
        }],
        "tileAvailability": { "constant": 1 },
        "contentAvailability": [{ "bitstream": 0, "availableCount": 3 }],
        "childSubtreeAvailability": { "constant": 0 },
        "contentMetadata": [0]
    });
    let resolver = MemoryResourceResolver::new().with_entry("subtrees/0/0/0.json", subtree.to_string());
    let mut tileset_json = implicit_quadtree_tileset(2, 2, "subtrees/{level}/{x}/{y}.json");
    tileset_json["schema"] = json!({
        "id": "contents",
        "classes": { "content": { "properties": {
            "uri": { "type": "STRING", "semantic": "CONTENT_URI" }
        } } }
    });
    let tileset = tileset(tileset_json);

    let mut uris = Vec::new();
    TilesetTraverser::new(Rc::new(resolver))
        .traverse(&tileset, |tile| {
            if let TraversedTile::Implicit(implicit) = tile {
                let raw: Vec<String> = tile.raw_contents().unwrap().into_iter().map(|c| c.uri).collect();
                let last: Vec<String> = tile.final_contents().unwrap().into_iter().map(|c| c.uri).collect();
                uris.push((implicit.coordinates().to_string(), raw, last));
            }
            true
        })
        .await
        .unwrap();

    let with_content: Vec<(&str, &str, &str)> = uris
        .iter()
        .filter(|(_, raw, _)| !raw.is_empty())
        .map(|(coordinates, raw, last)| (coordinates.as_str(), raw[0].as_str(), last[0].as_str()))
        .collect();
    assert_eq!(uris.len(), 5);
    assert_eq!(
        with_content,
        vec![
            ("0-0-0", "content/0/0/0.glb", "x"),
            ("1-1-0", "content/1/1/0.glb", "y"),
            ("1-0-1", "content/1/0/1.glb", "z"),
        ]
    );
}

#[tokio::test]
async fn test_depth_first_follows_morton_order() {
    let tileset = tileset(implicit_quadtree_tileset(2, 4, "subtrees/{level}/{x}/{y}.json"));
    let mut paths = Vec::new();
    let stats = TilesetTraverser::new(Rc::new(full_quadtree_resolver()))
        .with_depth_first(true)
        .traverse(&tileset, |tile| {
            paths.push(tile.path().to_string());
            true
        })
        .await
        .unwrap();

    assert_eq!(stats.visited, 86);
    assert_eq!(
        &paths[..9],
        &[
            "/root",
            "/root/[0-0-0]",
            "/root/[1-0-0]",
            "/root/[2-0-0]",
            "/root/[3-0-0]",
            "/root/[3-1-0]",
            "/root/[3-0-1]",
            "/root/[3-1-1]",
            "/root/[2-1-0]",
        ]
    );
}

#[tokio::test]
async fn test_pruned_tiles_do_not_resolve_child_subtrees() {
    let tileset = tileset(implicit_quadtree_tileset(2, 4, "subtrees/{level}/{x}/{y}.json"));
    // Only the root subtree exists
    let resolver = Rc::new(
        MemoryResourceResolver::new().with_entry("subtrees/0/0/0.json", fully_available_subtree()),
    );

    let stats = TilesetTraverser::new(resolver.clone())
        .traverse(&tileset, |tile| tile.level() < 2)
        .await
        .unwrap();
    assert_eq!(stats.visited, 6);

    let stats = TilesetTraverser::new(resolver.clone())
        .with_max_depth(Some(2))
        .traverse(&tileset, |_| true)
        .await
        .unwrap();
    assert_eq!(stats.visited, 6);
    assert_eq!(stats.max_level, 2);

    let err = TilesetTraverser::new(resolver)
        .traverse(&tileset, |_| true)
        .await
        .unwrap_err();
    assert!(err.is_resource_error());
    assert!(matches!(err, Tiles3dError::SubtreeResolution { .. }));
}

#[tokio::test]
async fn test_unavailable_implicit_root_has_no_tiles() {
    let subtree = json!({
        "tileAvailability": { "constant": 0 },
        "childSubtreeAvailability": { "constant": 0 }
    });
    let resolver = MemoryResourceResolver::new().with_entry("subtrees/0/0/0.json", subtree.to_string());
    let tileset = tileset(implicit_quadtree_tileset(2, 4, "subtrees/{level}/{x}/{y}.json"));

    let stats = TilesetTraverser::new(Rc::new(resolver))
        .traverse(&tileset, |_| true)
        .await
        .unwrap();
    assert_eq!(stats.visited, 1);
    assert_eq!(stats.implicit, 0);
}

#[tokio::test]
async fn test_invalid_subtree_aborts_traversal() {
    let resolver = MemoryResourceResolver::new().with_entry("subtrees/0/0/0.json", "not a subtree");
    let tileset = tileset(implicit_quadtree_tileset(2, 4, "subtrees/{level}/{x}/{y}.json"));

    let err = TilesetTraverser::new(Rc::new(resolver))
        .traverse(&tileset, |_| true)
        .await
        .unwrap_err();
    assert!(!err.is_resource_error());
}
