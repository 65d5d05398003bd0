//! Bounding volumes and geometric errors of implicit tiles
//!
//! Every implicit tile covers an equal share of the implicit root's volume:
//! at level `l` each subdivided axis is split into `2^l` slices and the tile
//! takes slice `x`, `y` (and `z` for octrees).

use std::f64::consts::PI;

use glam::DVec3;

use super::coordinates::TreeCoordinates;
use crate::error::{Tiles3dError, Tiles3dResult};
use crate::tiles3d::BoundingVolume;

/// Per-axis slice of a node: (index, number of slices); `None` keeps the axis
type Slices = [Option<(f64, f64)>; 3];

fn slices(coordinates: &TreeCoordinates) -> Slices {
    match coordinates {
        TreeCoordinates::Quadtree(c) => {
            let dim = f64::from(c.level).exp2();
            [Some((f64::from(c.x), dim)), Some((f64::from(c.y), dim)), None]
        }
        TreeCoordinates::Octree(c) => {
            let dim = f64::from(c.level).exp2();
            [
                Some((f64::from(c.x), dim)),
                Some((f64::from(c.y), dim)),
                Some((f64::from(c.z), dim)),
            ]
        }
    }
}

/// Shrink a box (center and half axes) to the given slices
fn subdivide_box(center: DVec3, axes: [DVec3; 3], slices: &Slices) -> (DVec3, [DVec3; 3]) {
    let mut new_center = center;
    let mut new_axes = axes;
    for (axis, slice) in new_axes.iter_mut().zip(slices) {
        if let Some((index, dim)) = *slice {
            new_center += *axis * ((2.0 * index + 1.0) / dim - 1.0);
            *axis /= dim;
        }
    }
    (new_center, new_axes)
}

fn subdivide_oriented_box(data: &[f64; 12], slices: &Slices) -> [f64; 12] {
    let center = DVec3::new(data[0], data[1], data[2]);
    let axes = [
        DVec3::new(data[3], data[4], data[5]),
        DVec3::new(data[6], data[7], data[8]),
        DVec3::new(data[9], data[10], data[11]),
    ];
    let (c, [u, v, w]) = subdivide_box(center, axes, slices);
    [c.x, c.y, c.z, u.x, u.y, u.z, v.x, v.y, v.z, w.x, w.y, w.z]
}

/// Regions subdivide longitude, latitude and (octree) height linearly.
/// Regions crossing the antimeridian have `east < west`.
fn subdivide_region(data: &[f64; 6], slices: &Slices) -> [f64; 6] {
    let [west, south, east, north, min_height, max_height] = *data;
    let mut result = *data;

    if let Some((x, dim)) = slices[0] {
        let width = if east < west { east + 2.0 * PI - west } else { east - west };
        let step = width / dim;
        let wrap = |lon: f64| if lon > PI { lon - 2.0 * PI } else { lon };
        result[0] = wrap(west + x * step);
        result[2] = wrap(west + (x + 1.0) * step);
    }
    if let Some((y, dim)) = slices[1] {
        let step = (north - south) / dim;
        result[1] = south + y * step;
        result[3] = south + (y + 1.0) * step;
    }
    if let Some((z, dim)) = slices[2] {
        let step = (max_height - min_height) / dim;
        result[4] = min_height + z * step;
        result[5] = min_height + (z + 1.0) * step;
    }
    result
}

/// Spheres subdivide their axis-aligned bounding box; the result encloses
/// the subdivided box.
fn subdivide_sphere(data: &[f64; 4], slices: &Slices) -> [f64; 4] {
    let center = DVec3::new(data[0], data[1], data[2]);
    let r = data[3];
    let axes = [DVec3::X * r, DVec3::Y * r, DVec3::Z * r];
    let (c, [u, v, w]) = subdivide_box(center, axes, slices);
    [c.x, c.y, c.z, (u + v + w).length()]
}

/// Bounding volume of the implicit tile at global `coordinates`, derived from
/// the implicit root's volume. Every box, region and sphere present in the
/// root volume is subdivided; a volume with none of them is an error.
pub fn derive_bounding_volume(
    root: &BoundingVolume,
    coordinates: &TreeCoordinates,
) -> Tiles3dResult<BoundingVolume> {
    if root.bounding_box.is_none() && root.region.is_none() && root.sphere.is_none() {
        return Err(Tiles3dError::implicit_tiling(format!(
            "cannot subdivide bounding volume with kinds {:?}",
            root.kinds()
        )));
    }
    let slices = slices(coordinates);
    Ok(BoundingVolume {
        bounding_box: root.bounding_box.as_ref().map(|b| subdivide_oriented_box(b, &slices)),
        region: root.region.as_ref().map(|r| subdivide_region(r, &slices)),
        sphere: root.sphere.as_ref().map(|s| subdivide_sphere(s, &slices)),
        extensions: None,
    })
}

/// Geometric error halves with every level
pub fn derive_geometric_error(root_geometric_error: f64, level: u32) -> f64 {
    root_geometric_error / f64::from(level).exp2()
}
