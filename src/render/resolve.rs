//! Depth resolver: group a pixel's contributions into surface layers.
//!
//! After sorting by depth, contributions are merged front to back into a layer
//! while they lie within `surface_thickness` of the layer's nearest depth. The
//! next contribution beyond that band starts a new layer. Only the nearest
//! layer is visible; farther layers are occluded.

use crate::render::accum::AccumulationCell;
use nalgebra::Vector3;

/// Sums over the contributions of one surface layer.
///
/// Sums are kept in f64 so dense overlaps don't lose the small tails of
/// distant kernels.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub min_depth: f32,
    pub max_depth: f32,
    pub count: usize,
    pub weight: f64,
    pub coverage: f64,
    pub weighted_color: Vector3<f64>,
}

impl Layer {
    fn start(depth: f32) -> Self {
        Self {
            min_depth: depth,
            max_depth: depth,
            count: 0,
            weight: 0.0,
            coverage: 0.0,
            weighted_color: Vector3::zeros(),
        }
    }

    /// Whether a contribution at `depth` (≥ min_depth) belongs to this layer.
    fn accepts(&self, depth: f32, thickness: f32) -> bool {
        depth - self.min_depth <= thickness
    }
}

/// Split a cell into depth layers, nearest first.
///
/// Sorts the cell in place.
pub fn resolve_layers(cell: &mut AccumulationCell, thickness: f32) -> Vec<Layer> {
    cell.sort_by_depth();

    let mut layers: Vec<Layer> = Vec::new();
    for c in cell.as_slice() {
        let needs_new = match layers.last() {
            Some(layer) => !layer.accepts(c.depth, thickness),
            None => true,
        };
        if needs_new {
            layers.push(Layer::start(c.depth));
        }

        if let Some(layer) = layers.last_mut() {
            layer.max_depth = c.depth;
            layer.count += 1;
            layer.weight += c.weight as f64;
            layer.coverage += c.coverage as f64;
            layer.weighted_color += c.weighted_color.cast::<f64>();
        }
    }
    layers
}

/// The visible (nearest) layer of a cell, or None if nothing reached the pixel.
pub fn nearest_layer(cell: &mut AccumulationCell, thickness: f32) -> Option<Layer> {
    resolve_layers(cell, thickness).into_iter().next()
}
