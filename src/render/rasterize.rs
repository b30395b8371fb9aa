//! Rasterizer: footprints → per-pixel accumulation.
//!
//! The image is cut into square tiles. Every footprint is routed to each tile
//! its bounding box overlaps, and every tile is accumulated by exactly one
//! rayon task, so no pixel is ever written from two threads. Footprints are
//! routed in point order, which makes the contents of every cell independent
//! of thread scheduling.

use crate::render::accum::{Contribution, TileBuffer};
use crate::render::project::{Footprint, PixelRect};
use rayon::prelude::*;

/// Partition of a `width × height` image into `tile_size` squares (edge tiles
/// may be smaller).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        Self {
            width,
            height,
            tile_size,
            tiles_x: width.div_ceil(tile_size),
            tiles_y: height.div_ceil(tile_size),
        }
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_x as usize * self.tiles_y as usize
    }

    /// Pixel rectangle of tile `index` (row-major over tiles).
    pub fn tile_rect(&self, index: usize) -> PixelRect {
        let tx = index as u32 % self.tiles_x;
        let ty = index as u32 / self.tiles_x;
        let min_x = tx * self.tile_size;
        let min_y = ty * self.tile_size;
        PixelRect {
            min_x,
            min_y,
            max_x: (min_x + self.tile_size).min(self.width) - 1,
            max_y: (min_y + self.tile_size).min(self.height) - 1,
        }
    }

    /// Indices of all tiles overlapping `rect` (which lies inside the image).
    pub fn tiles_overlapping(&self, rect: &PixelRect) -> impl Iterator<Item = usize> + '_ {
        let tx0 = rect.min_x / self.tile_size;
        let tx1 = rect.max_x / self.tile_size;
        let ty0 = rect.min_y / self.tile_size;
        let ty1 = rect.max_y / self.tile_size;
        (ty0..=ty1).flat_map(move |ty| {
            (tx0..=tx1).map(move |tx| (ty * self.tiles_x + tx) as usize)
        })
    }
}

/// Evaluate a footprint at pixel (x, y). None when the falloff is below `cutoff`.
pub fn evaluate(footprint: &Footprint, x: u32, y: u32, cutoff: f32) -> Option<Contribution> {
    let falloff = footprint.falloff_at(x, y);
    if !(falloff >= cutoff) {
        return None;
    }
    let weight = footprint.normalization * falloff;
    Some(Contribution {
        depth: footprint.depth,
        weight,
        coverage: falloff,
        weighted_color: footprint.color * weight,
    })
}

/// Route footprint indices to tiles, preserving footprint order within each bin.
pub fn bin_footprints(grid: &TileGrid, footprints: &[Footprint]) -> Vec<Vec<u32>> {
    let mut bins = vec![Vec::new(); grid.tile_count()];
    for (i, footprint) in footprints.iter().enumerate() {
        for tile in grid.tiles_overlapping(&footprint.bounds) {
            bins[tile].push(i as u32);
        }
    }
    bins
}

/// Accumulate the footprints listed in `indices` into a fresh buffer for `rect`.
pub fn rasterize_tile(
    rect: PixelRect,
    footprints: &[Footprint],
    indices: &[u32],
    cutoff: f32,
) -> TileBuffer {
    let mut tile = TileBuffer::new(rect);

    for &i in indices {
        let footprint = &footprints[i as usize];
        let Some(area) = footprint.bounds.intersect(&rect) else {
            continue;
        };

        for y in area.min_y..=area.max_y {
            for x in area.min_x..=area.max_x {
                if let Some(contribution) = evaluate(footprint, x, y, cutoff) {
                    tile.cell_mut(x, y).push(contribution);
                }
            }
        }
    }

    tile
}

/// Accumulate every tile in parallel and pass each finished buffer to `finish`.
///
/// A tile owns every contribution to its pixels, so once `rasterize_tile`
/// returns, each of its cells is complete: `finish` runs after that per-tile
/// barrier on the same worker and the buffer is dropped right after. Results
/// come back in tile order.
pub fn render_tiles<T, F>(grid: &TileGrid, footprints: &[Footprint], cutoff: f32, finish: F) -> Vec<T>
where
    T: Send,
    F: Fn(TileBuffer) -> T + Sync,
{
    let bins = bin_footprints(grid, footprints);

    bins.par_iter()
        .enumerate()
        .map(|(index, indices)| {
            finish(rasterize_tile(grid.tile_rect(index), footprints, indices, cutoff))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix2, Vector2, Vector3};

    fn footprint(center: Vector2<f32>, variance: f32, bounds: PixelRect) -> Footprint {
        Footprint {
            center,
            covariance: Matrix2::identity() * variance,
            conic: Matrix2::identity() / variance,
            normalization: 1.0 / (2.0 * std::f32::consts::PI * variance),
            depth: 1.0,
            extent: Vector2::repeat(3.0 * variance.sqrt()),
            bounds,
            color: Vector3::new(1.0, 0.5, 0.0),
        }
    }

    #[test]
    fn test_tile_grid_covers_image_exactly() {
        let grid = TileGrid::new(40, 20, 16);
        assert_eq!((grid.tiles_x, grid.tiles_y), (3, 2));

        let total: usize = (0..grid.tile_count()).map(|i| grid.tile_rect(i).area()).sum();
        assert_eq!(total, 40 * 20);

        let last = grid.tile_rect(grid.tile_count() - 1);
        assert_eq!(last, PixelRect { min_x: 32, min_y: 16, max_x: 39, max_y: 19 });
    }

    #[test]
    fn test_tiles_overlapping() {
        let grid = TileGrid::new(64, 64, 16);
        let rect = PixelRect { min_x: 10, min_y: 20, max_x: 17, max_y: 40 };
        let tiles: Vec<usize> = grid.tiles_overlapping(&rect).collect();
        // Columns 0-1, rows 1-2.
        assert_eq!(tiles, vec![4, 5, 8, 9]);
    }

    #[test]
    fn test_evaluate_respects_cutoff() {
        let bounds = PixelRect { min_x: 0, min_y: 0, max_x: 9, max_y: 9 };
        let fp = footprint(Vector2::new(5.0, 5.0), 1.0, bounds);

        let peak = evaluate(&fp, 4, 4, 1e-2).unwrap();
        assert!(peak.coverage > 0.7);
        assert_eq!(peak.weighted_color, fp.color * peak.weight);

        assert!(evaluate(&fp, 9, 9, 1e-2).is_none());
    }

    #[test]
    fn test_render_tiles_finishes_each_tile_in_order() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let bounds = PixelRect { min_x: 0, min_y: 0, max_x: 5, max_y: 5 };
        let fps = vec![footprint(Vector2::new(3.0, 3.0), 1.0, bounds)];
        let grid = TileGrid::new(40, 20, 16);
        let calls = AtomicUsize::new(0);

        let summaries = render_tiles(&grid, &fps, 1e-2, |tile| {
            calls.fetch_add(1, Ordering::Relaxed);
            (tile.rect, tile.contribution_count())
        });

        assert_eq!(calls.load(Ordering::Relaxed), grid.tile_count());
        for (index, (rect, count)) in summaries.iter().enumerate() {
            assert_eq!(*rect, grid.tile_rect(index));
            assert_eq!(*count > 0, index == 0);
        }
    }

    #[test]
    fn test_split_footprint_matches_single_tile() {
        // A footprint straddling four tiles lands in the same pixels as on one big tile.
        let bounds = PixelRect { min_x: 10, min_y: 10, max_x: 21, max_y: 21 };
        let fps = vec![footprint(Vector2::new(16.0, 16.0), 4.0, bounds)];

        let tiled = render_tiles(&TileGrid::new(32, 32, 16), &fps, 1e-2, |tile| tile);
        let single = render_tiles(&TileGrid::new(32, 32, 32), &fps, 1e-2, |tile| tile);
        assert_eq!(tiled.len(), 4);
        assert_eq!(single.len(), 1);

        for y in 0..32 {
            for x in 0..32 {
                let tile = tiled.iter().find(|t| t.rect.contains(x, y)).unwrap();
                assert_eq!(tile.cell(x, y).as_slice(), single[0].cell(x, y).as_slice());
            }
        }
    }
}
