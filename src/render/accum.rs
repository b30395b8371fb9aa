//! Per-pixel accumulation storage.
//!
//! A cell keeps every contribution separately (rather than running sums) so the
//! depth resolver can split them into layers after accumulation finishes.
//! Most pixels see only a few splats, so a small number of contributions live
//! inline and the rest spill to the heap. Every pixel of a tile holds a cell
//! while the tile is being worked on, which keeps the inline part small.

use crate::render::project::PixelRect;
use nalgebra::Vector3;
use smallvec::SmallVec;

/// Contributions stored inline before a cell spills to the heap.
pub const INLINE_CONTRIBUTIONS: usize = 4;

/// One splat's contribution to one pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contribution {
    /// Camera-space depth of the splat
    pub depth: f32,

    /// Normalized kernel weight
    pub weight: f32,

    /// Unnormalized falloff in (0, 1], used for alpha coverage
    pub coverage: f32,

    /// weight × color
    pub weighted_color: Vector3<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct AccumulationCell {
    contributions: SmallVec<[Contribution; INLINE_CONTRIBUTIONS]>,
}

impl AccumulationCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, contribution: Contribution) {
        debug_assert!(contribution.weight >= 0.0 && contribution.coverage >= 0.0);
        self.contributions.push(contribution);
    }

    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    pub fn as_slice(&self) -> &[Contribution] {
        &self.contributions
    }

    /// Whether the contributions outgrew inline storage.
    pub fn spilled(&self) -> bool {
        self.contributions.spilled()
    }

    /// Stable sort by ascending depth. Equal depths keep insertion order.
    pub fn sort_by_depth(&mut self) {
        self.contributions
            .sort_by(|a, b| a.depth.total_cmp(&b.depth));
    }
}

/// Accumulation cells for one exclusively owned image tile.
#[derive(Clone, Debug)]
pub struct TileBuffer {
    pub rect: PixelRect,
    cells: Vec<AccumulationCell>,
}

impl TileBuffer {
    pub fn new(rect: PixelRect) -> Self {
        Self {
            rect,
            cells: vec![AccumulationCell::new(); rect.area()],
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(self.rect.contains(x, y));
        ((y - self.rect.min_y) * self.rect.width() + (x - self.rect.min_x)) as usize
    }

    /// Cell of image pixel (x, y), which must lie inside the tile.
    pub fn cell(&self, x: u32, y: u32) -> &AccumulationCell {
        &self.cells[self.index(x, y)]
    }

    pub fn cell_mut(&mut self, x: u32, y: u32) -> &mut AccumulationCell {
        let idx = self.index(x, y);
        &mut self.cells[idx]
    }

    /// Cells in row-major order within the tile.
    pub fn cells_mut(&mut self) -> &mut [AccumulationCell] {
        &mut self.cells
    }

    pub fn contribution_count(&self) -> usize {
        self.cells.iter().map(AccumulationCell::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(depth: f32, weight: f32) -> Contribution {
        Contribution {
            depth,
            weight,
            coverage: weight,
            weighted_color: Vector3::repeat(weight),
        }
    }

    #[test]
    fn test_cell_spills_only_past_inline_capacity() {
        let mut cell = AccumulationCell::new();
        for i in 0..INLINE_CONTRIBUTIONS {
            cell.push(contribution(i as f32, 1.0));
        }
        assert!(!cell.spilled());

        cell.push(contribution(100.0, 1.0));
        assert!(cell.spilled());
        assert_eq!(cell.len(), INLINE_CONTRIBUTIONS + 1);
    }

    #[test]
    fn test_cell_size_stays_small() {
        use std::mem::size_of;

        assert_eq!(size_of::<Contribution>(), 24);
        // Inline contributions plus the capacity word and the inline/heap tag.
        assert!(size_of::<AccumulationCell>() <= INLINE_CONTRIBUTIONS * 24 + 16);
        assert!(size_of::<AccumulationCell>() <= 112);
    }

    #[test]
    fn test_sort_by_depth_is_stable() {
        let mut cell = AccumulationCell::new();
        cell.push(contribution(2.0, 0.1));
        cell.push(contribution(1.0, 0.2));
        cell.push(contribution(2.0, 0.3));
        cell.push(contribution(0.5, 0.4));
        cell.sort_by_depth();

        let order: Vec<f32> = cell.as_slice().iter().map(|c| c.weight).collect();
        assert_eq!(order, vec![0.4, 0.2, 0.1, 0.3]);
    }

    #[test]
    fn test_tile_buffer_addresses_image_pixels() {
        let rect = PixelRect { min_x: 16, min_y: 32, max_x: 31, max_y: 47 };
        let mut tile = TileBuffer::new(rect);
        tile.cell_mut(16, 32).push(contribution(1.0, 1.0));
        tile.cell_mut(31, 47).push(contribution(1.0, 1.0));
        tile.cell_mut(31, 47).push(contribution(2.0, 1.0));

        assert_eq!(tile.cell(16, 32).len(), 1);
        assert_eq!(tile.cell(31, 47).len(), 2);
        assert_eq!(tile.cells_mut()[rect.area() - 1].len(), 2);
        assert_eq!(tile.contribution_count(), 3);
    }
}
