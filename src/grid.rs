//! Point grid - flat position and color buffers for the point field.
//!
//! Laid out exactly as uploaded: three floats per point, X-major
//! (`index = ix * amount_y + iy`). X and Z are fixed at creation; only Y and
//! the colors move.

/// Pure white, the resting color of every point.
pub const BASE_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

#[derive(Clone, Debug)]
pub struct PointGrid {
    amount_x: usize,
    amount_y: usize,
    positions: Vec<f32>,
    colors: Vec<f32>,
}

impl PointGrid {
    /// Lay out `amount_x * amount_y` points centred on the origin.
    pub fn new(amount_x: usize, amount_y: usize, separation: f32) -> Self {
        let count = amount_x * amount_y;
        let mut positions = Vec::with_capacity(count * 3);
        let half_x = amount_x as f32 * separation / 2.0;
        let half_y = amount_y as f32 * separation / 2.0;

        for ix in 0..amount_x {
            for iy in 0..amount_y {
                positions.push(ix as f32 * separation - half_x);
                positions.push(0.0);
                positions.push(iy as f32 * separation - half_y);
            }
        }

        let colors = BASE_COLOR.repeat(count);
        Self {
            amount_x,
            amount_y,
            positions,
            colors,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.amount_x * self.amount_y
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn amount_x(&self) -> usize {
        self.amount_x
    }

    pub fn amount_y(&self) -> usize {
        self.amount_y
    }

    /// Index of the point at grid cell (ix, iy).
    #[inline]
    pub fn index(&self, ix: usize, iy: usize) -> usize {
        ix * self.amount_y + iy
    }

    pub fn position(&self, index: usize) -> [f32; 3] {
        let i = index * 3;
        [self.positions[i], self.positions[i + 1], self.positions[i + 2]]
    }

    pub fn color(&self, index: usize) -> [f32; 3] {
        let i = index * 3;
        [self.colors[i], self.colors[i + 1], self.colors[i + 2]]
    }

    #[inline]
    pub fn set_height(&mut self, index: usize, y: f32) {
        self.positions[index * 3 + 1] = y;
    }

    /// Paint every point the same color.
    pub fn fill_color(&mut self, color: [f32; 3]) {
        for chunk in self.colors.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn reset_colors(&mut self) {
        self.fill_color(BASE_COLOR);
    }

    pub fn is_base_color(&self) -> bool {
        self.colors
            .chunks_exact(3)
            .all(|c| c == BASE_COLOR.as_slice())
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_centred() {
        let grid = PointGrid::new(40, 60, 150.0);
        assert_eq!(grid.len(), 2400);
        assert_eq!(grid.positions().len(), 7200);

        assert_eq!(grid.position(0), [-3000.0, 0.0, -4500.0]);
        let last = grid.position(grid.index(39, 59));
        assert_eq!(last, [39.0 * 150.0 - 3000.0, 0.0, 59.0 * 150.0 - 4500.0]);
    }

    #[test]
    fn test_height_leaves_xz_alone() {
        let mut grid = PointGrid::new(4, 4, 10.0);
        let before = grid.position(5);
        grid.set_height(5, 42.0);
        let after = grid.position(5);

        assert_eq!(after[1], 42.0);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[2], before[2]);
    }

    #[test]
    fn test_fill_and_reset() {
        let mut grid = PointGrid::new(3, 3, 1.0);
        assert!(grid.is_base_color());

        grid.fill_color([1.0, 0.2, 0.2]);
        assert!(!grid.is_base_color());
        assert_eq!(grid.color(8), [1.0, 0.2, 0.2]);

        grid.reset_colors();
        assert!(grid.is_base_color());
    }
}
