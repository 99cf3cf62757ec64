use glam::Vec3;

use crate::grid::GridPointCloud;

impl GridPointCloud {
    /// Reduce the grid resolution averaging the points inside every
    /// `factor x factor` block.
    ///
    /// The new grid has `ceil(width / factor) x ceil(height / factor)` cells.
    /// Each cell averages the position and the color channels of the visible
    /// cells in its block, rounding the colors to the nearest integer. Cells
    /// without visible contributors are invisible and placed at the origin.
    ///
    /// The blocks are aligned on multiples of `factor` and the grid is not
    /// padded, unlike the variant that averages a window centered on every
    /// `factor`-th cell and adds a margin of empty cells around the result.
    ///
    /// A `factor` of one or less leaves the grid unchanged.
    pub fn reduce_resolution(&mut self, factor: usize) {
        if factor <= 1 || self.is_empty() {
            return;
        }

        let new_width = self.width.div_ceil(factor);
        let new_height = self.height.div_ceil(factor);
        let len = new_width * new_height;
        let mut points = vec![Vec3::ZERO; len];
        let mut colors = vec![[0u8; 3]; len];
        let mut visibility = vec![false; len];

        for row in 0..new_height {
            for col in 0..new_width {
                let mut point_sum = Vec3::ZERO;
                let mut color_sum = [0u32; 3];
                let mut counter = 0u32;

                let rows = row * factor..((row + 1) * factor).min(self.height);
                for src_row in rows {
                    let cols = col * factor..((col + 1) * factor).min(self.width);
                    for src_col in cols {
                        let src = self.index(src_col, src_row);
                        if self.visibility[src] {
                            point_sum += self.points[src];
                            let color = self.colors[src];
                            color_sum[0] += color[0] as u32;
                            color_sum[1] += color[1] as u32;
                            color_sum[2] += color[2] as u32;
                            counter += 1;
                        }
                    }
                }

                if counter > 0 {
                    let dst = col + row * new_width;
                    let inv_count = 1.0 / counter as f32;
                    points[dst] = point_sum * inv_count;
                    colors[dst] = color_sum.map(|c| (c as f32 * inv_count).round() as u8);
                    visibility[dst] = true;
                }
            }
        }

        log::debug!(
            "reduced resolution by {} from {}x{} to {}x{}",
            factor,
            self.width,
            self.height,
            new_width,
            new_height
        );

        self.width = new_width;
        self.height = new_height;
        self.points = points;
        self.colors = colors;
        self.visibility = visibility;
        self.invalidate();
    }

    /// Reduce the grid resolution keeping one cell out of every
    /// `factor x factor` block, without averaging.
    ///
    /// A `factor` of one or less leaves the grid unchanged.
    pub fn subsample(&mut self, factor: usize) {
        if factor <= 1 {
            return;
        }
        let width = self.width;
        self.resize_with(self.width / factor, self.height / factor, |col, row| {
            Some(col * factor + row * factor * width)
        });
    }

    /// Crop the grid to the smallest rectangle containing all the visible cells.
    ///
    /// The cell values are reused as they are. A grid without visible cells is
    /// reduced to a single invisible cell.
    pub fn crop(&mut self) {
        let bounds = self
            .row_extents()
            .into_iter()
            .enumerate()
            .filter_map(|(row, extent)| extent.map(|(first, last)| (row, first, last)))
            .fold(None, |acc: Option<(usize, usize, usize, usize)>, (row, first, last)| {
                Some(match acc {
                    None => (first, last, row, row),
                    Some((c0, c1, r0, _)) => (c0.min(first), c1.max(last), r0, row),
                })
            });

        let Some((col_ini, col_end, row_ini, row_end)) = bounds else {
            log::warn!("cropping a grid without visible points");
            let has_cells = !self.is_empty();
            self.resize_with(1, 1, |_, _| has_cells.then_some(0));
            return;
        };

        let new_width = col_end - col_ini + 1;
        let new_height = row_end - row_ini + 1;
        if new_width == self.width && new_height == self.height {
            return;
        }

        let width = self.width;
        self.resize_with(new_width, new_height, |col, row| {
            Some((col_ini + col) + (row_ini + row) * width)
        });
    }

    /// Grow the grid to `new_width x new_height`, placing the old content in
    /// the middle of the new grid. The new cells are invisible.
    ///
    /// Dimensions smaller than the current ones are clamped, so the grid never
    /// shrinks.
    pub fn extend(&mut self, new_width: usize, new_height: usize) {
        let new_width = new_width.max(self.width);
        let new_height = new_height.max(self.height);
        let col_offset = (new_width - self.width) / 2;
        let row_offset = (new_height - self.height) / 2;
        self.extend_with_offset(new_width, new_height, col_offset, row_offset);
    }

    /// Grow the grid so that the cell closest to the center in the XY plane
    /// becomes the middle cell, with symmetric margins on both sides.
    ///
    /// Grids without visible cells are left unchanged.
    pub fn extend_from_center(&mut self) {
        let Some(central) = self.central_point() else {
            return;
        };
        let (col, row) = self.col_row(central);

        let half_width = col.max(self.width - 1 - col);
        let half_height = row.max(self.height - 1 - row);
        self.extend_with_offset(
            2 * half_width + 1,
            2 * half_height + 1,
            half_width - col,
            half_height - row,
        );
    }

    fn extend_with_offset(
        &mut self,
        new_width: usize,
        new_height: usize,
        col_offset: usize,
        row_offset: usize,
    ) {
        if new_width == self.width && new_height == self.height {
            return;
        }

        let (width, height) = (self.width, self.height);
        self.resize_with(new_width, new_height, |col, row| {
            let src_col = col.checked_sub(col_offset).filter(|&c| c < width)?;
            let src_row = row.checked_sub(row_offset).filter(|&r| r < height)?;
            Some(src_col + src_row * width)
        });
    }
}
