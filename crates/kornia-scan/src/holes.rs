use crate::grid::GridPointCloud;

impl GridPointCloud {
    /// Fill the holes of every row interpolating between the visible cells that
    /// delimit them.
    ///
    /// A hole is a run of invisible cells with a visible cell on both sides in
    /// the same row. Holes of at most `max_gap` cells are filled with linearly
    /// interpolated positions and colors and become visible. Runs touching the
    /// row ends are never filled, and rows never exchange information.
    ///
    /// # Returns
    ///
    /// The number of cells that were filled.
    pub fn fill_holes(&mut self, max_gap: usize) -> usize {
        let mut filled = 0;

        for (row, extent) in self.row_extents().into_iter().enumerate() {
            let Some((first, last)) = extent else {
                continue;
            };

            let mut col = first + 1;
            while col < last {
                if self.visibility[self.index(col, row)] {
                    col += 1;
                    continue;
                }

                // the row extent guarantees a visible cell before `last`
                let start_col = col - 1;
                let mut end_col = col + 1;
                while !self.visibility[self.index(end_col, row)] {
                    end_col += 1;
                }

                let gap = end_col - start_col - 1;
                if gap <= max_gap {
                    self.interpolate_run(row, start_col, end_col);
                    filled += gap;
                }

                col = end_col + 1;
            }
        }

        log::debug!("filled {} cells with max gap {}", filled, max_gap);

        if filled > 0 {
            self.invalidate();
        }
        filled
    }

    fn interpolate_run(&mut self, row: usize, start_col: usize, end_col: usize) {
        let start = self.index(start_col, row);
        let end = self.index(end_col, row);

        let start_point = self.points[start];
        let direction = self.points[end] - start_point;
        let start_color = self.colors[start].map(|c| c as f32);
        let end_color = self.colors[end].map(|c| c as f32);
        let delta = 1.0 / (end - start) as f32;

        for (step, index) in (start + 1..end).enumerate() {
            let t = (step + 1) as f32 * delta;
            self.points[index] = start_point + direction * t;
            self.colors[index] = std::array::from_fn(|k| {
                (start_color[k] + t * (end_color[k] - start_color[k])).round() as u8
            });
            self.visibility[index] = true;
        }
    }
}
