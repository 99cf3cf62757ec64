use glam::Vec3;

use crate::grid::GridPointCloud;

impl GridPointCloud {
    /// Compute the normal of every visible point.
    ///
    /// The normal averages the unit cross products of the edges to the
    /// right/left and up/down neighbors over the four quadrants where both
    /// neighbors are visible. The cross order is mirrored for the mirrored
    /// quadrants so that all the contributions point to the same side of the
    /// surface. Points without any contributing quadrant get the zero vector,
    /// as do invisible points.
    ///
    /// For a flat grid with columns along +x and rows along +y the normals
    /// point along +z.
    pub fn calculate_normals(&mut self) -> &[Vec3] {
        let normals = (0..self.len()).map(|i| self.point_normal(i)).collect();
        self.normals.insert(normals)
    }

    /// Compute the normals only if they are not available.
    pub fn ensure_normals(&mut self) -> &[Vec3] {
        if self.normals.is_none() {
            return self.calculate_normals();
        }
        self.normals.as_deref().unwrap_or_default()
    }

    fn point_normal(&self, index: usize) -> Vec3 {
        if !self.visibility[index] {
            return Vec3::ZERO;
        }

        let (col, row) = self.col_row(index);
        let point = self.points[index];
        let edge = |neighbor: Option<usize>| {
            neighbor
                .filter(|&n| self.visibility[n])
                .map(|n| self.points[n] - point)
        };

        let right = edge((col + 1 < self.width).then(|| index + 1));
        let left = edge((col > 0).then(|| index - 1));
        let down = edge((row + 1 < self.height).then(|| index + self.width));
        let up = edge((row > 0).then(|| index - self.width));

        let quadrants = [(right, down), (up, right), (down, left), (left, up)];

        let (sum, count) = quadrants
            .into_iter()
            .filter_map(|(a, b)| Some(a?.cross(b?).normalize_or_zero()))
            .fold((Vec3::ZERO, 0), |(sum, n), perp| (sum + perp, n + 1));

        if count > 0 {
            sum.normalize_or_zero()
        } else {
            Vec3::ZERO
        }
    }
}
