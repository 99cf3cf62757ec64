use glam::Vec3;

use crate::grid::GridPointCloud;

/// Base distance between a point and its back surface point.
pub const BACK_OFFSET: f32 = 0.01;

/// Offset multiplier for points whose four axis-aligned neighbors are visible.
pub const INTERIOR_OFFSET_FACTOR: f32 = 10.0;

impl GridPointCloud {
    /// Compute the back surface, a copy of the scan displaced along the
    /// inverse normals.
    ///
    /// Interior points, with their four axis-aligned neighbors visible, are
    /// displaced [`INTERIOR_OFFSET_FACTOR`] times further than [`BACK_OFFSET`],
    /// so that thin lines of points do not grow a thick double surface.
    /// Normals are computed first if they are not available. Invisible cells
    /// keep their front position.
    pub fn calculate_back_points(&mut self) -> &[Vec3] {
        self.ensure_normals();
        let normals = self.normals.as_deref().unwrap_or_default();

        let back_points = self
            .points
            .iter()
            .zip(normals.iter())
            .enumerate()
            .map(|(index, (&point, &normal))| {
                if !self.visibility[index] {
                    return point;
                }
                let (col, row) = self.col_row(index);
                let offset = if self.has_visible_cross(col, row) {
                    BACK_OFFSET * INTERIOR_OFFSET_FACTOR
                } else {
                    BACK_OFFSET
                };
                point - normal * offset
            })
            .collect();

        self.back_points.insert(back_points)
    }

    /// Compute the back surface only if it is not available.
    pub fn ensure_back_points(&mut self) -> &[Vec3] {
        if self.back_points.is_none() {
            return self.calculate_back_points();
        }
        self.back_points.as_deref().unwrap_or_default()
    }
}
