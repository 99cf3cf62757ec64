use glam::{Vec2, Vec3};

use crate::grid::GridPointCloud;

/// A point projected on the screen by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    /// Horizontal screen coordinate.
    pub x: f32,
    /// Vertical screen coordinate.
    pub y: f32,
    /// Camera-space depth. Larger values are closer to the viewer.
    pub depth: f32,
}

impl GridPointCloud {
    /// Find the visible point that best matches a screen position.
    ///
    /// The candidates are the visible points projected within `radius` of
    /// `screen`. When the back surface is available, a point is only a
    /// candidate if it is in front of its own back point, which hides points
    /// seen through the back of thin geometry. Among the candidates the chosen
    /// point minimizes `screen_distance² + (max_depth - depth)²`, where
    /// `max_depth` is the depth of the candidate closest to the viewer.
    ///
    /// # Arguments
    ///
    /// * `screen` - The screen position, usually the cursor.
    /// * `radius` - The maximum screen distance to the position.
    /// * `project` - The renderer projection of a 3D point.
    ///
    /// # Returns
    ///
    /// The grid index of the selected point, or `None` if there are no candidates.
    pub fn nearest_point_to_screen_position<F>(
        &self,
        screen: Vec2,
        radius: f32,
        project: F,
    ) -> Option<usize>
    where
        F: Fn(Vec3) -> ScreenPoint,
    {
        let radius_sq = radius * radius;
        let back_points = self.back_points.as_deref();

        let candidates = self
            .visible_points()
            .filter_map(|(index, point)| {
                let projected = project(point);
                let dist_sq = Vec2::new(projected.x, projected.y).distance_squared(screen);
                if dist_sq > radius_sq {
                    return None;
                }
                if let Some(back) = back_points {
                    if projected.depth <= project(back[index]).depth {
                        return None;
                    }
                }
                Some((index, dist_sq, projected.depth))
            })
            .collect::<Vec<_>>();

        let max_depth = candidates
            .iter()
            .map(|&(_, _, depth)| depth)
            .fold(f32::NEG_INFINITY, f32::max);

        let picked = candidates
            .into_iter()
            .map(|(index, dist_sq, depth)| (index, dist_sq + (max_depth - depth).powi(2)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index);

        log::debug!("picked point {:?} at {:?}", picked, screen);
        picked
    }
}
