use glam::Vec3;

/// Default squared distance below which two points are considered connected.
///
/// The value corresponds to a separation of 120 sensor units (millimeters for
/// Kinect-like devices).
pub const DEFAULT_CONNECTIVITY_THRESHOLD: f32 = 120.0 * 120.0;

/// Error types for the grid point cloud.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GridError {
    /// An input array does not match the grid dimensions
    #[error("Array has {found} elements, expected {expected}")]
    SizeMismatch {
        /// number of elements required by the grid dimensions
        expected: usize,
        /// number of elements provided
        found: usize,
    },

    /// Lines to assemble mix grid columns and grid rows
    #[error("Cannot combine vertical and horizontal lines")]
    OrientationMismatch,

    /// Two grids that should share dimensions do not
    #[error("Grid dimensions {found:?} do not match {expected:?}")]
    DimensionMismatch {
        /// the reference (width, height)
        expected: (usize, usize),
        /// the offending (width, height)
        found: (usize, usize),
    },
}

/// A structured point cloud laid out on a rectangular sensor grid.
///
/// Every cell of the `width x height` grid stores a position, a color and a
/// visibility flag in flat row-major arrays. Invisible cells keep their slot so
/// that indices stay stable across operations.
///
/// Normals and back points are derived state: any operation that can change
/// the neighbor geometry drops them, and they are computed again on request.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPointCloud {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) points: Vec<Vec3>,
    pub(crate) colors: Vec<[u8; 3]>,
    pub(crate) visibility: Vec<bool>,
    pub(crate) center: Vec3,
    pub(crate) connectivity_threshold: f32,
    pub(crate) normals: Option<Vec<Vec3>>,
    pub(crate) back_points: Option<Vec<Vec3>>,
}

impl GridPointCloud {
    /// Create an empty grid where all the points are invisible.
    ///
    /// # Arguments
    ///
    /// * `width` - The number of grid columns.
    /// * `height` - The number of grid rows.
    pub fn new(width: usize, height: usize) -> Self {
        let len = width * height;
        Self {
            width,
            height,
            points: vec![Vec3::ZERO; len],
            colors: vec![[0, 0, 0]; len],
            visibility: vec![false; len],
            center: Vec3::ZERO,
            connectivity_threshold: DEFAULT_CONNECTIVITY_THRESHOLD,
            normals: None,
            back_points: None,
        }
    }

    /// Create a grid from its raw row-major arrays.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SizeMismatch`] if any array length differs from
    /// `width * height`.
    pub fn from_parts(
        width: usize,
        height: usize,
        points: Vec<Vec3>,
        colors: Vec<[u8; 3]>,
        visibility: Vec<bool>,
    ) -> Result<Self, GridError> {
        let expected = width * height;
        for found in [points.len(), colors.len(), visibility.len()] {
            if found != expected {
                return Err(GridError::SizeMismatch { expected, found });
            }
        }

        Ok(Self {
            width,
            height,
            points,
            colors,
            visibility,
            center: Vec3::ZERO,
            connectivity_threshold: DEFAULT_CONNECTIVITY_THRESHOLD,
            normals: None,
            back_points: None,
        })
    }

    /// Create a grid with the dimensions of `source`, keeping only the visible
    /// points that satisfy `predicate`.
    ///
    /// The center and the connectivity threshold are inherited from `source`.
    pub fn from_selection<F>(source: &GridPointCloud, predicate: F) -> Self
    where
        F: Fn(Vec3) -> bool,
    {
        let mut grid = Self::new(source.width, source.height);
        grid.center = source.center;
        grid.connectivity_threshold = source.connectivity_threshold;

        for (i, point) in source.points.iter().enumerate() {
            if source.visibility[i] && predicate(*point) {
                grid.points[i] = *point;
                grid.colors[i] = source.colors[i];
                grid.visibility[i] = true;
            }
        }

        grid
    }

    /// Get the number of grid columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get the number of grid rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the number of grid cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the grid has no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Flat index of the cell at `(col, row)`.
    #[inline]
    pub fn index(&self, col: usize, row: usize) -> usize {
        debug_assert!(col < self.width && row < self.height);
        col + row * self.width
    }

    /// Column and row of the cell at the flat index `index`.
    #[inline]
    pub fn col_row(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Get as reference the cell positions.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Get as reference the cell colors.
    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    /// Get as reference the cell visibility mask.
    pub fn visibility(&self) -> &[bool] {
        &self.visibility
    }

    /// Whether the cell at `index` holds meaningful data.
    #[inline]
    pub fn is_visible(&self, index: usize) -> bool {
        self.visibility[index]
    }

    /// Number of visible cells.
    pub fn visible_count(&self) -> usize {
        self.visibility.iter().filter(|&&v| v).count()
    }

    /// The semantic origin of the scan.
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Set the semantic origin of the scan without moving the points.
    pub fn set_center(&mut self, center: Vec3) {
        self.center = center;
    }

    /// Squared distance below which two points are connected.
    pub fn connectivity_threshold(&self) -> f32 {
        self.connectivity_threshold
    }

    /// Set the squared distance below which two points are connected.
    pub fn set_connectivity_threshold(&mut self, threshold: f32) {
        self.connectivity_threshold = threshold;
    }

    /// The point normals, if they have been computed since the last change.
    pub fn normals(&self) -> Option<&[Vec3]> {
        self.normals.as_deref()
    }

    /// The back surface points, if they have been computed since the last change.
    pub fn back_points(&self) -> Option<&[Vec3]> {
        self.back_points.as_deref()
    }

    /// Store a visible point at `index`.
    pub fn set_point(&mut self, index: usize, point: Vec3, color: [u8; 3]) {
        self.points[index] = point;
        self.colors[index] = color;
        self.visibility[index] = true;
        self.invalidate();
    }

    /// Mark the cell at `index` as invisible. Position and color are kept.
    pub fn hide_point(&mut self, index: usize) {
        self.visibility[index] = false;
        self.invalidate();
    }

    /// Replace the visibility mask.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SizeMismatch`] if the mask does not cover the grid.
    pub fn apply_visibility_mask(&mut self, mask: &[bool]) -> Result<(), GridError> {
        if mask.len() != self.len() {
            return Err(GridError::SizeMismatch {
                expected: self.len(),
                found: mask.len(),
            });
        }
        self.visibility.copy_from_slice(mask);
        self.invalidate();
        Ok(())
    }

    /// Check if two points are close enough to be joined by an edge.
    #[inline]
    pub fn connected(&self, a: Vec3, b: Vec3) -> bool {
        a.distance_squared(b) < self.connectivity_threshold
    }

    /// Check if the cells at `i` and `j` are both visible and connected.
    #[inline]
    pub fn cells_connected(&self, i: usize, j: usize) -> bool {
        self.visibility[i] && self.visibility[j] && self.connected(self.points[i], self.points[j])
    }

    /// Rebuild the grid with new dimensions.
    ///
    /// For every destination cell `mapping(col, row)` returns the source cell to
    /// copy from, or `None` to leave the destination invisible.
    pub fn resize_with<F>(&mut self, new_width: usize, new_height: usize, mapping: F)
    where
        F: Fn(usize, usize) -> Option<usize>,
    {
        let len = new_width * new_height;
        let mut points = vec![Vec3::ZERO; len];
        let mut colors = vec![[0, 0, 0]; len];
        let mut visibility = vec![false; len];

        for row in 0..new_height {
            for col in 0..new_width {
                if let Some(src) = mapping(col, row) {
                    let dst = col + row * new_width;
                    points[dst] = self.points[src];
                    colors[dst] = self.colors[src];
                    visibility[dst] = self.visibility[src];
                }
            }
        }

        log::debug!(
            "resized grid from {}x{} to {}x{}",
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

    /// Restrict the visible points to those strictly inside the box delimited
    /// by `lower` and `upper`. Positions and colors are left untouched.
    pub fn constrain(&mut self, lower: Vec3, upper: Vec3) {
        for (visible, point) in self.visibility.iter_mut().zip(self.points.iter()) {
            *visible &= point.cmpgt(lower).all() && point.cmplt(upper).all();
        }
        self.invalidate();
    }

    /// Move all the points and the center by `offset`.
    pub fn translate(&mut self, offset: Vec3) {
        self.points.iter_mut().for_each(|p| *p += offset);
        self.center += offset;
        self.invalidate();
    }

    /// Rotate all the points around the vertical axis passing by the center.
    ///
    /// # Arguments
    ///
    /// * `angle` - The rotation angle in radians.
    pub fn rotate(&mut self, angle: f32) {
        let (sin, cos) = angle.sin_cos();
        let center = self.center;
        for point in self.points.iter_mut() {
            let p = *point - center;
            *point = Vec3::new(cos * p.x - sin * p.z, p.y, sin * p.x + cos * p.z) + center;
        }
        self.invalidate();
    }

    /// Scale all the points around the center.
    ///
    /// The connectivity threshold is scaled by `factor²` so that connectivity
    /// judgments are unchanged.
    pub fn scale(&mut self, factor: f32) {
        let center = self.center;
        for point in self.points.iter_mut() {
            *point = (*point - center) * factor + center;
        }
        self.connectivity_threshold *= factor * factor;
        self.invalidate();
    }

    /// Compute the lower and upper corners of the box containing all the
    /// visible points, or `None` if there are no visible points.
    pub fn calculate_limits(&self) -> Option<(Vec3, Vec3)> {
        self.visible_points()
            .map(|(_, p)| (p, p))
            .reduce(|(lo, hi), (p, _)| (lo.min(p), hi.max(p)))
    }

    /// First and last visible column of every row, `None` for empty rows.
    pub fn row_extents(&self) -> Vec<Option<(usize, usize)>> {
        self.visibility
            .chunks(self.width.max(1))
            .take(self.height)
            .map(|row| {
                let first = row.iter().position(|&v| v)?;
                let last = row.iter().rposition(|&v| v)?;
                Some((first, last))
            })
            .collect()
    }

    /// Index of the visible cell closest to the center in the XY plane.
    pub fn central_point(&self) -> Option<usize> {
        let center = self.center.truncate();
        self.visible_points()
            .map(|(i, p)| (i, p.truncate().distance_squared(center)))
            .fold(None, |best: Option<(usize, f32)>, (i, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((i, d)),
            })
            .map(|(i, _)| i)
    }

    /// Mean position of the visible points.
    pub fn centroid(&self) -> Option<Vec3> {
        let (sum, count) = self
            .visible_points()
            .fold((Vec3::ZERO, 0usize), |(sum, n), (_, p)| (sum + p, n + 1));
        (count > 0).then(|| sum / count as f32)
    }

    /// Iterate over the visible cells as `(index, position)`.
    pub fn visible_points(&self) -> impl Iterator<Item = (usize, Vec3)> + '_ {
        self.points
            .iter()
            .zip(self.visibility.iter())
            .enumerate()
            .filter_map(|(i, (p, &v))| v.then_some((i, *p)))
    }

    /// Whether the four axis-aligned neighbors of `(col, row)` are visible.
    pub(crate) fn has_visible_cross(&self, col: usize, row: usize) -> bool {
        if col == 0 || row == 0 || col + 1 >= self.width || row + 1 >= self.height {
            return false;
        }
        let index = self.index(col, row);
        self.visibility[index - 1]
            && self.visibility[index + 1]
            && self.visibility[index - self.width]
            && self.visibility[index + self.width]
    }

    /// Drop the derived state after a geometry change.
    pub(crate) fn invalidate(&mut self) {
        self.normals = None;
        self.back_points = None;
    }
}

/// Pack an RGB color into an opaque `0xAARRGGBB` value.
#[inline]
pub fn pack_rgba(color: [u8; 3]) -> u32 {
    0xff00_0000 | (color[0] as u32) << 16 | (color[1] as u32) << 8 | color[2] as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_grid(width: usize, height: usize) -> GridPointCloud {
        let mut grid = GridPointCloud::new(width, height);
        for row in 0..height {
            for col in 0..width {
                let index = grid.index(col, row);
                grid.set_point(index, Vec3::new(col as f32, row as f32, 0.0), [10, 20, 30]);
            }
        }
        grid
    }

    #[test]
    fn test_new_grid_is_invisible() {
        let grid = GridPointCloud::new(4, 3);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid.visible_count(), 0);
        assert!(grid.normals().is_none());
        assert!(grid.calculate_limits().is_none());
        assert!(grid.central_point().is_none());
    }

    #[test]
    fn test_from_parts_size_mismatch() {
        let res = GridPointCloud::from_parts(2, 2, vec![Vec3::ZERO; 4], vec![[0; 3]; 3], vec![true; 4]);
        assert!(matches!(
            res,
            Err(GridError::SizeMismatch {
                expected: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn test_index_roundtrip() {
        let grid = GridPointCloud::new(5, 4);
        assert_eq!(grid.index(3, 2), 13);
        assert_eq!(grid.col_row(13), (3, 2));
    }

    #[test]
    fn test_from_selection() {
        let grid = flat_grid(4, 4);
        let selected = GridPointCloud::from_selection(&grid, |p| p.x < 2.0);
        assert_eq!(selected.width(), 4);
        assert_eq!(selected.visible_count(), 8);
        assert!(selected.is_visible(selected.index(1, 3)));
        assert!(!selected.is_visible(selected.index(2, 0)));
    }

    #[test]
    fn test_constrain_is_strict() {
        let mut grid = flat_grid(4, 1);
        grid.constrain(Vec3::new(0.0, -1.0, -1.0), Vec3::new(3.0, 1.0, 1.0));
        assert_eq!(grid.visibility(), &[false, true, true, false]);
        // positions are not touched
        assert_eq!(grid.points()[0], Vec3::ZERO);
    }

    #[test]
    fn test_translate_moves_center() {
        let mut grid = flat_grid(2, 2);
        grid.translate(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(grid.points()[3], Vec3::new(2.0, 3.0, 3.0));
        assert_eq!(grid.center(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_rotate_around_center() {
        let mut grid = flat_grid(2, 1);
        grid.set_center(Vec3::new(0.0, 0.0, 0.0));
        grid.rotate(std::f32::consts::FRAC_PI_2);
        let p = grid.points()[1];
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_scale_rescales_threshold() {
        let mut grid = flat_grid(3, 1);
        grid.set_center(Vec3::new(1.0, 0.0, 0.0));
        grid.set_connectivity_threshold(4.0);
        grid.scale(3.0);
        assert_eq!(grid.points()[0], Vec3::new(-2.0, 0.0, 0.0));
        assert_eq!(grid.points()[2], Vec3::new(4.0, 0.0, 0.0));
        assert_relative_eq!(grid.connectivity_threshold(), 36.0);
        assert!(grid.cells_connected(0, 1));
    }

    #[test]
    fn test_connected_threshold() {
        let mut grid = GridPointCloud::new(1, 1);
        grid.set_connectivity_threshold(1.0);
        assert!(grid.connected(Vec3::ZERO, Vec3::new(0.5, 0.5, 0.0)));
        assert!(!grid.connected(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_limits_and_extents() {
        let mut grid = GridPointCloud::new(4, 3);
        let a = grid.index(1, 0);
        let b = grid.index(3, 2);
        grid.set_point(a, Vec3::new(-1.0, 2.0, 5.0), [0; 3]);
        grid.set_point(b, Vec3::new(3.0, -2.0, 1.0), [0; 3]);

        let (lo, hi) = grid.calculate_limits().unwrap();
        assert_eq!(lo, Vec3::new(-1.0, -2.0, 1.0));
        assert_eq!(hi, Vec3::new(3.0, 2.0, 5.0));
        assert_eq!(grid.row_extents(), vec![Some((1, 1)), None, Some((3, 3))]);
    }

    #[test]
    fn test_central_point() {
        let mut grid = flat_grid(5, 5);
        grid.set_center(Vec3::new(3.1, 1.2, 40.0));
        assert_eq!(grid.central_point(), Some(grid.index(3, 1)));
    }

    #[test]
    fn test_apply_visibility_mask() {
        let mut grid = flat_grid(2, 2);
        assert!(grid.apply_visibility_mask(&[true, false]).is_err());
        grid.apply_visibility_mask(&[true, false, false, true]).unwrap();
        assert_eq!(grid.visible_count(), 2);
    }

    #[test]
    fn test_pack_rgba() {
        assert_eq!(pack_rgba([0x12, 0x34, 0x56]), 0xff12_3456);
    }
}
