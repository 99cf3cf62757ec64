use glam::Vec3;

use crate::{
    grid::{GridError, GridPointCloud},
    selection::ScanBox,
};

/// Maximum distance between the slit line and the box center.
pub const SLIT_MAX_DISTANCE: f32 = 5.0;

/// Shift between consecutive slits when they are not rotated.
pub const SLIT_SHIFT: f32 = 5.0;

/// Rotation between consecutive slits, in degrees.
pub const SLIT_ROTATION_DEG: f32 = 4.0;

/// A single grid column or row cut through the scan box center.
#[derive(Debug, Clone, PartialEq)]
pub struct Slit {
    vertical: bool,
    center: Vec3,
    points: Vec<Vec3>,
    colors: Vec<[u8; 3]>,
    visibility: Vec<bool>,
}

impl Slit {
    /// Extract a slit from a grid.
    ///
    /// A vertical slit is the grid column holding the visible in-box point
    /// closest to the box center along x, a horizontal one the grid row
    /// closest along y. Only columns or rows closer than [`SLIT_MAX_DISTANCE`]
    /// qualify; if none does the slit is empty. The slit keeps the in-box
    /// points of the selected line.
    ///
    /// # Arguments
    ///
    /// * `source` - The grid to cut.
    /// * `scan_box` - The box delimiting the scanned volume.
    /// * `vertical` - Cut a column instead of a row.
    pub fn extract(source: &GridPointCloud, scan_box: &ScanBox, vertical: bool) -> Self {
        let len = if vertical { source.height } else { source.width };
        let axis_distance = |p: Vec3| {
            if vertical {
                (p.x - scan_box.center.x).abs()
            } else {
                (p.y - scan_box.center.y).abs()
            }
        };

        let mut position = None;
        let mut min_distance = SLIT_MAX_DISTANCE;
        for (index, point) in source.visible_points() {
            if !scan_box.contains(point) {
                continue;
            }
            let distance = axis_distance(point);
            if distance < min_distance {
                let (col, row) = source.col_row(index);
                position = Some(if vertical { col } else { row });
                min_distance = distance;
            }
        }

        let mut slit = Self {
            vertical,
            center: scan_box.center,
            points: vec![Vec3::ZERO; len],
            colors: vec![[0, 0, 0]; len],
            visibility: vec![false; len],
        };

        let Some(position) = position else {
            log::debug!("no points close enough to the box center for a slit");
            return slit;
        };

        for i in 0..len {
            let index = if vertical {
                source.index(position, i)
            } else {
                source.index(i, position)
            };
            let point = source.points[index];
            if source.visibility[index] && scan_box.contains(point) {
                slit.points[i] = point;
                slit.colors[i] = source.colors[index];
                slit.visibility[i] = true;
            }
        }

        slit
    }

    /// Whether the slit is a grid column.
    pub fn is_vertical(&self) -> bool {
        self.vertical
    }

    /// The box center at extraction time.
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Number of cells along the slit.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the slit has no cells.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The slit positions.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Number of visible cells.
    pub fn visible_count(&self) -> usize {
        self.visibility.iter().filter(|&&v| v).count()
    }
}

/// Assemble successive slits into a grid.
///
/// The slits become the columns (vertical slits) or rows (horizontal slits) of
/// the grid in order, the last one being the newest. Older slits are either
/// rotated around their center by [`SLIT_ROTATION_DEG`] per slit of age, around
/// the vertical axis for vertical slits and the horizontal axis otherwise, or
/// shifted by [`SLIT_SHIFT`] per slit of age across the slit direction.
///
/// # Arguments
///
/// * `slits` - The slits, oldest first.
/// * `rotate` - Rotate the slits instead of shifting them.
/// * `common_center` - Move every slit so that its center matches the newest one.
///
/// # Returns
///
/// The combined grid centered on the newest slit center, or a 1x1 invisible
/// grid if there are no slits.
///
/// # Errors
///
/// Returns [`GridError::OrientationMismatch`] if vertical and horizontal
/// slits are mixed, and [`GridError::SizeMismatch`] if the slits differ in
/// length.
pub fn combine_slits(
    slits: &[Slit],
    rotate: bool,
    common_center: bool,
) -> Result<GridPointCloud, GridError> {
    let Some(newest) = slits.last() else {
        log::warn!("no slits to combine");
        return Ok(GridPointCloud::new(1, 1));
    };

    if slits.iter().any(|s| s.vertical != newest.vertical) {
        return Err(GridError::OrientationMismatch);
    }

    if let Some(other) = slits.iter().find(|s| s.len() != newest.len()) {
        return Err(GridError::SizeMismatch {
            expected: newest.len(),
            found: other.len(),
        });
    }

    let vertical = newest.vertical;
    let (width, height) = if vertical {
        (slits.len(), newest.len())
    } else {
        (newest.len(), slits.len())
    };

    let mut grid = GridPointCloud::new(width, height);
    grid.center = newest.center;

    for (i, slit) in slits.iter().enumerate() {
        let age = (slits.len() - 1 - i) as f32;
        let (sin, cos) = (SLIT_ROTATION_DEG * age).to_radians().sin_cos();

        for (j, &point) in slit.points.iter().enumerate() {
            if !slit.visibility[j] {
                continue;
            }

            let mut point = if rotate {
                let p = point - slit.center;
                let p = if vertical {
                    Vec3::new(cos * p.x - sin * p.z, p.y, sin * p.x + cos * p.z)
                } else {
                    Vec3::new(p.x, cos * p.y - sin * p.z, sin * p.y + cos * p.z)
                };
                p + slit.center
            } else if vertical {
                point + Vec3::new(SLIT_SHIFT * age, 0.0, 0.0)
            } else {
                point + Vec3::new(0.0, SLIT_SHIFT * age, 0.0)
            };

            if common_center {
                point += grid.center - slit.center;
            }

            let index = if vertical {
                grid.index(i, j)
            } else {
                grid.index(j, i)
            };
            grid.set_point(index, point, slit.colors[j]);
        }
    }

    log::debug!(
        "combined {} slits into a {}x{} grid",
        slits.len(),
        width,
        height
    );

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plane(width: usize, height: usize) -> GridPointCloud {
        let mut grid = GridPointCloud::new(width, height);
        for i in 0..grid.len() {
            let (col, row) = grid.col_row(i);
            grid.set_point(
                i,
                Vec3::new(col as f32 * 2.0, row as f32 * 2.0, 0.0),
                [col as u8, row as u8, 0],
            );
        }
        grid
    }

    #[test]
    fn test_extract_vertical() {
        let grid = plane(5, 4);
        let scan_box = ScanBox::new(Vec3::new(4.4, 3.0, 0.0), 20.0);
        let slit = Slit::extract(&grid, &scan_box, true);
        assert!(slit.is_vertical());
        assert_eq!(slit.len(), 4);
        assert_eq!(slit.visible_count(), 4);
        // column 2 is at x = 4
        assert!(slit.points().iter().all(|p| p.x == 4.0));
    }

    #[test]
    fn test_extract_horizontal_and_box_clipping() {
        let grid = plane(5, 4);
        let scan_box = ScanBox::new(Vec3::new(0.0, 2.0, 0.0), 5.0);
        let slit = Slit::extract(&grid, &scan_box, false);
        assert_eq!(slit.len(), 5);
        // row 1, only x = 0 and x = 2 are inside the box
        assert_eq!(slit.visible_count(), 2);
        assert_eq!(slit.points()[1], Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn test_extract_too_far() {
        let grid = plane(3, 3);
        let scan_box = ScanBox::new(Vec3::new(100.0, 0.0, 0.0), 1000.0);
        let slit = Slit::extract(&grid, &scan_box, true);
        assert_eq!(slit.visible_count(), 0);
        assert_eq!(slit.len(), 3);
    }

    #[test]
    fn test_combine_shifted() -> Result<(), GridError> {
        let grid = plane(3, 3);
        let scan_box = ScanBox::new(Vec3::new(2.0, 2.0, 0.0), 20.0);
        let slit = Slit::extract(&grid, &scan_box, true);
        let slits = vec![slit.clone(), slit.clone(), slit];

        let combined = combine_slits(&slits, false, false)?;
        assert_eq!((combined.width(), combined.height()), (3, 3));
        assert_eq!(combined.visible_count(), 9);
        assert_eq!(combined.points()[combined.index(0, 0)].x, 2.0 + 2.0 * SLIT_SHIFT);
        assert_eq!(combined.points()[combined.index(1, 0)].x, 2.0 + SLIT_SHIFT);
        assert_eq!(combined.points()[combined.index(2, 2)], Vec3::new(2.0, 4.0, 0.0));
        assert_eq!(combined.center(), scan_box.center);
        Ok(())
    }

    #[test]
    fn test_combine_rotated_common_center() -> Result<(), GridError> {
        let grid = plane(3, 3);
        let old = Slit::extract(&grid, &ScanBox::new(Vec3::new(2.0, 2.0, 0.0), 20.0), true);
        let new = Slit::extract(&grid, &ScanBox::new(Vec3::new(2.0, 2.0, 10.0), 40.0), true);

        let combined = combine_slits(&[old, new], true, true)?;
        assert_eq!(combined.center(), Vec3::new(2.0, 2.0, 10.0));

        // the old slit is rotated by 4 degrees, then moved to the new center
        let p = combined.points()[combined.index(0, 1)];
        assert_relative_eq!(p.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 10.0, epsilon = 1e-5);
        // the newest slit is untouched
        assert_eq!(combined.points()[combined.index(1, 0)], Vec3::new(2.0, 0.0, 0.0));
        Ok(())
    }

    #[test]
    fn test_combine_edge_cases() {
        let empty = combine_slits(&[], false, false).unwrap();
        assert_eq!(empty.len(), 1);

        let a = Slit::extract(&plane(3, 3), &ScanBox::new(Vec3::ZERO, 20.0), true);
        let b = Slit::extract(&plane(3, 4), &ScanBox::new(Vec3::ZERO, 20.0), true);
        assert!(matches!(
            combine_slits(&[a.clone(), b], false, false),
            Err(GridError::SizeMismatch { .. })
        ));

        // a row of a square grid has the length of its columns
        let c = Slit::extract(&plane(3, 3), &ScanBox::new(Vec3::ZERO, 20.0), false);
        assert_eq!(a.len(), c.len());
        assert!(matches!(
            combine_slits(&[a, c], false, false),
            Err(GridError::OrientationMismatch)
        ));
    }
}
