use glam::Vec3;

use crate::grid::GridPointCloud;

/// Fraction of the box size the center is pushed back from a detected face.
pub const FACE_DEPTH_OFFSET: f32 = 0.2;

/// An axis-aligned cube used to select the scanned points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanBox {
    /// The cube center.
    pub center: Vec3,
    /// The cube side length.
    pub size: f32,
}

impl ScanBox {
    /// Create a new scan box.
    pub fn new(center: Vec3, size: f32) -> Self {
        Self { center, size }
    }

    /// Check if a point lies strictly inside the box.
    pub fn contains(&self, point: Vec3) -> bool {
        let half_size = self.size / 2.0;
        (point - self.center).abs().cmplt(Vec3::splat(half_size)).all()
    }

    /// The eight box corners, lower corner first.
    pub fn corners(&self) -> [Vec3; 8] {
        let half = self.size / 2.0;
        std::array::from_fn(|i| {
            let sign = |bit: usize| if i & bit == 0 { -half } else { half };
            self.center + Vec3::new(sign(1), sign(2), sign(4))
        })
    }

    /// Move the box center to a detected face position.
    ///
    /// The new center is pushed back by [`FACE_DEPTH_OFFSET`] times the box
    /// size along z, so that the box holds the head behind the face.
    ///
    /// # Returns
    ///
    /// Whether the box was moved.
    pub fn center_on(&mut self, face: Option<Vec3>) -> bool {
        match face {
            Some(position) => {
                self.center = position + Vec3::new(0.0, 0.0, FACE_DEPTH_OFFSET * self.size);
                log::debug!("scan box centered on face at {:?}", position);
                true
            }
            None => {
                log::debug!("no face position, scan box not moved");
                false
            }
        }
    }
}

impl GridPointCloud {
    /// Create a grid with the visible points of `source` that lie inside the
    /// scan box. The new grid is centered on the box center.
    pub fn from_scan_box(source: &GridPointCloud, scan_box: &ScanBox) -> Self {
        let mut grid = Self::from_selection(source, |p| scan_box.contains(p));
        grid.center = scan_box.center;
        grid
    }
}
