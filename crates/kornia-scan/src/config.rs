use serde::{Deserialize, Serialize};

use crate::grid::GridPointCloud;

/// Parameters of the scan processing pipeline.
///
/// Missing fields take their default value when deserializing, and the
/// defaults leave the scan untouched apart from computing its normals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Block size of the resolution reduction. `1` keeps the resolution.
    pub resolution_factor: usize,
    /// Longest row hole to fill. `0` disables the hole filling.
    pub max_hole_gap: usize,
    /// Gaussian kernel side. Values not larger than one disable the smoothing.
    pub smoothing_kernel: usize,
    /// Squared connectivity distance replacing the scan threshold.
    pub connectivity_threshold: Option<f32>,
    /// Scale factor around the scan center.
    pub scale: f32,
    /// Crop the grid to the bounding rectangle of the visible cells.
    pub crop: bool,
    /// Compute the point normals.
    pub normals: bool,
    /// Compute the back surface.
    pub back_surface: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            resolution_factor: 1,
            max_hole_gap: 0,
            smoothing_kernel: 0,
            connectivity_threshold: None,
            scale: 1.0,
            crop: false,
            normals: true,
            back_surface: false,
        }
    }
}

impl ProcessingConfig {
    /// Run the processing pipeline on a scan.
    ///
    /// The steps run in this order: connectivity override, resolution
    /// reduction, crop, hole filling, smoothing, scaling, normals and back
    /// surface. Steps whose parameter is a no-op are skipped.
    pub fn apply(&self, grid: &mut GridPointCloud) {
        if let Some(threshold) = self.connectivity_threshold {
            grid.set_connectivity_threshold(threshold);
        }

        if self.resolution_factor > 1 {
            grid.reduce_resolution(self.resolution_factor);
        }

        if self.crop {
            grid.crop();
        }

        if self.max_hole_gap > 0 {
            grid.fill_holes(self.max_hole_gap);
        }

        if self.smoothing_kernel > 1 {
            grid.gaussian_smooth(self.smoothing_kernel);
        }

        if self.scale != 1.0 {
            grid.scale(self.scale);
        }

        if self.normals || self.back_surface {
            grid.ensure_normals();
        }

        if self.back_surface {
            grid.ensure_back_points();
        }

        log::debug!(
            "processed scan: {}x{} grid, {} visible points",
            grid.width(),
            grid.height(),
            grid.visible_count()
        );
    }
}
