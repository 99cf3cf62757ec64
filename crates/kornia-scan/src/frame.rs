use glam::Vec3;

use crate::grid::{GridError, GridPointCloud};

/// A single frame delivered by a depth sensor.
///
/// All the arrays are row-major and hold `width * height` elements: the 3D
/// position reconstructed for every pixel, the registered color image and the
/// raw depth map, where zero marks pixels without a depth measurement.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    /// The frame horizontal resolution.
    pub width: usize,
    /// The frame vertical resolution.
    pub height: usize,
    /// The 3D position of every pixel.
    pub points: Vec<Vec3>,
    /// The color of every pixel.
    pub colors: Vec<[u8; 3]>,
    /// The raw depth of every pixel.
    pub depth: Vec<u16>,
}

impl DepthFrame {
    fn validate(&self) -> Result<(), GridError> {
        let expected = self.width * self.height;
        for found in [self.points.len(), self.colors.len(), self.depth.len()] {
            if found != expected {
                return Err(GridError::SizeMismatch { expected, found });
            }
        }
        Ok(())
    }
}

impl GridPointCloud {
    /// Create a grid from a sensor frame, keeping one pixel out of every
    /// `reduction x reduction` block.
    ///
    /// # Arguments
    ///
    /// * `frame` - The sensor frame.
    /// * `reduction` - The subsampling factor. Values below one are treated as one.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SizeMismatch`] if the frame arrays are inconsistent.
    pub fn from_frame(frame: &DepthFrame, reduction: usize) -> Result<Self, GridError> {
        let reduction = reduction.max(1);
        let mut grid = Self::new(frame.width / reduction, frame.height / reduction);
        grid.update_from_frame(frame, reduction)?;
        Ok(grid)
    }

    /// Refresh the grid with a new sensor frame.
    ///
    /// The arrays are reallocated only if the subsampled dimensions changed.
    pub fn update_from_frame(&mut self, frame: &DepthFrame, reduction: usize) -> Result<(), GridError> {
        frame.validate()?;
        let reduction = reduction.max(1);
        let width = frame.width / reduction;
        let height = frame.height / reduction;

        if width != self.width || height != self.height {
            let center = self.center;
            let threshold = self.connectivity_threshold;
            *self = Self::new(width, height);
            self.center = center;
            self.connectivity_threshold = threshold;
        }

        for row in 0..height {
            for col in 0..width {
                let index = self.index(col, row);
                let src = col * reduction + row * reduction * frame.width;
                self.points[index] = frame.points[src];
                self.colors[index] = frame.colors[src];
                self.visibility[index] = frame.depth[src] > 0;
            }
        }

        self.invalidate();
        Ok(())
    }
}
