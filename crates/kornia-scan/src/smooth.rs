use glam::Vec3;

use crate::grid::GridPointCloud;

/// Create a square gaussian kernel truncated to the inscribed disk.
///
/// # Arguments
///
/// * `kernel_size` - The side of the kernel. Should be odd.
///
/// # Returns
///
/// A row-major `kernel_size x kernel_size` vector of unnormalized weights. The
/// weight at offset `(di, dj)` from the middle is `exp(-(di² + dj²) / (2σ²))`
/// with `σ = (kernel_size - 1) / 4`, and zero outside the disk of radius
/// `(kernel_size - 1) / 2`.
pub fn gaussian_disk_kernel(kernel_size: usize) -> Vec<f32> {
    let radius = (kernel_size as isize - 1) / 2;
    let sigma = (kernel_size as f32 - 1.0) / 4.0;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let radius_sq = radius * radius;

    let mut kernel = Vec::with_capacity(kernel_size * kernel_size);
    for di in -radius..=radius {
        for dj in -radius..=radius {
            let dist_sq = di * di + dj * dj;
            if dist_sq <= radius_sq && two_sigma_sq > 0.0 {
                kernel.push((-(dist_sq as f32) / two_sigma_sq).exp());
            } else {
                kernel.push(0.0);
            }
        }
    }
    kernel
}

impl GridPointCloud {
    /// Smooth the point positions with a gaussian kernel.
    ///
    /// Every visible point is replaced by the weighted mean of its visible
    /// neighbors inside the kernel that are connected to it. Weights come from
    /// [`gaussian_disk_kernel`]. Points without qualifying neighbors and
    /// invisible points keep their position. All the means are computed from
    /// the positions before smoothing.
    ///
    /// # Arguments
    ///
    /// * `kernel_size` - The kernel side. Even values are increased by one and
    ///   values not larger than one leave the grid unchanged.
    pub fn gaussian_smooth(&mut self, kernel_size: usize) {
        let kernel_size = if kernel_size % 2 == 0 {
            kernel_size + 1
        } else {
            kernel_size
        };
        if kernel_size <= 1 {
            return;
        }

        let kernel = gaussian_disk_kernel(kernel_size);
        let radius = (kernel_size - 1) / 2;
        let source = self.points.clone();

        for row in 0..self.height {
            for col in 0..self.width {
                let index = self.index(col, row);
                if !self.visibility[index] {
                    continue;
                }

                let point = source[index];
                let mut weighted_sum = Vec3::ZERO;
                let mut weight_sum = 0.0f32;

                let rows = row.saturating_sub(radius)..=(row + radius).min(self.height - 1);
                for nrow in rows {
                    let cols = col.saturating_sub(radius)..=(col + radius).min(self.width - 1);
                    for ncol in cols {
                        let nindex = self.index(ncol, nrow);
                        let weight = kernel[(ncol + radius - col) + (nrow + radius - row) * kernel_size];
                        if weight > 0.0
                            && self.visibility[nindex]
                            && self.connected(point, source[nindex])
                        {
                            weighted_sum += source[nindex] * weight;
                            weight_sum += weight;
                        }
                    }
                }

                if weight_sum > 0.0 {
                    self.points[index] = weighted_sum / weight_sum;
                }
            }
        }

        log::debug!("gaussian smoothing with kernel size {}", kernel_size);
        self.invalidate();
    }
}
