use glam::Vec3;

use crate::grid::{GridError, GridPointCloud};

/// Average several scans of the same dimensions.
///
/// Every cell averages the positions and colors of the scans where it is
/// visible, and is visible if it is visible in at least one scan. The center
/// is the mean of the scan centers.
///
/// # Arguments
///
/// * `clouds` - The scans to average.
///
/// # Returns
///
/// The averaged scan, or a 1x1 invisible grid if `clouds` is empty.
///
/// # Errors
///
/// Returns [`GridError::DimensionMismatch`] if the scans differ in dimensions.
pub fn average_clouds(clouds: &[GridPointCloud]) -> Result<GridPointCloud, GridError> {
    let Some(first) = clouds.first() else {
        log::warn!("no scans to average");
        return Ok(GridPointCloud::new(1, 1));
    };

    let expected = (first.width, first.height);
    if let Some(other) = clouds.iter().find(|c| (c.width, c.height) != expected) {
        return Err(GridError::DimensionMismatch {
            expected,
            found: (other.width, other.height),
        });
    }

    let len = first.len();
    let mut sums = vec![Vec3::ZERO; len];
    let mut color_sums = vec![[0u32; 3]; len];
    let mut counts = vec![0u32; len];
    let mut center = Vec3::ZERO;

    for cloud in clouds {
        center += cloud.center;
        for (index, point) in cloud.visible_points() {
            sums[index] += point;
            for (sum, &c) in color_sums[index].iter_mut().zip(&cloud.colors[index]) {
                *sum += c as u32;
            }
            counts[index] += 1;
        }
    }

    let mut average = GridPointCloud::new(first.width, first.height);
    average.center = center / clouds.len() as f32;
    average.connectivity_threshold = first.connectivity_threshold;

    for (index, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let color = color_sums[index].map(|sum| ((sum as f32 / count as f32).round()) as u8);
        average.set_point(index, sums[index] / count as f32, color);
    }

    log::debug!(
        "averaged {} scans into {} visible points",
        clouds.len(),
        average.visible_count()
    );

    Ok(average)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_average_clouds() -> Result<(), GridError> {
        let mut a = GridPointCloud::new(2, 1);
        a.set_point(0, Vec3::new(0.0, 0.0, 0.0), [0, 10, 255]);
        a.set_center(Vec3::new(0.0, 0.0, 0.0));

        let mut b = GridPointCloud::new(2, 1);
        b.set_point(0, Vec3::new(2.0, 4.0, 6.0), [1, 20, 255]);
        b.set_point(1, Vec3::new(1.0, 1.0, 1.0), [7, 7, 7]);
        b.set_center(Vec3::new(2.0, 2.0, 2.0));

        let average = average_clouds(&[a, b])?;
        assert_eq!(average.visibility(), &[true, true]);
        assert_eq!(average.points()[0], Vec3::new(1.0, 2.0, 3.0));
        // 0.5 rounds away from zero
        assert_eq!(average.colors()[0], [1, 15, 255]);
        // only visible in one scan
        assert_eq!(average.points()[1], Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(average.colors()[1], [7, 7, 7]);
        assert_relative_eq!(average.center().x, 1.0);
        Ok(())
    }

    #[test]
    fn test_average_edge_cases() {
        let empty = average_clouds(&[]).unwrap();
        assert_eq!((empty.width(), empty.height()), (1, 1));
        assert_eq!(empty.visible_count(), 0);

        let res = average_clouds(&[GridPointCloud::new(2, 2), GridPointCloud::new(3, 2)]);
        assert!(matches!(
            res,
            Err(GridError::DimensionMismatch {
                expected: (2, 2),
                found: (3, 2)
            })
        ));
    }
}
