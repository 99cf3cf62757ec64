use crate::grid::{GridError, GridPointCloud};

/// Apply processing steps to a scan while keeping the untouched original.
///
/// Every processing step starts again from the original scan, so that the
/// parameters can be tuned interactively without accumulating the effect of
/// previous attempts. Two visibility masks are kept next to the modified scan:
/// the mask right after the last processing step and an active mask that
/// callers can edit and apply.
#[derive(Debug, Clone)]
pub struct ScanModifier {
    original: GridPointCloud,
    modified: GridPointCloud,
    initial_visibility: Vec<bool>,
    active_visibility: Vec<bool>,
}

impl ScanModifier {
    /// Create a modifier from a scan.
    pub fn new(scan: GridPointCloud) -> Self {
        let modified = scan.clone();
        let mut modifier = Self {
            original: scan,
            modified,
            initial_visibility: Vec::new(),
            active_visibility: Vec::new(),
        };
        modifier.reset_visibility();
        modifier
    }

    /// The untouched scan.
    pub fn original(&self) -> &GridPointCloud {
        &self.original
    }

    /// The processed scan.
    pub fn modified(&self) -> &GridPointCloud {
        &self.modified
    }

    /// Mutable access to the processed scan, to compute its derived state.
    pub fn modified_mut(&mut self) -> &mut GridPointCloud {
        &mut self.modified
    }

    /// Consume the modifier and return the processed scan.
    pub fn into_modified(self) -> GridPointCloud {
        self.modified
    }

    /// Discard all the modifications.
    pub fn reset(&mut self) {
        self.modified = self.original.clone();
        self.reset_visibility();
    }

    /// Reduce the resolution of the original scan. See
    /// [`GridPointCloud::reduce_resolution`].
    pub fn reduce_resolution(&mut self, factor: usize) {
        self.reset();
        self.modified.reduce_resolution(factor);
        self.reset_visibility();
    }

    /// Fill the holes of the original scan. See [`GridPointCloud::fill_holes`].
    ///
    /// # Returns
    ///
    /// The number of filled cells.
    pub fn fill_holes(&mut self, max_gap: usize) -> usize {
        self.reset();
        let filled = self.modified.fill_holes(max_gap);
        self.reset_visibility();
        filled
    }

    /// Smooth the original scan. See [`GridPointCloud::gaussian_smooth`].
    pub fn gaussian_smooth(&mut self, kernel_size: usize) {
        self.reset();
        self.modified.gaussian_smooth(kernel_size);
        self.reset_visibility();
    }

    /// The visibility mask of the processed scan before any edit.
    pub fn initial_visibility(&self) -> &[bool] {
        &self.initial_visibility
    }

    /// The editable visibility mask.
    pub fn active_visibility(&self) -> &[bool] {
        &self.active_visibility
    }

    /// Mutable access to the editable visibility mask.
    pub fn active_visibility_mut(&mut self) -> &mut [bool] {
        &mut self.active_visibility
    }

    /// Copy the editable visibility mask into the processed scan.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SizeMismatch`] if the processed scan was resized
    /// through [`ScanModifier::modified_mut`] after the masks were created.
    pub fn apply_visibility_mask(&mut self) -> Result<(), GridError> {
        self.modified.apply_visibility_mask(&self.active_visibility)
    }

    fn reset_visibility(&mut self) {
        self.initial_visibility = self.modified.visibility.clone();
        self.active_visibility = self.modified.visibility.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn line_scan() -> GridPointCloud {
        let mut grid = GridPointCloud::new(6, 2);
        for i in 0..grid.len() {
            let (col, row) = grid.col_row(i);
            grid.set_point(i, Vec3::new(col as f32, row as f32, 0.0), [10; 3]);
        }
        grid.hide_point(2);
        grid
    }

    #[test]
    fn test_steps_restart_from_original() {
        let mut modifier = ScanModifier::new(line_scan());

        modifier.reduce_resolution(2);
        assert_eq!(modifier.modified().width(), 3);

        // the hole filling starts from the full resolution scan
        let filled = modifier.fill_holes(3);
        assert_eq!(filled, 1);
        assert_eq!(modifier.modified().width(), 6);
        assert_eq!(modifier.modified().visible_count(), 12);
        assert_eq!(modifier.original().visible_count(), 11);
        assert_eq!(modifier.initial_visibility(), modifier.modified().visibility());

        modifier.reset();
        assert_eq!(modifier.modified(), modifier.original());
    }

    #[test]
    fn test_apply_mask_after_resize() {
        let mut modifier = ScanModifier::new(line_scan());
        modifier.modified_mut().reduce_resolution(2);
        assert!(matches!(
            modifier.apply_visibility_mask(),
            Err(GridError::SizeMismatch {
                expected: 3,
                found: 12
            })
        ));

        // processing steps rebuild the masks
        modifier.gaussian_smooth(3);
        assert!(modifier.apply_visibility_mask().is_ok());
    }

    #[test]
    fn test_visibility_masks() -> Result<(), GridError> {
        let mut modifier = ScanModifier::new(line_scan());
        modifier.modified_mut().calculate_normals();

        modifier.active_visibility_mut()[0] = false;
        assert!(modifier.modified().is_visible(0));

        modifier.apply_visibility_mask()?;
        assert!(!modifier.modified().is_visible(0));
        assert!(modifier.modified().normals().is_none());
        assert!(modifier.initial_visibility()[0]);
        assert!(!modifier.active_visibility()[0]);

        modifier.gaussian_smooth(3);
        assert!(modifier.modified().is_visible(0));
        assert_eq!(
            modifier.into_modified().visible_count(),
            line_scan().visible_count()
        );
        Ok(())
    }
}
