use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::grid::GridPointCloud;

/// Vertex attributes to attach to the generated meshes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshOptions {
    /// Attach the point colors.
    pub with_colors: bool,
    /// Attach the point normals, when they are available.
    pub with_normals: bool,
}

/// The kind of primitive a [`Mesh`] is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Three vertices per triangle.
    Triangles,
    /// A strip where every vertex after the first two closes a triangle.
    TriangleStrip,
    /// Two vertices per line segment.
    Lines,
    /// One vertex per point.
    Points,
}

impl Primitive {
    /// Number of vertices of a single primitive.
    pub fn arity(&self) -> usize {
        match self {
            Primitive::Triangles | Primitive::TriangleStrip => 3,
            Primitive::Lines => 2,
            Primitive::Points => 1,
        }
    }
}

/// A mesh vertex, ready to be consumed by a renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    /// The vertex position.
    pub position: Vec3,
    /// The vertex color, if requested.
    pub color: Option<[u8; 3]>,
    /// The unit vertex normal, if requested and available.
    pub normal: Option<Vec3>,
}

/// A flat list of primitives generated from a grid point cloud.
#[derive(Debug, Clone)]
pub struct Mesh {
    primitive: Primitive,
    vertices: Vec<MeshVertex>,
    cells: Vec<usize>,
}

impl Mesh {
    /// The primitive kind.
    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    /// The vertices, grouped by [`Primitive::arity`] or in strip order.
    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    /// The grid cell every vertex comes from.
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// Number of primitives.
    pub fn len(&self) -> usize {
        match self.primitive {
            Primitive::TriangleStrip => self.vertices.len().saturating_sub(2),
            primitive => self.vertices.len() / primitive.arity(),
        }
    }

    /// Check if the mesh has no primitives.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl GridPointCloud {
    /// Triangulate the visible points.
    ///
    /// Every 2x2 block of cells is split in two triangles. If the natural
    /// triangle of a half is rejected, because a vertex is invisible or a pair
    /// of vertices is not connected, the triangle over the other diagonal is
    /// tried instead. A triangle is kept only if its three vertices are visible
    /// and pairwise connected.
    ///
    /// # Returns
    ///
    /// The grid indices of the triangle vertices.
    pub fn triangle_indices(&self) -> Vec<[usize; 3]> {
        self.triangulate(&self.points)
    }

    /// Connect every visible point with its right, lower and lower-right
    /// neighbors when they are visible and connected.
    pub fn line_indices(&self) -> Vec<[usize; 2]> {
        let mut lines = Vec::new();
        for row in 0..self.height {
            for col in 0..self.width {
                let index = self.index(col, row);
                if !self.visibility[index] {
                    continue;
                }
                let has_right = col + 1 < self.width;
                let has_down = row + 1 < self.height;
                let neighbors = [
                    has_right.then(|| index + 1),
                    has_down.then(|| index + self.width),
                    (has_right && has_down).then(|| index + 1 + self.width),
                ];
                for neighbor in neighbors.into_iter().flatten() {
                    if self.cells_connected(index, neighbor) {
                        lines.push([index, neighbor]);
                    }
                }
            }
        }
        lines
    }

    /// Build horizontal bands of triangle strips, one band every
    /// `vertical_gap` rows.
    ///
    /// A band alternates a cell and the cell below it. When the lower cell is
    /// invisible or not connected, the upper cell is repeated instead. A band
    /// breaks at an invisible cell, where the lower cell closes it if it is
    /// connected to the previous cell, and before a cell that is not connected
    /// to its left neighbor. Strips with fewer than three vertices are dropped.
    ///
    /// # Returns
    ///
    /// The grid indices of every strip, in strip order.
    pub fn band_indices(&self, vertical_gap: usize) -> Vec<Vec<usize>> {
        let mut bands = Vec::new();
        let mut band = Vec::new();
        let mut close = |band: &mut Vec<usize>| {
            if band.len() >= 3 {
                bands.push(std::mem::take(band));
            } else {
                band.clear();
            }
        };

        for row in (0..self.height.saturating_sub(1)).step_by(vertical_gap.max(1)) {
            close(&mut band);

            let mut col = 0;
            while col < self.width {
                let index = self.index(col, row);
                let lower = index + self.width;

                if self.visibility[index] {
                    // the band is not empty only if the left cell was added
                    if !band.is_empty()
                        && !self.connected(self.points[index], self.points[index - 1])
                    {
                        // start a new band at this cell
                        close(&mut band);
                        continue;
                    }
                    band.push(index);
                    band.push(if self.cells_connected(index, lower) {
                        lower
                    } else {
                        index
                    });
                } else if !band.is_empty() {
                    if self.visibility[lower]
                        && self.connected(self.points[lower], self.points[index - 1])
                    {
                        band.push(lower);
                    }
                    close(&mut band);
                }
                col += 1;
            }
        }
        close(&mut band);

        bands
    }

    /// Build the band strips of the scan. See [`GridPointCloud::band_indices`].
    pub fn bands(&self, vertical_gap: usize, options: MeshOptions) -> Vec<Mesh> {
        let bands = self.band_indices(vertical_gap);
        log::debug!("built {} bands with vertical gap {}", bands.len(), vertical_gap);
        bands
            .into_iter()
            .map(|band| {
                self.build_mesh(
                    Primitive::TriangleStrip,
                    band.into_iter(),
                    &self.points,
                    options,
                    1.0,
                )
            })
            .collect()
    }

    /// Indices of the visible points.
    pub fn point_indices(&self) -> Vec<usize> {
        self.visible_points().map(|(i, _)| i).collect()
    }

    /// Build the triangle mesh of the scan front side.
    pub fn triangles(&self, options: MeshOptions) -> Mesh {
        let indices = self.triangle_indices();
        log::debug!("triangulated {} triangles", indices.len());
        self.build_mesh(
            Primitive::Triangles,
            indices.iter().flatten().copied(),
            &self.points,
            options,
            1.0,
        )
    }

    /// Build the line mesh of the scan.
    pub fn lines(&self, options: MeshOptions) -> Mesh {
        let indices = self.line_indices();
        self.build_mesh(
            Primitive::Lines,
            indices.iter().flatten().copied(),
            &self.points,
            options,
            1.0,
        )
    }

    /// Build the point mesh of the scan.
    pub fn point_mesh(&self, options: MeshOptions) -> Mesh {
        self.build_mesh(
            Primitive::Points,
            self.point_indices().into_iter(),
            &self.points,
            options,
            1.0,
        )
    }

    /// Build the triangle mesh of the back surface, with flipped normals.
    ///
    /// Returns `None` if the back points have not been computed.
    pub fn back_triangles(&self, options: MeshOptions) -> Option<Mesh> {
        let back_points = self.back_points.as_deref()?;
        let indices = self.triangulate(back_points);
        Some(self.build_mesh(
            Primitive::Triangles,
            indices.iter().flatten().copied(),
            back_points,
            options,
            -1.0,
        ))
    }

    fn triangulate(&self, positions: &[Vec3]) -> Vec<[usize; 3]> {
        let visible = &self.visibility;
        let valid = |a: usize, b: usize, c: usize| {
            visible[a]
                && visible[b]
                && visible[c]
                && self.connected(positions[a], positions[b])
                && self.connected(positions[a], positions[c])
                && self.connected(positions[b], positions[c])
        };

        let mut triangles = Vec::new();
        for row in 0..self.height.saturating_sub(1) {
            for col in 0..self.width.saturating_sub(1) {
                let i = self.index(col, row);
                let right = i + 1;
                let down = i + self.width;
                let diag = down + 1;

                if valid(i, right, down) {
                    triangles.push([i, right, down]);
                } else if valid(i, diag, down) {
                    triangles.push([i, diag, down]);
                }

                if valid(right, diag, down) {
                    triangles.push([right, diag, down]);
                } else if valid(i, right, diag) {
                    triangles.push([i, right, diag]);
                }
            }
        }
        triangles
    }

    fn build_mesh(
        &self,
        primitive: Primitive,
        cells: impl Iterator<Item = usize>,
        positions: &[Vec3],
        options: MeshOptions,
        normal_sign: f32,
    ) -> Mesh {
        let normals = self.normals.as_deref().filter(|_| options.with_normals);
        let cells = cells.collect::<Vec<_>>();
        let vertices = cells
            .iter()
            .map(|&i| MeshVertex {
                position: positions[i],
                color: options.with_colors.then(|| self.colors[i]),
                normal: normals.map(|n| n[i] * normal_sign),
            })
            .collect();

        Mesh {
            primitive,
            vertices,
            cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_grid(width: usize, height: usize) -> GridPointCloud {
        let mut grid = GridPointCloud::new(width, height);
        for i in 0..grid.len() {
            let (col, row) = grid.col_row(i);
            grid.set_point(i, Vec3::new(col as f32, row as f32, 0.0), [col as u8, row as u8, 0]);
        }
        grid
    }

    #[test]
    fn test_flat_grid_triangles() {
        let grid = flat_grid(4, 4);
        let mesh = grid.triangles(MeshOptions::default());
        assert_eq!(mesh.len(), 18);
        assert_eq!(mesh.vertices().len(), 54);
        assert_eq!(mesh.primitive(), Primitive::Triangles);
        assert!(mesh.vertices().iter().all(|v| v.color.is_none() && v.normal.is_none()));
    }

    #[test]
    fn test_fallback_diagonal() {
        let mut grid = flat_grid(2, 2);
        // missing upper-right corner: only the other diagonal survives
        grid.hide_point(1);
        assert_eq!(grid.triangle_indices(), vec![[0, 3, 2]]);

        let mut grid = flat_grid(2, 2);
        grid.hide_point(2);
        assert_eq!(grid.triangle_indices(), vec![[0, 1, 3]]);
    }

    #[test]
    fn test_fallback_on_disconnected_corner() {
        let mut grid = flat_grid(2, 2);
        grid.set_connectivity_threshold(4.0);
        grid.set_point(1, Vec3::new(1.0, 0.0, 50.0), [0; 3]);
        assert_eq!(grid.triangle_indices(), vec![[0, 3, 2]]);

        let mut grid = flat_grid(2, 2);
        grid.set_connectivity_threshold(4.0);
        grid.set_point(2, Vec3::new(0.0, 1.0, 50.0), [0; 3]);
        assert_eq!(grid.triangle_indices(), vec![[0, 1, 3]]);
    }

    #[test]
    fn test_disconnected_vertices_are_never_joined() {
        let mut grid = flat_grid(4, 4);
        grid.set_connectivity_threshold(4.0);
        let far = grid.index(1, 1);
        grid.set_point(far, Vec3::new(1.0, 1.0, 50.0), [0; 3]);

        for tri in grid.triangle_indices() {
            for a in tri {
                for b in tri {
                    assert!(grid.connected(grid.points()[a], grid.points()[b]));
                }
            }
            assert!(!tri.contains(&far));
        }
        for [a, b] in grid.line_indices() {
            assert!(grid.connected(grid.points()[a], grid.points()[b]));
            assert!(a != far && b != far);
        }
    }

    #[test]
    fn test_lines_and_points() {
        let mut grid = flat_grid(3, 2);
        assert_eq!(grid.line_indices().len(), 3 + 4 + 2);
        assert_eq!(grid.point_indices().len(), 6);

        grid.hide_point(4);
        assert_eq!(grid.point_mesh(MeshOptions::default()).len(), 5);
        assert_eq!(grid.lines(MeshOptions::default()).len(), 5);
    }

    #[test]
    fn test_bands() {
        let grid = flat_grid(3, 2);
        assert_eq!(grid.band_indices(1), vec![vec![0, 3, 1, 4, 2, 5]]);

        let bands = grid.bands(1, MeshOptions::default());
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].primitive(), Primitive::TriangleStrip);
        assert_eq!(bands[0].len(), 4);

        // one band every two rows
        let grid = flat_grid(3, 5);
        let bands = grid.band_indices(2);
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[1][0], grid.index(0, 2));
    }

    #[test]
    fn test_bands_break_at_invisible_cells() {
        let mut grid = flat_grid(3, 2);
        grid.hide_point(1);
        // the lower cell closes the band, the band on the right is too short
        assert_eq!(grid.band_indices(1), vec![vec![0, 3, 4]]);

        let mut grid = flat_grid(3, 2);
        grid.hide_point(4);
        // missing lower cells repeat the upper one
        assert_eq!(grid.band_indices(1), vec![vec![0, 3, 1, 1, 2, 5]]);
    }

    #[test]
    fn test_bands_break_at_disconnected_cells() {
        let mut grid = flat_grid(5, 2);
        grid.set_connectivity_threshold(4.0);
        grid.set_point(2, Vec3::new(2.0, 0.0, 50.0), [0; 3]);

        let bands = grid.band_indices(1);
        assert_eq!(bands, vec![vec![0, 5, 1, 6], vec![3, 8, 4, 9]]);
        for band in &bands {
            for pair in band.windows(2) {
                assert!(grid.connected(grid.points()[pair[0]], grid.points()[pair[1]]));
            }
        }
    }

    #[test]
    fn test_vertex_attributes() {
        let mut grid = flat_grid(2, 2);
        let options = MeshOptions {
            with_colors: true,
            with_normals: true,
        };

        // normals requested but not computed
        let mesh = grid.triangles(options);
        assert!(mesh.vertices().iter().all(|v| v.normal.is_none()));

        grid.calculate_normals();
        let mesh = grid.triangles(options);
        let first = mesh.vertices()[0];
        assert_eq!(first.color, Some([0, 0, 0]));
        assert_eq!(first.normal, Some(Vec3::Z));
        assert_eq!(mesh.cells()[1], 1);
    }

    #[test]
    fn test_back_triangles() {
        let mut grid = flat_grid(3, 3);
        assert!(grid.back_triangles(MeshOptions::default()).is_none());

        grid.calculate_back_points();
        let options = MeshOptions {
            with_colors: false,
            with_normals: true,
        };
        let back = grid.back_triangles(options).unwrap();
        assert_eq!(back.len(), 8);
        assert!(back.vertices().iter().all(|v| v.position.z < 0.0));
        assert_eq!(back.vertices()[0].normal, Some(-Vec3::Z));
    }
}
