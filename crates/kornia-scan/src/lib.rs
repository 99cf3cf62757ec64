#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Averaging of several scans of the same dimensions.
pub mod average;

/// Back surface generation along inverse normals.
pub mod back_surface;

/// Processing pipeline configuration.
pub mod config;

/// Ingestion of depth sensor frames.
pub mod frame;

/// The grid point cloud container.
pub mod grid;

/// Row-local hole filling.
pub mod holes;

/// I/O utilities for reading and writing scans.
pub mod io;

/// Connectivity-gated triangulation.
pub mod mesh;

/// Scan modifier keeping an untouched original.
pub mod modifier;

/// Per-point normal estimation.
pub mod normals;

/// Screen-space point picking.
pub mod pick;

/// Resolution reduction, cropping and extension.
pub mod resample;

/// Volumetric selection of scan points.
pub mod selection;

/// Vertical and horizontal slit scans.
pub mod slit;

/// Connectivity-gated gaussian smoothing.
pub mod smooth;

pub use grid::{GridError, GridPointCloud};
