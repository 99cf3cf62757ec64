use argh::FromArgs;
use std::path::{Path, PathBuf};

use kornia_scan::{
    config::ProcessingConfig,
    io::points::{read_points, write_points},
    mesh::MeshOptions,
};

#[derive(FromArgs)]
/// Process a points file scan and report its mesh statistics
struct Args {
    /// path to the input points file
    #[argh(option, short = 'i')]
    input_path: PathBuf,

    /// path to write the processed points file
    #[argh(option, short = 'o')]
    output_path: Option<PathBuf>,

    /// path to a JSON processing configuration
    #[argh(option, short = 'c')]
    config_path: Option<PathBuf>,

    /// attach colors to the mesh vertices
    #[argh(switch)]
    with_colors: bool,
}

/// Error types for the configuration file.
#[derive(Debug, thiserror::Error)]
enum ConfigError {
    /// Error reading the file
    #[error("error reading the configuration file")]
    Io(#[from] std::io::Error),

    /// Error parsing the JSON content
    #[error("error parsing the configuration file")]
    Json(#[from] serde_json::Error),
}

fn read_config(path: &Path) -> Result<ProcessingConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config_path {
        Some(path) => read_config(path)?,
        None => ProcessingConfig::default(),
    };
    log::info!("processing config: {:?}", config);

    let mut scan = read_points(&args.input_path)?;
    log::info!(
        "loaded {}x{} scan with {} visible points",
        scan.width(),
        scan.height(),
        scan.visible_count()
    );

    config.apply(&mut scan);

    let options = MeshOptions {
        with_colors: args.with_colors,
        with_normals: config.normals,
    };
    let triangles = scan.triangles(options);
    let lines = scan.lines(options);
    let points = scan.point_mesh(options);
    let bands = scan.bands(1, options);

    log::info!(
        "mesh: {} triangles, {} lines, {} points, {} bands",
        triangles.len(),
        lines.len(),
        points.len(),
        bands.len()
    );

    if let Some(back) = scan.back_triangles(options) {
        log::info!("back side: {} triangles", back.len());
    }

    if let Some((lower, upper)) = scan.calculate_limits() {
        log::info!("limits: {:?} to {:?}", lower, upper);
    }

    if let Some(path) = &args.output_path {
        write_points(path, &scan)?;
        log::info!("wrote processed scan to {}", path.display());
    }

    Ok(())
}
