use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use glam::Vec3;

use crate::grid::GridPointCloud;

/// The line written in place of an invisible point.
pub const INVISIBLE_LINE: &str = "-99 -99 -99 -99 -99 -99";

/// Error types for the points file module.
#[derive(Debug, thiserror::Error)]
pub enum PointsFileError {
    /// Error reading or writing file
    #[error("error reading or writing file")]
    Io(#[from] std::io::Error),

    /// The file has no dimensions line
    #[error("Missing dimensions line")]
    MissingHeader,

    /// Parse error
    #[error("Parse error at line {line}: {message}")]
    ParseError {
        /// one-based line number
        line: usize,
        /// what went wrong
        message: String,
    },

    /// The number of data lines does not match the dimensions
    #[error("Expected {expected} point lines, found {found}")]
    LineCountMismatch {
        /// number of lines required by the dimensions
        expected: usize,
        /// number of lines in the file
        found: usize,
    },
}

/// Read a points file.
///
/// The first line holds the grid dimensions `<width> <height>` and every
/// following line a cell `x y z r g b`, with the sentinel [`INVISIBLE_LINE`]
/// for invisible cells. The center of the loaded grid is the centroid of its
/// visible points.
///
/// # Arguments
///
/// * `path` - The path to the points file.
pub fn read_points(path: impl AsRef<Path>) -> Result<GridPointCloud, PointsFileError> {
    let file = File::open(path)?;
    read_points_from(BufReader::new(file))
}

/// Read a points file from a buffered reader. See [`read_points`].
pub fn read_points_from<R: BufRead>(reader: R) -> Result<GridPointCloud, PointsFileError> {
    // keep the line numbers and skip blank lines
    let mut lines = reader
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()));

    let (header_index, header) = lines.next().ok_or(PointsFileError::MissingHeader)?;
    let header_line = header_index + 1;
    let (width, height) = parse_dimensions(&header?, header_line)?;

    let expected = width
        .checked_mul(height)
        .ok_or_else(|| PointsFileError::ParseError {
            line: header_line,
            message: format!("Grid dimensions {}x{} are too large", width, height),
        })?;

    // the grid is only allocated once the file holds all its cells
    let mut cells = Vec::new();
    let mut found = 0;
    for (line_number, line) in lines {
        let line = line?;
        if found < expected {
            cells.push(parse_point_line(&line, line_number + 1)?);
        }
        found += 1;
    }

    if found != expected {
        return Err(PointsFileError::LineCountMismatch { expected, found });
    }

    let mut grid = GridPointCloud::new(width, height);
    for (index, cell) in cells.into_iter().enumerate() {
        if let Some((point, color)) = cell {
            grid.points[index] = point;
            grid.colors[index] = color;
            grid.visibility[index] = true;
        }
    }

    if let Some(centroid) = grid.centroid() {
        grid.center = centroid;
    }

    log::debug!(
        "read {}x{} points grid with {} visible points",
        width,
        height,
        grid.visible_count()
    );

    Ok(grid)
}

/// Write a grid to a points file.
///
/// The positions are written relative to the grid center.
///
/// # Arguments
///
/// * `path` - The path to the points file.
/// * `grid` - The grid to write.
pub fn write_points(path: impl AsRef<Path>, grid: &GridPointCloud) -> Result<(), PointsFileError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_points_to(&mut writer, grid)?;
    writer.flush()?;
    Ok(())
}

/// Write a grid to a writer. See [`write_points`].
pub fn write_points_to<W: Write>(mut writer: W, grid: &GridPointCloud) -> Result<(), PointsFileError> {
    writeln!(writer, "{} {}", grid.width(), grid.height())?;

    let center = grid.center();
    for ((point, color), &visible) in grid
        .points()
        .iter()
        .zip(grid.colors())
        .zip(grid.visibility())
    {
        if visible {
            let p = *point - center;
            writeln!(
                writer,
                "{} {} {} {} {} {}",
                p.x, p.y, p.z, color[0], color[1], color[2]
            )?;
        } else {
            writeln!(writer, "{}", INVISIBLE_LINE)?;
        }
    }

    Ok(())
}

/// Utility function to parse a token of a points file.
fn parse_part<T: std::str::FromStr>(s: &str, line: usize) -> Result<T, PointsFileError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>().map_err(|e| PointsFileError::ParseError {
        line,
        message: format!("{}: {}", s, e),
    })
}

fn parse_dimensions(line: &str, line_number: usize) -> Result<(usize, usize), PointsFileError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();
    match parts.as_slice() {
        [width, height] => Ok((
            parse_part(width, line_number)?,
            parse_part(height, line_number)?,
        )),
        _ => Err(PointsFileError::ParseError {
            line: line_number,
            message: format!("Invalid number of dimensions: {}", parts.len()),
        }),
    }
}

/// Parse a point line. Returns `None` for invisible points, marked with a
/// negative red channel.
fn parse_point_line(line: &str, line_number: usize) -> Result<Option<(Vec3, [u8; 3])>, PointsFileError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();
    if parts.len() != 6 {
        return Err(PointsFileError::ParseError {
            line: line_number,
            message: format!("Invalid number of parts: {}", parts.len()),
        });
    }

    let values = parts
        .iter()
        .map(|s| parse_part::<f32>(s, line_number))
        .collect::<Result<Vec<_>, _>>()?;

    if values[3] < 0.0 {
        return Ok(None);
    }

    let mut color = [0u8; 3];
    for (channel, &value) in color.iter_mut().zip(&values[3..]) {
        let value = value.round();
        if !(0.0..=255.0).contains(&value) {
            return Err(PointsFileError::ParseError {
                line: line_number,
                message: format!("Color channel out of range: {}", value),
            });
        }
        *channel = value as u8;
    }

    Ok(Some((Vec3::new(values[0], values[1], values[2]), color)))
}
