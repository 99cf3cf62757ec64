/// Plain text points file reader and writer.
pub mod points;
