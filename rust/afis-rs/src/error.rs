use thiserror::Error;
use template_manager::TemplateError;

/// Errors reported by template construction.
///
/// Only structurally invalid input fails; degenerate but valid input (blank
/// images, tiny templates) always produces a template.
#[derive(Error, Debug)]
pub enum AfisError {
    #[error("Raster has no pixels: {width}x{height}")]
    EmptyRaster { width: usize, height: usize },

    #[error("Raster of {width}x{height} needs {expected} samples, got {actual}")]
    PixelCountMismatch { width: usize, height: usize, expected: usize, actual: usize },

    #[error("Resolution must be positive: {0} DPI")]
    InvalidDpi(i32),

    #[error("Raster of {width}x{height} at {dpi} DPI scales down to nothing")]
    DegenerateScaling { width: usize, height: usize, dpi: i32 },

    #[error("Template record error: {0}")]
    Record(#[from] TemplateError),
}

pub type Result<T> = std::result::Result<T, AfisError>;
