use crate::constants::DEFAULT_DPI;
use crate::error::{AfisError, Result};

use template_manager::fingerprint_base::round_to_int;

use ndarray::Array2;
use tracing::debug;

/// Grayscale fingerprint image in the pipeline's convention: row 0 is the
/// bottom row and high values are dark ridges.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pixels: Array2<u8>,
    dpi: i32,
}

impl Raster {
    /// Wraps samples that are already bottom-up with dark ridges as high values.
    /// `pixels` is row-major, `width * height` long.
    pub fn new(width: usize, height: usize, pixels: Vec<u8>, dpi: i32) -> Result<Self> {
        let actual = pixels.len();
        validate(width, height, actual, dpi)?;
        let pixels = Array2::from_shape_vec((height, width), pixels)
            .map_err(|_| AfisError::PixelCountMismatch { width, height, expected: width * height, actual })?;
        Ok(Raster { pixels, dpi })
    }

    /// Ingests an ordinary capture (top row first, dark ridges as low values):
    /// rows are flipped and every sample inverted.
    pub fn from_capture(width: usize, height: usize, pixels: Vec<u8>, dpi: i32) -> Result<Self> {
        validate(width, height, pixels.len(), dpi)?;
        let pixels = Array2::from_shape_fn((height, width), |(y, x)| 255 - pixels[(height - y - 1) * width + x]);
        Ok(Raster { pixels, dpi })
    }

    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    pub fn dpi(&self) -> i32 {
        self.dpi
    }

    pub fn pixels(&self) -> &Array2<u8> {
        &self.pixels
    }

    /// Samples resampled to the pipeline's native resolution
    pub(crate) fn normalized(&self) -> Result<Array2<u8>> {
        if self.dpi == DEFAULT_DPI {
            return Ok(self.pixels.clone());
        }

        let ratio = DEFAULT_DPI as f64 / self.dpi as f64;
        let new_width = round_to_int(ratio * self.width() as f64);
        let new_height = round_to_int(ratio * self.height() as f64);
        if new_width <= 0 || new_height <= 0 {
            return Err(AfisError::DegenerateScaling { width: self.width(), height: self.height(), dpi: self.dpi });
        }

        debug!("scaling {}x{} at {} DPI to {}x{}", self.width(), self.height(), self.dpi, new_width, new_height);
        Ok(scale_image(&self.pixels, new_width as usize, new_height as usize))
    }
}

fn validate(width: usize, height: usize, actual: usize, dpi: i32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(AfisError::EmptyRaster { width, height });
    }
    if actual != width * height {
        return Err(AfisError::PixelCountMismatch { width, height, expected: width * height, actual });
    }
    if dpi <= 0 {
        return Err(AfisError::InvalidDpi(dpi));
    }
    Ok(())
}

/// Area-weighted resampling: every output pixel averages the source pixels it
/// overlaps, weighted by the overlapped area.
pub(crate) fn scale_image(input: &Array2<u8>, new_width: usize, new_height: usize) -> Array2<u8> {
    let (old_height, old_width) = input.dim();
    let scale_x = new_width as f64 / old_width as f64;
    let scale_y = new_height as f64 / old_height as f64;
    let descale_x = 1.0 / scale_x;
    let descale_y = 1.0 / scale_y;

    let mut output = Array2::<u8>::zeros((new_height, new_width));
    for y in 0..new_height {
        let y1 = y as f64 * descale_y;
        let y2 = y1 + descale_y;
        let y1i = y1 as usize;
        let y2i = (y2.ceil() as usize).min(old_height);
        for x in 0..new_width {
            let x1 = x as f64 * descale_x;
            let x2 = x1 + descale_x;
            let x1i = x1 as usize;
            let x2i = (x2.ceil() as usize).min(old_width);

            let mut sum = 0.0;
            for oy in y1i..y2i {
                let ry = ((oy + 1) as f64).min(y2) - (oy as f64).max(y1);
                for ox in x1i..x2i {
                    let rx = ((ox + 1) as f64).min(x2) - (ox as f64).max(x1);
                    sum += rx * ry * input[[oy, ox]] as f64;
                }
            }

            output[[y, x]] = round_to_int(sum * scale_x * scale_y).clamp(0, 255) as u8;
        }
    }

    output
}
