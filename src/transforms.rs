// src/transforms.rs - Named, parameterised image transforms applied by the pipeline

use std::fmt;

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::errors::{BubbleKickerError, Result};
use crate::image_utils::{BACKGROUND, FOREGROUND};
use crate::morphology::{clear_border, dilate_square, erode_square, fill_holes, footprint_radius, invert};

/// Largest adaptive threshold block; keeps imageproc's running box sums inside `u32`
pub const MAX_BLOCK_SIZE: u32 = 511;

/// A single transform step together with its parameters.
///
/// Every variant maps a grayscale image to a new image of the same size and
/// never touches its input. Static preconditions are checked by
/// [`Operation::validate`]; preconditions that depend on the image (such as
/// the border buffer fitting inside it) are checked by [`Operation::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Canny edge detection with hysteresis thresholds
    Canny { low: f32, high: f32 },
    /// Local mean threshold: pixel > mean(block) - c becomes foreground
    AdaptiveThreshold { block_size: u32, c: f64 },
    /// Global threshold: pixel > level becomes foreground
    Threshold { level: u8 },
    /// Dilation with a square footprint
    Dilate { footprint: u32 },
    /// Erosion with a square footprint
    Erode { footprint: u32 },
    /// Fill background cavities enclosed by foreground
    FillHoles,
    /// Remove objects touching the border
    ClearBorder { buffer_size: u32, bgval: u8 },
    /// Swap foreground and background
    Invert,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Canny { .. } => "canny",
            Operation::AdaptiveThreshold { .. } => "adaptive_threshold",
            Operation::Threshold { .. } => "threshold",
            Operation::Dilate { .. } => "dilate",
            Operation::Erode { .. } => "erode",
            Operation::FillHoles => "fill_holes",
            Operation::ClearBorder { .. } => "clear_border",
            Operation::Invert => "invert",
        }
    }

    /// Check the parameter preconditions that do not depend on the image
    pub fn validate(&self) -> Result<()> {
        match *self {
            Operation::Canny { low, high } => {
                if !low.is_finite() || !high.is_finite() {
                    return Err(BubbleKickerError::invalid_parameter(
                        self.name(),
                        "thresholds must be finite",
                    ));
                }
                if low < 0.0 {
                    return Err(BubbleKickerError::invalid_parameter(
                        self.name(),
                        format!("low threshold must be >= 0, got {}", low),
                    ));
                }
                if low > high {
                    return Err(BubbleKickerError::invalid_parameter(
                        self.name(),
                        format!("low threshold {} exceeds high threshold {}", low, high),
                    ));
                }
                Ok(())
            }
            Operation::AdaptiveThreshold { block_size, c } => {
                if block_size < 3 || block_size % 2 == 0 {
                    return Err(BubbleKickerError::invalid_parameter(
                        self.name(),
                        format!("block_size must be an odd integer >= 3, got {}", block_size),
                    ));
                }
                if block_size > MAX_BLOCK_SIZE {
                    return Err(BubbleKickerError::invalid_parameter(
                        self.name(),
                        format!("block_size must be <= {}, got {}", MAX_BLOCK_SIZE, block_size),
                    ));
                }
                if !c.is_finite() {
                    return Err(BubbleKickerError::invalid_parameter(
                        self.name(),
                        "c must be finite",
                    ));
                }
                Ok(())
            }
            Operation::Dilate { footprint } | Operation::Erode { footprint } => {
                footprint_radius(self.name(), footprint).map(|_| ())
            }
            Operation::Threshold { .. }
            | Operation::FillHoles
            | Operation::ClearBorder { .. }
            | Operation::Invert => Ok(()),
        }
    }

    /// Run the transform, producing a new image
    pub fn apply(&self, image: &GrayImage) -> Result<GrayImage> {
        self.validate()?;

        // Nothing to transform; canny's suppression step also needs a non-empty image
        if image.width() == 0 || image.height() == 0 {
            return Ok(image.clone());
        }

        let output = match *self {
            Operation::Canny { low, high } => imageproc::edges::canny(image, low, high),
            Operation::AdaptiveThreshold { block_size, c } => {
                adaptive_threshold(image, block_size, c)
            }
            Operation::Threshold { level } => imageproc::contrast::threshold(image, level),
            Operation::Dilate { footprint } => dilate_square(image, footprint)?,
            Operation::Erode { footprint } => erode_square(image, footprint)?,
            Operation::FillHoles => fill_holes(image),
            Operation::ClearBorder { buffer_size, bgval } => {
                clear_border(image, buffer_size, bgval)?
            }
            Operation::Invert => invert(image),
        };

        Ok(output)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Canny { low, high } => write!(f, "canny(low={}, high={})", low, high),
            Operation::AdaptiveThreshold { block_size, c } => {
                write!(f, "adaptive_threshold(block_size={}, c={})", block_size, c)
            }
            Operation::Threshold { level } => write!(f, "threshold(level={})", level),
            Operation::Dilate { footprint } => write!(f, "dilate(footprint={})", footprint),
            Operation::Erode { footprint } => write!(f, "erode(footprint={})", footprint),
            Operation::FillHoles => write!(f, "fill_holes()"),
            Operation::ClearBorder { buffer_size, bgval } => {
                write!(f, "clear_border(buffer_size={}, bgval={})", buffer_size, bgval)
            }
            Operation::Invert => write!(f, "invert()"),
        }
    }
}

/// Mean-C adaptive threshold over a square block
fn adaptive_threshold(image: &GrayImage, block_size: u32, c: f64) -> GrayImage {
    let radius = block_size / 2;
    let local_mean = imageproc::filter::box_filter(image, radius, radius);
    let (width, height) = image.dimensions();

    GrayImage::from_fn(width, height, |x, y| {
        let value = f64::from(image.get_pixel(x, y)[0]);
        let mean = f64::from(local_mean.get_pixel(x, y)[0]);
        if value > mean - c {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}
