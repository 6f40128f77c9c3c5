use image::{GrayImage, Luma};

use crate::regions::LabelImage;

/// Constants
pub const FOREGROUND: u8 = 255; // Value written for set pixels by the binary transforms
pub const BACKGROUND: u8 = 0;

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}

/// True when every pixel is either 0 or 255
pub fn is_binary(image: &GrayImage) -> bool {
    image.pixels().all(|p| p[0] == BACKGROUND || p[0] == FOREGROUND)
}

/// Spread labels over the 8-bit range so neighbouring regions are distinguishable
pub fn labels_to_gray(labels: &LabelImage) -> GrayImage {
    let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0);
    let (width, height) = labels.dimensions();

    GrayImage::from_fn(width, height, |x, y| {
        let label = labels.get_pixel(x, y)[0];
        if label == 0 || max_label == 0 {
            Luma([BACKGROUND])
        } else {
            // Keep labelled pixels away from pure black
            let scaled = 55 + (u64::from(label) * 200 / u64::from(max_label)) as u32;
            Luma([scaled.min(255) as u8])
        }
    })
}
