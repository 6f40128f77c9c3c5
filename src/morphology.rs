// src/morphology.rs - Binary mask operations not covered by imageproc

use std::collections::{HashSet, VecDeque};

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::errors::{BubbleKickerError, Result};
use crate::image_utils::{in_bounds, FOREGROUND, BACKGROUND};

/// Largest footprint whose radius still fits the imageproc `u8` radius
pub const MAX_FOOTPRINT: u32 = 511;

/// 4-connected neighbours, used for flood filling background
static FOUR_NEIGHBOURHOOD: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// Convert a square footprint side length into an LInf radius
pub fn footprint_radius(operation: &str, footprint: u32) -> Result<u8> {
    if footprint == 0 || footprint % 2 == 0 {
        return Err(BubbleKickerError::invalid_parameter(
            operation,
            format!("footprint must be a positive odd integer, got {}", footprint),
        ));
    }
    if footprint > MAX_FOOTPRINT {
        return Err(BubbleKickerError::invalid_parameter(
            operation,
            format!("footprint must be <= {}, got {}", MAX_FOOTPRINT, footprint),
        ));
    }
    Ok((footprint / 2) as u8)
}

/// Dilate non-zero pixels with a square footprint
pub fn dilate_square(image: &GrayImage, footprint: u32) -> Result<GrayImage> {
    let radius = footprint_radius("dilate", footprint)?;
    Ok(imageproc::morphology::dilate(image, Norm::LInf, radius))
}

/// Erode non-zero pixels with a square footprint
pub fn erode_square(image: &GrayImage, footprint: u32) -> Result<GrayImage> {
    let radius = footprint_radius("erode", footprint)?;
    Ok(imageproc::morphology::erode(image, Norm::LInf, radius))
}

/// Fill background cavities enclosed by foreground.
///
/// Background pixels that cannot reach the image border through other
/// 4-connected background pixels become foreground. The result is binary.
pub fn fill_holes(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut outside = vec![false; (width as usize) * (height as usize)];
    let mut queue = VecDeque::new();
    let index = |x: u32, y: u32| (y as usize) * (width as usize) + x as usize;

    // Seed with every background pixel on the border
    for y in 0..height {
        for x in 0..width {
            let on_border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            if on_border && image.get_pixel(x, y)[0] == BACKGROUND {
                outside[index(x, y)] = true;
                queue.push_back((x, y));
            }
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        for &(dx, dy) in &FOUR_NEIGHBOURHOOD {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if !in_bounds(nx, ny, width, height) {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if !outside[index(nx, ny)] && image.get_pixel(nx, ny)[0] == BACKGROUND {
                outside[index(nx, ny)] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        if outside[index(x, y)] {
            Luma([BACKGROUND])
        } else {
            Luma([FOREGROUND])
        }
    })
}

/// Replace foreground objects touching the image border with `bgval`.
///
/// An 8-connected object is cleared when any of its pixels lies within
/// `buffer_size` pixels of the border.
pub fn clear_border(image: &GrayImage, buffer_size: u32, bgval: u8) -> Result<GrayImage> {
    let (width, height) = image.dimensions();
    if u64::from(buffer_size) * 2 >= u64::from(width.min(height)) {
        return Err(BubbleKickerError::invalid_parameter(
            "clear_border",
            format!(
                "buffer_size {} is too large for a {}x{} image",
                buffer_size, width, height
            ),
        ));
    }

    let labels = connected_components(image, Connectivity::Eight, Luma([BACKGROUND]));
    let in_buffer = |x: u32, y: u32| {
        x <= buffer_size
            || y <= buffer_size
            || x >= width - 1 - buffer_size
            || y >= height - 1 - buffer_size
    };

    let mut touching = HashSet::new();
    for (x, y, label) in labels.enumerate_pixels() {
        if label[0] != 0 && in_buffer(x, y) {
            touching.insert(label[0]);
        }
    }

    Ok(GrayImage::from_fn(width, height, |x, y| {
        if touching.contains(&labels.get_pixel(x, y)[0]) {
            Luma([bgval])
        } else {
            *image.get_pixel(x, y)
        }
    }))
}

/// Swap foreground and background intensities
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut inverted = image.clone();
    for pixel in inverted.pixels_mut() {
        pixel[0] = u8::MAX - pixel[0];
    }
    inverted
}
