// src/channel.rs - Colour plane selection for the raw working image

use std::fmt;
use std::str::FromStr;

use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

use crate::errors::{BubbleKickerError, Result};

/// Colour plane of an RGB source that becomes the raw single-channel image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// Index of the plane inside an RGB pixel
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }

    /// Slice the given plane out of a multi-channel source
    pub fn extract(self, source: &RgbImage) -> GrayImage {
        let idx = self.index();
        let (width, height) = source.dimensions();
        GrayImage::from_fn(width, height, |x, y| Luma([source.get_pixel(x, y)[idx]]))
    }
}

impl FromStr for Channel {
    type Err = BubbleKickerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "red" => Ok(Channel::Red),
            "green" => Ok(Channel::Green),
            "blue" => Ok(Channel::Blue),
            other => Err(BubbleKickerError::InvalidChannel(other.to_string())),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn parses_known_channels() {
        assert_eq!("red".parse::<Channel>().unwrap(), Channel::Red);
        assert_eq!("green".parse::<Channel>().unwrap(), Channel::Green);
        assert_eq!("blue".parse::<Channel>().unwrap(), Channel::Blue);
    }

    #[test]
    fn rejects_unknown_channel() {
        let err = "alpha".parse::<Channel>().unwrap_err();
        assert!(matches!(err, BubbleKickerError::InvalidChannel(ref c) if c == "alpha"));
        // Names are case sensitive, like the configuration values
        assert!("Red".parse::<Channel>().is_err());
    }

    #[test]
    fn extracts_requested_plane() {
        let source = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 200]));
        let green = Channel::Green.extract(&source);
        assert_eq!(green.dimensions(), (3, 2));
        assert_eq!(green.get_pixel(2, 1)[0], 1);
        assert_eq!(Channel::Red.extract(&source).get_pixel(2, 1)[0], 2);
        assert!(Channel::Blue.extract(&source).pixels().all(|p| p[0] == 200));
    }
}
