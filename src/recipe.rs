// src/recipe.rs - Pipeline recipes as plain data

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::transforms::Operation;

/// A named, ordered list of transform steps.
///
/// Adding a new pipeline variant means writing a new list of steps; one
/// executor ([`crate::pipeline::PipelineState::run_recipe`]) runs them all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Operation>,
}

impl Recipe {
    pub fn new(name: &str, steps: Vec<Operation>) -> Self {
        Self {
            name: name.to_string(),
            steps,
        }
    }

    /// Edge based recipe: outlines are found with Canny, closed by dilation
    /// and filled, border objects are removed and the blobs shrunk back.
    /// The final inversion leaves bubbles at value 0.
    pub fn canny(
        threshold: (f32, f32),
        dilate_footprint: u32,
        border_buffer_size: u32,
        border_bgval: u8,
        erode_footprint: u32,
    ) -> Self {
        Self::new(
            "canny",
            vec![
                Operation::Canny {
                    low: threshold.0,
                    high: threshold.1,
                },
                Operation::Dilate {
                    footprint: dilate_footprint,
                },
                Operation::FillHoles,
                Operation::ClearBorder {
                    buffer_size: border_buffer_size,
                    bgval: border_bgval,
                },
                Operation::Erode {
                    footprint: erode_footprint,
                },
                Operation::Invert,
            ],
        )
    }

    /// Local threshold recipe for unevenly lit frames
    pub fn adaptive_threshold(
        block_size: u32,
        c: f64,
        border_buffer_size: u32,
        border_bgval: u8,
        erode_footprint: u32,
    ) -> Self {
        Self::new(
            "adaptive_threshold",
            vec![
                Operation::AdaptiveThreshold { block_size, c },
                Operation::ClearBorder {
                    buffer_size: border_buffer_size,
                    bgval: border_bgval,
                },
                Operation::Erode {
                    footprint: erode_footprint,
                },
                Operation::Invert,
            ],
        )
    }

    /// Check every step's static preconditions
    pub fn validate(&self) -> Result<()> {
        self.steps.iter().try_for_each(Operation::validate)
    }

    /// Run all steps on an image without recording anything
    pub fn run(&self, image: &GrayImage) -> Result<GrayImage> {
        let mut current = image.clone();
        for step in &self.steps {
            current = step.apply(&current)?;
        }
        Ok(current)
    }
}

impl Default for Recipe {
    fn default() -> Self {
        Recipe::canny((50.0, 100.0), 3, 0, 0, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BubbleKickerError;

    #[test]
    fn canny_recipe_orders_steps() {
        let recipe = Recipe::canny((10.0, 20.0), 3, 1, 0, 5);
        let names: Vec<&str> = recipe.steps.iter().map(Operation::name).collect();
        assert_eq!(
            names,
            vec!["canny", "dilate", "fill_holes", "clear_border", "erode", "invert"]
        );
    }

    #[test]
    fn adaptive_recipe_orders_steps() {
        let recipe = Recipe::adaptive_threshold(11, 2.0, 1, 0, 3);
        let names: Vec<&str> = recipe.steps.iter().map(Operation::name).collect();
        assert_eq!(
            names,
            vec!["adaptive_threshold", "clear_border", "erode", "invert"]
        );
    }

    #[test]
    fn validate_reports_first_bad_step() {
        let recipe = Recipe::canny((10.0, 20.0), 4, 0, 0, 3);
        let err = recipe.validate().unwrap_err();
        assert!(matches!(
            err,
            BubbleKickerError::InvalidParameter { ref operation, .. } if operation == "dilate"
        ));
    }

    #[test]
    fn deserializes_from_toml_steps() {
        let text = r#"
            name = "custom"

            [[steps]]
            op = "threshold"
            level = 120

            [[steps]]
            op = "clear_border"
            buffer_size = 2
            bgval = 0
        "#;
        let recipe: Recipe = toml::from_str(text).unwrap();
        assert_eq!(recipe.name, "custom");
        assert_eq!(
            recipe.steps,
            vec![
                Operation::Threshold { level: 120 },
                Operation::ClearBorder {
                    buffer_size: 2,
                    bgval: 0
                },
            ]
        );
    }
}
