// src/processing.rs - Per-frame run: recipe, extraction, filtering and output files

use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::config::Config;
use crate::errors::{BubbleKickerError, Result};
use crate::image_io::{save_gray_image, save_label_image, InputImage};
use crate::output::{write_history, write_properties_csv};
use crate::pipeline::PipelineState;
use crate::regions::PropertyTable;

/// Outcome of processing one frame
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSummary {
    pub filename: String,
    /// Regions found in the final mask
    pub detected: usize,
    /// Regions left after filtering
    pub retained: usize,
    pub history: Vec<String>,
}

/// Run the configured recipe on one frame, then extract and filter its regions.
///
/// Writes `<name>_properties.csv`, `<name>_filtered.csv` and
/// `<name>_history.txt` into the output directory. A mask without any
/// foreground yields a summary with zero regions and header-only tables.
pub fn process_image(input_image: InputImage, config: &Config, debug: bool) -> Result<ImageSummary> {
    let InputImage { image, path, filename } = input_image;
    debug!("Processing {} ({}x{})", path.display(), image.width(), image.height());

    let output_dir = PathBuf::from(&config.output_dir);
    fs::create_dir_all(&output_dir)?;

    let ruleset = config.filter.ruleset()?;
    let mut state = PipelineState::new(image, config.channel);

    if debug {
        // Step through the recipe so every stage can be inspected
        let debug_dir = output_dir.join("debug");
        fs::create_dir_all(&debug_dir)?;
        save_gray_image(state.raw(), debug_dir.join(format!("{}_00_raw.png", filename)))?;

        for (idx, step) in config.recipe.steps.iter().enumerate() {
            let stage = state.apply_operation(step.clone())?;
            save_gray_image(
                stage,
                debug_dir.join(format!("{}_{:02}_{}.png", filename, idx + 1, step.name())),
            )?;
        }
    } else {
        state.run_recipe(&config.recipe)?;
    }

    write_history(state.log(), output_dir.join(format!("{}_history.txt", filename)))?;

    if config.save_intermediate || debug {
        save_gray_image(state.current(), output_dir.join(format!("{}_mask.png", filename)))?;
    }

    let regions = match state.extract_regions(&config.extraction) {
        Ok(regions) => regions,
        Err(BubbleKickerError::EmptyMask) => {
            warn!("{}: no regions found in the final mask", filename);
            let empty = PropertyTable::new();
            write_properties_csv(&empty, output_dir.join(format!("{}_properties.csv", filename)))?;
            write_properties_csv(&empty, output_dir.join(format!("{}_filtered.csv", filename)))?;
            return Ok(ImageSummary {
                filename,
                detected: 0,
                retained: 0,
                history: state.history(),
            });
        }
        Err(e) => return Err(e),
    };

    let filtered = state.filter_regions(&regions, &ruleset)?;

    write_properties_csv(
        regions.table(),
        output_dir.join(format!("{}_properties.csv", filename)),
    )?;
    write_properties_csv(
        filtered.table(),
        output_dir.join(format!("{}_filtered.csv", filename)),
    )?;

    if config.save_intermediate || debug {
        save_label_image(regions.labels(), output_dir.join(format!("{}_labels.png", filename)))?;
        save_label_image(
            filtered.labels(),
            output_dir.join(format!("{}_labels_filtered.png", filename)),
        )?;
    }

    info!(
        "{}: {} regions detected, {} retained",
        filename,
        regions.len(),
        filtered.len()
    );

    Ok(ImageSummary {
        filename,
        detected: regions.len(),
        retained: filtered.len(),
        history: state.history(),
    })
}
