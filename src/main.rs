use std::path::{Path, PathBuf};
use std::time::Instant;
use clap::Parser;
use log::{error, info, LevelFilter};
use rayon::prelude::*;

use bubble_kicker_lib::errors::{BubbleKickerError, Result};
use bubble_kicker_lib::image_io::{get_image_files_in_dir, load_image, output_names};
use bubble_kicker_lib::{process_image, Channel, Config, ImageSummary};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "BubbleKicker - Bubble size extraction from grayscale frames")]
struct Args {
    /// Path to input file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Colour plane to analyse (overwrites config)
    #[clap(long)]
    channel: Option<Channel>,

    /// Enable debug mode (save every recipe stage and log more detail)
    #[clap(short, long)]
    debug: bool,

    /// Write the default configuration to the config path and exit
    #[clap(long)]
    write_default_config: bool,
}

fn init_logging(debug: bool) {
    let default_level = if debug { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}

fn process_path(path: &Path, name: Option<&str>, config: &Config, debug: bool) -> Result<ImageSummary> {
    info!("Processing: {}", path.display());
    let mut input_image = load_image(path)?;
    if let Some(name) = name {
        input_image.filename = name.to_string();
    }
    process_image(input_image, config, debug)
}

/// Main function
fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_logging(args.debug);

    if args.write_default_config {
        Config::default().save_to_file(&args.config)?;
        info!("Wrote default configuration to {}", args.config);
        return Ok(());
    }

    // Load configuration
    let mut config = Config::from_file(&args.config)?;

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }

    if let Some(output) = args.output.clone() {
        config.output_dir = output;
    }

    if let Some(channel) = args.channel {
        config.channel = channel;
    }

    // Validate configuration
    config.validate()?;

    // Start timing
    let start_time = Instant::now();

    // Process input
    let input_path = PathBuf::from(&config.input_path);

    let summaries: Vec<ImageSummary> = if input_path.is_file() {
        info!("Processing single file: {}", input_path.display());
        vec![process_path(&input_path, None, &config, args.debug)?]
    } else if input_path.is_dir() {
        info!("Processing directory: {}", input_path.display());
        let image_files = get_image_files_in_dir(&input_path)?;
        info!("Found {} image files", image_files.len());

        // Names follow the path below the input directory so nested frames do not collide
        let names = output_names(&input_path, &image_files)?;
        let jobs: Vec<(&PathBuf, &String)> = image_files.iter().zip(&names).collect();

        let results: Vec<Result<ImageSummary>> = if config.use_parallel {
            jobs.par_iter()
                .map(|(path, name)| process_path(path.as_path(), Some(name.as_str()), &config, args.debug))
                .collect()
        } else {
            jobs.iter()
                .map(|(path, name)| process_path(path.as_path(), Some(name.as_str()), &config, args.debug))
                .collect()
        };

        // One bad frame does not stop the batch
        results
            .into_iter()
            .zip(&image_files)
            .filter_map(|(result, path)| match result {
                Ok(summary) => Some(summary),
                Err(e) => {
                    error!("Failed to process {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    } else {
        return Err(BubbleKickerError::InvalidPath(input_path));
    };

    let detected: usize = summaries.iter().map(|s| s.detected).sum();
    let retained: usize = summaries.iter().map(|s| s.retained).sum();
    info!(
        "Processed {} images: {} regions detected, {} retained",
        summaries.len(),
        detected,
        retained
    );

    // Report elapsed time
    let elapsed = start_time.elapsed();
    info!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
