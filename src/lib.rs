// src/lib.rs - Library interface for BubbleKicker

pub mod channel;
pub mod config;
pub mod errors;
pub mod filter;
pub mod history;
pub mod image_io;
pub mod image_utils;
pub mod metrics;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod processing;
pub mod recipe;
pub mod regions;
pub mod shape_analysis;
pub mod transforms;

// Re-export commonly used types and functions
pub use errors::{BubbleKickerError, Result};
pub use channel::Channel;
pub use config::{Config, FilterConfig};
pub use pipeline::PipelineState;
pub use processing::{process_image, ImageSummary};
pub use image_io::{InputImage, load_image, save_gray_image, save_label_image};
pub use output::{write_history, write_properties_csv};

// Pipeline building blocks
pub use transforms::Operation;
pub use recipe::Recipe;
pub use history::{OperationLog, OperationRecord};

// Region extraction and filtering
pub use regions::{
    extract_regions,
    label_set,
    BoundingBox,
    ExtractionConfig,
    Foreground,
    LabelConnectivity,
    LabelImage,
    Property,
    PropertyTable,
    RegionProperties,
    Regions,
};
pub use filter::{filter_regions, Bound, FilterRule, Ruleset};
