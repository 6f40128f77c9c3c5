// src/pipeline.rs - Stateful transform pipeline over one source frame

use image::{GrayImage, RgbImage};
use log::debug;

use crate::channel::Channel;
use crate::errors::{BubbleKickerError, Result};
use crate::filter::Ruleset;
use crate::history::{OperationLog, OperationRecord};
use crate::recipe::Recipe;
use crate::regions::{extract_regions, ExtractionConfig, Regions};
use crate::transforms::Operation;

/// Raw and working images of one frame plus the log of what turned one into the other.
///
/// The raw image is only re-derived on construction and channel switches.
/// Every successful transform replaces the current image with a new one
/// and appends one log entry; a failing call changes nothing.
#[derive(Debug, Clone)]
pub struct PipelineState {
    source: RgbImage,
    channel: Channel,
    raw: GrayImage,
    current: GrayImage,
    log: OperationLog,
    revision: u64,
}

impl PipelineState {
    pub fn new(source: RgbImage, channel: Channel) -> Self {
        let raw = channel.extract(&source);
        let current = raw.clone();
        Self {
            source,
            channel,
            raw,
            current,
            log: OperationLog::new(),
            revision: 0,
        }
    }

    /// Construct from a channel name (`"red"`, `"green"` or `"blue"`)
    pub fn initialize(source: RgbImage, channel: &str) -> Result<Self> {
        let channel = channel.parse::<Channel>()?;
        Ok(Self::new(source, channel))
    }

    pub fn source(&self) -> &RgbImage {
        &self.source
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn raw(&self) -> &GrayImage {
        &self.raw
    }

    pub fn current(&self) -> &GrayImage {
        &self.current
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    /// Counter bumped whenever the current image changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply one transform to the current image and record it
    pub fn apply_operation(&mut self, operation: Operation) -> Result<&GrayImage> {
        let output = operation.apply(&self.current)?;
        debug!("Applied {} (step {})", operation, self.log.len());
        self.commit(output, std::iter::once(operation));
        Ok(&self.current)
    }

    /// Apply every step of a recipe, all or nothing.
    ///
    /// Each step gets its own log entry; if any step fails neither the
    /// current image nor the log is touched.
    pub fn run_recipe(&mut self, recipe: &Recipe) -> Result<&GrayImage> {
        recipe.validate()?;

        let mut working = self.current.clone();
        for step in &recipe.steps {
            working = step.apply(&working)?;
            debug!("Recipe '{}': applied {}", recipe.name, step);
        }

        self.commit(working, recipe.steps.iter().cloned());
        Ok(&self.current)
    }

    fn commit(&mut self, image: GrayImage, operations: impl IntoIterator<Item = Operation>) {
        self.current = image;
        for operation in operations {
            self.log.push(operation);
        }
        self.revision += 1;
    }

    /// Restore the raw image and forget the history
    pub fn reset_to_raw(&mut self) {
        self.current = self.raw.clone();
        self.log.clear();
        self.revision += 1;
    }

    /// Re-derive raw and current images from another colour plane and clear the history
    pub fn switch_channel(&mut self, channel: Channel) {
        self.channel = channel;
        self.raw = channel.extract(&self.source);
        self.reset_to_raw();
    }

    /// [`PipelineState::switch_channel`] by name; an unknown name leaves the state untouched
    pub fn switch_channel_by_name(&mut self, channel: &str) -> Result<()> {
        let channel = channel.parse::<Channel>()?;
        self.switch_channel(channel);
        Ok(())
    }

    /// Descriptions of the applied operations, most recent last.
    /// Empty when nothing has been applied since the last reset.
    pub fn history(&self) -> Vec<String> {
        self.log.descriptions()
    }

    /// Most recent operation; fails with `EmptyHistory` when there is none
    pub fn last_operation(&self) -> Result<&OperationRecord> {
        self.log.last()
    }

    /// Re-run the logged operations on the raw image
    pub fn replay(&self) -> Result<GrayImage> {
        self.log.to_recipe("replay").run(&self.raw)
    }

    /// Label the current image, stamping the result with the current revision
    pub fn extract_regions(&self, config: &ExtractionConfig) -> Result<Regions> {
        Ok(extract_regions(&self.current, config)?.with_revision(self.revision))
    }

    /// Filter regions extracted from this pipeline's current image.
    ///
    /// Fails with `StaleRegions` when the current image changed after extraction.
    pub fn filter_regions(&self, regions: &Regions, ruleset: &Ruleset) -> Result<Regions> {
        match regions.revision() {
            Some(revision) if revision == self.revision => regions.filter(ruleset),
            Some(revision) => Err(BubbleKickerError::StaleRegions {
                extracted_at: revision,
                current: self.revision,
            }),
            None => Err(BubbleKickerError::InconsistentRegions(
                "regions were not extracted through this pipeline".to_string(),
            )),
        }
    }
}
