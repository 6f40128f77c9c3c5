// src/regions.rs - Connected component labelling and per-region property tables

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{BubbleKickerError, Result};
use crate::filter::{filter_regions, Ruleset};
use crate::image_utils::{is_binary, BACKGROUND, FOREGROUND};
use crate::metrics::recompute_derived;
use crate::shape_analysis::{measure_region, RegionMask};

/// Label image: 0 is background, regions are numbered from 1
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Which mask value marks foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Foreground {
    /// 0-valued pixels are regions (the polarity left by the built-in recipes)
    #[default]
    Zero,
    /// Any non-zero pixel is a region
    NonZero,
}

/// Pixel adjacency used for labelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelConnectivity {
    Four,
    #[default]
    Eight,
}

impl From<LabelConnectivity> for Connectivity {
    fn from(value: LabelConnectivity) -> Self {
        match value {
            LabelConnectivity::Four => Connectivity::Four,
            LabelConnectivity::Eight => Connectivity::Eight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub foreground: Foreground,
    #[serde(default)]
    pub connectivity: LabelConnectivity,
}

/// Columns of a [`PropertyTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
    Area,
    Perimeter,
    CentroidRow,
    CentroidCol,
    ConvexArea,
    EquivalentDiameter,
    Solidity,
    Convexity,
    CircularityReciprocal,
}

impl Property {
    pub const ALL: [Property; 9] = [
        Property::Area,
        Property::Perimeter,
        Property::CentroidRow,
        Property::CentroidCol,
        Property::ConvexArea,
        Property::EquivalentDiameter,
        Property::Solidity,
        Property::Convexity,
        Property::CircularityReciprocal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Property::Area => "area",
            Property::Perimeter => "perimeter",
            Property::CentroidRow => "centroid_row",
            Property::CentroidCol => "centroid_col",
            Property::ConvexArea => "convex_area",
            Property::EquivalentDiameter => "equivalent_diameter",
            Property::Solidity => "solidity",
            Property::Convexity => "convexity",
            Property::CircularityReciprocal => "circularity_reciprocal",
        }
    }
}

impl FromStr for Property {
    type Err = BubbleKickerError;

    fn from_str(s: &str) -> Result<Self> {
        Property::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| BubbleKickerError::UnknownProperty(s.to_string()))
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive bounding box in source image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub min_row: u32,
    pub min_col: u32,
    pub max_row: u32,
    pub max_col: u32,
}

/// Shape descriptors of one labelled region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionProperties {
    pub label: u32,
    pub area: u32,
    pub perimeter: f64,
    /// (row, col)
    pub centroid: (f64, f64),
    pub bbox: BoundingBox,
    pub convex_area: u32,
    pub equivalent_diameter: f64,
    pub solidity: f64,
    /// `None` when the perimeter is zero
    pub convexity: Option<f64>,
    /// `None` when the perimeter is zero
    pub circularity_reciprocal: Option<f64>,
}

impl RegionProperties {
    /// Column value; `None` marks an undefined metric
    pub fn value(&self, property: Property) -> Option<f64> {
        match property {
            Property::Area => Some(f64::from(self.area)),
            Property::Perimeter => Some(self.perimeter),
            Property::CentroidRow => Some(self.centroid.0),
            Property::CentroidCol => Some(self.centroid.1),
            Property::ConvexArea => Some(f64::from(self.convex_area)),
            Property::EquivalentDiameter => Some(self.equivalent_diameter),
            Property::Solidity => Some(self.solidity),
            Property::Convexity => self.convexity,
            Property::CircularityReciprocal => self.circularity_reciprocal,
        }
    }

    pub fn has_undefined_metrics(&self) -> bool {
        self.convexity.is_none() || self.circularity_reciprocal.is_none()
    }
}

/// One row per region, keyed and ordered by label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyTable {
    rows: BTreeMap<u32, RegionProperties>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, row: RegionProperties) {
        self.rows.insert(row.label, row);
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut RegionProperties> {
        self.rows.values_mut()
    }

    pub(crate) fn retain(&mut self, keep: &BTreeSet<u32>) {
        self.rows.retain(|label, _| keep.contains(label));
    }

    pub fn get(&self, label: u32) -> Option<&RegionProperties> {
        self.rows.get(&label)
    }

    pub fn labels(&self) -> BTreeSet<u32> {
        self.rows.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionProperties> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Names of the columns every row carries
    pub fn columns(&self) -> &'static [Property] {
        &Property::ALL
    }

    /// Resolve a column name against this table
    pub fn column(&self, name: &str) -> Result<Property> {
        self.columns()
            .iter()
            .copied()
            .find(|p| p.name() == name)
            .ok_or_else(|| BubbleKickerError::UnknownProperty(name.to_string()))
    }

    /// (label, value) pairs of one column, in label order
    pub fn column_values(&self, property: Property) -> Vec<(u32, Option<f64>)> {
        self.rows
            .values()
            .map(|row| (row.label, row.value(property)))
            .collect()
    }
}

/// Distinct non-zero labels present in a label image
pub fn label_set(labels: &LabelImage) -> BTreeSet<u32> {
    labels.pixels().map(|p| p[0]).filter(|&l| l != 0).collect()
}

/// A label image paired with the property table computed from it.
///
/// The pair can only be produced by extraction or filtering, so a table is
/// never matched against a label image it was not derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Regions {
    labels: LabelImage,
    table: PropertyTable,
    revision: Option<u64>,
}

impl Regions {
    pub(crate) fn from_parts(labels: LabelImage, table: PropertyTable, revision: Option<u64>) -> Self {
        Self {
            labels,
            table,
            revision,
        }
    }

    pub(crate) fn with_revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn labels(&self) -> &LabelImage {
        &self.labels
    }

    pub fn table(&self) -> &PropertyTable {
        &self.table
    }

    /// Pipeline revision the regions were extracted at, if they came from a pipeline
    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn into_parts(self) -> (LabelImage, PropertyTable) {
        (self.labels, self.table)
    }

    /// Apply a ruleset, keeping label image and table consistent
    pub fn filter(&self, ruleset: &Ruleset) -> Result<Regions> {
        let (labels, table) = filter_regions(&self.labels, &self.table, ruleset)?;
        Ok(Regions::from_parts(labels, table, self.revision))
    }
}

/// Label the foreground of a binary mask and measure every region.
///
/// Regions are numbered 1..N in raster discovery order. Fails with
/// [`BubbleKickerError::EmptyMask`] when the mask has no foreground.
pub fn extract_regions(mask: &GrayImage, config: &ExtractionConfig) -> Result<Regions> {
    let (width, height) = mask.dimensions();

    if !is_binary(mask) {
        debug!("Mask is not binary; labelling by {:?} polarity", config.foreground);
    }

    // Normalise polarity so the labeller always sees non-zero foreground
    let binary = GrayImage::from_fn(width, height, |x, y| {
        let value = mask.get_pixel(x, y)[0];
        let is_foreground = match config.foreground {
            Foreground::Zero => value == 0,
            Foreground::NonZero => value != 0,
        };
        Luma([if is_foreground { FOREGROUND } else { BACKGROUND }])
    });

    let labels = connected_components(&binary, config.connectivity.into(), Luma([BACKGROUND]));

    let mut pixels_by_label: Vec<Vec<(u32, u32)>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if pixels_by_label.len() < label {
            pixels_by_label.resize_with(label, Vec::new);
        }
        pixels_by_label[label - 1].push((x, y));
    }

    if pixels_by_label.is_empty() {
        return Err(BubbleKickerError::EmptyMask);
    }

    let mut table = PropertyTable::new();
    for (idx, pixels) in pixels_by_label.iter().enumerate() {
        let label = idx as u32 + 1;
        let mask = match RegionMask::from_pixels(pixels) {
            Some(mask) => mask,
            None => continue,
        };
        let geometry = measure_region(&mask);

        table.insert(RegionProperties {
            label,
            area: geometry.area,
            perimeter: geometry.perimeter,
            centroid: geometry.centroid,
            bbox: BoundingBox {
                min_row: mask.origin.1,
                min_col: mask.origin.0,
                max_row: mask.origin.1 + mask.height - 1,
                max_col: mask.origin.0 + mask.width - 1,
            },
            convex_area: geometry.convex_area,
            equivalent_diameter: 0.0,
            solidity: 0.0,
            convexity: None,
            circularity_reciprocal: None,
        });
    }

    recompute_derived(&mut table);

    for row in table.iter().filter(|r| r.has_undefined_metrics()) {
        warn!(
            "Region {} (area {}) has zero perimeter; convexity and circularity are undefined",
            row.label, row.area
        );
    }
    info!("Extracted {} regions from {}x{} mask", table.len(), width, height);

    Ok(Regions::from_parts(labels, table, None))
}
