// src/filter.rs - Rule based removal of regions from a label image and its property table

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::{BubbleKickerError, Result};
use crate::regions::{label_set, LabelImage, Property, PropertyTable, RegionProperties};

/// Side of a filter bound. Both bounds are strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    /// Keep regions whose value is strictly greater than the threshold
    Min,
    /// Keep regions whose value is strictly less than the threshold
    Max,
}

impl Bound {
    fn parse(property: &str, key: &str) -> Result<Self> {
        match key {
            "min" => Ok(Bound::Min),
            "max" => Ok(Bound::Max),
            other => Err(BubbleKickerError::UnsupportedRule {
                property: property.to_string(),
                bound: other.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Bound::Min => "min",
            Bound::Max => "max",
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single bound on one property column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub property: String,
    pub bound: Bound,
    pub threshold: f64,
}

impl FilterRule {
    pub fn new(property: &str, bound: Bound, threshold: f64) -> Self {
        Self {
            property: property.to_string(),
            bound,
            threshold,
        }
    }

    pub fn min(property: &str, threshold: f64) -> Self {
        Self::new(property, Bound::Min, threshold)
    }

    pub fn max(property: &str, threshold: f64) -> Self {
        Self::new(property, Bound::Max, threshold)
    }

    /// Strict comparison of a defined value against the threshold
    pub fn accepts(&self, value: f64) -> bool {
        match self.bound {
            Bound::Min => value > self.threshold,
            Bound::Max => value < self.threshold,
        }
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.bound {
            Bound::Min => ">",
            Bound::Max => "<",
        };
        write!(f, "{} {} {}", self.property, op, self.threshold)
    }
}

/// Conjunction of filter rules.
///
/// A region survives when it satisfies every rule. A region whose value for
/// a ruled column is undefined fails that rule, unless `include_undefined`
/// is set, in which case the rule is skipped for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    #[serde(default)]
    pub rules: Vec<FilterRule>,
    #[serde(default)]
    pub include_undefined: bool,
}

impl Ruleset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: FilterRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn include_undefined(mut self, include: bool) -> Self {
        self.include_undefined = include;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Build from the nested mapping form, e.g.
    /// `{"area": {"min": 10}, "convexity": {"min": 0.9, "max": 2.0}}`
    pub fn from_mapping(mapping: &BTreeMap<String, BTreeMap<String, f64>>) -> Result<Self> {
        let mut rules = Vec::new();
        for (property, bounds) in mapping {
            for (key, &threshold) in bounds {
                let bound = Bound::parse(property, key)?;
                rules.push(FilterRule::new(property, bound, threshold));
            }
        }
        Ok(Self {
            rules,
            include_undefined: false,
        })
    }

    /// Parse the nested mapping form from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let mapping: BTreeMap<String, BTreeMap<String, f64>> = serde_json::from_str(text)?;
        Self::from_mapping(&mapping)
    }

    /// Nested mapping form of the rules
    pub fn to_mapping(&self) -> BTreeMap<String, BTreeMap<String, f64>> {
        let mut mapping: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for rule in &self.rules {
            mapping
                .entry(rule.property.clone())
                .or_default()
                .insert(rule.bound.name().to_string(), rule.threshold);
        }
        mapping
    }

    /// Check thresholds and resolve every property against the table's columns
    pub fn validate(&self, table: &PropertyTable) -> Result<Vec<(Property, &FilterRule)>> {
        self.rules
            .iter()
            .map(|rule| {
                if !rule.threshold.is_finite() {
                    return Err(BubbleKickerError::invalid_parameter(
                        "filter",
                        format!("threshold for '{}' must be finite", rule.property),
                    ));
                }
                Ok((table.column(&rule.property)?, rule))
            })
            .collect()
    }

    fn admits(&self, row: &RegionProperties, resolved: &[(Property, &FilterRule)]) -> bool {
        resolved.iter().all(|(property, rule)| match row.value(*property) {
            Some(value) => rule.accepts(value),
            None => self.include_undefined,
        })
    }
}

/// Remove regions failing the ruleset from both the label image and the table.
///
/// The ruleset is validated before anything is computed, and the label
/// image must hold exactly the labels the table is indexed by. On success
/// the returned image contains exactly the labels of the returned table.
pub fn filter_regions(
    labels: &LabelImage,
    table: &PropertyTable,
    ruleset: &Ruleset,
) -> Result<(LabelImage, PropertyTable)> {
    let resolved = ruleset.validate(table)?;

    let image_labels = label_set(labels);
    let table_labels = table.labels();
    if image_labels != table_labels {
        let orphans: Vec<u32> = image_labels.symmetric_difference(&table_labels).copied().collect();
        return Err(BubbleKickerError::InconsistentRegions(format!(
            "labels {:?} appear in only one of label image and property table",
            orphans
        )));
    }

    let survivors: BTreeSet<u32> = table
        .iter()
        .filter(|row| ruleset.admits(row, &resolved))
        .map(|row| row.label)
        .collect();

    for rule in &ruleset.rules {
        debug!("Filter rule: {}", rule);
    }
    info!(
        "Filtering kept {} of {} regions",
        survivors.len(),
        table.len()
    );

    let mut filtered_labels = labels.clone();
    for pixel in filtered_labels.pixels_mut() {
        if pixel[0] != 0 && !survivors.contains(&pixel[0]) {
            pixel[0] = 0;
        }
    }

    let mut filtered_table = table.clone();
    filtered_table.retain(&survivors);

    Ok((filtered_labels, filtered_table))
}
