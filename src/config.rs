// src/config.rs - TOML configuration for batch runs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::channel::Channel;
use crate::errors::{BubbleKickerError, Result};
use crate::filter::Ruleset;
use crate::recipe::Recipe;
use crate::regions::{ExtractionConfig, PropertyTable};

/// Configuration for BubbleKicker
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub input_path: String,
    pub output_dir: String,

    #[serde(default = "default_channel")]
    pub channel: Channel,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    /// Save the final mask and label image next to the CSV output
    #[serde(default)]
    pub save_intermediate: bool,

    #[serde(default)]
    pub recipe: Recipe,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default = "default_filter")]
    pub filter: FilterConfig,
}

/// Ruleset in its nested mapping form, e.g.
///
/// ```toml
/// [filter.rules.circularity_reciprocal]
/// min = 0.2
/// max = 1.6
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct FilterConfig {
    #[serde(default)]
    pub include_undefined: bool,
    #[serde(default)]
    pub rules: BTreeMap<String, BTreeMap<String, f64>>,
}

impl FilterConfig {
    pub fn ruleset(&self) -> Result<Ruleset> {
        Ok(Ruleset::from_mapping(&self.rules)?.include_undefined(self.include_undefined))
    }
}

fn default_channel() -> Channel {
    Channel::Red
}

fn default_parallel() -> bool {
    true
}

fn default_filter() -> FilterConfig {
    let mut rules = BTreeMap::new();
    rules.insert(
        "circularity_reciprocal".to_string(),
        BTreeMap::from([("min".to_string(), 0.2), ("max".to_string(), 1.6)]),
    );
    rules.insert(
        "convexity".to_string(),
        BTreeMap::from([("min".to_string(), 0.92)]),
    );
    FilterConfig {
        include_undefined: false,
        rules,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: "./input".to_string(),
            output_dir: "./output".to_string(),
            channel: default_channel(),
            use_parallel: default_parallel(),
            save_intermediate: false,
            recipe: Recipe::default(),
            extraction: ExtractionConfig::default(),
            filter: default_filter(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BubbleKickerError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| BubbleKickerError::ConfigLoad {
            source: e,
            path: path.to_path_buf(),
        })?;

        Ok(config)
    }

    /// Validate configuration and prepare the output directory
    pub fn validate(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(BubbleKickerError::InvalidPath(input_path));
        }

        self.validate_pipeline()?;

        fs::create_dir_all(&self.output_dir).map_err(|e| {
            BubbleKickerError::Io(io::Error::new(
                ErrorKind::Other,
                format!("Failed to create output directory '{}': {}", self.output_dir, e),
            ))
        })?;

        Ok(())
    }

    /// Check recipe parameters and ruleset without touching the filesystem
    pub fn validate_pipeline(&self) -> Result<()> {
        if self.recipe.steps.is_empty() {
            return Err(BubbleKickerError::Config(
                "recipe must contain at least one step".to_string(),
            ));
        }
        self.recipe.validate()?;

        // Column names are fixed, so an empty table is enough to resolve them
        self.filter.ruleset()?.validate(&PropertyTable::new())?;

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            BubbleKickerError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content).map_err(BubbleKickerError::Io)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::Foreground;
    use crate::transforms::Operation;

    #[test]
    fn default_config_is_valid_pipeline() {
        let config = Config::default();
        assert!(config.validate_pipeline().is_ok());
        assert_eq!(config.filter.ruleset().unwrap().rules.len(), 3);
    }

    #[test]
    fn parses_minimal_file_with_defaults() {
        let text = r#"
            input_path = "frames"
            output_dir = "out"
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.channel, Channel::Red);
        assert!(config.use_parallel);
        assert_eq!(config.recipe, Recipe::default());
        // A missing [filter] table gets the same rules as Config::default()
        assert_eq!(config.filter, Config::default().filter);
        assert_eq!(config.filter.ruleset().unwrap().rules.len(), 3);
    }

    #[test]
    fn parses_full_file() {
        let text = r#"
            input_path = "frames"
            output_dir = "out"
            channel = "green"

            [extraction]
            foreground = "non_zero"
            connectivity = "four"

            [recipe]
            name = "threshold_only"

            [[recipe.steps]]
            op = "threshold"
            level = 90

            [filter]
            include_undefined = true

            [filter.rules.area]
            min = 10.0
            max = 500.0
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.channel, Channel::Green);
        assert_eq!(config.extraction.foreground, Foreground::NonZero);
        assert_eq!(config.recipe.steps, vec![Operation::Threshold { level: 90 }]);
        let ruleset = config.filter.ruleset().unwrap();
        assert!(ruleset.include_undefined);
        assert_eq!(ruleset.rules.len(), 2);
    }

    #[test]
    fn rejects_invalid_channel_name() {
        let text = r#"
            input_path = "frames"
            output_dir = "out"
            channel = "alpha"
        "#;
        assert!(toml::from_str::<Config>(text).is_err());
    }

    #[test]
    fn validate_pipeline_catches_bad_rules_and_steps() {
        let mut config = Config::default();
        config
            .filter
            .rules
            .insert("roundness".to_string(), BTreeMap::from([("min".to_string(), 1.0)]));
        assert!(matches!(
            config.validate_pipeline(),
            Err(BubbleKickerError::UnknownProperty(_))
        ));

        let mut config = Config::default();
        config.recipe.steps.push(Operation::Dilate { footprint: 8 });
        assert!(matches!(
            config.validate_pipeline(),
            Err(BubbleKickerError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
