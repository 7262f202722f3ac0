//! Harness configuration.
//!
//! The configuration is an explicit immutable value constructed once at
//! startup (from a JSON file) and handed to each component, never read from
//! ambient state. Validation happens up front: a bad layout or binding is
//! fatal before any interface is touched.
//!
//! # File format
//!
//! ```json
//! {
//!     "input_dataset": "csv_files_input/df_test_1_with_2_attributes.csv",
//!     "output_csv": "csv_files_output/p4_out.csv",
//!     "word_size": 32,
//!     "precision": 16,
//!     "timeout_ms": 1000,
//!     "limit": 50,
//!     "features": [
//!         { "name": "a", "iface": "s1-eth1", "columns": ["82", "83"] }
//!     ],
//!     "outputs": [
//!         { "name": "P4_class", "iface": "s126-eth2", "neuron_id": 126 },
//!         { "name": "output_s101", "iface": "s126-eth101", "neuron_id": 101,
//!           "conversion": "fixed_point" }
//!     ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AnnwireError, Result};
use crate::protocol::{
    Conversion, WireLayout, DEFAULT_DATA_FIELDS, DEFAULT_SLACK_BITS, DEFAULT_WORD_SIZE,
};

/// Default fractional precision for fixed-point conversion.
pub const DEFAULT_PRECISION: u32 = 16;

/// Default per-test-case receive timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

fn default_word_size() -> u32 {
    DEFAULT_WORD_SIZE
}

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

fn default_slack() -> u32 {
    DEFAULT_SLACK_BITS
}

fn default_data_fields() -> usize {
    DEFAULT_DATA_FIELDS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Maps a feature name to a transmit interface and the dataset columns that
/// populate the stimulus frame's data fields. Immutable for the run.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureBinding {
    /// Human-readable feature name.
    pub name: String,
    /// Transmit interface for this feature's stimulus frame.
    pub iface: String,
    /// Dataset column identifiers, one per data field.
    pub columns: Vec<String>,
}

/// Maps an output name to a listen interface, the expected `neuron_id`, and
/// a unit-conversion strategy. Immutable for the run.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputBinding {
    /// Human-readable output name; becomes a result-table column.
    pub name: String,
    /// Listen interface for this output.
    pub iface: String,
    /// `neuron_id` expected on frames carrying this output.
    pub neuron_id: u32,
    /// Raw-to-engineering-units conversion (default: identity).
    #[serde(default)]
    pub conversion: Conversion,
}

/// Complete harness configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    /// Input dataset CSV path.
    pub input_dataset: PathBuf,
    /// Result table CSV path.
    pub output_csv: PathBuf,

    /// Bits per data field.
    #[serde(default = "default_word_size")]
    pub word_size: u32,
    /// Fractional bits for fixed-point conversion.
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Slack (padding) bits at the end of the payload.
    #[serde(default = "default_slack")]
    pub slack: u32,
    /// Number of data fields per frame.
    #[serde(default = "default_data_fields")]
    pub data_fields: usize,
    /// Per-test-case receive timeout before retransmission.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Optional cap on the number of dataset rows to run.
    #[serde(default)]
    pub limit: Option<usize>,

    /// Feature bindings (stimulus side).
    pub features: Vec<FeatureBinding>,
    /// Output bindings (response side).
    pub outputs: Vec<OutputBinding>,
}

impl HarnessConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// The wire layout implied by this configuration.
    pub fn layout(&self) -> WireLayout {
        WireLayout::new(self.word_size, self.data_fields, self.slack)
    }

    /// The per-test-case receive timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The deduplicated set of listen interfaces, in declaration order.
    pub fn listen_ifaces(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.outputs
            .iter()
            .filter(|o| seen.insert(o.iface.clone()))
            .map(|o| o.iface.clone())
            .collect()
    }

    /// Validate the configuration.
    ///
    /// Checks the wire layout, that bindings are non-empty, that output
    /// names and neuron ids are unique, and that every feature binding
    /// carries exactly one column per data field.
    pub fn validate(&self) -> Result<()> {
        self.layout().validate()?;

        if self.precision > self.word_size {
            return Err(AnnwireError::Config(format!(
                "precision {} exceeds word_size {}",
                self.precision, self.word_size
            )));
        }

        if self.features.is_empty() {
            return Err(AnnwireError::Config("no feature bindings declared".into()));
        }
        if self.outputs.is_empty() {
            return Err(AnnwireError::Config("no output bindings declared".into()));
        }

        for feature in &self.features {
            if feature.columns.len() != self.data_fields {
                return Err(AnnwireError::Config(format!(
                    "feature '{}' binds {} columns but the layout has {} data fields",
                    feature.name,
                    feature.columns.len(),
                    self.data_fields
                )));
            }
        }

        let mut names = HashSet::new();
        let mut neuron_ids = HashSet::new();
        for output in &self.outputs {
            if !names.insert(output.name.as_str()) {
                return Err(AnnwireError::Config(format!(
                    "duplicate output name '{}'",
                    output.name
                )));
            }
            if !neuron_ids.insert(output.neuron_id) {
                return Err(AnnwireError::Config(format!(
                    "duplicate output neuron_id {}",
                    output.neuron_id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "input_dataset": "in.csv",
            "output_csv": "out.csv",
            "data_fields": 1,
            "features": [
                { "name": "a", "iface": "s1-eth1", "columns": ["82"] }
            ],
            "outputs": [
                { "name": "P4_class", "iface": "s126-eth2", "neuron_id": 126 }
            ]
        }"#
    }

    #[test]
    fn test_defaults() {
        let config: HarnessConfig = serde_json::from_str(minimal_json()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.word_size, 32);
        assert_eq!(config.precision, 16);
        assert_eq!(config.slack, 8);
        assert_eq!(config.timeout_ms, 1000);
        assert_eq!(config.timeout(), Duration::from_millis(1000));
        assert_eq!(config.limit, None);
        assert_eq!(config.outputs[0].conversion, Conversion::Identity);
        assert_eq!(config.layout(), WireLayout::new(32, 1, 8));
    }

    #[test]
    fn test_full_config_parses() {
        let json = r#"{
            "input_dataset": "in.csv",
            "output_csv": "out.csv",
            "word_size": 32,
            "precision": 16,
            "timeout_ms": 250,
            "limit": 50,
            "features": [
                { "name": "a", "iface": "s1-eth1", "columns": ["82", "83"] }
            ],
            "outputs": [
                { "name": "P4_class", "iface": "s126-eth2", "neuron_id": 126 },
                { "name": "output_s101", "iface": "s126-eth101", "neuron_id": 101,
                  "conversion": "fixed_point" }
            ]
        }"#;

        let config: HarnessConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.limit, Some(50));
        assert_eq!(config.outputs[1].conversion, Conversion::FixedPoint);
        assert_eq!(
            config.listen_ifaces(),
            vec!["s126-eth2".to_string(), "s126-eth101".to_string()]
        );
    }

    #[test]
    fn test_listen_ifaces_deduplicated() {
        let json = r#"{
            "input_dataset": "in.csv",
            "output_csv": "out.csv",
            "data_fields": 1,
            "features": [
                { "name": "a", "iface": "s1-eth1", "columns": ["82"] }
            ],
            "outputs": [
                { "name": "x", "iface": "s126-eth2", "neuron_id": 126 },
                { "name": "y", "iface": "s126-eth2", "neuron_id": 101 }
            ]
        }"#;

        let config: HarnessConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.listen_ifaces(), vec!["s126-eth2".to_string()]);
    }

    #[test]
    fn test_validate_rejects_column_count_mismatch() {
        let mut config: HarnessConfig = serde_json::from_str(minimal_json()).unwrap();
        config.data_fields = 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("data fields"));
    }

    #[test]
    fn test_validate_rejects_duplicate_output_name() {
        let mut config: HarnessConfig = serde_json::from_str(minimal_json()).unwrap();
        let mut dup = config.outputs[0].clone();
        dup.neuron_id = 101;
        config.outputs.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate output name"));
    }

    #[test]
    fn test_validate_rejects_duplicate_neuron_id() {
        let mut config: HarnessConfig = serde_json::from_str(minimal_json()).unwrap();
        let mut dup = config.outputs[0].clone();
        dup.name = "other".into();
        config.outputs.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate output neuron_id"));
    }

    #[test]
    fn test_validate_rejects_empty_bindings() {
        let mut config: HarnessConfig = serde_json::from_str(minimal_json()).unwrap();
        config.outputs.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_precision_beyond_word_size() {
        let mut config: HarnessConfig = serde_json::from_str(minimal_json()).unwrap();
        config.precision = 33;
        assert!(config.validate().is_err());
    }
}
