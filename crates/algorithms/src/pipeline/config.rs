//! Pipeline configuration files

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use cirrus_core::{Error, FlagSet, PixelFlag, Result};
use cirrus_parallel::ProcessingMode;

use super::{ClassifierVariant, PixelClassifier, DEFAULT_TILE_SIZE};
use crate::buffer::CloudBufferParams;
use crate::neural::NetworkModel;
use crate::threshold::ThresholdTable;
use crate::transform::InputTransform;

/// Threshold table reference: a table name or an inline table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableSource {
    Named(String),
    Inline(ThresholdTable),
}

impl TableSource {
    pub fn resolve(&self) -> Result<ThresholdTable> {
        match self {
            TableSource::Named(name) => ThresholdTable::named(name),
            TableSource::Inline(table) => Ok(table.clone()),
        }
    }
}

/// Buffer pass settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BufferConfig {
    pub radius: usize,
    pub trigger: FlagSet,
}

impl Default for BufferConfig {
    fn default() -> Self {
        let params = CloudBufferParams::default();
        Self {
            radius: params.radius,
            trigger: params.trigger,
        }
    }
}

impl From<&BufferConfig> for CloudBufferParams {
    fn from(config: &BufferConfig) -> Self {
        CloudBufferParams {
            radius: config.radius,
            trigger: config.trigger,
            buffer: PixelFlag::Buffer,
        }
    }
}

/// Pipeline settings, usually read from a JSON file.
///
/// ```json
/// {
///   "variant": "land-v2-simple",
///   "model": "nets/land.net",
///   "transform": { "kind": "log" },
///   "bands": ["b1", "b2", "b3", "b4", "b5", "b6", "pressure"],
///   "buffer": { "radius": 2, "trigger": ["cloud"] },
///   "threads": 4
/// }
/// ```
///
/// Missing fields take their defaults. `variant` names the threshold table
/// unless `table` overrides it. `"buffer": null` disables the buffer pass.
/// An empty `bands` list is filled with `band_1..band_n` from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub variant: String,
    pub table: Option<TableSource>,
    pub model: PathBuf,
    pub transform: InputTransform,
    pub bands: Vec<String>,
    pub output_index: usize,
    pub buffer: Option<BufferConfig>,
    pub tile_size: usize,
    /// Worker threads; unset uses the global pool, 1 runs sequentially
    pub threads: Option<usize>,
    pub emit_scores: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            variant: "global-v2".to_string(),
            table: None,
            model: PathBuf::new(),
            transform: InputTransform::default(),
            bands: Vec::new(),
            output_index: 0,
            buffer: Some(BufferConfig::default()),
            tile_size: DEFAULT_TILE_SIZE,
            threads: None,
            emit_scores: false,
        }
    }
}

impl PipelineConfig {
    /// Read a configuration file. A relative `model` path is resolved
    /// against the file's directory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ResourceUnavailable {
                resource: path.display().to_string(),
                reason: "configuration file not found".to_string(),
            },
            _ => Error::Io(e),
        })?;

        let mut config = Self::from_json_str(&text)?;
        if config.model.is_relative() && !config.model.as_os_str().is_empty() {
            if let Some(dir) = path.parent() {
                config.model = dir.join(&config.model);
            }
        }
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The threshold table this configuration selects
    pub fn threshold_table(&self) -> Result<ThresholdTable> {
        match &self.table {
            Some(source) => source.resolve(),
            None => ThresholdTable::named(&self.variant),
        }
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        ProcessingMode::from_threads(self.threads)
    }

    /// Load the model and table and wire the classifier.
    ///
    /// Every fatal condition (missing or corrupt model, unknown table,
    /// band/transform/output mismatch) is reported here, before any pixel
    /// is processed.
    pub fn build(&self) -> Result<PixelClassifier> {
        if self.tile_size == 0 {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: "0".to_string(),
                reason: "tiles must be at least one pixel wide".to_string(),
            });
        }
        let table = self.threshold_table()?;
        if self.model.as_os_str().is_empty() {
            return Err(Error::ResourceUnavailable {
                resource: "model".to_string(),
                reason: "no model path configured".to_string(),
            });
        }
        let model = Arc::new(NetworkModel::from_path(&self.model)?);

        let bands = if self.bands.is_empty() {
            (1..=model.inputs()).map(|i| format!("band_{}", i)).collect()
        } else {
            self.bands.clone()
        };

        let variant = ClassifierVariant::new(
            self.variant.clone(),
            table,
            model,
            self.transform.clone(),
            bands,
            self.output_index,
        )?;
        info!(
            "pipeline '{}': model {} ({}), transform {}, {}-class table",
            variant.name(),
            self.model.display(),
            variant.model().describe(),
            variant.transform().label(),
            variant.table().arity()
        );

        Ok(PixelClassifier::new(variant)
            .with_buffer(self.buffer.as_ref().map(CloudBufferParams::from))
            .with_tile_size(self.tile_size)
            .with_mode(self.processing_mode())
            .with_scores(self.emit_scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.processing_mode(), ProcessingMode::Parallel);
        let buffer = config.buffer.unwrap();
        assert_eq!(buffer.radius, 2);
        assert_eq!(buffer.trigger, FlagSet::from(PixelFlag::Cloud));
    }

    #[test]
    fn test_full_document() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "variant": "water-v1-simple",
                "model": "/models/water.net",
                "transform": [{ "kind": "log" }, { "kind": "identity" }],
                "bands": ["b1", "b2"],
                "buffer": { "radius": 1, "trigger": ["cloud", "ambiguous"] },
                "tile_size": 64,
                "threads": 1,
                "emit_scores": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.processing_mode(), ProcessingMode::Sequential);
        assert_eq!(config.threshold_table().unwrap().arity(), 3);
        let buffer = CloudBufferParams::from(config.buffer.as_ref().unwrap());
        assert!(buffer.trigger.contains(PixelFlag::Ambiguous));
        assert_eq!(buffer.radius, 1);
    }

    #[test]
    fn test_buffer_null_disables_pass() {
        let config = PipelineConfig::from_json_str(r#"{ "buffer": null }"#).unwrap();
        assert!(config.buffer.is_none());
    }

    #[test]
    fn test_table_override() {
        let named = PipelineConfig::from_json_str(r#"{ "variant": "x", "table": "land-v1" }"#).unwrap();
        assert_eq!(named.threshold_table().unwrap(), ThresholdTable::named("land-v1").unwrap());

        let inline = PipelineConfig::from_json_str(
            r#"{ "table": { "boundaries": [0.5], "flags": ["clear", "cloud"] } }"#,
        )
        .unwrap();
        assert_eq!(inline.threshold_table().unwrap().arity(), 2);
    }

    #[test]
    fn test_unknown_table() {
        let config = PipelineConfig::from_json_str(r#"{ "variant": "arctic-v9" }"#).unwrap();
        assert!(matches!(config.threshold_table(), Err(Error::ResourceUnavailable { .. })));
        assert!(matches!(config.build(), Err(Error::ResourceUnavailable { .. })));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{ "radius": 3 }"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_missing_model() {
        let config = PipelineConfig::default();
        assert!(matches!(config.build(), Err(Error::ResourceUnavailable { .. })));
        let config = PipelineConfig {
            model: PathBuf::from("/nonexistent/cloud.net"),
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(Error::ResourceUnavailable { .. })));
    }

    #[test]
    fn test_zero_tile_size() {
        let config = PipelineConfig {
            tile_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            PipelineConfig::from_path("/nonexistent/pipeline.json"),
            Err(Error::ResourceUnavailable { .. })
        ));
    }
}
