use serde::Deserialize;

use super::encoding::EncodingConfig;
use super::error::ConfigError;
use super::layout::LayoutConfig;

/// Everything the engine can be tuned with. Every field has a default, so
/// `{}` is a valid configuration document.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
	/// Placement strategy and its parameters.
	pub layout: LayoutConfig,
	/// Visual encoding parameters.
	pub encoding: EncodingConfig,
	/// Pick tolerance around a node's drawn radius, in graph units.
	pub hit_slack: f64,
	/// Re-fetch on this cadence when set; otherwise only on request.
	pub refresh_interval_ms: Option<u32>,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			layout: LayoutConfig::default(),
			encoding: EncodingConfig::default(),
			hit_slack: 4.0,
			refresh_interval_ms: None,
		}
	}
}

impl EngineConfig {
	/// Parse and validate a JSON document.
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let config: Self = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	/// Check every numeric parameter is usable; the error names the field.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let check = |ok: bool, field: &'static str, reason: &'static str| {
			if ok {
				Ok(())
			} else {
				Err(ConfigError::Value { field, reason })
			}
		};
		let (layout, force, enc) = (&self.layout, &self.layout.force, &self.encoding);
		check(
			layout.radius_fraction > 0.0 && layout.radius_fraction <= 0.5,
			"layout.radius_fraction",
			"must be in (0, 0.5]",
		)?;
		check(layout.padding >= 0.0, "layout.padding", "must not be negative")?;
		check(
			force.alpha_decay > 0.0 && force.alpha_decay < 1.0,
			"layout.force.alpha_decay",
			"must be in (0, 1)",
		)?;
		check(
			force.max_iterations > 0,
			"layout.force.max_iterations",
			"must be positive",
		)?;
		check(
			force.link_distance > 0.0,
			"layout.force.link_distance",
			"must be positive",
		)?;
		check(
			enc.base_size > 0.0 && enc.max_size >= enc.base_size,
			"encoding.max_size",
			"must be at least base_size, which must be positive",
		)?;
		check(
			enc.edge_max_width > 0.0,
			"encoding.edge_max_width",
			"must be positive",
		)?;
		check(
			(0.0..=1.0).contains(&enc.dim_opacity),
			"encoding.dim_opacity",
			"must be in [0, 1]",
		)?;
		check(
			self.refresh_interval_ms != Some(0),
			"refresh_interval_ms",
			"must be positive when set",
		)?;
		check(self.hit_slack >= 0.0, "hit_slack", "must not be negative")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::layout::LayoutKind;

	#[test]
	fn empty_document_is_default() {
		assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
	}

	#[test]
	fn partial_document_overrides_fields() {
		let config = EngineConfig::from_json(
			r#"{"layout": {"kind": "circular", "force": {"max_iterations": 40}}, "encoding": {"base_size": 10}, "refresh_interval_ms": 30000}"#,
		)
		.unwrap();
		assert_eq!(config.layout.kind, LayoutKind::Circular);
		assert_eq!(config.layout.force.max_iterations, 40);
		assert_eq!(config.layout.force.link_distance, 100.0);
		assert_eq!(config.encoding.base_size, 10.0);
		assert_eq!(config.refresh_interval_ms, Some(30_000));
	}

	#[test]
	fn rejects_out_of_range_values() {
		let err = EngineConfig::from_json(r#"{"layout": {"force": {"alpha_decay": 1.5}}}"#).unwrap_err();
		assert!(matches!(
			err,
			ConfigError::Value {
				field: "layout.force.alpha_decay",
				..
			}
		));
		assert!(EngineConfig::from_json(r#"{"encoding": {"max_size": 2}}"#).is_err());
		assert!(matches!(
			EngineConfig::from_json("[1, 2]"),
			Err(ConfigError::Json(_))
		));
	}
}
