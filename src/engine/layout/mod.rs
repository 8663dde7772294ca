//! Node placement.
//!
//! Both strategies sit behind [`LayoutEngine`] and keep every position
//! inside the [`Viewport`].

mod circular;
mod force;

use serde::Deserialize;
use serde_json::Value;

pub use circular::{CircularLayout, circular_positions};
pub use force::{ForceConfig, ForceLayout};

use super::model::GraphSnapshot;

/// A point in graph coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
	/// Horizontal, growing rightwards.
	pub x: f64,
	/// Vertical, growing downwards.
	pub y: f64,
}

impl Position {
	/// A point at `(x, y)`.
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Euclidean distance.
	pub fn distance(self, other: Position) -> f64 {
		((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
	}
}

/// The drawable area. Positions are confined to `[0, width] x [0, height]`,
/// inset by `padding` where the area is large enough.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	/// Width in graph units.
	pub width: f64,
	/// Height in graph units.
	pub height: f64,
	/// Border inset kept free of nodes.
	pub padding: f64,
}

impl Default for Viewport {
	fn default() -> Self {
		Self::new(800.0, 600.0)
	}
}

impl Viewport {
	/// A viewport with the default 20 unit padding.
	pub fn new(width: f64, height: f64) -> Self {
		let sane = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
		Self {
			width: sane(width),
			height: sane(height),
			padding: 20.0,
		}
	}

	/// Replace the padding; negative or non-finite values become 0.
	pub fn with_padding(mut self, padding: f64) -> Self {
		self.padding = if padding.is_finite() { padding.max(0.0) } else { 0.0 };
		self
	}

	/// Midpoint of the area.
	pub fn center(&self) -> Position {
		Position::new(self.width / 2.0, self.height / 2.0)
	}

	/// Whether `p` lies in `[0, width] x [0, height]`.
	pub fn contains(&self, p: Position) -> bool {
		(0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
	}

	/// Pull a position inside the padded area; non-finite coordinates go to
	/// the center.
	pub fn clamp(&self, p: Position) -> Position {
		let inset_x = self.padding.min(self.width / 2.0);
		let inset_y = self.padding.min(self.height / 2.0);
		let axis = |v: f64, inset: f64, extent: f64| {
			if v.is_finite() {
				v.clamp(inset, extent - inset)
			} else {
				extent / 2.0
			}
		};
		Position::new(
			axis(p.x, inset_x, self.width),
			axis(p.y, inset_y, self.height),
		)
	}
}

/// Which placement strategy runs.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
	/// Deterministic ring, no simulation.
	Circular,
	/// Force-directed simulation.
	#[default]
	Force,
}

/// Placement parameters.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
	/// Strategy to run.
	pub kind: LayoutKind,
	/// Circle radius as a fraction of `min(width, height)`.
	pub radius_fraction: f64,
	/// Inset kept free along the viewport border.
	pub padding: f64,
	/// Parameters of the force-directed strategy.
	pub force: ForceConfig,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			kind: LayoutKind::Force,
			radius_fraction: 0.35,
			padding: 20.0,
			force: ForceConfig::default(),
		}
	}
}

impl LayoutConfig {
	/// Force parameters with the snapshot's `metadata.d3_config` hints
	/// (`link_distance`, `center_force`) applied.
	pub fn force_for(&self, metadata: Option<&Value>) -> ForceConfig {
		let mut force = self.force.clone();
		let Some(hints) = metadata.and_then(|m| m.get("d3_config")) else {
			return force;
		};
		let positive = |key: &str| hints.get(key).and_then(Value::as_f64).filter(|v| *v > 0.0);
		if let Some(distance) = positive("link_distance") {
			force.link_distance = distance;
		}
		if let Some(center) = positive("center_force") {
			force.center_strength = center.min(1.0);
		}
		force
	}
}

/// A placement strategy driven one tick at a time.
pub trait LayoutEngine {
	/// Which strategy this is.
	fn kind(&self) -> LayoutKind;

	/// One position per snapshot node, in snapshot order.
	fn positions(&self) -> &[Position];

	/// Advance one tick. Returns `false` once there is nothing left to do.
	fn step(&mut self) -> bool;

	/// Whether further ticks would change nothing.
	fn is_settled(&self) -> bool;

	/// Pin a node so forces no longer move it.
	fn begin_drag(&mut self, idx: usize);

	/// Move a pinned node; the target is clamped to the viewport.
	fn drag_to(&mut self, idx: usize, x: f64, y: f64);

	/// Release the pin and let the neighbourhood resettle.
	fn end_drag(&mut self, idx: usize);

	/// Adapt to a new drawable area, keeping positions inside it.
	fn resize(&mut self, viewport: Viewport);

	/// Tick until settled; returns the number of ticks that ran.
	fn run_until_settled(&mut self) -> usize {
		let mut ticks = 0;
		while self.step() {
			ticks += 1;
		}
		ticks
	}
}

/// Build the configured strategy for a snapshot.
pub fn create_layout(
	snapshot: &GraphSnapshot,
	config: &LayoutConfig,
	viewport: Viewport,
) -> Box<dyn LayoutEngine> {
	let viewport = viewport.with_padding(config.padding);
	match config.kind {
		LayoutKind::Circular => Box::new(CircularLayout::new(
			snapshot.len(),
			viewport,
			config.radius_fraction,
		)),
		LayoutKind::Force => {
			let seed = circular_positions(snapshot.len(), &viewport, config.radius_fraction);
			let links = snapshot.edges().iter().map(|e| (e.source, e.target));
			Box::new(ForceLayout::new(
				seed,
				links,
				viewport,
				config.force_for(snapshot.metadata()),
			))
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn clamp_keeps_points_inside() {
		let viewport = Viewport::new(100.0, 50.0).with_padding(10.0);
		assert_eq!(viewport.clamp(Position::new(-5.0, 500.0)), Position::new(10.0, 40.0));
		assert_eq!(viewport.clamp(Position::new(f64::NAN, 20.0)), Position::new(50.0, 20.0));

		let tiny = Viewport::new(8.0, 0.0).with_padding(10.0);
		let p = tiny.clamp(Position::new(100.0, 100.0));
		assert!(tiny.contains(p), "{p:?}");
	}

	#[test]
	fn metadata_hints_override_force_config() {
		let config = LayoutConfig::default();
		let meta = json!({"d3_config": {"link_distance": 60, "center_force": 0.4, "charge_strength": -200}});
		let force = config.force_for(Some(&meta));
		assert_eq!(force.link_distance, 60.0);
		assert_eq!(force.center_strength, 0.4);
		assert_eq!(config.force_for(None), config.force);

		let bogus = json!({"d3_config": {"link_distance": -1}});
		assert_eq!(config.force_for(Some(&bogus)).link_distance, config.force.link_distance);
	}

	#[test]
	fn layout_kind_deserializes_lowercase() {
		let kind: LayoutKind = serde_json::from_str("\"circular\"").unwrap();
		assert_eq!(kind, LayoutKind::Circular);
	}
}
