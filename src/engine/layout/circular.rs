use std::f64::consts::PI;

use super::{LayoutEngine, LayoutKind, Position, Viewport};

/// Node `i` of `n` at angle `i / n * 2pi` on a circle of radius
/// `min(width, height) * radius_fraction` around the viewport center.
///
/// The result depends on input order: the same order and viewport always
/// give the same positions, a different order gives a different picture.
pub fn circular_positions(n: usize, viewport: &Viewport, radius_fraction: f64) -> Vec<Position> {
	let center = viewport.center();
	let radius = viewport.width.min(viewport.height) * radius_fraction;
	(0..n)
		.map(|i| {
			let angle = (i as f64 / n as f64) * 2.0 * PI;
			viewport.clamp(Position::new(
				center.x + radius * angle.cos(),
				center.y + radius * angle.sin(),
			))
		})
		.collect()
}

/// Stateless ring placement. Dragging moves a node directly; a resize
/// recomputes the ring.
pub struct CircularLayout {
	positions: Vec<Position>,
	viewport: Viewport,
	radius_fraction: f64,
	dragging: Option<usize>,
}

impl CircularLayout {
	/// `n` nodes on a ring inside `viewport`.
	pub fn new(n: usize, viewport: Viewport, radius_fraction: f64) -> Self {
		Self {
			positions: circular_positions(n, &viewport, radius_fraction),
			viewport,
			radius_fraction,
			dragging: None,
		}
	}
}

impl LayoutEngine for CircularLayout {
	fn kind(&self) -> LayoutKind {
		LayoutKind::Circular
	}

	fn positions(&self) -> &[Position] {
		&self.positions
	}

	fn step(&mut self) -> bool {
		false
	}

	fn is_settled(&self) -> bool {
		true
	}

	fn begin_drag(&mut self, idx: usize) {
		if idx < self.positions.len() {
			self.dragging = Some(idx);
		}
	}

	/// Only the node passed to `begin_drag` moves.
	fn drag_to(&mut self, idx: usize, x: f64, y: f64) {
		if self.dragging != Some(idx) {
			return;
		}
		self.positions[idx] = self.viewport.clamp(Position::new(x, y));
	}

	fn end_drag(&mut self, idx: usize) {
		if self.dragging == Some(idx) {
			self.dragging = None;
		}
	}

	fn resize(&mut self, viewport: Viewport) {
		self.viewport = viewport.with_padding(self.viewport.padding);
		self.positions = circular_positions(self.positions.len(), &self.viewport, self.radius_fraction);
	}
}
