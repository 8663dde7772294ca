use crate::engine::Position;

/// Per-frame simulated time step.
pub const FRAME_DT: f64 = 0.016;

#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<usize>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start: Position,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// Screen-side state of the canvas: pan/zoom, gestures in progress and the
/// hover fade. Graph data lives in the refresh controller.
#[derive(Clone, Debug, Default)]
pub struct CanvasState {
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub width: f64,
	pub height: f64,
	pub flow_time: f64,
	/// 0 = no hover emphasis, 1 = fully applied.
	pub highlight_t: f64,
	hover_active: bool,
	delay_t: f64,
}

impl CanvasState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			width,
			height,
			..Self::default()
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn set_hover_active(&mut self, active: bool) {
		if active && !self.hover_active {
			self.delay_t = 0.0;
		}
		if !active {
			self.highlight_t = 0.0;
		}
		self.hover_active = active;
	}

	pub fn zoom_at(&mut self, x: f64, y: f64, zoom_in: bool) {
		let factor = if zoom_in { 1.1 } else { 0.9 };
		let new_k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = x - (x - self.transform.x) * ratio;
		self.transform.y = y - (y - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn tick(&mut self, dt: f64) {
		self.flow_time += dt;
		if !self.hover_active {
			return;
		}
		let (delay, speed) = (0.08, 1.8);
		self.delay_t = (self.delay_t + dt).min(delay);
		if self.delay_t >= delay {
			self.highlight_t += (1.0 - self.highlight_t) * speed * dt;
		}
	}

	/// Abandon any drag or pan in progress; node indices do not survive a
	/// scene swap.
	pub fn cancel_gestures(&mut self) {
		self.drag = DragState::default();
		self.pan.active = false;
		self.set_hover_active(false);
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cancel_gestures_forgets_dragged_node() {
		let mut state = CanvasState::new(400.0, 300.0);
		state.drag.active = true;
		state.drag.node_idx = Some(3);
		state.pan.active = true;
		state.set_hover_active(true);
		state.tick(1.0);
		assert!(state.highlight_t > 0.0);

		state.cancel_gestures();
		assert!(!state.drag.active);
		assert_eq!(state.drag.node_idx, None);
		assert!(!state.pan.active);
		assert_eq!(state.highlight_t, 0.0);
	}

	#[test]
	fn zoom_keeps_point_under_cursor() {
		let mut state = CanvasState::new(400.0, 300.0);
		let before = state.screen_to_graph(120.0, 80.0);
		state.zoom_at(120.0, 80.0, true);
		let after = state.screen_to_graph(120.0, 80.0);
		assert!((before.0 - after.0).abs() < 1e-9);
		assert!((before.1 - after.1).abs() < 1e-9);
	}
}
