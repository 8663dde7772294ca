use std::f64::consts::{FRAC_PI_2, PI};

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use serde::Deserialize;

use super::{LayoutEngine, LayoutKind, Position, Viewport};

/// Force simulation parameters.
///
/// Charge and spring integration come from `force_graph`; on top of it each
/// tick pulls linked nodes toward `link_distance`, drifts the whole system
/// toward the center and cools `alpha` by `alpha_decay`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForceConfig {
	/// Repulsion between every pair of nodes.
	pub charge: f32,
	/// Attraction along links.
	pub spring: f32,
	/// Cap on the force applied to one node per update.
	pub force_max: f32,
	/// Velocity scale of the integrator.
	pub node_speed: f32,
	/// Velocity kept between updates, 0 to 1.
	pub damping: f32,
	/// Mass of every node.
	pub node_mass: f32,
	/// Rest length of a link.
	pub link_distance: f64,
	/// Fraction of the rest-length error corrected per tick at full temperature.
	pub link_strength: f64,
	/// Fraction of the offset between the centroid and the viewport center
	/// corrected per tick.
	pub center_strength: f64,
	/// Simulated seconds per tick at full temperature.
	pub time_step: f32,
	/// Temperature below which the layout counts as settled.
	pub alpha_min: f64,
	/// Fraction of the temperature lost per tick.
	pub alpha_decay: f64,
	/// Hard cap on ticks per (re)heat.
	pub max_iterations: usize,
	/// Temperature restored when a dragged node is released.
	pub reheat_alpha: f64,
}

impl Default for ForceConfig {
	fn default() -> Self {
		Self {
			charge: 150.0,
			spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping: 0.9,
			node_mass: 10.0,
			link_distance: 100.0,
			link_strength: 0.3,
			center_strength: 0.1,
			time_step: 0.016,
			alpha_min: 0.001,
			// reaches alpha_min after ~300 ticks
			alpha_decay: 0.0228,
			max_iterations: 300,
			reheat_alpha: 0.3,
		}
	}
}

/// Nodes closer than this are treated as stacked and nudged apart; neither
/// the charge nor the link pass has a direction to push along otherwise.
const MIN_SEPARATION: f64 = 0.5;
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

#[derive(Clone, Debug, Default)]
struct NodeSlot {
	index: usize,
}

/// Iterative force-directed placement, one tick per animation frame.
pub struct ForceLayout {
	graph: ForceGraph<NodeSlot, ()>,
	handles: Vec<DefaultNodeIdx>,
	links: Vec<(usize, usize)>,
	positions: Vec<Position>,
	viewport: Viewport,
	config: ForceConfig,
	alpha: f64,
	ticks: usize,
	dragging: Option<usize>,
}

impl ForceLayout {
	/// `seed` gives the starting position of every node; links refer to
	/// indices into it. Links with an out-of-range endpoint are ignored.
	pub fn new(
		seed: Vec<Position>,
		links: impl IntoIterator<Item = (usize, usize)>,
		viewport: Viewport,
		config: ForceConfig,
	) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: config.charge,
			force_spring: config.spring,
			force_max: config.force_max,
			node_speed: config.node_speed,
			damping_factor: config.damping,
		});
		let positions: Vec<Position> = seed.into_iter().map(|p| viewport.clamp(p)).collect();
		let handles: Vec<DefaultNodeIdx> = positions
			.iter()
			.enumerate()
			.map(|(index, p)| {
				graph.add_node(NodeData {
					x: p.x as f32,
					y: p.y as f32,
					mass: config.node_mass,
					is_anchor: false,
					user_data: NodeSlot { index },
				})
			})
			.collect();

		let mut kept = Vec::new();
		for (source, target) in links {
			if source >= handles.len() || target >= handles.len() || source == target {
				continue;
			}
			graph.add_edge(handles[source], handles[target], EdgeData::default());
			kept.push((source, target));
		}

		let mut layout = Self {
			graph,
			handles,
			links: kept,
			positions,
			viewport,
			alpha: 1.0,
			ticks: 0,
			dragging: None,
			config,
		};
		layout.separate_stacked();
		layout.push_positions();
		layout
	}

	/// Current temperature.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Ticks run since the last (re)heat.
	pub fn ticks(&self) -> usize {
		self.ticks
	}

	/// Parameters in effect, with snapshot hints applied.
	pub fn config(&self) -> &ForceConfig {
		&self.config
	}

	fn is_pinned(&self, idx: usize) -> bool {
		self.dragging == Some(idx)
	}

	fn reheat(&mut self) {
		self.alpha = self.alpha.max(self.config.reheat_alpha);
		self.ticks = 0;
	}

	fn set_anchor(&mut self, idx: usize, anchored: bool) {
		let Some(&handle) = self.handles.get(idx) else {
			return;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.index() == handle {
				node.data.is_anchor = anchored;
			}
		});
	}

	fn pull_positions(&mut self) {
		let (positions, pinned) = (&mut self.positions, self.dragging);
		self.graph.visit_nodes(|node| {
			let idx = node.data.user_data.index;
			if pinned != Some(idx) {
				positions[idx] = Position::new(node.x() as f64, node.y() as f64);
			}
		});
	}

	fn push_positions(&mut self) {
		let positions = &self.positions;
		self.graph.visit_nodes_mut(|node| {
			let p = positions[node.data.user_data.index];
			node.data.x = p.x as f32;
			node.data.y = p.y as f32;
		});
	}

	fn apply_links(&mut self) {
		let strength = self.config.link_strength * self.alpha;
		for &(s, t) in &self.links {
			let (ps, pt) = (self.positions[s], self.positions[t]);
			let (dx, dy) = (pt.x - ps.x, pt.y - ps.y);
			let dist = (dx * dx + dy * dy).sqrt();
			if dist < 1e-6 {
				continue;
			}
			let shift = (dist - self.config.link_distance) / dist * strength * 0.5;
			let (mx, my) = (dx * shift, dy * shift);
			if self.dragging != Some(t) {
				self.positions[t].x -= mx;
				self.positions[t].y -= my;
			}
			if self.dragging != Some(s) {
				self.positions[s].x += mx;
				self.positions[s].y += my;
			}
		}
	}

	/// Move each free node that sits on top of an earlier one a short,
	/// index-dependent step toward the viewport center. Deterministic, and
	/// the result stays inside the viewport.
	fn separate_stacked(&mut self) {
		let center = self.viewport.center();
		for j in 0..self.positions.len() {
			if self.is_pinned(j) {
				continue;
			}
			let p = self.positions[j];
			let dragged = self.dragging;
			let stacked = self.positions.iter().enumerate().any(|(i, q)| {
				i != j && (i < j || dragged == Some(i)) && q.distance(p) < MIN_SEPARATION
			});
			if !stacked {
				continue;
			}
			let (cx, cy) = (center.x - p.x, center.y - p.y);
			let inward = if cx.hypot(cy) > MIN_SEPARATION {
				cy.atan2(cx)
			} else {
				0.0
			};
			let angle = inward + (j as f64 * GOLDEN_ANGLE).rem_euclid(PI) - FRAC_PI_2;
			let step = 2.0 * MIN_SEPARATION;
			self.positions[j] = self.viewport.clamp(Position::new(
				p.x + angle.cos() * step,
				p.y + angle.sin() * step,
			));
		}
	}

	fn apply_centering(&mut self) {
		let free = self.positions.len() - self.dragging.map_or(0, |_| 1);
		if free == 0 {
			return;
		}
		let (mut sx, mut sy) = (0.0, 0.0);
		for (i, p) in self.positions.iter().enumerate() {
			if !self.is_pinned(i) {
				sx += p.x;
				sy += p.y;
			}
		}
		let center = self.viewport.center();
		let k = self.config.center_strength;
		let (ox, oy) = ((center.x - sx / free as f64) * k, (center.y - sy / free as f64) * k);
		for i in 0..self.positions.len() {
			if !self.is_pinned(i) {
				self.positions[i].x += ox;
				self.positions[i].y += oy;
			}
		}
	}
}

impl LayoutEngine for ForceLayout {
	fn kind(&self) -> LayoutKind {
		LayoutKind::Force
	}

	fn positions(&self) -> &[Position] {
		&self.positions
	}

	fn step(&mut self) -> bool {
		if self.is_settled() {
			return false;
		}
		self.graph.update(self.config.time_step * self.alpha as f32);
		self.pull_positions();
		self.apply_links();
		self.apply_centering();
		let viewport = self.viewport;
		for p in &mut self.positions {
			*p = viewport.clamp(*p);
		}
		self.separate_stacked();
		self.push_positions();

		self.alpha *= 1.0 - self.config.alpha_decay;
		self.ticks += 1;
		true
	}

	fn is_settled(&self) -> bool {
		self.positions.is_empty()
			|| self.alpha < self.config.alpha_min
			|| self.ticks >= self.config.max_iterations
	}

	fn begin_drag(&mut self, idx: usize) {
		if idx >= self.positions.len() {
			return;
		}
		if let Some(prev) = self.dragging.take() {
			self.set_anchor(prev, false);
		}
		self.dragging = Some(idx);
		self.set_anchor(idx, true);
	}

	fn drag_to(&mut self, idx: usize, x: f64, y: f64) {
		if !self.is_pinned(idx) {
			return;
		}
		self.positions[idx] = self.viewport.clamp(Position::new(x, y));
		self.push_positions();
	}

	fn end_drag(&mut self, idx: usize) {
		if !self.is_pinned(idx) {
			return;
		}
		self.dragging = None;
		self.set_anchor(idx, false);
		self.reheat();
	}

	fn resize(&mut self, viewport: Viewport) {
		self.viewport = viewport.with_padding(self.viewport.padding);
		let viewport = self.viewport;
		for p in &mut self.positions {
			*p = viewport.clamp(*p);
		}
		self.push_positions();
		self.reheat();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::layout::circular_positions;

	fn layout(n: usize, links: &[(usize, usize)], config: ForceConfig) -> ForceLayout {
		let viewport = Viewport::new(800.0, 600.0);
		ForceLayout::new(
			circular_positions(n, &viewport, 0.35),
			links.iter().copied(),
			viewport,
			config,
		)
	}

	fn ring(n: usize) -> Vec<(usize, usize)> {
		(0..n).map(|i| (i, (i + 1) % n)).collect()
	}

	#[test]
	fn terminates_within_iteration_cap() {
		let config = ForceConfig {
			max_iterations: 50,
			alpha_decay: 0.0001,
			..ForceConfig::default()
		};
		let mut sim = layout(12, &ring(12), config);
		assert_eq!(sim.run_until_settled(), 50);
		assert!(sim.is_settled());
		assert!(!sim.step());
	}

	#[test]
	fn terminates_without_edges_or_nodes() {
		let mut sim = layout(20, &[], ForceConfig::default());
		let ticks = sim.run_until_settled();
		assert!(ticks <= ForceConfig::default().max_iterations);

		let mut empty = layout(0, &[], ForceConfig::default());
		assert_eq!(empty.run_until_settled(), 0);
	}

	#[test]
	fn alpha_cools_to_convergence() {
		let config = ForceConfig {
			max_iterations: 10_000,
			alpha_decay: 0.1,
			..ForceConfig::default()
		};
		let mut sim = layout(5, &ring(5), config);
		let ticks = sim.run_until_settled();
		assert!(ticks < 100, "{ticks}");
		assert!(sim.alpha() < sim.config().alpha_min);
	}

	#[test]
	fn positions_stay_in_viewport() {
		let viewport = Viewport::new(800.0, 600.0);
		let mut links = ring(40);
		links.extend((0..40).map(|i| (0, i)));
		let mut sim = layout(40, &links, ForceConfig::default());
		while sim.step() {
			assert!(sim.positions().iter().all(|p| viewport.contains(*p)));
		}
		assert_eq!(sim.positions().len(), 40);
	}

	#[test]
	fn dragged_node_is_pinned_until_release() {
		let mut sim = layout(6, &ring(6), ForceConfig::default());
		sim.begin_drag(2);
		sim.drag_to(2, 123.0, 321.0);
		for _ in 0..20 {
			sim.step();
		}
		assert_eq!(sim.positions()[2], Position::new(123.0, 321.0));

		sim.run_until_settled();
		sim.end_drag(2);
		assert!(!sim.is_settled());
		assert_eq!(sim.ticks(), 0);
		assert!(sim.alpha() >= sim.config().reheat_alpha);
	}

	fn assert_apart(positions: &[Position]) {
		for (i, a) in positions.iter().enumerate() {
			for b in &positions[i + 1..] {
				assert!(a.distance(*b) > 1e-3, "{a:?} and {b:?} overlap");
			}
		}
	}

	#[test]
	fn stacked_nodes_are_pushed_apart() {
		let viewport = Viewport::new(400.0, 400.0);
		let mut sim = ForceLayout::new(
			vec![Position::new(100.0, 100.0); 3],
			[(0, 1)],
			viewport,
			ForceConfig::default(),
		);
		assert_apart(sim.positions());
		sim.run_until_settled();
		assert_apart(sim.positions());
		assert!(sim.positions().iter().all(|p| viewport.contains(*p)));
	}

	#[test]
	fn nodes_clamped_into_a_corner_do_not_stack() {
		let viewport = Viewport::new(100.0, 100.0);
		let mut sim = ForceLayout::new(
			vec![Position::new(-50.0, -50.0); 4],
			std::iter::empty(),
			viewport,
			ForceConfig::default(),
		);
		for _ in 0..5 {
			sim.step();
			assert_apart(sim.positions());
		}
	}

	#[test]
	fn ignores_out_of_range_links_and_drags() {
		let mut sim = layout(3, &[(0, 9), (1, 1), (0, 2)], ForceConfig::default());
		assert_eq!(sim.links, vec![(0, 2)]);
		sim.drag_to(0, 10.0, 10.0);
		sim.begin_drag(42);
		assert_eq!(sim.dragging, None);
	}
}
