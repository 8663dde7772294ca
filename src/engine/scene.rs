//! A loaded snapshot together with its layout, encodings and interaction
//! state. Produces the [`Frame`] a render surface draws from.

use log::debug;

use super::config::EngineConfig;
use super::encoding::{
	EdgeStyle, EncodingConfig, NodeStyle, emphasize_edge, emphasize_node, encode_edge, encode_node,
};
use super::interaction::{Affected, InteractionState, NodeDetail};
use super::layout::{LayoutEngine, LayoutKind, Position, Viewport, create_layout};
use super::model::GraphSnapshot;

/// A positioned, encoded node.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderNode<'a> {
	/// Index in the snapshot.
	pub index: usize,
	/// Node id.
	pub id: &'a str,
	/// Text drawn next to the node.
	pub label: &'a str,
	/// Current layout position.
	pub position: Position,
	/// Encoded visual attributes.
	pub style: NodeStyle,
}

/// A positioned, encoded edge.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderEdge {
	/// Position of the source node.
	pub source: Position,
	/// Position of the target node.
	pub target: Position,
	/// Drawn radius of the source, for trimming the line.
	pub source_radius: f64,
	/// Drawn radius of the target, where the arrowhead ends.
	pub target_radius: f64,
	/// Encoded visual attributes.
	pub style: EdgeStyle,
}

/// Everything needed to draw one frame, independent of the drawing API.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame<'a> {
	/// Nodes, in snapshot order.
	pub nodes: Vec<RenderNode<'a>>,
	/// Edges, in snapshot order.
	pub edges: Vec<RenderEdge>,
}

/// One loaded snapshot with its layout, encoding and interaction state.
pub struct Scene {
	snapshot: GraphSnapshot,
	layout: Box<dyn LayoutEngine>,
	encoding: EncodingConfig,
	hit_slack: f64,
	base_nodes: Vec<NodeStyle>,
	base_edges: Vec<EdgeStyle>,
	node_styles: Vec<NodeStyle>,
	edge_styles: Vec<EdgeStyle>,
	incident: Vec<Vec<usize>>,
	interaction: InteractionState,
}

impl Scene {
	/// Encode `snapshot` and seed its layout in `viewport`.
	pub fn new(snapshot: GraphSnapshot, config: &EngineConfig, viewport: Viewport) -> Self {
		let encoding = config.encoding.clone();
		let base_nodes: Vec<NodeStyle> = snapshot
			.nodes()
			.iter()
			.map(|n| encode_node(n, &encoding))
			.collect();
		let mut incident = vec![Vec::new(); snapshot.len()];
		let base_edges: Vec<EdgeStyle> = snapshot
			.edges()
			.iter()
			.enumerate()
			.map(|(i, e)| {
				incident[e.source].push(i);
				if e.target != e.source {
					incident[e.target].push(i);
				}
				let nodes = snapshot.nodes();
				encode_edge(e, &nodes[e.source], &nodes[e.target], &encoding)
			})
			.collect();
		let layout = create_layout(&snapshot, &config.layout, viewport);
		debug!(
			"scene built: {} nodes, {} edges, {:?} layout",
			snapshot.len(),
			snapshot.edges().len(),
			layout.kind()
		);

		Self {
			node_styles: base_nodes.clone(),
			edge_styles: base_edges.clone(),
			base_nodes,
			base_edges,
			incident,
			layout,
			encoding,
			hit_slack: config.hit_slack,
			interaction: InteractionState::default(),
			snapshot,
		}
	}

	/// The normalized graph.
	pub fn snapshot(&self) -> &GraphSnapshot {
		&self.snapshot
	}

	/// Active layout strategy.
	pub fn layout_kind(&self) -> LayoutKind {
		self.layout.kind()
	}

	/// Current position of every node, in snapshot order.
	pub fn positions(&self) -> &[Position] {
		self.layout.positions()
	}

	/// Current style of node `idx`, emphasis applied.
	pub fn node_style(&self, idx: usize) -> Option<&NodeStyle> {
		self.node_styles.get(idx)
	}

	/// Current style of edge `idx`, emphasis applied.
	pub fn edge_style(&self, idx: usize) -> Option<&EdgeStyle> {
		self.edge_styles.get(idx)
	}

	/// Hover and selection state.
	pub fn interaction(&self) -> &InteractionState {
		&self.interaction
	}

	/// Advance the layout one tick; `false` once it has settled.
	pub fn tick(&mut self) -> bool {
		self.layout.step()
	}

	/// Whether the layout has come to rest.
	pub fn is_settled(&self) -> bool {
		self.layout.is_settled()
	}

	/// Run the layout to completion.
	pub fn settle(&mut self) -> usize {
		self.layout.run_until_settled()
	}

	/// Adapt the layout to a new drawable area.
	pub fn resize(&mut self, viewport: Viewport) {
		self.layout.resize(viewport);
	}

	/// Hover by id; `true` when any style changed.
	pub fn hover(&mut self, id: Option<&str>) -> bool {
		let affected = self.interaction.hover(&self.snapshot, id);
		self.reencode(affected)
	}

	/// Hover by index; `true` when any style changed.
	pub fn hover_index(&mut self, idx: Option<usize>) -> bool {
		let affected = self.interaction.hover_index(&self.snapshot, idx);
		self.reencode(affected)
	}

	/// Select by id; unknown ids leave the selection unchanged.
	pub fn select(&mut self, id: Option<&str>) -> bool {
		let affected = self.interaction.select(&self.snapshot, id);
		self.reencode(affected)
	}

	/// Select by index; out-of-range indices change nothing.
	pub fn select_index(&mut self, idx: Option<usize>) -> bool {
		if idx.is_some_and(|i| i >= self.snapshot.len()) {
			return false;
		}
		let affected = self.interaction.select_index(idx);
		self.reencode(affected)
	}

	/// Id of the selected node.
	pub fn selected_id(&self) -> Option<&str> {
		let idx = self.interaction.selected()?;
		self.snapshot.node(idx).map(|n| n.id.as_str())
	}

	/// Detail panel content for the selected node.
	pub fn detail(&self) -> Option<NodeDetail> {
		self.interaction.detail(&self.snapshot)
	}

	/// Pin node `idx` under the pointer.
	pub fn begin_drag(&mut self, idx: usize) {
		self.layout.begin_drag(idx);
	}

	/// Move the pinned node; other indices are ignored.
	pub fn drag_to(&mut self, idx: usize, x: f64, y: f64) {
		self.layout.drag_to(idx, x, y);
	}

	/// Release the pinned node.
	pub fn end_drag(&mut self, idx: usize) {
		self.layout.end_drag(idx);
	}

	/// The node under a graph-space point: the closest one whose drawn
	/// radius plus the pick slack covers it.
	pub fn node_at(&self, x: f64, y: f64) -> Option<usize> {
		let point = Position::new(x, y);
		self.layout
			.positions()
			.iter()
			.enumerate()
			.map(|(i, p)| (i, p.distance(point)))
			.filter(|&(i, d)| d <= self.node_styles[i].size / 2.0 + self.hit_slack)
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(i, _)| i)
	}

	fn reencode(&mut self, affected: Affected) -> bool {
		match affected {
			Affected::None => false,
			Affected::All => {
				for i in 0..self.node_styles.len() {
					self.reencode_node(i);
				}
				for e in 0..self.edge_styles.len() {
					self.reencode_edge(e);
				}
				true
			}
			Affected::Nodes(nodes) => {
				for &i in &nodes {
					self.reencode_node(i);
				}
				for &i in &nodes {
					for k in 0..self.incident[i].len() {
						self.reencode_edge(self.incident[i][k]);
					}
				}
				true
			}
		}
	}

	fn reencode_node(&mut self, idx: usize) {
		self.node_styles[idx] = emphasize_node(
			self.base_nodes[idx],
			self.interaction.emphasis(idx),
			&self.encoding,
		);
	}

	fn reencode_edge(&mut self, idx: usize) {
		let edge = self.snapshot.edges()[idx];
		let highlighted =
			self.interaction.is_highlighted(edge.source) && self.interaction.is_highlighted(edge.target);
		let dim = self.interaction.hovered().is_some() && !highlighted;
		self.edge_styles[idx] = emphasize_edge(self.base_edges[idx], highlighted, dim, &self.encoding);
	}

	/// The current frame: edges first so nodes draw on top.
	pub fn frame(&self) -> Frame<'_> {
		let positions = self.layout.positions();
		let nodes = self
			.snapshot
			.nodes()
			.iter()
			.enumerate()
			.map(|(index, node)| RenderNode {
				index,
				id: &node.id,
				label: &node.name,
				position: positions[index],
				style: self.node_styles[index],
			})
			.collect();
		let edges = self
			.snapshot
			.edges()
			.iter()
			.zip(&self.edge_styles)
			.map(|(edge, style)| RenderEdge {
				source: positions[edge.source],
				target: positions[edge.target],
				source_radius: self.node_styles[edge.source].size / 2.0,
				target_radius: self.node_styles[edge.target].size / 2.0,
				style: *style,
			})
			.collect();
		Frame { nodes, edges }
	}
}

impl Drop for Scene {
	fn drop(&mut self) {
		debug!("scene released ({} nodes)", self.snapshot.len());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::encoding::{Emphasis, palette};
	use crate::engine::model::build_graph_model;
	use crate::engine::wire::{RawEdge, RawNode};

	fn scene(kind: LayoutKind) -> Scene {
		let snapshot = build_graph_model(
			vec![
				RawNode::new("n1").with_risk(9.5).with_anomaly(true),
				RawNode::new("n2").with_risk(1.0),
				RawNode::new("n3").with_risk(5.0),
			],
			vec![RawEdge::new("n1", "n2"), RawEdge::new("n2", "n3")],
			None,
		);
		let mut config = EngineConfig::default();
		config.layout.kind = kind;
		Scene::new(snapshot, &config, Viewport::new(400.0, 300.0))
	}

	#[test]
	fn frame_covers_every_element() {
		let scene = scene(LayoutKind::Circular);
		let frame = scene.frame();
		assert_eq!(frame.nodes.len(), 3);
		assert_eq!(frame.edges.len(), 2);
		assert_eq!(frame.nodes[0].style.color, palette::ANOMALY);
		assert_eq!(frame.edges[0].style.color, palette::EDGE_ONE_ANOMALOUS);
		assert_eq!(frame.edges[0].source, frame.nodes[0].position);
	}

	#[test]
	fn hover_reencodes_without_moving_nodes() {
		let mut scene = scene(LayoutKind::Circular);
		let before = scene.positions().to_vec();
		assert!(scene.hover(Some("n3")));
		assert_eq!(scene.positions(), before.as_slice());
		assert_eq!(scene.node_style(2).unwrap().color, palette::HIGHLIGHT);
		assert_eq!(scene.node_style(1).unwrap().emphasis, Emphasis::Highlighted);
		assert_eq!(scene.node_style(0).unwrap().emphasis, Emphasis::Dimmed);
		assert!(scene.edge_style(1).unwrap().highlighted);
		assert!(!scene.edge_style(0).unwrap().highlighted);

		assert!(scene.hover(None));
		assert_eq!(scene.node_style(0).unwrap().color, palette::ANOMALY);
		assert_eq!(scene.edge_style(0).unwrap().opacity, 1.0);
		assert!(scene.snapshot().nodes()[0].is_anomaly);
	}

	#[test]
	fn selection_highlights_and_projects_detail() {
		let mut scene = scene(LayoutKind::Circular);
		assert!(scene.select(Some("n2")));
		assert_eq!(scene.selected_id(), Some("n2"));
		assert_eq!(scene.node_style(1).unwrap().color, palette::HIGHLIGHT);
		assert_eq!(scene.detail().unwrap().name, "n2");
		assert!(!scene.select(Some("nope")));
		assert_eq!(scene.selected_id(), Some("n2"));
		assert!(!scene.select_index(Some(99)));
		assert!(scene.select_index(None));
		assert!(scene.detail().is_none());
	}

	#[test]
	fn fresh_scene_ignores_drag_that_began_elsewhere() {
		for kind in [LayoutKind::Circular, LayoutKind::Force] {
			let mut scene = scene(kind);
			let before = scene.positions().to_vec();
			scene.drag_to(1, 5.0, 5.0);
			scene.end_drag(1);
			assert_eq!(scene.positions(), before.as_slice(), "{kind:?}");
		}
	}

	#[test]
	fn node_at_picks_closest_within_radius() {
		let scene = scene(LayoutKind::Circular);
		let p = scene.positions()[1];
		assert_eq!(scene.node_at(p.x + 2.0, p.y), Some(1));
		assert_eq!(scene.node_at(-1000.0, -1000.0), None);
	}

	#[test]
	fn force_scene_settles_inside_viewport() {
		let mut scene = scene(LayoutKind::Force);
		scene.settle();
		assert!(scene.is_settled());
		let viewport = Viewport::new(400.0, 300.0);
		assert!(scene.positions().iter().all(|p| viewport.contains(*p)));
	}
}
