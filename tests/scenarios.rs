//! End-to-end behaviour of the engine, from API body to rendered frame.

use std::cell::RefCell;

use security_graph_canvas::engine::encoding::palette;
use security_graph_canvas::engine::wire::{GraphResponse, decode_response};
use security_graph_canvas::engine::{
	DemoGraphSource, EngineConfig, GraphError, GraphWarning, LayoutKind, Position,
	RefreshController, RefreshStatus, Viewport, build_graph_model, refresh,
};
use security_graph_canvas::engine::layout::circular_positions;
use security_graph_canvas::engine::scene::Scene;

fn load(body: &str, kind: LayoutKind, viewport: Viewport) -> RefreshController {
	let mut config = EngineConfig::default();
	config.layout.kind = kind;
	let mut ctrl = RefreshController::new(config, viewport);
	let ticket = ctrl.begin_refresh();
	ctrl.complete(ticket, decode_response(body));
	ctrl
}

const TWO_NODES: &str = r#"{
	"success": true,
	"elements": {
		"nodes": [
			{"data": {"id": "n1", "riskScore": 9.5, "isAnomaly": true}},
			{"data": {"id": "n2", "riskScore": 1.0, "isAnomaly": false}}
		],
		"edges": [{"data": {"source": "n1", "target": "n2"}}]
	}
}"#;

#[test]
fn anomalous_high_risk_node_gets_anomaly_color_and_largest_size() {
	let ctrl = load(TWO_NODES, LayoutKind::Circular, Viewport::new(800.0, 600.0));
	assert_eq!(ctrl.status(), RefreshStatus::Ready);
	let frame = ctrl.scene().unwrap().frame();

	let n1 = frame.nodes.iter().find(|n| n.id == "n1").unwrap();
	let n2 = frame.nodes.iter().find(|n| n.id == "n2").unwrap();
	assert_eq!(n1.style.color, palette::ANOMALY);
	assert!(n1.style.size > n2.style.size);
	assert_eq!(frame.edges.len(), 1);
	assert_eq!(frame.edges[0].style.color, palette::EDGE_ONE_ANOMALOUS);
}

#[test]
fn anomaly_color_wins_over_low_risk() {
	let body = r#"{"elements": {"nodes": [{"data": {"id": "a", "riskScore": 2.0, "isAnomaly": true}}], "edges": []}}"#;
	let ctrl = load(body, LayoutKind::Circular, Viewport::new(200.0, 200.0));
	assert_eq!(ctrl.scene().unwrap().frame().nodes[0].style.color, palette::ANOMALY);
}

#[test]
fn empty_node_list_is_reported_as_empty_graph() {
	let body = r#"{"success": true, "elements": {"nodes": [], "edges": []}}"#;
	let ctrl = load(body, LayoutKind::Force, Viewport::new(800.0, 600.0));
	assert_eq!(ctrl.status(), RefreshStatus::Error);
	assert_eq!(ctrl.error(), Some(&GraphError::EmptyGraph));
	assert!(ctrl.scene().is_none());
	assert_eq!(
		ctrl.view_status().error.as_deref(),
		Some("no graph data available")
	);
}

#[test]
fn dangling_edge_is_skipped_with_one_warning() {
	let body = r#"{
		"success": true,
		"elements": {
			"nodes": [{"data": {"id": "a"}}, {"data": {"id": "b"}}],
			"edges": [
				{"data": {"source": "a", "target": "b"}},
				{"data": {"source": "a", "target": "ghost"}}
			]
		}
	}"#;
	let ctrl = load(body, LayoutKind::Circular, Viewport::new(400.0, 400.0));
	let scene = ctrl.scene().unwrap();
	let warnings = scene.snapshot().warnings();
	assert_eq!(warnings.len(), 1);
	assert!(matches!(
		&warnings[0],
		GraphWarning::DanglingEdge { missing, .. } if missing == "ghost"
	));
	let frame = scene.frame();
	assert_eq!(frame.nodes.len(), 2);
	assert_eq!(frame.edges.len(), 1);
	assert_eq!(ctrl.view_status().stats.unwrap().skipped_edges, 1);
}

#[test]
fn settled_positions_stay_inside_the_viewport() {
	let response = DemoGraphSource::new(80).response();
	for (w, h) in [(800.0, 600.0), (320.0, 240.0), (60.0, 900.0)] {
		let viewport = Viewport::new(w, h);
		for kind in [LayoutKind::Circular, LayoutKind::Force] {
			let mut config = EngineConfig::default();
			config.layout.kind = kind;
			let snapshot = build_graph_model(
				response.nodes.clone(),
				response.edges.clone(),
				None,
			);
			let mut scene = Scene::new(snapshot, &config, viewport);
			scene.settle();
			for node in scene.frame().nodes {
				let Position { x, y } = node.position;
				assert!((0.0..=w).contains(&x), "{kind:?} x={x} outside 0..{w}");
				assert!((0.0..=h).contains(&y), "{kind:?} y={y} outside 0..{h}");
			}
		}
	}
}

#[test]
fn crowded_force_layout_keeps_nodes_distinct() {
	let response = DemoGraphSource::new(80).response();
	let snapshot = build_graph_model(response.nodes, response.edges, None);
	let mut scene = Scene::new(snapshot, &EngineConfig::default(), Viewport::new(320.0, 240.0));
	scene.settle();
	let positions = scene.positions();
	for (i, a) in positions.iter().enumerate() {
		for b in &positions[i + 1..] {
			assert!(a.distance(*b) > 1e-3, "{a:?} and {b:?} overlap");
		}
	}
}

#[test]
fn circular_layout_is_deterministic() {
	let viewport = Viewport::new(640.0, 480.0);
	let a = circular_positions(17, &viewport, 0.35);
	let b = circular_positions(17, &viewport, 0.35);
	assert_eq!(a, b);

	let ctrl_a = load(TWO_NODES, LayoutKind::Circular, viewport);
	let ctrl_b = load(TWO_NODES, LayoutKind::Circular, viewport);
	assert_eq!(
		ctrl_a.scene().unwrap().positions(),
		ctrl_b.scene().unwrap().positions()
	);
}

#[test]
fn force_layout_terminates_without_edges() {
	let nodes = DemoGraphSource::new(25).response().nodes;
	let config = EngineConfig::default();
	let cap = config.layout.force.max_iterations;
	let snapshot = build_graph_model(nodes, Vec::new(), None);
	let mut scene = Scene::new(snapshot, &config, Viewport::new(500.0, 500.0));
	assert!(scene.settle() <= cap);
	assert!(scene.is_settled());
}

#[test]
fn selecting_unknown_id_keeps_selection() {
	let mut ctrl = load(TWO_NODES, LayoutKind::Circular, Viewport::new(800.0, 600.0));
	let scene = ctrl.scene_mut().unwrap();
	scene.select(Some("n2"));
	assert!(!scene.select(Some("missing")));
	assert_eq!(scene.selected_id(), Some("n2"));
}

#[test]
fn older_refresh_never_overwrites_newer() {
	let body = |id: &str| -> Result<GraphResponse, GraphError> {
		decode_response(&format!(r#"{{"nodes": [{{"id": "{id}"}}]}}"#))
	};
	let mut ctrl = RefreshController::new(EngineConfig::default(), Viewport::new(300.0, 300.0));
	let a = ctrl.begin_refresh();
	let b = ctrl.begin_refresh();
	assert!(!ctrl.complete(a, body("from-a")));
	assert!(ctrl.complete(b, body("from-b")));
	assert!(!ctrl.complete(a, body("from-a")));
	let scene = ctrl.scene().unwrap();
	assert_eq!(scene.snapshot().nodes()[0].id, "from-b");
}

#[test]
fn demo_source_refreshes_end_to_end() {
	let ctrl = RefCell::new(RefreshController::new(
		EngineConfig::default(),
		Viewport::new(800.0, 600.0),
	));
	assert!(pollster::block_on(refresh(&ctrl, &DemoGraphSource::new(30))));
	let view = ctrl.borrow().view_status();
	assert_eq!(view.status, RefreshStatus::Ready);
	assert_eq!(view.stats.unwrap().nodes, 30);
}
