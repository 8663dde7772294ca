//! Risk-driven visual encoding.
//!
//! Node color comes from [`NODE_COLOR_RULES`], evaluated top to bottom with
//! the first match winning; the platform table is the fallback. Size is the
//! base size plus every [`SizeBonus`] that applies.

use serde::Deserialize;

use super::model::{CloudPlatform, Edge, MEDIUM_RISK, Node, NodeKind};

/// Fixed colors.
pub mod palette {
	/// Anomalous node.
	pub const ANOMALY: &str = "#e0115f";
	/// Node with a critical CVE.
	pub const CVE_CRITICAL: &str = "#d7263d";
	/// Node with a high severity CVE.
	pub const CVE_HIGH: &str = "#f0542d";
	/// Node with any other CVE.
	pub const CVE_PRESENT: &str = "#ff8c42";
	/// Risk score at or above 7.
	pub const HIGH_RISK: &str = "#ffb000";
	/// Risk score at or above 4.
	pub const MEDIUM_RISK: &str = "#f4d35e";
	/// Fallback for unknown platforms.
	pub const NEUTRAL: &str = "#95a5a6";
	/// Selected or hovered elements.
	pub const HIGHLIGHT: &str = "#00e5ff";

	/// Both endpoints anomalous.
	pub const EDGE_BOTH_ANOMALOUS: &str = "#ff1f6b";
	/// Exactly one endpoint anomalous.
	pub const EDGE_ONE_ANOMALOUS: &str = "#ff7eb0";
	/// An endpoint at high risk.
	pub const EDGE_HIGH_RISK: &str = "#ffc266";
	/// Everything else.
	pub const EDGE_BASELINE: &str = "#64b4ff";
}

/// Tunable encoding parameters.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncodingConfig {
	/// Diameter before bonuses.
	pub base_size: f64,
	/// Added for anomalous nodes.
	pub anomaly_bonus: f64,
	/// Added for high-risk nodes.
	pub high_risk_bonus: f64,
	/// Added for nodes with a critical CVE.
	pub critical_cve_bonus: f64,
	/// Added for well-connected nodes.
	pub hub_bonus: f64,
	/// Degree strictly above this earns the hub bonus.
	pub hub_degree_threshold: u32,
	/// Upper bound on the diameter.
	pub max_size: f64,
	/// Border width of anomalous nodes.
	pub anomaly_border: f64,
	/// Border width of nodes with a critical CVE.
	pub critical_cve_border: f64,
	/// Border width of high-risk nodes.
	pub high_risk_border: f64,
	/// Border width of every other node.
	pub default_border: f64,
	/// Edge width per unit of weight.
	pub edge_width_scale: f64,
	/// Upper bound on edge width.
	pub edge_max_width: f64,
	/// Opacity of elements outside an active hover neighbourhood.
	pub dim_opacity: f64,
}

impl Default for EncodingConfig {
	fn default() -> Self {
		Self {
			base_size: 8.0,
			anomaly_bonus: 6.0,
			high_risk_bonus: 4.0,
			critical_cve_bonus: 3.0,
			hub_bonus: 3.0,
			hub_degree_threshold: 5,
			max_size: 24.0,
			anomaly_border: 3.0,
			critical_cve_border: 2.5,
			high_risk_border: 2.0,
			default_border: 1.0,
			edge_width_scale: 1.5,
			edge_max_width: 6.0,
			dim_opacity: 0.25,
		}
	}
}

/// Outline of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeShape {
	/// Resources and untyped entities.
	Circle,
	/// IP addresses.
	Ellipse,
	/// Processes.
	RoundRectangle,
	/// Services.
	Diamond,
}

/// Stroke pattern of a node border.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderStyle {
	/// Every node that is not anomalous.
	Solid,
	/// Anomalies.
	Dashed,
}

/// Presentation state layered over the base encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Emphasis {
	/// No interaction affects this element.
	#[default]
	Normal,
	/// Inside the hovered neighbourhood.
	Highlighted,
	/// The selected node.
	Selected,
	/// Outside an active hover neighbourhood.
	Dimmed,
}

/// Render properties of one node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStyle {
	/// Fill color.
	pub color: &'static str,
	/// Diameter in graph units.
	pub size: f64,
	/// Outline, from the node type.
	pub shape: NodeShape,
	/// Border width in graph units.
	pub border_width: f64,
	/// Dashed for anomalies.
	pub border_style: BorderStyle,
	/// 0 to 1.
	pub opacity: f64,
	/// Interaction state this style was computed for.
	pub emphasis: Emphasis,
}

/// Render properties of one edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeStyle {
	/// Stroke color.
	pub color: &'static str,
	/// Stroke width in graph units.
	pub width: f64,
	/// 0 to 1.
	pub opacity: f64,
	/// Both endpoints are inside the hovered neighbourhood.
	pub highlighted: bool,
}

/// One row of the node color table.
pub struct ColorRule {
	/// Short name, for logs and tests.
	pub name: &'static str,
	/// Predicate over the node.
	pub matches: fn(&Node) -> bool,
	/// Color applied when the predicate holds.
	pub color: &'static str,
}

fn is_anomaly(node: &Node) -> bool {
	node.is_anomaly
}

fn has_critical_cve(node: &Node) -> bool {
	node.cve_count > 0 && node.has_critical_cve()
}

fn has_high_cve(node: &Node) -> bool {
	node.cve_count > 0 && node.has_high_cve()
}

fn has_cve(node: &Node) -> bool {
	node.cve_count > 0
}

fn is_high_risk(node: &Node) -> bool {
	node.is_high_risk()
}

fn is_medium_risk(node: &Node) -> bool {
	node.risk_score >= MEDIUM_RISK
}

/// Ordered by precedence; a later rule never overrides an earlier match.
pub const NODE_COLOR_RULES: &[ColorRule] = &[
	ColorRule {
		name: "anomaly",
		matches: is_anomaly,
		color: palette::ANOMALY,
	},
	ColorRule {
		name: "critical-cve",
		matches: has_critical_cve,
		color: palette::CVE_CRITICAL,
	},
	ColorRule {
		name: "high-cve",
		matches: has_high_cve,
		color: palette::CVE_HIGH,
	},
	ColorRule {
		name: "cve",
		matches: has_cve,
		color: palette::CVE_PRESENT,
	},
	ColorRule {
		name: "high-risk",
		matches: is_high_risk,
		color: palette::HIGH_RISK,
	},
	ColorRule {
		name: "medium-risk",
		matches: is_medium_risk,
		color: palette::MEDIUM_RISK,
	},
];

/// The first rule in [`NODE_COLOR_RULES`] that matches, if any.
pub fn matching_rule(node: &Node) -> Option<&'static ColorRule> {
	NODE_COLOR_RULES.iter().find(|rule| (rule.matches)(node))
}

/// Fallback color by hosting platform.
pub fn platform_color(platform: CloudPlatform) -> &'static str {
	match platform {
		CloudPlatform::Aws => "#ff9900",
		CloudPlatform::Azure => "#0078d4",
		CloudPlatform::Gcp => "#34a853",
		CloudPlatform::OnPrem => "#8e7cc3",
		CloudPlatform::Alibaba => "#ff6a00",
		CloudPlatform::Ibm => "#4589ff",
		CloudPlatform::Oracle => "#c74634",
		CloudPlatform::Generic => palette::NEUTRAL,
	}
}

/// Fill color: first matching rule, else the platform color.
pub fn node_color(node: &Node) -> &'static str {
	matching_rule(node)
		.map(|rule| rule.color)
		.unwrap_or_else(|| platform_color(node.platform))
}

/// Additive size bonuses. Order does not matter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeBonus {
	/// The node is flagged anomalous.
	Anomaly,
	/// Risk score at or above 7.
	HighRisk,
	/// At least one critical CVE.
	CriticalCve,
	/// Degree above the hub threshold.
	Hub,
}

impl SizeBonus {
	/// Every bonus, for summing.
	pub const ALL: [SizeBonus; 4] = [
		SizeBonus::Anomaly,
		SizeBonus::HighRisk,
		SizeBonus::CriticalCve,
		SizeBonus::Hub,
	];

	/// Whether this bonus applies to `node`.
	pub fn applies(self, node: &Node, cfg: &EncodingConfig) -> bool {
		match self {
			SizeBonus::Anomaly => node.is_anomaly,
			SizeBonus::HighRisk => node.is_high_risk(),
			SizeBonus::CriticalCve => has_critical_cve(node),
			SizeBonus::Hub => node.total_degree > cfg.hub_degree_threshold,
		}
	}

	/// Size added when the bonus applies.
	pub fn amount(self, cfg: &EncodingConfig) -> f64 {
		match self {
			SizeBonus::Anomaly => cfg.anomaly_bonus,
			SizeBonus::HighRisk => cfg.high_risk_bonus,
			SizeBonus::CriticalCve => cfg.critical_cve_bonus,
			SizeBonus::Hub => cfg.hub_bonus,
		}
	}
}

/// Base size plus every applicable bonus, clamped to `max_size`.
pub fn node_size(node: &Node, cfg: &EncodingConfig) -> f64 {
	let bonus: f64 = SizeBonus::ALL
		.iter()
		.filter(|b| b.applies(node, cfg))
		.map(|b| b.amount(cfg))
		.sum();
	(cfg.base_size + bonus).min(cfg.max_size)
}

/// Shape by entity type; risk never changes it.
pub fn node_shape(kind: NodeKind) -> NodeShape {
	match kind {
		NodeKind::Process => NodeShape::RoundRectangle,
		NodeKind::Ip => NodeShape::Ellipse,
		NodeKind::Service => NodeShape::Diamond,
		NodeKind::Resource | NodeKind::Generic => NodeShape::Circle,
	}
}

fn node_border(node: &Node, cfg: &EncodingConfig) -> (f64, BorderStyle) {
	if node.is_anomaly {
		(cfg.anomaly_border, BorderStyle::Dashed)
	} else if has_critical_cve(node) {
		(cfg.critical_cve_border, BorderStyle::Solid)
	} else if node.is_high_risk() {
		(cfg.high_risk_border, BorderStyle::Solid)
	} else {
		(cfg.default_border, BorderStyle::Solid)
	}
}

/// Base encoding of a node, before any hover or selection emphasis.
pub fn encode_node(node: &Node, cfg: &EncodingConfig) -> NodeStyle {
	let (border_width, border_style) = node_border(node, cfg);
	NodeStyle {
		color: node_color(node),
		size: node_size(node, cfg),
		shape: node_shape(node.kind),
		border_width,
		border_style,
		opacity: 1.0,
		emphasis: Emphasis::Normal,
	}
}

/// Base encoding of an edge from its resolved endpoints.
pub fn encode_edge(edge: &Edge, source: &Node, target: &Node, cfg: &EncodingConfig) -> EdgeStyle {
	let color = match (source.is_anomaly, target.is_anomaly) {
		(true, true) => palette::EDGE_BOTH_ANOMALOUS,
		(true, false) | (false, true) => palette::EDGE_ONE_ANOMALOUS,
		_ if source.is_high_risk() || target.is_high_risk() => palette::EDGE_HIGH_RISK,
		_ => palette::EDGE_BASELINE,
	};
	EdgeStyle {
		color,
		width: (edge.weight * cfg.edge_width_scale).min(cfg.edge_max_width),
		opacity: 1.0,
		highlighted: false,
	}
}

/// Layer hover/selection emphasis over a base node encoding.
pub fn emphasize_node(base: NodeStyle, emphasis: Emphasis, cfg: &EncodingConfig) -> NodeStyle {
	match emphasis {
		Emphasis::Normal => base,
		Emphasis::Highlighted | Emphasis::Selected => NodeStyle {
			color: palette::HIGHLIGHT,
			opacity: 1.0,
			emphasis,
			..base
		},
		Emphasis::Dimmed => NodeStyle {
			opacity: cfg.dim_opacity,
			emphasis,
			..base
		},
	}
}

/// Layer hover emphasis over a base edge encoding. `dim` is set while a
/// hover is active and this edge is not inside its neighbourhood.
pub fn emphasize_edge(base: EdgeStyle, highlighted: bool, dim: bool, cfg: &EncodingConfig) -> EdgeStyle {
	if highlighted {
		EdgeStyle {
			color: palette::HIGHLIGHT,
			opacity: 1.0,
			highlighted: true,
			..base
		}
	} else if dim {
		EdgeStyle {
			opacity: cfg.dim_opacity,
			..base
		}
	} else {
		base
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::model::{CveRef, CveSeverity};

	fn node(risk: f64, anomaly: bool) -> Node {
		Node {
			id: "n".into(),
			name: "n".into(),
			kind: NodeKind::Generic,
			platform: CloudPlatform::Generic,
			risk_score: risk,
			is_anomaly: anomaly,
			cve_count: 0,
			cves: Vec::new(),
			critical_cves: 0,
			high_cves: 0,
			total_degree: 0,
		}
	}

	fn with_cve(mut n: Node, severity: Option<CveSeverity>) -> Node {
		n.cves.push(CveRef {
			id: "CVE-2024-0001".into(),
			severity,
		});
		n.cve_count = n.cves.len() as u32;
		n
	}

	#[test]
	fn anomaly_beats_low_risk() {
		let cfg = EncodingConfig::default();
		let style = encode_node(&node(2.0, true), &cfg);
		assert_eq!(style.color, palette::ANOMALY);
		assert_eq!(style.border_style, BorderStyle::Dashed);
	}

	#[test]
	fn color_precedence_follows_table_order() {
		let critical = with_cve(node(9.0, false), Some(CveSeverity::Critical));
		assert_eq!(node_color(&critical), palette::CVE_CRITICAL);
		assert_eq!(node_color(&with_cve(node(9.0, true), None)), palette::ANOMALY);
		assert_eq!(
			node_color(&with_cve(node(1.0, false), Some(CveSeverity::High))),
			palette::CVE_HIGH
		);
		assert_eq!(node_color(&with_cve(node(8.0, false), None)), palette::CVE_PRESENT);
		assert_eq!(node_color(&node(7.0, false)), palette::HIGH_RISK);
		assert_eq!(node_color(&node(4.0, false)), palette::MEDIUM_RISK);
		assert_eq!(matching_rule(&node(3.9, false)).map(|r| r.name), None);
	}

	#[test]
	fn low_risk_falls_back_to_platform() {
		let mut n = node(1.0, false);
		assert_eq!(node_color(&n), palette::NEUTRAL);
		n.platform = CloudPlatform::Aws;
		assert_eq!(node_color(&n), platform_color(CloudPlatform::Aws));
		n.platform = CloudPlatform::Azure;
		assert_ne!(node_color(&n), palette::NEUTRAL);
	}

	#[test]
	fn size_bonuses_add_up_and_clamp() {
		let cfg = EncodingConfig::default();
		assert_eq!(node_size(&node(1.0, false), &cfg), cfg.base_size);
		assert_eq!(
			node_size(&node(9.5, true), &cfg),
			cfg.base_size + cfg.anomaly_bonus + cfg.high_risk_bonus
		);

		let mut everything = with_cve(node(9.5, true), Some(CveSeverity::Critical));
		everything.total_degree = cfg.hub_degree_threshold + 1;
		let tight = EncodingConfig {
			max_size: 20.0,
			..EncodingConfig::default()
		};
		assert_eq!(node_size(&everything, &tight), 20.0);
	}

	#[test]
	fn shape_ignores_risk() {
		let mut n = node(9.9, true);
		n.kind = NodeKind::Process;
		assert_eq!(encode_node(&n, &EncodingConfig::default()).shape, NodeShape::RoundRectangle);
		assert_eq!(node_shape(NodeKind::Ip), NodeShape::Ellipse);
		assert_eq!(node_shape(NodeKind::Service), NodeShape::Diamond);
		assert_eq!(node_shape(NodeKind::Resource), NodeShape::Circle);
	}

	#[test]
	fn border_escalates_with_tier() {
		let cfg = EncodingConfig::default();
		let tiers = [
			encode_node(&node(9.0, true), &cfg),
			encode_node(&with_cve(node(1.0, false), Some(CveSeverity::Critical)), &cfg),
			encode_node(&node(7.5, false), &cfg),
			encode_node(&node(1.0, false), &cfg),
		];
		assert!(tiers.windows(2).all(|w| w[0].border_width > w[1].border_width));
		assert!(tiers[1..].iter().all(|s| s.border_style == BorderStyle::Solid));
	}

	#[test]
	fn edge_color_from_endpoint_pair() {
		let cfg = EncodingConfig::default();
		let edge = Edge {
			source: 0,
			target: 1,
			weight: 1.0,
		};
		let (a, b) = (node(1.0, true), node(1.0, false));
		assert_eq!(encode_edge(&edge, &a, &a, &cfg).color, palette::EDGE_BOTH_ANOMALOUS);
		assert_eq!(encode_edge(&edge, &a, &b, &cfg).color, palette::EDGE_ONE_ANOMALOUS);
		assert_eq!(encode_edge(&edge, &b, &a, &cfg).color, palette::EDGE_ONE_ANOMALOUS);
		assert_eq!(
			encode_edge(&edge, &b, &node(8.0, false), &cfg).color,
			palette::EDGE_HIGH_RISK
		);
		assert_eq!(encode_edge(&edge, &b, &b, &cfg).color, palette::EDGE_BASELINE);
	}

	#[test]
	fn edge_width_is_capped() {
		let cfg = EncodingConfig::default();
		let n = node(1.0, false);
		let thin = Edge {
			source: 0,
			target: 1,
			weight: 2.0,
		};
		let heavy = Edge { weight: 50.0, ..thin };
		assert_eq!(encode_edge(&thin, &n, &n, &cfg).width, 3.0);
		assert_eq!(encode_edge(&heavy, &n, &n, &cfg).width, cfg.edge_max_width);
	}

	#[test]
	fn emphasis_overrides_color_only_in_presentation() {
		let cfg = EncodingConfig::default();
		let n = node(9.0, true);
		let base = encode_node(&n, &cfg);
		let lit = emphasize_node(base, Emphasis::Highlighted, &cfg);
		assert_eq!(lit.color, palette::HIGHLIGHT);
		assert_eq!(lit.size, base.size);
		let dim = emphasize_node(base, Emphasis::Dimmed, &cfg);
		assert_eq!(dim.color, palette::ANOMALY);
		assert_eq!(dim.opacity, cfg.dim_opacity);
		assert!(n.is_anomaly);
	}
}
