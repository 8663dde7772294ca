//! Normalized graph snapshot built from raw API records.

use std::collections::{BTreeMap, HashMap};

use log::warn;
use serde_json::Value;

use super::error::GraphWarning;
use super::wire::{RawCve, RawEdge, RawNode};

/// Risk score at and above which a node counts as high risk.
pub const HIGH_RISK: f64 = 7.0;
/// Risk score at and above which a node counts as medium risk.
pub const MEDIUM_RISK: f64 = 4.0;
/// Upper bound of the risk scale.
pub const MAX_RISK: f64 = 10.0;

/// Entity type; decides the node shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeKind {
	/// An IP address.
	Ip,
	/// An OS process.
	Process,
	/// A network service.
	Service,
	/// A cloud resource.
	Resource,
	/// Anything else.
	#[default]
	Generic,
}

impl NodeKind {
	/// Unknown spellings map to [`NodeKind::Generic`].
	pub fn parse(value: &str) -> Self {
		match value.trim().to_ascii_lowercase().as_str() {
			"ip" | "ip_address" | "ipaddress" => NodeKind::Ip,
			"process" => NodeKind::Process,
			"service" => NodeKind::Service,
			"resource" => NodeKind::Resource,
			_ => NodeKind::Generic,
		}
	}

	/// Canonical lowercase name.
	pub fn as_str(self) -> &'static str {
		match self {
			NodeKind::Ip => "ip",
			NodeKind::Process => "process",
			NodeKind::Service => "service",
			NodeKind::Resource => "resource",
			NodeKind::Generic => "generic",
		}
	}
}

/// Hosting platform; decides the fallback node color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CloudPlatform {
	/// Amazon Web Services.
	Aws,
	/// Microsoft Azure.
	Azure,
	/// Google Cloud.
	Gcp,
	/// Self-hosted infrastructure.
	OnPrem,
	/// Alibaba Cloud.
	Alibaba,
	/// IBM Cloud.
	Ibm,
	/// Oracle Cloud.
	Oracle,
	/// Unknown or unspecified.
	#[default]
	Generic,
}

impl CloudPlatform {
	/// Unknown spellings map to [`CloudPlatform::Generic`].
	pub fn parse(value: &str) -> Self {
		match value.trim().to_ascii_lowercase().as_str() {
			"aws" | "amazon" => CloudPlatform::Aws,
			"azure" | "microsoft" => CloudPlatform::Azure,
			"gcp" | "google" => CloudPlatform::Gcp,
			"onprem" | "on_prem" | "on-prem" | "on-premises" => CloudPlatform::OnPrem,
			"alibaba" | "aliyun" => CloudPlatform::Alibaba,
			"ibm" => CloudPlatform::Ibm,
			"oracle" | "oci" => CloudPlatform::Oracle,
			_ => CloudPlatform::Generic,
		}
	}

	/// Name as the API spells it.
	pub fn as_str(self) -> &'static str {
		match self {
			CloudPlatform::Aws => "aws",
			CloudPlatform::Azure => "azure",
			CloudPlatform::Gcp => "gcp",
			CloudPlatform::OnPrem => "onPrem",
			CloudPlatform::Alibaba => "alibaba",
			CloudPlatform::Ibm => "ibm",
			CloudPlatform::Oracle => "oracle",
			CloudPlatform::Generic => "generic",
		}
	}
}

/// CVE severity tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CveSeverity {
	/// CVSS below 4.
	Low,
	/// CVSS 4 to 6.9.
	Medium,
	/// CVSS 7 to 8.9.
	High,
	/// CVSS 9 and above.
	Critical,
}

impl CveSeverity {
	fn from_label(label: &str) -> Option<Self> {
		match label.trim().to_ascii_uppercase().as_str() {
			"CRITICAL" => Some(CveSeverity::Critical),
			"HIGH" => Some(CveSeverity::High),
			"MEDIUM" | "MODERATE" => Some(CveSeverity::Medium),
			"LOW" => Some(CveSeverity::Low),
			_ => None,
		}
	}

	/// CVSS base score banding.
	fn from_score(score: f64) -> Option<Self> {
		if !score.is_finite() || score <= 0.0 {
			None
		} else if score >= 9.0 {
			Some(CveSeverity::Critical)
		} else if score >= 7.0 {
			Some(CveSeverity::High)
		} else if score >= 4.0 {
			Some(CveSeverity::Medium)
		} else {
			Some(CveSeverity::Low)
		}
	}
}

/// A CVE attached to a node.
#[derive(Clone, Debug, PartialEq)]
pub struct CveRef {
	/// CVE identifier.
	pub id: String,
	/// Unknown when neither a label nor a score was sent.
	pub severity: Option<CveSeverity>,
}

impl From<RawCve> for CveRef {
	fn from(raw: RawCve) -> Self {
		match raw {
			RawCve::Id(id) => CveRef { id, severity: None },
			RawCve::Record {
				id,
				severity,
				score,
			} => {
				let severity = severity
					.as_deref()
					.and_then(CveSeverity::from_label)
					.or_else(|| score.and_then(CveSeverity::from_score));
				CveRef { id, severity }
			}
		}
	}
}

/// A security entity with its risk attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	/// Unique within the snapshot.
	pub id: String,
	/// Display label; the id when none was sent.
	pub name: String,
	/// Entity type.
	pub kind: NodeKind,
	/// Hosting platform.
	pub platform: CloudPlatform,
	/// Always within `[0, 10]`.
	pub risk_score: f64,
	/// Anomaly label from the scoring service.
	pub is_anomaly: bool,
	/// Upstream count, or the number of known CVEs.
	pub cve_count: u32,
	/// CVEs listed by the API, possibly fewer than `cve_count`.
	pub cves: Vec<CveRef>,
	/// Upstream count of critical CVEs.
	pub critical_cves: u32,
	/// Upstream count of high severity CVEs.
	pub high_cves: u32,
	/// Upstream degree, or the number of incident edges.
	pub total_degree: u32,
}

impl Node {
	/// Risk score at or above [`HIGH_RISK`].
	pub fn is_high_risk(&self) -> bool {
		self.risk_score >= HIGH_RISK
	}

	/// From the upstream count or a listed CVE.
	pub fn has_critical_cve(&self) -> bool {
		self.critical_cves > 0
			|| self
				.cves
				.iter()
				.any(|c| c.severity == Some(CveSeverity::Critical))
	}

	/// From the upstream count or a listed CVE.
	pub fn has_high_cve(&self) -> bool {
		self.high_cves > 0
			|| self
				.cves
				.iter()
				.any(|c| c.severity == Some(CveSeverity::High))
	}

	/// Ids of the listed CVEs.
	pub fn cve_ids(&self) -> impl Iterator<Item = &str> {
		self.cves.iter().map(|c| c.id.as_str())
	}
}

/// A directed relation between two nodes of the same snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
	/// Index into [`GraphSnapshot::nodes`].
	pub source: usize,
	/// Index into [`GraphSnapshot::nodes`].
	pub target: usize,
	/// Always positive and finite.
	pub weight: f64,
}

/// Aggregate figures for the status overlay.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphStats {
	/// Node count.
	pub nodes: usize,
	/// Edge count, after dropping dangling edges.
	pub edges: usize,
	/// Nodes flagged anomalous.
	pub anomalous_nodes: usize,
	/// Nodes at or above [`HIGH_RISK`].
	pub high_risk_nodes: usize,
	/// Sum of `cve_count` over all nodes.
	pub total_cves: u64,
	/// Nodes with a non-zero `cve_count`.
	pub nodes_with_cves: usize,
	/// Zero for an empty snapshot, as are `avg_risk` and `max_risk`.
	pub min_risk: f64,
	/// Mean risk score.
	pub avg_risk: f64,
	/// Highest risk score.
	pub max_risk: f64,
	/// Node count per platform name.
	pub platforms: BTreeMap<&'static str, usize>,
	/// Edges dropped for an unknown endpoint.
	pub skipped_edges: usize,
	/// Nodes dropped for reusing an id.
	pub duplicate_ids: usize,
}

/// One immutable graph as received from the API.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	metadata: Option<Value>,
	index: HashMap<String, usize>,
	adjacency: Vec<Vec<usize>>,
	warnings: Vec<GraphWarning>,
}

/// Normalize raw records into a snapshot.
///
/// Never fails: duplicate ids keep their first occurrence, edges with an
/// unknown endpoint are dropped, and out-of-range risk scores are clamped.
/// Each of these is logged and recorded in [`GraphSnapshot::warnings`].
pub fn build_graph_model(
	raw_nodes: Vec<RawNode>,
	raw_edges: Vec<RawEdge>,
	metadata: Option<Value>,
) -> GraphSnapshot {
	let mut warnings = Vec::new();
	let mut nodes: Vec<Node> = Vec::with_capacity(raw_nodes.len());
	let mut upstream_degree: Vec<Option<u32>> = Vec::with_capacity(raw_nodes.len());
	let mut index = HashMap::with_capacity(raw_nodes.len());

	for raw in raw_nodes {
		if index.contains_key(&raw.id) {
			warnings.push(GraphWarning::DuplicateNodeId { id: raw.id });
			continue;
		}
		let (node, degree) = normalize_node(raw, &mut warnings);
		index.insert(node.id.clone(), nodes.len());
		nodes.push(node);
		upstream_degree.push(degree);
	}

	let mut edges = Vec::with_capacity(raw_edges.len());
	let mut derived = vec![0u32; nodes.len()];
	let mut adjacency = vec![Vec::new(); nodes.len()];
	for raw in raw_edges {
		let (source, target) = match (index.get(&raw.source), index.get(&raw.target)) {
			(Some(&s), Some(&t)) => (s, t),
			(s, _) => {
				let missing = if s.is_none() {
					raw.source.clone()
				} else {
					raw.target.clone()
				};
				warnings.push(GraphWarning::DanglingEdge {
					source: raw.source,
					target: raw.target,
					missing,
				});
				continue;
			}
		};
		derived[source] += 1;
		if source != target {
			derived[target] += 1;
			adjacency[source].push(target);
			adjacency[target].push(source);
		}
		let weight = match raw.weight {
			Some(w) if w.is_finite() && w > 0.0 => w,
			_ => 1.0,
		};
		edges.push(Edge {
			source,
			target,
			weight,
		});
	}

	for neighbors in &mut adjacency {
		neighbors.sort_unstable();
		neighbors.dedup();
	}

	for (i, node) in nodes.iter_mut().enumerate() {
		node.total_degree = match upstream_degree[i] {
			Some(upstream) => {
				if upstream != derived[i] {
					warnings.push(GraphWarning::InconsistentDegree {
						id: node.id.clone(),
						upstream,
						derived: derived[i],
					});
				}
				upstream
			}
			None => derived[i],
		};
	}

	for warning in &warnings {
		warn!("{warning}");
	}

	GraphSnapshot {
		nodes,
		edges,
		metadata,
		index,
		adjacency,
		warnings,
	}
}

fn normalize_node(raw: RawNode, warnings: &mut Vec<GraphWarning>) -> (Node, Option<u32>) {
	let risk = raw.risk_score.unwrap_or(0.0);
	let risk_score = if !risk.is_finite() {
		warnings.push(GraphWarning::RiskScoreOutOfRange {
			id: raw.id.clone(),
			value: risk,
		});
		0.0
	} else if !(0.0..=MAX_RISK).contains(&risk) {
		warnings.push(GraphWarning::RiskScoreOutOfRange {
			id: raw.id.clone(),
			value: risk,
		});
		risk.clamp(0.0, MAX_RISK)
	} else {
		risk
	};

	let cves: Vec<CveRef> = raw
		.cve_ids
		.unwrap_or_default()
		.into_iter()
		.map(CveRef::from)
		.collect();
	let critical_cves = raw.cve_critical_count.unwrap_or(0);
	let high_cves = raw.cve_high_count.unwrap_or(0);
	// severity counts may arrive without the list they summarize
	let cve_count = raw
		.cve_count
		.unwrap_or_else(|| (cves.len() as u32).max(critical_cves.saturating_add(high_cves)));

	let node = Node {
		name: raw.name.unwrap_or_else(|| raw.id.clone()),
		id: raw.id,
		kind: raw.kind.as_deref().map(NodeKind::parse).unwrap_or_default(),
		platform: raw
			.cloud_platform
			.as_deref()
			.map(CloudPlatform::parse)
			.unwrap_or_default(),
		risk_score,
		is_anomaly: raw.is_anomaly.unwrap_or(false),
		cve_count,
		cves,
		critical_cves,
		high_cves,
		total_degree: 0,
	};
	(node, raw.total_degree)
}

impl GraphSnapshot {
	/// In response order.
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// Edges whose endpoints both exist.
	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	/// Node at a snapshot index.
	pub fn node(&self, idx: usize) -> Option<&Node> {
		self.nodes.get(idx)
	}

	/// Snapshot index of a node id.
	pub fn index_of(&self, id: &str) -> Option<usize> {
		self.index.get(id).copied()
	}

	/// Distinct nodes one hop away, ignoring edge direction.
	pub fn neighbors(&self, idx: usize) -> &[usize] {
		self.adjacency.get(idx).map(Vec::as_slice).unwrap_or(&[])
	}

	/// The response's `metadata` object, untouched.
	pub fn metadata(&self) -> Option<&Value> {
		self.metadata.as_ref()
	}

	/// Everything normalization had to repair.
	pub fn warnings(&self) -> &[GraphWarning] {
		&self.warnings
	}

	/// Whether the snapshot has no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Node count.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Summary figures for the status overlay.
	pub fn stats(&self) -> GraphStats {
		let mut stats = GraphStats {
			nodes: self.nodes.len(),
			edges: self.edges.len(),
			..GraphStats::default()
		};
		if self.nodes.is_empty() {
			return stats;
		}
		let (mut min, mut max, mut sum) = (f64::MAX, f64::MIN, 0.0);
		for node in &self.nodes {
			min = min.min(node.risk_score);
			max = max.max(node.risk_score);
			sum += node.risk_score;
			stats.anomalous_nodes += node.is_anomaly as usize;
			stats.high_risk_nodes += node.is_high_risk() as usize;
			stats.total_cves += node.cve_count as u64;
			stats.nodes_with_cves += (node.cve_count > 0) as usize;
			*stats.platforms.entry(node.platform.as_str()).or_default() += 1;
		}
		stats.min_risk = min;
		stats.max_risk = max;
		stats.avg_risk = sum / self.nodes.len() as f64;
		for warning in &self.warnings {
			match warning {
				GraphWarning::DanglingEdge { .. } => stats.skipped_edges += 1,
				GraphWarning::DuplicateNodeId { .. } => stats.duplicate_ids += 1,
				_ => {}
			}
		}
		stats
	}
}
