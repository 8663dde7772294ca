//! Decoding of the graph API response.
//!
//! The service answers with
//! `{success, elements: {nodes, edges}, metadata?, error?}`. Element records
//! may be flat or wrapped Cytoscape-style as `{data: {...}}`, ids may be
//! strings or numbers, and every field also accepts its snake_case name.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::error::GraphError;

/// A node record as it arrives from the graph API, before normalization.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
	/// Node id.
	#[serde(deserialize_with = "de_id")]
	pub id: String,
	/// Display label.
	#[serde(default, alias = "label")]
	pub name: Option<String>,
	/// Entity type (`ip`, `process`, ...).
	#[serde(default, rename = "type", alias = "kind")]
	pub kind: Option<String>,
	/// Hosting platform.
	#[serde(default, alias = "cloud_platform", alias = "platform")]
	pub cloud_platform: Option<String>,
	/// Risk score from the scoring service.
	#[serde(default, alias = "risk_score")]
	pub risk_score: Option<f64>,
	/// Anomaly label from the scoring service.
	#[serde(default, alias = "is_anomaly")]
	pub is_anomaly: Option<bool>,
	/// Upstream CVE count.
	#[serde(default, alias = "cve_count")]
	pub cve_count: Option<u32>,
	/// CVE identifiers or detailed CVE records.
	#[serde(default, alias = "cve_ids", alias = "cve", alias = "cves")]
	pub cve_ids: Option<Vec<RawCve>>,
	/// Upstream count of critical CVEs.
	#[serde(default, alias = "cve_critical_count")]
	pub cve_critical_count: Option<u32>,
	/// Upstream count of high severity CVEs.
	#[serde(default, alias = "cve_high_count")]
	pub cve_high_count: Option<u32>,
	/// Upstream degree.
	#[serde(default, alias = "total_degree")]
	pub total_degree: Option<u32>,
}

impl RawNode {
	/// Start a record with only an id.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			..Self::default()
		}
	}

	/// Set `name`.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Set `type`.
	pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
		self.kind = Some(kind.into());
		self
	}

	/// Set `cloudPlatform`.
	pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
		self.cloud_platform = Some(platform.into());
		self
	}

	/// Set `riskScore`.
	pub fn with_risk(mut self, risk: f64) -> Self {
		self.risk_score = Some(risk);
		self
	}

	/// Set `isAnomaly`.
	pub fn with_anomaly(mut self, anomaly: bool) -> Self {
		self.is_anomaly = Some(anomaly);
		self
	}

	/// Append to `cveIds`.
	pub fn with_cve(mut self, cve: RawCve) -> Self {
		self.cve_ids.get_or_insert_with(Vec::new).push(cve);
		self
	}

	/// Set `totalDegree`.
	pub fn with_degree(mut self, degree: u32) -> Self {
		self.total_degree = Some(degree);
		self
	}
}

/// A CVE reference: either a bare id or a record with severity.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawCve {
	/// `"CVE-2024-0001"`
	Id(String),
	/// `{"id": "CVE-2024-0001", "severity": "CRITICAL", "cvss": 9.8}`
	Record {
		/// CVE identifier.
		#[serde(alias = "cve_id", alias = "cveId")]
		id: String,
		/// Severity label, case-insensitive.
		#[serde(default)]
		severity: Option<String>,
		/// CVSS base score.
		#[serde(default, alias = "cvss", alias = "base_score")]
		score: Option<f64>,
	},
}

/// An edge record as it arrives from the graph API.
#[derive(Clone, Debug, Deserialize)]
pub struct RawEdge {
	/// Source node id.
	#[serde(deserialize_with = "de_id")]
	pub source: String,
	/// Target node id.
	#[serde(deserialize_with = "de_id")]
	pub target: String,
	/// Optional positive weight; defaults to 1.
	#[serde(default, alias = "value")]
	pub weight: Option<f64>,
}

impl RawEdge {
	/// Unweighted edge.
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			weight: None,
		}
	}

	/// Set `weight`.
	pub fn with_weight(mut self, weight: f64) -> Self {
		self.weight = Some(weight);
		self
	}
}

/// A decoded, successful graph response.
#[derive(Clone, Debug, Default)]
pub struct GraphResponse {
	/// Node records in response order.
	pub nodes: Vec<RawNode>,
	/// Edge records in response order.
	pub edges: Vec<RawEdge>,
	/// Opaque metadata, passed through untouched.
	pub metadata: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
	Text(String),
	Int(i64),
	Float(f64),
}

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match WireId::deserialize(deserializer)? {
		WireId::Text(s) => s,
		WireId::Int(n) => n.to_string(),
		WireId::Float(f) => f.to_string(),
	})
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Element<T> {
	Wrapped { data: T },
	Flat(T),
}

impl<T> Element<T> {
	fn into_inner(self) -> T {
		match self {
			Element::Wrapped { data } | Element::Flat(data) => data,
		}
	}
}

/// Decode a response body.
///
/// `success: false` becomes [`GraphError::Network`]. A missing or non-array
/// `elements.nodes` and any record that cannot be decoded become
/// [`GraphError::MalformedResponse`]. An empty node list is returned as-is;
/// deciding that it is an error belongs to the refresh controller.
pub fn decode_response(body: &str) -> Result<GraphResponse, GraphError> {
	let value: Value = serde_json::from_str(body)
		.map_err(|e| GraphError::MalformedResponse(format!("invalid JSON: {e}")))?;
	let Value::Object(mut root) = value else {
		return Err(GraphError::MalformedResponse(
			"expected a JSON object".into(),
		));
	};

	if let Some(Value::Bool(false)) = root.get("success") {
		let message = root
			.get("error")
			.and_then(Value::as_str)
			.unwrap_or("graph service reported failure");
		return Err(GraphError::Network(message.to_string()));
	}

	let metadata = root.remove("metadata").filter(|m| !m.is_null());
	let mut elements = match root.remove("elements") {
		Some(Value::Object(elements)) => elements,
		Some(_) => {
			return Err(GraphError::MalformedResponse(
				"`elements` is not an object".into(),
			));
		}
		// bare `{nodes, links}` payloads from the analysis backend
		None => root,
	};

	let nodes = match elements.remove("nodes") {
		Some(nodes @ Value::Array(_)) => decode_elements::<RawNode>(nodes, "nodes")?,
		_ => {
			return Err(GraphError::MalformedResponse(
				"`elements.nodes` is missing or not an array".into(),
			));
		}
	};
	let edges = match take_edges(&mut elements) {
		None | Some(Value::Null) => Vec::new(),
		Some(edges @ Value::Array(_)) => decode_elements::<RawEdge>(edges, "edges")?,
		Some(_) => {
			return Err(GraphError::MalformedResponse(
				"`elements.edges` is not an array".into(),
			));
		}
	};

	Ok(GraphResponse {
		nodes,
		edges,
		metadata,
	})
}

fn take_edges(elements: &mut Map<String, Value>) -> Option<Value> {
	elements.remove("edges").or_else(|| elements.remove("links"))
}

fn decode_elements<T>(value: Value, what: &str) -> Result<Vec<T>, GraphError>
where
	T: for<'de> Deserialize<'de>,
{
	let elements: Vec<Element<T>> = serde_json::from_value(value)
		.map_err(|e| GraphError::MalformedResponse(format!("invalid {what}: {e}")))?;
	Ok(elements.into_iter().map(Element::into_inner).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_flat_elements() {
		let body = r#"{
			"success": true,
			"elements": {
				"nodes": [{"id": "n1", "name": "web-01", "type": "ip", "riskScore": 9.5, "isAnomaly": true}],
				"edges": [{"source": "n1", "target": "n1", "weight": 2.0}]
			}
		}"#;
		let response = decode_response(body).unwrap();
		assert_eq!(response.nodes.len(), 1);
		assert_eq!(response.nodes[0].risk_score, Some(9.5));
		assert_eq!(response.nodes[0].is_anomaly, Some(true));
		assert_eq!(response.edges[0].weight, Some(2.0));
		assert!(response.metadata.is_none());
	}

	#[test]
	fn decodes_wrapped_snake_case_and_numeric_ids() {
		let body = r#"{
			"success": true,
			"elements": {
				"nodes": [
					{"data": {"id": 0, "cloud_platform": "aws", "risk_score": 3.0,
					          "cve": ["CVE-2021-44228", {"cve_id": "CVE-2023-1", "severity": "HIGH"}]}},
					{"data": {"id": 1}}
				],
				"edges": [{"data": {"source": 0, "target": 1}}]
			},
			"metadata": {"d3_config": {"link_distance": 80}}
		}"#;
		let response = decode_response(body).unwrap();
		assert_eq!(response.nodes[0].id, "0");
		assert_eq!(response.nodes[0].cloud_platform.as_deref(), Some("aws"));
		let cves = response.nodes[0].cve_ids.as_ref().unwrap();
		assert_eq!(cves[0], RawCve::Id("CVE-2021-44228".into()));
		assert!(matches!(&cves[1], RawCve::Record { severity: Some(s), .. } if s == "HIGH"));
		assert_eq!(response.edges[0].source, "0");
		assert!(response.metadata.is_some());
	}

	#[test]
	fn accepts_links_alias_without_elements() {
		let body = r#"{"nodes": [{"id": "a"}, {"id": "b"}], "links": [{"source": "a", "target": "b", "value": 3}]}"#;
		let response = decode_response(body).unwrap();
		assert_eq!(response.edges.len(), 1);
		assert_eq!(response.edges[0].weight, Some(3.0));
	}

	#[test]
	fn unsuccessful_response_is_network_error() {
		let body = r#"{"success": false, "error": "neo4j unavailable"}"#;
		assert_eq!(
			decode_response(body).unwrap_err(),
			GraphError::Network("neo4j unavailable".into())
		);
	}

	#[test]
	fn missing_or_non_array_nodes_is_malformed() {
		for body in [
			r#"{"success": true, "elements": {}}"#,
			r#"{"success": true, "elements": {"nodes": {"id": "a"}}}"#,
			r#"{"success": true}"#,
			"not json",
		] {
			assert!(
				matches!(decode_response(body), Err(GraphError::MalformedResponse(_))),
				"{body}"
			);
		}
	}

	#[test]
	fn empty_nodes_decode_without_error() {
		let body = r#"{"success": true, "elements": {"nodes": [], "edges": []}}"#;
		assert!(decode_response(body).unwrap().nodes.is_empty());
	}

	#[test]
	fn node_without_id_is_malformed() {
		let body = r#"{"success": true, "elements": {"nodes": [{"name": "orphan"}]}}"#;
		assert!(matches!(
			decode_response(body),
			Err(GraphError::MalformedResponse(_))
		));
	}
}
