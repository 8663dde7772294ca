use std::fmt;

use thiserror::Error;

/// Failures that put the view into the blocking error state.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GraphError {
	/// Transport failure, non-2xx status, or `success: false` from the API.
	#[error("network error: {0}")]
	Network(String),
	/// The response did not have the expected shape.
	#[error("malformed response: {0}")]
	MalformedResponse(String),
	/// A valid response that carried zero nodes.
	#[error("no graph data available")]
	EmptyGraph,
}

impl GraphError {
	/// Short category name for the status overlay.
	pub fn kind(&self) -> &'static str {
		match self {
			GraphError::Network(_) => "network",
			GraphError::MalformedResponse(_) => "malformed",
			GraphError::EmptyGraph => "empty",
		}
	}
}

/// Data-quality findings that never stop a snapshot from rendering.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphWarning {
	/// Edge dropped because an endpoint is not a known node id.
	DanglingEdge {
		/// Edge source id as sent.
		source: String,
		/// Edge target id as sent.
		target: String,
		/// The endpoint that did not resolve.
		missing: String,
	},
	/// A later node reused an id; the first occurrence was kept.
	DuplicateNodeId {
		/// The repeated id.
		id: String,
	},
	/// Upstream `totalDegree` disagrees with the edges actually present.
	InconsistentDegree {
		/// Node id.
		id: String,
		/// Degree reported by the API.
		upstream: u32,
		/// Degree counted from the kept edges.
		derived: u32,
	},
	/// Risk score outside [0, 10] or not finite; it was clamped.
	RiskScoreOutOfRange {
		/// Node id.
		id: String,
		/// Score as sent.
		value: f64,
	},
}

impl fmt::Display for GraphWarning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GraphWarning::DanglingEdge {
				source,
				target,
				missing,
			} => write!(
				f,
				"skipped edge {source} -> {target}: unknown node '{missing}'"
			),
			GraphWarning::DuplicateNodeId { id } => {
				write!(f, "duplicate node id '{id}', keeping first occurrence")
			}
			GraphWarning::InconsistentDegree {
				id,
				upstream,
				derived,
			} => write!(
				f,
				"node '{id}' reports degree {upstream} but has {derived} edges"
			),
			GraphWarning::RiskScoreOutOfRange { id, value } => {
				write!(f, "node '{id}' risk score {value} clamped to [0, 10]")
			}
		}
	}
}

/// Invalid engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The JSON document could not be decoded.
	#[error("invalid config: {0}")]
	Json(#[from] serde_json::Error),
	/// A numeric parameter was outside its usable range.
	#[error("invalid config value for `{field}`: {reason}")]
	Value {
		/// Offending parameter name.
		field: &'static str,
		/// What the parameter must satisfy.
		reason: &'static str,
	},
}
