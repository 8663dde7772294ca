//! Where graph snapshots come from.

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use super::error::GraphError;
use super::wire::{GraphResponse, RawCve, RawEdge, RawNode, decode_response};

/// An async provider of graph responses.
///
/// Futures are polled on the UI thread and need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait GraphSource {
	/// Fetch and decode one graph response.
	async fn fetch_graph(&self) -> Result<GraphResponse, GraphError>;
}

/// Fetches the graph API over the browser fetch API.
#[derive(Clone, Debug)]
pub struct HttpGraphSource {
	url: String,
}

impl HttpGraphSource {
	/// Fetch from `url` with a plain GET.
	pub fn new(url: impl Into<String>) -> Self {
		Self { url: url.into() }
	}

	/// Endpoint this source reads.
	pub fn url(&self) -> &str {
		&self.url
	}

	async fn fetch_text(&self) -> Result<String, GraphError> {
		let opts = RequestInit::new();
		opts.set_method("GET");
		opts.set_mode(RequestMode::Cors);

		let request = Request::new_with_str_and_init(&self.url, &opts)
			.map_err(|e| GraphError::Network(format!("request error: {e:?}")))?;
		request
			.headers()
			.set("Accept", "application/json")
			.map_err(|e| GraphError::Network(format!("request error: {e:?}")))?;

		let window = web_sys::window().ok_or_else(|| GraphError::Network("no window".into()))?;
		let resp_value = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(|e| GraphError::Network(format!("fetch error: {e:?}")))?;
		let resp: Response = resp_value
			.dyn_into()
			.map_err(|_| GraphError::Network("response is not a Response".into()))?;
		if !resp.ok() {
			return Err(GraphError::Network(format!("HTTP {}", resp.status())));
		}

		let text = JsFuture::from(
			resp.text()
				.map_err(|e| GraphError::Network(format!("body error: {e:?}")))?,
		)
		.await
		.map_err(|e| GraphError::Network(format!("body error: {e:?}")))?;
		text.as_string()
			.ok_or_else(|| GraphError::MalformedResponse("response body is not text".into()))
	}
}

impl GraphSource for HttpGraphSource {
	async fn fetch_graph(&self) -> Result<GraphResponse, GraphError> {
		let body = self.fetch_text().await?;
		decode_response(&body)
	}
}

/// A deterministic sample topology for running the dashboard without a
/// backend.
#[derive(Clone, Debug)]
pub struct DemoGraphSource {
	nodes: usize,
}

impl DemoGraphSource {
	/// A demo graph of `nodes` nodes.
	pub fn new(nodes: usize) -> Self {
		Self { nodes }
	}

	/// The generated response; identical on every call.
	pub fn response(&self) -> GraphResponse {
		const KINDS: [&str; 5] = ["ip", "process", "service", "resource", "interface"];
		const PLATFORMS: [&str; 6] = ["aws", "azure", "gcp", "onPrem", "oracle", "generic"];

		let nodes = (0..self.nodes)
			.map(|i| {
				let risk = (rand_simple(i * 7) * 10.0 * 10.0).round() / 10.0;
				let mut node = RawNode::new(format!("node-{i}"))
					.with_name(format!("{}-{i}", KINDS[i % KINDS.len()]))
					.with_kind(KINDS[i % KINDS.len()])
					.with_platform(PLATFORMS[(i / 3) % PLATFORMS.len()])
					.with_risk(risk)
					.with_anomaly(rand_simple(i * 13) > 0.9);
				if rand_simple(i * 17) > 0.75 {
					node = node.with_cve(RawCve::Record {
						id: format!("CVE-2024-{:04}", 1000 + i),
						severity: None,
						score: Some((rand_simple(i * 19) * 10.0).max(1.0)),
					});
				}
				node
			})
			.collect();

		// random tree, so every node is reachable
		let edges = (1..self.nodes)
			.map(|i| {
				let target = (rand_simple(i) * (i as f64)) as usize;
				RawEdge::new(format!("node-{i}"), format!("node-{target}"))
			})
			.collect();

		GraphResponse {
			nodes,
			edges,
			metadata: None,
		}
	}
}

impl GraphSource for DemoGraphSource {
	async fn fetch_graph(&self) -> Result<GraphResponse, GraphError> {
		Ok(self.response())
	}
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}
