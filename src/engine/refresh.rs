//! Full-replace refresh of the displayed graph.
//!
//! `Idle -> Loading -> {Ready, Error}`. Every refresh drops the current
//! scene before fetching, and responses are matched against a generation
//! ticket so a slow, older response can never overwrite a newer one.

use std::cell::RefCell;

use log::{debug, info, warn};

use super::config::EngineConfig;
use super::error::GraphError;
use super::layout::Viewport;
use super::model::{GraphStats, build_graph_model};
use super::scene::Scene;
use super::source::GraphSource;
use super::wire::GraphResponse;

/// Coarse lifecycle of the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshStatus {
	/// Nothing requested yet, or disposed.
	#[default]
	Idle,
	/// A request is in flight and no scene is shown.
	Loading,
	/// A scene is available.
	Ready,
	/// The latest request failed.
	Error,
}

/// What the host displays: status, error message and summary figures.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewStatus {
	/// Current lifecycle state.
	pub status: RefreshStatus,
	/// Message of the current error.
	pub error: Option<String>,
	/// Category of the current error, see [`GraphError::kind`].
	pub error_kind: Option<&'static str>,
	/// Summary figures of the shown snapshot.
	pub stats: Option<GraphStats>,
	/// Number of data-quality warnings in the shown snapshot.
	pub warnings: usize,
}

/// Identifies one refresh request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshTicket(u64);

enum LoadState {
	Idle,
	Loading,
	Ready(Box<Scene>),
	Error(GraphError),
}

/// Owns the scene; the only place one is created or dropped.
pub struct RefreshController {
	state: LoadState,
	generation: u64,
	config: EngineConfig,
	viewport: Viewport,
}

impl RefreshController {
	/// An idle controller for `viewport`.
	pub fn new(config: EngineConfig, viewport: Viewport) -> Self {
		Self {
			state: LoadState::Idle,
			generation: 0,
			config,
			viewport,
		}
	}

	/// Configuration every new scene is built with.
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Current drawable area.
	pub fn viewport(&self) -> Viewport {
		self.viewport
	}

	/// Tear down the current scene and start a new request.
	pub fn begin_refresh(&mut self) -> RefreshTicket {
		self.generation += 1;
		self.state = LoadState::Loading;
		info!("graph refresh #{} started", self.generation);
		RefreshTicket(self.generation)
	}

	/// Whether results for `ticket` would still be applied.
	pub fn is_current(&self, ticket: RefreshTicket) -> bool {
		ticket.0 == self.generation && matches!(self.state, LoadState::Loading)
	}

	/// Apply the outcome of a request. Stale tickets are ignored and
	/// `false` is returned.
	pub fn complete(
		&mut self,
		ticket: RefreshTicket,
		result: Result<GraphResponse, GraphError>,
	) -> bool {
		if !self.is_current(ticket) {
			debug!(
				"discarding response for refresh #{} (current #{})",
				ticket.0, self.generation
			);
			return false;
		}
		self.state = match result {
			Ok(response) if response.nodes.is_empty() => {
				warn!("graph refresh #{}: {}", ticket.0, GraphError::EmptyGraph);
				LoadState::Error(GraphError::EmptyGraph)
			}
			Ok(response) => {
				let snapshot = build_graph_model(response.nodes, response.edges, response.metadata);
				info!(
					"graph refresh #{} ready: {} nodes, {} edges, {} warnings",
					ticket.0,
					snapshot.len(),
					snapshot.edges().len(),
					snapshot.warnings().len()
				);
				LoadState::Ready(Box::new(Scene::new(snapshot, &self.config, self.viewport)))
			}
			Err(err) => {
				warn!("graph refresh #{} failed: {err}", ticket.0);
				LoadState::Error(err)
			}
		};
		true
	}

	/// Drop the scene and ignore anything still in flight.
	pub fn dispose(&mut self) {
		self.generation += 1;
		self.state = LoadState::Idle;
	}

	/// Current lifecycle state.
	pub fn status(&self) -> RefreshStatus {
		match self.state {
			LoadState::Idle => RefreshStatus::Idle,
			LoadState::Loading => RefreshStatus::Loading,
			LoadState::Ready(_) => RefreshStatus::Ready,
			LoadState::Error(_) => RefreshStatus::Error,
		}
	}

	/// The error of the latest failed request.
	pub fn error(&self) -> Option<&GraphError> {
		match &self.state {
			LoadState::Error(err) => Some(err),
			_ => None,
		}
	}

	/// The shown scene, once ready.
	pub fn scene(&self) -> Option<&Scene> {
		match &self.state {
			LoadState::Ready(scene) => Some(&**scene),
			_ => None,
		}
	}

	/// Mutable access to the shown scene.
	pub fn scene_mut(&mut self) -> Option<&mut Scene> {
		match &mut self.state {
			LoadState::Ready(scene) => Some(&mut **scene),
			_ => None,
		}
	}

	/// Snapshot of everything the status overlay shows.
	pub fn view_status(&self) -> ViewStatus {
		let scene = self.scene();
		ViewStatus {
			status: self.status(),
			error: self.error().map(ToString::to_string),
			error_kind: self.error().map(GraphError::kind),
			stats: scene.map(|s| s.snapshot().stats()),
			warnings: scene.map_or(0, |s| s.snapshot().warnings().len()),
		}
	}

	/// Resize the drawable area, relaying it to the shown scene.
	pub fn set_viewport(&mut self, viewport: Viewport) {
		self.viewport = viewport;
		if let Some(scene) = self.scene_mut() {
			scene.resize(viewport);
		}
	}
}

/// Fetch from `source` and apply the result. No borrow of the controller is
/// held across the await, so interaction keeps working while the fetch is
/// pending. Returns whether this request's result was applied.
pub async fn refresh<S: GraphSource>(controller: &RefCell<RefreshController>, source: &S) -> bool {
	let ticket = controller.borrow_mut().begin_refresh();
	let result = source.fetch_graph().await;
	controller.borrow_mut().complete(ticket, result)
}
