//! Hover and selection state over a snapshot.
//!
//! Nothing here touches the snapshot itself; emphasis is computed on top of
//! the base encoding.

use std::collections::HashSet;

use super::encoding::Emphasis;
use super::model::GraphSnapshot;

/// Read-only projection of the selected node for the detail panel.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDetail {
	/// Node id.
	pub id: String,
	/// Display label.
	pub name: String,
	/// Entity type name.
	pub kind: &'static str,
	/// Clamped to [0, 10].
	pub risk_score: f64,
	/// Anomaly label.
	pub is_anomaly: bool,
	/// Listed CVE ids, in response order.
	pub cve_ids: Vec<String>,
	/// Total CVE count; may exceed `cve_ids.len()`.
	pub cve_count: u32,
	/// Platform name.
	pub platform: &'static str,
	/// Number of connections.
	pub degree: u32,
}

/// Nodes whose emphasis changed after an interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Affected {
	/// Nothing changed.
	None,
	/// These node indices changed emphasis.
	Nodes(Vec<usize>),
	/// Hover switched on or off, which dims or undims everything.
	All,
}

impl Affected {
	/// Whether nothing changed.
	pub fn is_none(&self) -> bool {
		matches!(self, Affected::None)
	}
}

/// Hover neighbourhood and selection over one snapshot.
#[derive(Clone, Debug, Default)]
pub struct InteractionState {
	hovered: Option<usize>,
	highlighted: HashSet<usize>,
	selected: Option<usize>,
}

impl InteractionState {
	/// Index of the hovered node.
	pub fn hovered(&self) -> Option<usize> {
		self.hovered
	}

	/// Index of the selected node.
	pub fn selected(&self) -> Option<usize> {
		self.selected
	}

	/// Hovered node plus everything within one hop.
	pub fn highlighted(&self) -> &HashSet<usize> {
		&self.highlighted
	}

	/// Whether a node is in the hovered neighbourhood.
	pub fn is_highlighted(&self, idx: usize) -> bool {
		self.highlighted.contains(&idx)
	}

	/// Hover by id. An id that is not in the snapshot changes nothing.
	pub fn hover(&mut self, snapshot: &GraphSnapshot, id: Option<&str>) -> Affected {
		match id {
			None => self.hover_index(snapshot, None),
			Some(id) => match snapshot.index_of(id) {
				Some(idx) => self.hover_index(snapshot, Some(idx)),
				None => Affected::None,
			},
		}
	}

	/// Hover by index. An index outside the snapshot changes nothing.
	pub fn hover_index(&mut self, snapshot: &GraphSnapshot, idx: Option<usize>) -> Affected {
		if idx.is_some_and(|i| i >= snapshot.len()) || idx == self.hovered {
			return Affected::None;
		}
		let was_active = self.hovered.is_some();
		let mut next = HashSet::new();
		if let Some(i) = idx {
			next.insert(i);
			next.extend(snapshot.neighbors(i).iter().copied());
		}
		let previous = std::mem::replace(&mut self.highlighted, next);
		self.hovered = idx;

		if was_active != idx.is_some() {
			return Affected::All;
		}
		let mut changed: Vec<usize> = previous
			.symmetric_difference(&self.highlighted)
			.copied()
			.collect();
		changed.sort_unstable();
		if changed.is_empty() {
			Affected::None
		} else {
			Affected::Nodes(changed)
		}
	}

	/// Select by id, replacing any previous selection. An id that is not in
	/// the snapshot is a no-op.
	pub fn select(&mut self, snapshot: &GraphSnapshot, id: Option<&str>) -> Affected {
		let idx = match id {
			None => None,
			Some(id) => match snapshot.index_of(id) {
				Some(idx) => Some(idx),
				None => return Affected::None,
			},
		};
		self.select_index(idx)
	}

	/// Select by index, replacing any previous selection.
	pub fn select_index(&mut self, idx: Option<usize>) -> Affected {
		if idx == self.selected {
			return Affected::None;
		}
		let changed: Vec<usize> = self.selected.into_iter().chain(idx).collect();
		self.selected = idx;
		Affected::Nodes(changed)
	}

	/// Selection wins over hover; everything outside an active hover is dimmed.
	pub fn emphasis(&self, idx: usize) -> Emphasis {
		if self.selected == Some(idx) {
			Emphasis::Selected
		} else if self.highlighted.contains(&idx) {
			Emphasis::Highlighted
		} else if self.hovered.is_some() {
			Emphasis::Dimmed
		} else {
			Emphasis::Normal
		}
	}

	/// Detail projection of the selected node.
	pub fn detail(&self, snapshot: &GraphSnapshot) -> Option<NodeDetail> {
		let node = snapshot.node(self.selected?)?;
		Some(NodeDetail {
			id: node.id.clone(),
			name: node.name.clone(),
			kind: node.kind.as_str(),
			risk_score: node.risk_score,
			is_anomaly: node.is_anomaly,
			cve_ids: node.cve_ids().map(str::to_string).collect(),
			cve_count: node.cve_count,
			platform: node.platform.as_str(),
			degree: node.total_degree,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::model::build_graph_model;
	use crate::engine::wire::{RawCve, RawEdge, RawNode};

	// a - b - c   d
	fn snapshot() -> GraphSnapshot {
		build_graph_model(
			vec![
				RawNode::new("a").with_cve(RawCve::Id("CVE-2024-1".into())),
				RawNode::new("b"),
				RawNode::new("c"),
				RawNode::new("d"),
			],
			vec![RawEdge::new("a", "b"), RawEdge::new("b", "c")],
			None,
		)
	}

	#[test]
	fn hover_highlights_one_hop_neighbourhood() {
		let snapshot = snapshot();
		let mut state = InteractionState::default();
		assert_eq!(state.hover(&snapshot, Some("a")), Affected::All);
		assert_eq!(state.highlighted(), &HashSet::from([0, 1]));
		assert_eq!(state.emphasis(1), Emphasis::Highlighted);
		assert_eq!(state.emphasis(3), Emphasis::Dimmed);

		assert_eq!(state.hover(&snapshot, Some("c")), Affected::Nodes(vec![0, 2]));
		assert_eq!(state.hover(&snapshot, Some("c")), Affected::None);
		assert_eq!(state.hover(&snapshot, None), Affected::All);
		assert_eq!(state.emphasis(3), Emphasis::Normal);
	}

	#[test]
	fn hovering_unknown_id_changes_nothing() {
		let snapshot = snapshot();
		let mut state = InteractionState::default();
		state.hover(&snapshot, Some("b"));
		assert_eq!(state.hover(&snapshot, Some("zzz")), Affected::None);
		assert_eq!(state.hovered(), Some(1));
		assert_eq!(state.hover_index(&snapshot, Some(99)), Affected::None);
		assert_eq!(state.hovered(), Some(1));
		assert!(state.is_highlighted(2));
	}

	#[test]
	fn selecting_unknown_id_is_a_noop() {
		let snapshot = snapshot();
		let mut state = InteractionState::default();
		state.select(&snapshot, Some("c"));
		assert_eq!(state.select(&snapshot, Some("missing")), Affected::None);
		assert_eq!(state.selected(), Some(2));
	}

	#[test]
	fn selection_replaces_previous() {
		let snapshot = snapshot();
		let mut state = InteractionState::default();
		state.select(&snapshot, Some("a"));
		assert_eq!(state.select(&snapshot, Some("d")), Affected::Nodes(vec![0, 3]));
		assert_eq!(state.emphasis(3), Emphasis::Selected);
		assert_eq!(state.emphasis(0), Emphasis::Normal);
		assert_eq!(state.select(&snapshot, None), Affected::Nodes(vec![3]));
		assert!(state.detail(&snapshot).is_none());
	}

	#[test]
	fn detail_projects_selected_node() {
		let snapshot = snapshot();
		let mut state = InteractionState::default();
		state.select(&snapshot, Some("a"));
		let detail = state.detail(&snapshot).unwrap();
		assert_eq!(detail.id, "a");
		assert_eq!(detail.kind, "generic");
		assert_eq!(detail.platform, "generic");
		assert_eq!(detail.cve_ids, vec!["CVE-2024-1".to_string()]);
		assert_eq!(detail.cve_count, 1);
		assert_eq!(detail.degree, 1);
	}
}
