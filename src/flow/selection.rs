//! Single-node selection bound to a flow graph.
//!
//! The selection stores only an id. Lookups always go back to the graph, so the
//! inspector sees the authoritative node even after other edits.

use super::error::FlowError;
use super::graph::FlowGraph;
use super::node::FlowNode;

/// At most one selected node, by id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
	selected: Option<String>,
}

impl Selection {
	/// Nothing selected.
	pub fn new() -> Self {
		Self::default()
	}

	/// Select `id`, which must exist in `graph`.
	pub fn select(&mut self, graph: &FlowGraph, id: &str) -> Result<(), FlowError> {
		if !graph.contains(id) {
			return Err(FlowError::NotFound(id.to_string()));
		}
		self.selected = Some(id.to_string());
		Ok(())
	}

	/// Drop the selection.
	pub fn clear(&mut self) {
		self.selected = None;
	}

	/// Id of the selected node.
	pub fn selected_id(&self) -> Option<&str> {
		self.selected.as_deref()
	}

	/// True when `id` is selected.
	pub fn is_selected(&self, id: &str) -> bool {
		self.selected.as_deref() == Some(id)
	}

	/// Live lookup of the selected node.
	pub fn current<'a>(&self, graph: &'a FlowGraph) -> Option<&'a FlowNode> {
		self.selected.as_deref().and_then(|id| graph.get_node(id))
	}

	/// Drop the selection if it no longer names a node in `graph`.
	pub fn reconcile(&mut self, graph: &FlowGraph) {
		if self.selected.as_deref().is_some_and(|id| !graph.contains(id)) {
			self.selected = None;
		}
	}
}
