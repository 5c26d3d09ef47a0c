//! Undo/redo as a bounded log of invertible graph edits.

use std::collections::VecDeque;

use super::error::FlowError;
use super::graph::{FlowGraph, Removed};
use super::node::{FlowNode, NodePatch};

/// One applied change to a [`FlowGraph`], recorded with what it takes to reverse it.
#[derive(Clone, Debug, PartialEq)]
pub enum Edit {
	/// A node inserted at `index`.
	Added {
		/// The inserted node.
		node: FlowNode,
		/// Where it went.
		index: usize,
	},
	/// A node deleted together with its incoming edges.
	Removed(Removed),
	/// Fields of one node patched in place.
	Updated {
		/// Patched node.
		id: String,
		/// Patch restoring the old values.
		before: NodePatch,
		/// The patch that was applied.
		after: NodePatch,
	},
	/// A node swapped wholesale, used when a patch also rewrites `extra`.
	Replaced {
		/// The node before the edit.
		before: FlowNode,
		/// The node after the edit.
		after: FlowNode,
	},
	/// Several edits that undo and redo as one step.
	Batch(Vec<Edit>),
}

impl Edit {
	fn revert(&self, graph: &mut FlowGraph) -> Result<(), FlowError> {
		match self {
			Edit::Added { node, .. } => graph.remove_node(&node.id).map(|_| ()),
			Edit::Removed(removed) => graph.restore(removed.clone()),
			Edit::Updated { id, before, .. } => graph.update_node(id, before.clone()),
			Edit::Replaced { before, .. } => graph.replace(before.clone()),
			Edit::Batch(edits) => edits.iter().rev().try_for_each(|e| e.revert(graph)),
		}
	}

	fn reapply(&self, graph: &mut FlowGraph) -> Result<(), FlowError> {
		match self {
			Edit::Added { node, index } => graph.insert_at(*index, node.clone()),
			Edit::Removed(removed) => graph.remove_node(&removed.node.id).map(|_| ()),
			Edit::Updated { id, after, .. } => graph.update_node(id, after.clone()),
			Edit::Replaced { after, .. } => graph.replace(after.clone()),
			Edit::Batch(edits) => edits.iter().try_for_each(|e| e.reapply(graph)),
		}
	}
}

/// Edits kept when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Undo and redo stacks.
#[derive(Clone, Debug)]
pub struct History {
	undo: VecDeque<Edit>,
	redo: Vec<Edit>,
	limit: usize,
}

impl Default for History {
	fn default() -> Self {
		Self::with_limit(DEFAULT_HISTORY_LIMIT)
	}
}

impl History {
	/// Keep at most `limit` undoable edits (at least one).
	pub fn with_limit(limit: usize) -> Self {
		Self {
			undo: VecDeque::new(),
			redo: Vec::new(),
			limit: limit.max(1),
		}
	}

	/// Record an edit that has already been applied. Clears the redo stack.
	pub fn record(&mut self, edit: Edit) {
		self.redo.clear();
		self.undo.push_back(edit);
		while self.undo.len() > self.limit {
			self.undo.pop_front();
		}
	}

	/// True when there is an edit to undo.
	pub fn can_undo(&self) -> bool {
		!self.undo.is_empty()
	}

	/// True when there is an edit to redo.
	pub fn can_redo(&self) -> bool {
		!self.redo.is_empty()
	}

	/// Reverse the most recent edit. Returns `Ok(false)` when there is nothing to undo.
	pub fn undo(&mut self, graph: &mut FlowGraph) -> Result<bool, FlowError> {
		let Some(edit) = self.undo.pop_back() else {
			return Ok(false);
		};
		edit.revert(graph)?;
		self.redo.push(edit);
		Ok(true)
	}

	/// Re-apply the most recently undone edit.
	pub fn redo(&mut self, graph: &mut FlowGraph) -> Result<bool, FlowError> {
		let Some(edit) = self.redo.pop() else {
			return Ok(false);
		};
		edit.reapply(graph)?;
		self.undo.push_back(edit);
		Ok(true)
	}

	/// Forget every edit.
	pub fn clear(&mut self) {
		self.undo.clear();
		self.redo.clear();
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::flow::node::Position;
	use crate::flow::registry::NodeType;

	fn node(id: &str) -> FlowNode {
		FlowNode::new(id, NodeType::Message, id, Position::default())
	}

	fn add(graph: &mut FlowGraph, history: &mut History, id: &str) {
		let n = node(id);
		graph.add_node(n.clone()).unwrap();
		history.record(Edit::Added {
			node: n,
			index: graph.len() - 1,
		});
	}

	#[test]
	fn undo_and_redo_add() {
		let mut g = FlowGraph::new();
		let mut h = History::default();
		add(&mut g, &mut h, "a");

		assert!(h.undo(&mut g).unwrap());
		assert!(g.is_empty());
		assert!(h.redo(&mut g).unwrap());
		assert!(g.contains("a"));
		assert!(!h.redo(&mut g).unwrap());
	}

	#[test]
	fn undo_remove_restores_edges() {
		let mut g = FlowGraph::new();
		let mut h = History::default();
		add(&mut g, &mut h, "a");
		add(&mut g, &mut h, "b");
		g.connect("a", "b").unwrap();
		let before = g.clone();

		let removed = g.remove_node("b").unwrap();
		h.record(Edit::Removed(removed));
		h.undo(&mut g).unwrap();
		assert_eq!(g, before);
	}

	#[test]
	fn undo_update_restores_previous_fields() {
		let mut g = FlowGraph::new();
		let mut h = History::default();
		add(&mut g, &mut h, "a");

		let after = NodePatch::position(Position::new(9.0, 9.0));
		let before = g.get_node("a").unwrap().revert_patch(&after);
		g.update_node("a", after.clone()).unwrap();
		h.record(Edit::Updated {
			id: "a".into(),
			before,
			after,
		});

		h.undo(&mut g).unwrap();
		assert_eq!(g.get_node("a").unwrap().position, Position::default());
		h.redo(&mut g).unwrap();
		assert_eq!(g.get_node("a").unwrap().position, Position::new(9.0, 9.0));
	}

	#[test]
	fn new_edit_discards_redo() {
		let mut g = FlowGraph::new();
		let mut h = History::default();
		add(&mut g, &mut h, "a");
		h.undo(&mut g).unwrap();
		assert!(h.can_redo());
		add(&mut g, &mut h, "b");
		assert!(!h.can_redo());
	}

	#[test]
	fn log_is_bounded() {
		let mut g = FlowGraph::new();
		let mut h = History::with_limit(2);
		for id in ["a", "b", "c"] {
			add(&mut g, &mut h, id);
		}
		assert!(h.undo(&mut g).unwrap());
		assert!(h.undo(&mut g).unwrap());
		assert!(!h.undo(&mut g).unwrap());
		assert_eq!(g.len(), 1);
	}
}
