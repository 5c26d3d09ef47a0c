//! In-memory graph of one flow's nodes and their connections.
//!
//! Referential integrity is enforced eagerly: every id stored in any node's
//! `connections` names a node in the same graph, after every successful
//! operation. Failing operations leave the graph untouched.

use log::warn;

use super::error::FlowError;
use super::node::{FlowNode, NodePatch};

/// What [`FlowGraph::remove_node`] took out, enough to put it back exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct Removed {
	/// The node as it was, connections included.
	pub node: FlowNode,
	/// Former position in iteration order.
	pub index: usize,
	/// `(source id, slot)` for each edge into the removed node, slots ascending per source.
	pub detached_from: Vec<(String, usize)>,
}

/// The node set of one flow, in stable insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowGraph {
	nodes: Vec<FlowNode>,
}

impl FlowGraph {
	/// An empty flow.
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a graph from a stored node set.
	///
	/// Duplicate ids fail the whole load. Connections to missing nodes and
	/// self-loops, which older editors could leave behind, are pruned.
	pub fn from_nodes(nodes: Vec<FlowNode>) -> Result<Self, FlowError> {
		let mut graph = Self::new();
		for node in nodes {
			if node.id.is_empty() {
				return Err(FlowError::EmptyId);
			}
			if graph.contains(&node.id) {
				return Err(FlowError::DuplicateId(node.id));
			}
			graph.nodes.push(node);
		}

		let ids: Vec<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
		for node in &mut graph.nodes {
			let own_id = node.id.clone();
			node.connections.retain(|target| {
				let keep = *target != own_id && ids.contains(target);
				if !keep {
					warn!("flow: dropping stale connection {} -> {}", own_id, target);
				}
				keep
			});
		}
		Ok(graph)
	}

	/// Number of nodes.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// True when the flow has no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// True when a node with `id` exists.
	pub fn contains(&self, id: &str) -> bool {
		self.index_of(id).is_some()
	}

	/// Look up a node by id.
	pub fn get_node(&self, id: &str) -> Option<&FlowNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Snapshot of all nodes; later mutations do not affect it.
	pub fn list_nodes(&self) -> Vec<FlowNode> {
		self.nodes.clone()
	}

	/// All nodes in insertion order.
	pub fn nodes(&self) -> &[FlowNode] {
		&self.nodes
	}

	/// Borrowing iterator in insertion order (bottom to top on the canvas).
	pub fn iter(&self) -> impl DoubleEndedIterator<Item = &FlowNode> {
		self.nodes.iter()
	}

	/// Insert a new node.
	pub fn add_node(&mut self, node: FlowNode) -> Result<(), FlowError> {
		let index = self.nodes.len();
		self.insert_at(index, node)
	}

	pub(crate) fn insert_at(&mut self, index: usize, node: FlowNode) -> Result<(), FlowError> {
		if node.id.is_empty() {
			return Err(FlowError::EmptyId);
		}
		if self.contains(&node.id) {
			return Err(FlowError::DuplicateId(node.id));
		}
		self.check_targets(&node.id, &node.connections)?;
		self.nodes.insert(index.min(self.nodes.len()), node);
		Ok(())
	}

	/// Merge `patch` into the node with `id`.
	pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<(), FlowError> {
		let index = self
			.index_of(id)
			.ok_or_else(|| FlowError::NotFound(id.to_string()))?;
		if let Some(connections) = &patch.connections {
			self.check_targets(id, connections)?;
		}
		self.nodes[index].apply(patch);
		Ok(())
	}

	/// Swap in a whole new version of an existing node.
	pub(crate) fn replace(&mut self, node: FlowNode) -> Result<(), FlowError> {
		let index = self
			.index_of(&node.id)
			.ok_or_else(|| FlowError::NotFound(node.id.clone()))?;
		self.check_targets(&node.id, &node.connections)?;
		self.nodes[index] = node;
		Ok(())
	}

	/// Delete a node and every edge pointing at it.
	pub fn remove_node(&mut self, id: &str) -> Result<Removed, FlowError> {
		let index = self
			.index_of(id)
			.ok_or_else(|| FlowError::NotFound(id.to_string()))?;
		let node = self.nodes.remove(index);

		let mut detached_from = Vec::new();
		for other in &mut self.nodes {
			let source = other.id.clone();
			let mut slot = 0;
			other.connections.retain(|target| {
				let keep = target != id;
				if !keep {
					detached_from.push((source.clone(), slot));
				}
				slot += 1;
				keep
			});
		}

		Ok(Removed {
			node,
			index,
			detached_from,
		})
	}

	/// Put back a node returned by [`remove_node`](Self::remove_node), edges included.
	pub(crate) fn restore(&mut self, removed: Removed) -> Result<(), FlowError> {
		let id = removed.node.id.clone();
		self.insert_at(removed.index, removed.node)?;
		for (source, slot) in removed.detached_from {
			if let Some(i) = self.index_of(&source) {
				let connections = &mut self.nodes[i].connections;
				connections.insert(slot.min(connections.len()), id.clone());
			}
		}
		Ok(())
	}

	/// Append an edge `from -> to`. Connecting an existing edge again is a no-op.
	pub fn connect(&mut self, from: &str, to: &str) -> Result<(), FlowError> {
		let index = self
			.index_of(from)
			.ok_or_else(|| FlowError::NotFound(from.to_string()))?;
		if !self.contains(to) {
			return Err(FlowError::NotFound(to.to_string()));
		}
		if from == to {
			return Err(FlowError::SelfLoop(from.to_string()));
		}
		let connections = &mut self.nodes[index].connections;
		if !connections.iter().any(|c| c == to) {
			connections.push(to.to_string());
		}
		Ok(())
	}

	/// Remove the edge `from -> to` if present.
	pub fn disconnect(&mut self, from: &str, to: &str) -> Result<(), FlowError> {
		let index = self
			.index_of(from)
			.ok_or_else(|| FlowError::NotFound(from.to_string()))?;
		self.nodes[index].connections.retain(|c| c != to);
		Ok(())
	}

	/// True when `from` has an edge to `to`.
	pub fn is_connected(&self, from: &str, to: &str) -> bool {
		self.get_node(from)
			.is_some_and(|n| n.connections.iter().any(|c| c == to))
	}

	/// Confirm that every connection resolves and no node points at itself.
	pub fn validate(&self) -> Result<(), FlowError> {
		for (i, node) in self.nodes.iter().enumerate() {
			if self.nodes[..i].iter().any(|n| n.id == node.id) {
				return Err(FlowError::DuplicateId(node.id.clone()));
			}
			for target in &node.connections {
				if *target == node.id {
					return Err(FlowError::SelfLoop(node.id.clone()));
				}
				if !self.contains(target) {
					return Err(FlowError::DanglingConnection {
						from: node.id.clone(),
						to: target.clone(),
					});
				}
			}
		}
		Ok(())
	}

	fn index_of(&self, id: &str) -> Option<usize> {
		self.nodes.iter().position(|n| n.id == id)
	}

	fn check_targets(&self, id: &str, targets: &[String]) -> Result<(), FlowError> {
		for target in targets {
			if target == id {
				return Err(FlowError::SelfLoop(id.to_string()));
			}
			if !self.contains(target) {
				return Err(FlowError::NotFound(target.clone()));
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::flow::node::Position;
	use crate::flow::registry::NodeType;

	fn node(id: &str) -> FlowNode {
		FlowNode::new(id, NodeType::Message, id.to_uppercase(), Position::new(0.0, 0.0))
	}

	fn graph(ids: &[&str]) -> FlowGraph {
		let mut g = FlowGraph::new();
		for id in ids {
			g.add_node(node(id)).unwrap();
		}
		g
	}

	#[test]
	fn duplicate_add_leaves_graph_unchanged() {
		let mut g = graph(&["n1"]);
		let before = g.clone();

		let mut dup = node("n1");
		dup.title = "other".into();
		assert_eq!(g.add_node(dup), Err(FlowError::DuplicateId("n1".into())));
		assert_eq!(g, before);
	}

	#[test]
	fn empty_id_is_rejected() {
		let mut g = FlowGraph::new();
		assert_eq!(g.add_node(node("")), Err(FlowError::EmptyId));
		assert!(g.is_empty());
	}

	#[test]
	fn add_rejects_unknown_targets() {
		let mut g = graph(&["a"]);
		let mut b = node("b");
		b.connections = vec!["ghost".into()];
		assert_eq!(g.add_node(b), Err(FlowError::NotFound("ghost".into())));
		assert_eq!(g.len(), 1);
	}

	#[test]
	fn update_merges_only_given_fields() {
		let mut g = graph(&["n1"]);
		g.update_node("n1", NodePatch::position(Position::new(3.0, 4.0)))
			.unwrap();

		let n = g.get_node("n1").unwrap();
		assert_eq!(n.position, Position::new(3.0, 4.0));
		assert_eq!(n.title, "N1");
	}

	#[test]
	fn update_missing_node_fails() {
		let mut g = graph(&["n1"]);
		assert_eq!(
			g.update_node("nope", NodePatch::title("x")),
			Err(FlowError::NotFound("nope".into()))
		);
	}

	#[test]
	fn update_validates_connection_lists() {
		let mut g = graph(&["a", "b"]);
		let patch = NodePatch {
			connections: Some(vec!["b".into(), "a".into()]),
			..NodePatch::default()
		};
		assert_eq!(g.update_node("a", patch), Err(FlowError::SelfLoop("a".into())));
		assert!(g.get_node("a").unwrap().connections.is_empty());
	}

	#[test]
	fn remove_detaches_incoming_edges() {
		let mut g = graph(&["a", "b", "c"]);
		g.connect("a", "b").unwrap();
		g.connect("a", "c").unwrap();
		g.connect("c", "b").unwrap();

		let removed = g.remove_node("b").unwrap();
		assert_eq!(removed.index, 1);
		assert_eq!(
			removed.detached_from,
			vec![("a".to_string(), 0), ("c".to_string(), 0)]
		);
		assert!(g.iter().all(|n| !n.connections.contains(&"b".to_string())));
		assert_eq!(g.get_node("a").unwrap().connections, vec!["c".to_string()]);
		g.validate().unwrap();
	}

	#[test]
	fn restore_undoes_remove_exactly() {
		let mut g = graph(&["a", "b", "c"]);
		g.connect("a", "c").unwrap();
		g.connect("a", "b").unwrap();
		g.connect("b", "c").unwrap();
		let before = g.clone();

		let removed = g.remove_node("c").unwrap();
		g.restore(removed).unwrap();
		assert_eq!(g, before);
	}

	#[test]
	fn connect_checks_endpoints_and_loops() {
		let mut g = graph(&["a", "b"]);
		assert_eq!(g.connect("a", "a"), Err(FlowError::SelfLoop("a".into())));
		assert_eq!(g.connect("a", "zz"), Err(FlowError::NotFound("zz".into())));
		assert_eq!(g.connect("zz", "a"), Err(FlowError::NotFound("zz".into())));

		g.connect("a", "b").unwrap();
		g.connect("a", "b").unwrap();
		assert_eq!(g.get_node("a").unwrap().connections, vec!["b".to_string()]);
	}

	#[test]
	fn disconnect_removes_edge() {
		let mut g = graph(&["a", "b"]);
		g.connect("a", "b").unwrap();
		g.disconnect("a", "b").unwrap();
		assert!(!g.is_connected("a", "b"));
		assert_eq!(g.disconnect("x", "b"), Err(FlowError::NotFound("x".into())));
	}

	#[test]
	fn list_is_a_snapshot() {
		let mut g = graph(&["a", "b"]);
		let snapshot = g.list_nodes();
		g.remove_node("a").unwrap();
		assert_eq!(snapshot.len(), 2);
		assert_eq!(g.len(), 1);
	}

	#[test]
	fn load_prunes_stale_edges_and_rejects_duplicates() {
		let mut a = node("a");
		a.connections = vec!["b".into(), "gone".into(), "a".into()];
		let g = FlowGraph::from_nodes(vec![a, node("b")]).unwrap();
		assert_eq!(g.get_node("a").unwrap().connections, vec!["b".to_string()]);
		g.validate().unwrap();

		assert_eq!(
			FlowGraph::from_nodes(vec![node("x"), node("x")]),
			Err(FlowError::DuplicateId("x".into()))
		);
	}
}
