//! Editing session: the single owner of a flow while it is open in the editor.
//!
//! The session composes the graph, the selection, the canvas gesture state, and
//! the undo log, and is the only place where they are mutated. UI code holds a
//! handle to it and forwards events; nothing lives in ambient globals.
//!
//! Model-integrity failures coming from pointer gestures are logged and
//! swallowed. Direct calls (inspector edits, toolbar actions) return them.

use log::{debug, info, warn};

use super::error::{EditorError, FlowError, StoreError};
use super::graph::FlowGraph;
use super::history::{Edit, History};
use super::interaction::{self, CanvasConfig, CanvasEvent, CanvasState, Effect};
use super::layout::{self, LayoutParams};
use super::node::{FlowNode, IdGenerator, NodePatch, Position};
use super::registry::NodeType;
use super::selection::Selection;
use super::store::FlowStore;

/// Called with the full node list after every model mutation.
pub type NodesCallback = Box<dyn Fn(&[FlowNode])>;
/// Called with a node id on selection or deletion.
pub type IdCallback = Box<dyn Fn(&str)>;

/// Snapshot handed to a store while the session keeps accepting edits.
#[derive(Clone, Debug, PartialEq)]
pub struct SaveRequest {
	/// Template being saved.
	pub template_id: String,
	/// Nodes at the snapshot revision.
	pub nodes: Vec<FlowNode>,
	/// Revision the snapshot was taken at.
	pub revision: u64,
}

#[derive(Default)]
struct Callbacks {
	subflows_update: Option<NodesCallback>,
	node_select: Option<IdCallback>,
	node_delete: Option<IdCallback>,
}

/// One open flow with its selection, gesture, and undo log.
pub struct EditorSession {
	template_id: String,
	graph: FlowGraph,
	selection: Selection,
	canvas: CanvasState,
	config: CanvasConfig,
	history: History,
	ids: IdGenerator,
	revision: u64,
	saved_revision: u64,
	callbacks: Callbacks,
}

impl EditorSession {
	/// Start an empty session. `id_seed` should differ between sessions, e.g. the start time in ms.
	pub fn new(template_id: impl Into<String>, id_seed: u64) -> Self {
		Self {
			template_id: template_id.into(),
			graph: FlowGraph::new(),
			selection: Selection::new(),
			canvas: CanvasState::default(),
			config: CanvasConfig::default(),
			history: History::default(),
			ids: IdGenerator::new(id_seed),
			revision: 0,
			saved_revision: 0,
			callbacks: Callbacks::default(),
		}
	}

	/// Use custom canvas geometry.
	pub fn with_config(mut self, config: CanvasConfig) -> Self {
		self.config = config;
		self
	}

	/// Register the after-every-change callback.
	pub fn on_subflows_update(&mut self, f: impl Fn(&[FlowNode]) + 'static) {
		self.callbacks.subflows_update = Some(Box::new(f));
	}

	/// Register the selection callback.
	pub fn on_node_select(&mut self, f: impl Fn(&str) + 'static) {
		self.callbacks.node_select = Some(Box::new(f));
	}

	/// Register the deletion callback.
	pub fn on_node_delete(&mut self, f: impl Fn(&str) + 'static) {
		self.callbacks.node_delete = Some(Box::new(f));
	}

	/// Template this session edits.
	pub fn template_id(&self) -> &str {
		&self.template_id
	}

	/// The current model.
	pub fn graph(&self) -> &FlowGraph {
		&self.graph
	}

	/// Gesture and view state.
	pub fn canvas(&self) -> &CanvasState {
		&self.canvas
	}

	/// Canvas geometry.
	pub fn config(&self) -> &CanvasConfig {
		&self.config
	}

	/// Bumped on every model change.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// True when there are edits newer than the last successful save.
	pub fn is_dirty(&self) -> bool {
		self.revision != self.saved_revision
	}

	/// True when an edit can be undone.
	pub fn can_undo(&self) -> bool {
		self.history.can_undo()
	}

	/// True when an edit can be redone.
	pub fn can_redo(&self) -> bool {
		self.history.can_redo()
	}

	// Loading

	/// Replace the model with a stored node set. On error the current model is kept.
	pub fn load_nodes(&mut self, nodes: Vec<FlowNode>) -> Result<(), FlowError> {
		self.graph = FlowGraph::from_nodes(nodes)?;
		self.selection.clear();
		self.history.clear();
		self.canvas.gesture = Default::default();
		self.revision += 1;
		self.saved_revision = self.revision;
		Ok(())
	}

	/// Fetch this session's template from `store` and load it.
	pub async fn load<S: FlowStore>(&mut self, store: &S) -> Result<(), EditorError> {
		let nodes = store.load_flow_nodes(&self.template_id).await?;
		let count = nodes.len();
		self.load_nodes(nodes)?;
		info!("flow: loaded {} nodes for template {}", count, self.template_id);
		Ok(())
	}

	// Graph edits

	/// Insert a node as one undoable edit.
	pub fn add_node(&mut self, node: FlowNode) -> Result<(), FlowError> {
		self.graph.add_node(node.clone())?;
		let index = self.graph.len() - 1;
		self.commit(Edit::Added { node, index });
		Ok(())
	}

	/// Create a node of `kind` at `position` with a fresh id and registry defaults, and select it.
	pub fn create_node(&mut self, kind: NodeType, position: Position) -> Result<String, FlowError> {
		let graph = &self.graph;
		let id = self.ids.next_id(kind, |id| graph.contains(id));
		self.add_node(FlowNode::from_palette(id.clone(), kind, position))?;
		self.select(&id)?;
		Ok(id)
	}

	/// Patch a node as one undoable edit. An empty patch does nothing.
	pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<(), FlowError> {
		if patch.is_empty() {
			return Ok(());
		}
		let node = self
			.graph
			.get_node(id)
			.ok_or_else(|| FlowError::NotFound(id.to_string()))?;
		if patch.body.is_some() {
			let before = node.clone();
			self.graph.update_node(id, patch)?;
			let after = self
				.graph
				.get_node(id)
				.cloned()
				.ok_or_else(|| FlowError::NotFound(id.to_string()))?;
			self.commit(Edit::Replaced { before, after });
			return Ok(());
		}
		let before = node.revert_patch(&patch);
		self.graph.update_node(id, patch.clone())?;
		self.commit(Edit::Updated {
			id: id.to_string(),
			before,
			after: patch,
		});
		Ok(())
	}

	/// Delete a node, its incoming edges, and its selection in one step.
	pub fn remove_node(&mut self, id: &str) -> Result<(), FlowError> {
		let removed = self.graph.remove_node(id)?;
		if self.selection.is_selected(id) {
			self.selection.clear();
		}
		if let Some(cb) = &self.callbacks.node_delete {
			cb(id);
		}
		self.commit(Edit::Removed(removed));
		Ok(())
	}

	/// Add the edge `from -> to`.
	pub fn connect(&mut self, from: &str, to: &str) -> Result<(), FlowError> {
		self.edit_connections(from, |graph| graph.connect(from, to))
	}

	/// Remove the edge `from -> to`.
	pub fn disconnect(&mut self, from: &str, to: &str) -> Result<(), FlowError> {
		self.edit_connections(from, |graph| graph.disconnect(from, to))
	}

	fn edit_connections(
		&mut self,
		from: &str,
		op: impl FnOnce(&mut FlowGraph) -> Result<(), FlowError>,
	) -> Result<(), FlowError> {
		let before = self
			.graph
			.get_node(from)
			.ok_or_else(|| FlowError::NotFound(from.to_string()))?
			.connections
			.clone();
		op(&mut self.graph)?;
		let after = self
			.graph
			.get_node(from)
			.map(|n| n.connections.clone())
			.unwrap_or_default();
		if after != before {
			self.commit(Edit::Updated {
				id: from.to_string(),
				before: NodePatch {
					connections: Some(before),
					..NodePatch::default()
				},
				after: NodePatch {
					connections: Some(after),
					..NodePatch::default()
				},
			});
		}
		Ok(())
	}

	/// Move every node to its force-directed position, as one undoable step.
	pub fn arrange(&mut self, params: &LayoutParams) -> Result<(), FlowError> {
		let mut edits = Vec::new();
		for (id, position) in layout::arrange(&self.graph, params) {
			let patch = NodePatch::position(position);
			let Some(node) = self.graph.get_node(&id) else {
				continue;
			};
			if node.position == position {
				continue;
			}
			let before = node.revert_patch(&patch);
			self.graph.update_node(&id, patch.clone())?;
			edits.push(Edit::Updated {
				id,
				before,
				after: patch,
			});
		}
		if !edits.is_empty() {
			self.commit(Edit::Batch(edits));
		}
		Ok(())
	}

	/// Reverse the last edit. Returns `Ok(false)` when there is nothing to undo.
	pub fn undo(&mut self) -> Result<bool, FlowError> {
		let before = self.node_ids();
		let undone = self.history.undo(&mut self.graph)?;
		if undone {
			self.after_history_step(before);
		}
		Ok(undone)
	}

	/// Re-apply the last undone edit. Returns `Ok(false)` when there is nothing to redo.
	pub fn redo(&mut self) -> Result<bool, FlowError> {
		let before = self.node_ids();
		let redone = self.history.redo(&mut self.graph)?;
		if redone {
			self.after_history_step(before);
		}
		Ok(redone)
	}

	fn node_ids(&self) -> Vec<String> {
		self.graph.iter().map(|n| n.id.clone()).collect()
	}

	/// Report nodes the step took away, then drop a selection that went with them.
	fn after_history_step(&mut self, before: Vec<String>) {
		for id in before.iter().filter(|id| !self.graph.contains(id)) {
			if let Some(cb) = &self.callbacks.node_delete {
				cb(id);
			}
		}
		self.selection.reconcile(&self.graph);
		self.touch();
	}

	fn commit(&mut self, edit: Edit) {
		self.history.record(edit);
		self.touch();
	}

	fn touch(&mut self) {
		self.revision += 1;
		if let Some(cb) = &self.callbacks.subflows_update {
			cb(self.graph.nodes());
		}
	}

	// Selection and inspector

	/// Select a node and notify the host.
	pub fn select(&mut self, id: &str) -> Result<(), FlowError> {
		self.selection.select(&self.graph, id)?;
		if let Some(cb) = &self.callbacks.node_select {
			cb(id);
		}
		Ok(())
	}

	/// Select nothing.
	pub fn clear_selection(&mut self) {
		self.selection.clear();
	}

	/// Id of the selected node.
	pub fn selected_id(&self) -> Option<&str> {
		self.selection.selected_id()
	}

	/// The selected node as it is in the graph right now.
	pub fn current_selection(&self) -> Option<&FlowNode> {
		self.selection.current(&self.graph)
	}

	/// Apply an inspector edit to the selected node.
	pub fn edit_selected(&mut self, patch: NodePatch) -> Result<(), FlowError> {
		let id = self
			.selection
			.selected_id()
			.ok_or_else(|| FlowError::NotFound(String::new()))?
			.to_string();
		self.update_node(&id, patch)
	}

	/// Delete the selected node, if any. Returns whether something was deleted.
	pub fn delete_selected(&mut self) -> Result<bool, FlowError> {
		let Some(id) = self.selection.selected_id().map(str::to_string) else {
			return Ok(false);
		};
		self.remove_node(&id)?;
		Ok(true)
	}

	// Canvas

	/// Feed one pointer event through the gesture machine and apply its effects.
	///
	/// Returns the first effect that failed; the model is unchanged by that effect.
	pub fn handle(&mut self, event: CanvasEvent) -> Result<(), FlowError> {
		let state = std::mem::take(&mut self.canvas);
		let in_gesture = !state.is_idle();
		let (next, effects) = interaction::step(state, event, &self.graph, &self.config);
		self.canvas = next;

		if in_gesture && self.canvas.is_idle() && effects.is_empty() {
			debug!("flow: gesture ended without changes");
		}
		for effect in effects {
			if let Err(err) = self.apply(effect) {
				warn!("flow: rejected canvas edit: {}", err);
				return Err(err);
			}
		}
		Ok(())
	}

	fn apply(&mut self, effect: Effect) -> Result<(), FlowError> {
		match effect {
			Effect::Select(id) => self.select(&id),
			Effect::ClearSelection => {
				self.clear_selection();
				Ok(())
			}
			Effect::Create { kind, position } => self.create_node(kind, position).map(|_| ()),
			Effect::Move { id, position } => self.update_node(&id, NodePatch::position(position)),
			Effect::Connect { from, to } => self.connect(&from, &to),
		}
	}

	// Saving

	/// Snapshot the model for a save that may complete later.
	pub fn begin_save(&self) -> SaveRequest {
		SaveRequest {
			template_id: self.template_id.clone(),
			nodes: self.graph.list_nodes(),
			revision: self.revision,
		}
	}

	/// Record the outcome of a save started with [`begin_save`](Self::begin_save).
	///
	/// Local edits are never rolled back; a failed save can simply be retried.
	pub fn finish_save(&mut self, revision: u64, result: Result<(), StoreError>) -> Result<(), StoreError> {
		match result {
			Ok(()) => {
				self.saved_revision = self.saved_revision.max(revision);
				info!(
					"flow: saved template {} at revision {}",
					self.template_id, revision
				);
				Ok(())
			}
			Err(err) => {
				warn!("flow: saving template {} failed: {}", self.template_id, err);
				Err(err)
			}
		}
	}

	/// Save the current model to `store` and wait for the result.
	pub async fn save<S: FlowStore>(&mut self, store: &S) -> Result<(), StoreError> {
		let request = self.begin_save();
		let result = store
			.save_flow_nodes(&request.template_id, &request.nodes)
			.await;
		self.finish_save(request.revision, result)
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use pretty_assertions::assert_eq;

	use super::*;
	use crate::flow::node::NodeBody;

	fn session_with(ids: &[(&str, f64, f64)]) -> EditorSession {
		let mut s = EditorSession::new("tpl", 1);
		for (id, x, y) in ids {
			s.add_node(FlowNode::new(*id, NodeType::Message, *id, Position::new(*x, *y)))
				.unwrap();
		}
		s
	}

	#[test]
	fn removing_selected_node_clears_selection() {
		let mut s = session_with(&[("n1", 0.0, 0.0), ("n2", 300.0, 0.0)]);
		s.select("n1").unwrap();
		s.remove_node("n1").unwrap();
		assert!(s.current_selection().is_none());
		assert_eq!(s.selected_id(), None);
	}

	#[test]
	fn removing_other_node_keeps_selection() {
		let mut s = session_with(&[("n1", 0.0, 0.0), ("n2", 300.0, 0.0)]);
		s.select("n1").unwrap();
		s.remove_node("n2").unwrap();
		assert_eq!(s.selected_id(), Some("n1"));
	}

	#[test]
	fn palette_drop_creates_and_selects_fresh_node() {
		let mut s = EditorSession::new("tpl", 42);
		s.handle(CanvasEvent::PaletteDown {
			kind: NodeType::Condition,
			x: -50.0,
			y: 0.0,
			grab_x: 0.0,
			grab_y: 0.0,
		})
		.unwrap();
		s.handle(CanvasEvent::PointerUp { x: 200.0, y: 150.0 }).unwrap();

		let node = s.current_selection().unwrap();
		assert_eq!(node.id, "condition-42-0");
		assert_eq!(node.node_type(), NodeType::Condition);
		assert_eq!(node.position, Position::new(200.0, 150.0));
		assert!(s.canvas().is_idle());
	}

	#[test]
	fn fresh_ids_skip_loaded_ones() {
		let mut s = EditorSession::new("tpl", 0);
		s.load_nodes(vec![FlowNode::new(
			"message-0-0",
			NodeType::Message,
			"loaded",
			Position::default(),
		)])
		.unwrap();
		let id = s.create_node(NodeType::Message, Position::new(300.0, 0.0)).unwrap();
		assert_eq!(id, "message-0-1");
		assert_eq!(s.graph().len(), 2);
	}

	#[test]
	fn drag_moves_only_the_dragged_node() {
		let mut s = session_with(&[("n1", 100.0, 100.0), ("n2", 400.0, 400.0)]);
		s.handle(CanvasEvent::PointerDown {
			x: 110.0,
			y: 110.0,
			link: false,
		})
		.unwrap();
		s.handle(CanvasEvent::PointerMove { x: 140.0, y: 90.0 }).unwrap();
		s.handle(CanvasEvent::PointerUp { x: 160.0, y: 70.0 }).unwrap();

		assert_eq!(s.graph().get_node("n1").unwrap().position, Position::new(150.0, 60.0));
		assert_eq!(s.graph().get_node("n2").unwrap().position, Position::new(400.0, 400.0));
		assert_eq!(s.selected_id(), Some("n1"));
	}

	#[test]
	fn callbacks_mirror_changes() {
		let log = Rc::new(RefCell::new(Vec::<String>::new()));
		let mut s = EditorSession::new("tpl", 0);
		let (a, b, c) = (log.clone(), log.clone(), log.clone());
		s.on_subflows_update(move |nodes| a.borrow_mut().push(format!("update:{}", nodes.len())));
		s.on_node_select(move |id| b.borrow_mut().push(format!("select:{id}")));
		s.on_node_delete(move |id| c.borrow_mut().push(format!("delete:{id}")));

		s.add_node(FlowNode::new("n1", NodeType::Message, "Hi", Position::default()))
			.unwrap();
		s.select("n1").unwrap();
		s.remove_node("n1").unwrap();

		assert_eq!(
			*log.borrow(),
			vec!["update:1", "select:n1", "delete:n1", "update:0"]
		);

		log.borrow_mut().clear();
		s.undo().unwrap();
		s.undo().unwrap();
		s.redo().unwrap();
		s.redo().unwrap();
		assert_eq!(
			*log.borrow(),
			vec!["update:1", "delete:n1", "update:0", "update:1", "delete:n1", "update:0"]
		);
	}

	#[test]
	fn undoing_a_type_change_restores_the_node_exactly() {
		let mut s = EditorSession::new("tpl", 0);
		let stored: FlowNode = serde_json::from_value(serde_json::json!({
			"id": "m", "type": "message", "title": "Hi",
			"position": { "x": 0, "y": 0 }, "options": ["kept"]
		}))
		.unwrap();
		s.load_nodes(vec![stored]).unwrap();
		let before = s.graph().list_nodes();

		s.update_node("m", NodePatch::body(NodeBody::Question { options: vec!["Sim".into()] }))
			.unwrap();
		assert_eq!(s.graph().get_node("m").unwrap().node_type(), NodeType::Question);

		s.undo().unwrap();
		assert_eq!(s.graph().list_nodes(), before);

		s.redo().unwrap();
		assert_eq!(
			s.graph().get_node("m").unwrap().body,
			NodeBody::Question { options: vec!["Sim".into()] }
		);
	}

	#[test]
	fn failed_edit_does_not_notify_or_dirty() {
		let mut s = session_with(&[("n1", 0.0, 0.0)]);
		let rev = s.revision();
		assert!(s.connect("n1", "n1").is_err());
		assert!(s.update_node("zz", NodePatch::title("x")).is_err());
		assert_eq!(s.revision(), rev);
	}

	#[test]
	fn inspector_edits_apply_immediately() {
		let mut s = session_with(&[("n1", 0.0, 0.0)]);
		assert_eq!(
			s.edit_selected(NodePatch::title("x")),
			Err(FlowError::NotFound(String::new()))
		);
		s.select("n1").unwrap();
		s.edit_selected(NodePatch::content(Some("Olá!".into()))).unwrap();
		assert_eq!(
			s.current_selection().and_then(|n| n.content.as_deref()),
			Some("Olá!")
		);
	}

	#[test]
	fn undo_of_create_clears_selection() {
		let mut s = EditorSession::new("tpl", 0);
		s.create_node(NodeType::Action, Position::default()).unwrap();
		assert!(s.selected_id().is_some());
		assert!(s.undo().unwrap());
		assert_eq!(s.selected_id(), None);
		assert!(s.graph().is_empty());
		assert!(s.redo().unwrap());
		assert_eq!(s.graph().len(), 1);
	}

	#[test]
	fn undo_connect_and_arrange_batch() {
		let mut s = session_with(&[("a", 0.0, 0.0), ("b", 0.0, 0.0), ("c", 0.0, 0.0)]);
		s.connect("a", "b").unwrap();
		s.connect("a", "b").unwrap();
		assert!(s.undo().unwrap());
		assert!(!s.graph().is_connected("a", "b"));

		let before = s.graph().clone();
		s.arrange(&LayoutParams::default()).unwrap();
		assert!(s.undo().unwrap());
		assert_eq!(*s.graph(), before);
	}

	#[test]
	fn delete_selected_is_noop_without_selection() {
		let mut s = session_with(&[("n1", 0.0, 0.0)]);
		assert_eq!(s.delete_selected(), Ok(false));
		s.select("n1").unwrap();
		assert_eq!(s.delete_selected(), Ok(true));
		assert!(s.graph().is_empty());
	}

	#[test]
	fn save_in_flight_then_more_edits_stays_dirty() {
		let mut s = session_with(&[("n1", 0.0, 0.0)]);
		let request = s.begin_save();
		s.update_node("n1", NodePatch::title("edited while saving")).unwrap();
		s.finish_save(request.revision, Ok(())).unwrap();
		assert!(s.is_dirty());
		assert_eq!(request.nodes[0].title, "n1");
	}
}
