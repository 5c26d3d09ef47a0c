//! Flow node entity, its typed payload, and the serialized node shape.
//!
//! The wire format is the one the template storage speaks:
//!
//! ```json
//! { "id": "message-1700000000000-0", "type": "message", "title": "Greeting",
//!   "content": "Hi!", "position": { "x": 100, "y": 100 }, "connections": ["question-..."] }
//! ```
//!
//! Type-specific fields (`options`, `expression`, `action`) are lifted into
//! [`NodeBody`]. Any other field is kept verbatim in [`FlowNode::extra`] so a
//! load followed by a save never drops data written by a newer client. A
//! type-specific field this editor cannot decode stays in `extra` as well.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::FlowError;
use super::registry::{NodeType, describe};

/// A point in canvas (world) coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
	/// Horizontal coordinate, growing to the right.
	pub x: f64,
	/// Vertical coordinate, growing downwards.
	pub y: f64,
}

impl Position {
	/// A point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Translate by a vector.
	pub fn offset(self, dx: f64, dy: f64) -> Self {
		Self {
			x: self.x + dx,
			y: self.y + dy,
		}
	}
}

/// Per-type payload of a node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeBody {
	/// Plain bot message; no extra payload.
	Message,
	/// Quick-reply options offered with the question.
	Question {
		/// Option labels, in display order.
		options: Vec<String>,
	},
	/// Expression evaluated by the runtime to pick a branch.
	Condition {
		/// Runtime expression source.
		expression: String,
	},
	/// Name of the integration or handler the runtime invokes.
	Action {
		/// Handler name.
		action: String,
	},
}

impl NodeBody {
	/// An empty payload for the given type.
	pub fn empty(kind: NodeType) -> Self {
		match kind {
			NodeType::Message => NodeBody::Message,
			NodeType::Question => NodeBody::Question {
				options: Vec::new(),
			},
			NodeType::Condition => NodeBody::Condition {
				expression: String::new(),
			},
			NodeType::Action => NodeBody::Action {
				action: String::new(),
			},
		}
	}

	/// The node type this payload belongs to.
	pub fn node_type(&self) -> NodeType {
		match self {
			NodeBody::Message => NodeType::Message,
			NodeBody::Question { .. } => NodeType::Question,
			NodeBody::Condition { .. } => NodeType::Condition,
			NodeBody::Action { .. } => NodeType::Action,
		}
	}

	/// Wire key holding this payload, if the type has one.
	fn payload_key(kind: NodeType) -> Option<&'static str> {
		match kind {
			NodeType::Message => None,
			NodeType::Question => Some("options"),
			NodeType::Condition => Some("expression"),
			NodeType::Action => Some("action"),
		}
	}

	/// Lift the payload for `kind` out of `extra`. Returns the body and whether
	/// the key was present. A value that does not decode is left in `extra`.
	fn take_from(kind: NodeType, id: &str, extra: &mut Map<String, Value>) -> (Self, bool) {
		let Some(key) = Self::payload_key(kind) else {
			return (Self::empty(kind), false);
		};
		let Some(raw) = extra.get(key) else {
			return (Self::empty(kind), false);
		};
		let decoded = match kind {
			NodeType::Message => Ok(NodeBody::Message),
			NodeType::Question => {
				serde_json::from_value(raw.clone()).map(|options| NodeBody::Question { options })
			}
			NodeType::Condition => {
				serde_json::from_value(raw.clone()).map(|expression| NodeBody::Condition { expression })
			}
			NodeType::Action => serde_json::from_value(raw.clone()).map(|action| NodeBody::Action { action }),
		};
		match decoded {
			Ok(body) => {
				extra.remove(key);
				(body, true)
			}
			Err(err) => {
				warn!("flow: node '{}' keeps undecodable '{}' as is: {}", id, key, err);
				(Self::empty(kind), false)
			}
		}
	}

	/// Write the payload key when it has content or `keep_empty` is set.
	fn write_into(&self, keep_empty: bool, extra: &mut Map<String, Value>) {
		match self {
			NodeBody::Message => {}
			NodeBody::Question { options } if keep_empty || !options.is_empty() => {
				extra.insert("options".into(), Value::from(options.clone()));
			}
			NodeBody::Condition { expression } if keep_empty || !expression.is_empty() => {
				extra.insert("expression".into(), Value::from(expression.clone()));
			}
			NodeBody::Action { action } if keep_empty || !action.is_empty() => {
				extra.insert("action".into(), Value::from(action.clone()));
			}
			_ => {}
		}
	}
}

/// One placed unit of conversation logic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeRecord", into = "NodeRecord")]
pub struct FlowNode {
	/// Unique within the flow; never changes.
	pub id: String,
	/// Heading shown on the canvas.
	pub title: String,
	/// Message text, if any.
	pub content: Option<String>,
	/// Top-left corner on the canvas.
	pub position: Position,
	/// Outgoing edges, in the order they were made.
	pub connections: Vec<String>,
	/// Type-specific data.
	pub body: NodeBody,
	/// Fields this editor does not understand, carried through untouched.
	pub extra: Map<String, Value>,
	/// The payload key is written even when empty: it was stored that way or
	/// the body has been edited.
	payload_on_wire: bool,
}

impl FlowNode {
	/// A node of `kind` with an empty payload and no connections.
	pub fn new(id: impl Into<String>, kind: NodeType, title: impl Into<String>, position: Position) -> Self {
		Self {
			id: id.into(),
			title: title.into(),
			content: None,
			position,
			connections: Vec::new(),
			body: NodeBody::empty(kind),
			extra: Map::new(),
			payload_on_wire: false,
		}
	}

	/// A node as dropped from the palette, with the registry's default title and content.
	pub fn from_palette(id: impl Into<String>, kind: NodeType, position: Position) -> Self {
		let style = describe(kind);
		Self {
			content: style.default_content.map(str::to_string),
			..Self::new(id, kind, style.default_title, position)
		}
	}

	/// Set the message text.
	pub fn with_content(mut self, content: impl Into<String>) -> Self {
		self.content = Some(content.into());
		self
	}

	/// Shorthand for the body's type.
	pub fn node_type(&self) -> NodeType {
		self.body.node_type()
	}

	/// Merge a patch into this node. Callers validate connections beforehand.
	pub(crate) fn apply(&mut self, patch: NodePatch) {
		if let Some(title) = patch.title {
			self.title = title;
		}
		if let Some(content) = patch.content {
			self.content = content;
		}
		if let Some(position) = patch.position {
			self.position = position;
		}
		if let Some(body) = patch.body {
			let key = NodeBody::payload_key(body.node_type());
			if let Some(key) = key {
				self.extra.remove(key);
			}
			self.payload_on_wire = key.is_some();
			self.body = body;
		}
		if let Some(connections) = patch.connections {
			self.connections = connections;
		}
	}

	/// The patch that would restore `self` from any state reached by `patch`.
	///
	/// Body changes also touch `extra`, so they are undone by restoring the
	/// whole node instead.
	pub(crate) fn revert_patch(&self, patch: &NodePatch) -> NodePatch {
		NodePatch {
			title: patch.title.as_ref().map(|_| self.title.clone()),
			content: patch.content.as_ref().map(|_| self.content.clone()),
			position: patch.position.map(|_| self.position),
			body: patch.body.as_ref().map(|_| self.body.clone()),
			connections: patch.connections.as_ref().map(|_| self.connections.clone()),
		}
	}
}

/// A partial update of a node. `None` fields are left unchanged.
///
/// `id` is deliberately absent: identity never changes after creation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodePatch {
	/// New title.
	pub title: Option<String>,
	/// `Some(None)` clears the content.
	pub content: Option<Option<String>>,
	/// New position.
	pub position: Option<Position>,
	/// New type and payload.
	pub body: Option<NodeBody>,
	/// Replacement outgoing edges.
	pub connections: Option<Vec<String>>,
}

impl NodePatch {
	/// Move only.
	pub fn position(position: Position) -> Self {
		Self {
			position: Some(position),
			..Self::default()
		}
	}

	/// Rename only.
	pub fn title(title: impl Into<String>) -> Self {
		Self {
			title: Some(title.into()),
			..Self::default()
		}
	}

	/// Set or clear the content only.
	pub fn content(content: Option<String>) -> Self {
		Self {
			content: Some(content),
			..Self::default()
		}
	}

	/// Replace the type and payload only.
	pub fn body(body: NodeBody) -> Self {
		Self {
			body: Some(body),
			..Self::default()
		}
	}

	/// True when the patch changes nothing.
	pub fn is_empty(&self) -> bool {
		*self == Self::default()
	}
}

/// Serialized node shape.
#[derive(Serialize, Deserialize)]
struct NodeRecord {
	id: String,
	#[serde(rename = "type")]
	kind: NodeType,
	title: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	content: Option<String>,
	position: Position,
	#[serde(default)]
	connections: Vec<String>,
	#[serde(flatten)]
	extra: Map<String, Value>,
}

impl TryFrom<NodeRecord> for FlowNode {
	type Error = FlowError;

	fn try_from(mut record: NodeRecord) -> Result<Self, Self::Error> {
		if record.id.is_empty() {
			return Err(FlowError::EmptyId);
		}
		let (body, payload_on_wire) = NodeBody::take_from(record.kind, &record.id, &mut record.extra);
		Ok(Self {
			id: record.id,
			title: record.title,
			content: record.content,
			position: record.position,
			connections: record.connections,
			body,
			extra: record.extra,
			payload_on_wire,
		})
	}
}

impl From<FlowNode> for NodeRecord {
	fn from(node: FlowNode) -> Self {
		let mut extra = node.extra;
		node.body.write_into(node.payload_on_wire, &mut extra);
		Self {
			id: node.id,
			kind: node.body.node_type(),
			title: node.title,
			content: node.content,
			position: node.position,
			connections: node.connections,
			extra,
		}
	}
}

/// Hands out fresh node ids of the form `<type>-<seed>-<n>`.
///
/// The seed is normally the session start time in milliseconds, which keeps
/// ids from separate sessions apart; the counter keeps them apart within one.
#[derive(Clone, Debug)]
pub struct IdGenerator {
	seed: u64,
	next: u64,
}

impl IdGenerator {
	/// Start counting at zero for `seed`.
	pub fn new(seed: u64) -> Self {
		Self { seed, next: 0 }
	}

	/// Produce an id for `kind` that `taken` reports as unused.
	pub fn next_id(&mut self, kind: NodeType, taken: impl Fn(&str) -> bool) -> String {
		loop {
			let id = format!("{}-{}-{}", kind.as_str(), self.seed, self.next);
			self.next += 1;
			if !taken(&id) {
				return id;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn decodes_wire_shape() {
		let node: FlowNode = serde_json::from_value(json!({
			"id": "n1",
			"type": "question",
			"title": "Ask name",
			"content": "What is your name?",
			"position": { "x": 10.0, "y": 20.5 },
			"connections": ["n2"],
			"options": ["Ana", "Bruno"]
		}))
		.unwrap();

		assert_eq!(node.node_type(), NodeType::Question);
		assert_eq!(
			node.body,
			NodeBody::Question {
				options: vec!["Ana".into(), "Bruno".into()]
			}
		);
		assert_eq!(node.position, Position::new(10.0, 20.5));
		assert_eq!(node.connections, vec!["n2".to_string()]);
		assert!(node.extra.is_empty());
	}

	#[test]
	fn missing_optional_fields_default() {
		let node: FlowNode = serde_json::from_value(json!({
			"id": "n1",
			"type": "message",
			"title": "Hi",
			"position": { "x": 0, "y": 0 }
		}))
		.unwrap();

		assert_eq!(node.content, None);
		assert!(node.connections.is_empty());
	}

	#[test]
	fn unknown_fields_survive_a_round_trip() {
		let wire = json!({
			"id": "n1",
			"type": "action",
			"title": "Call CRM",
			"position": { "x": 1.0, "y": 2.0 },
			"connections": [],
			"action": "crm.lookup",
			"color": "#ff0000",
			"meta": { "createdBy": "ana" }
		});
		let node: FlowNode = serde_json::from_value(wire.clone()).unwrap();
		assert_eq!(node.extra.get("color"), Some(&json!("#ff0000")));

		assert_eq!(serde_json::to_value(&node).unwrap(), wire);
	}

	#[test]
	fn rejects_empty_id() {
		let empty = serde_json::from_value::<FlowNode>(json!({
			"id": "", "type": "message", "title": "x", "position": { "x": 0, "y": 0 }
		}));
		assert!(empty.is_err());
	}

	#[test]
	fn undecodable_payload_is_kept_verbatim() {
		let wire = json!({
			"id": "q", "type": "question", "title": "x",
			"position": { "x": 0.0, "y": 0.0 }, "connections": [],
			"options": [{ "label": "Ana", "value": "a" }]
		});
		let node: FlowNode = serde_json::from_value(wire.clone()).unwrap();
		assert_eq!(node.body, NodeBody::empty(NodeType::Question));
		assert!(node.extra.contains_key("options"));
		assert_eq!(serde_json::to_value(&node).unwrap(), wire);
	}

	#[test]
	fn empty_payloads_round_trip_when_present() {
		for wire in [
			json!({ "id": "q", "type": "question", "title": "x",
				"position": { "x": 0.0, "y": 0.0 }, "connections": [], "options": [] }),
			json!({ "id": "c", "type": "condition", "title": "x",
				"position": { "x": 0.0, "y": 0.0 }, "connections": [], "expression": "" }),
			json!({ "id": "a", "type": "action", "title": "x",
				"position": { "x": 0.0, "y": 0.0 }, "connections": [], "action": "" }),
			json!({ "id": "q2", "type": "question", "title": "x",
				"position": { "x": 0.0, "y": 0.0 }, "connections": [] }),
		] {
			let node: FlowNode = serde_json::from_value(wire.clone()).unwrap();
			assert_eq!(serde_json::to_value(&node).unwrap(), wire);
		}
	}

	#[test]
	fn edited_body_is_written_even_when_empty() {
		let mut node = FlowNode::new("c", NodeType::Message, "x", Position::default());
		node.apply(NodePatch::body(NodeBody::empty(NodeType::Condition)));
		let wire = serde_json::to_value(&node).unwrap();
		assert_eq!(wire["expression"], json!(""));
	}

	#[test]
	fn unknown_type_fails_to_decode() {
		let res = serde_json::from_value::<FlowNode>(json!({
			"id": "n", "type": "webhook", "title": "x", "position": { "x": 0, "y": 0 }
		}));
		assert!(res.is_err());
	}

	#[test]
	fn changing_body_drops_stale_payload_key() {
		let mut node: FlowNode = serde_json::from_value(json!({
			"id": "n", "type": "message", "title": "x",
			"position": { "x": 0, "y": 0 }, "options": ["left over"]
		}))
		.unwrap();
		assert!(node.extra.contains_key("options"));

		node.apply(NodePatch::body(NodeBody::empty(NodeType::Question)));
		assert!(!node.extra.contains_key("options"));
	}

	#[test]
	fn palette_nodes_use_registry_defaults() {
		let node = FlowNode::from_palette("message-0-0", NodeType::Message, Position::new(5.0, 5.0));
		assert_eq!(node.title, describe(NodeType::Message).default_title);
		assert_eq!(node.content.as_deref(), describe(NodeType::Message).default_content);
	}

	#[test]
	fn id_generator_skips_taken_ids() {
		let mut ids = IdGenerator::new(7);
		let id = ids.next_id(NodeType::Action, |id| id == "action-7-0");
		assert_eq!(id, "action-7-1");
		assert_eq!(ids.next_id(NodeType::Message, |_| false), "message-7-2");
	}
}
