//! Static catalog of node types and their display metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::FlowError;

/// The closed set of node kinds a flow can contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
	/// Bot sends text.
	Message,
	/// Bot asks and waits for an answer.
	Question,
	/// Branch on an expression.
	Condition,
	/// Call an integration.
	Action,
}

impl NodeType {
	/// Every node type, in palette order.
	pub const ALL: [NodeType; 4] = [
		NodeType::Message,
		NodeType::Question,
		NodeType::Condition,
		NodeType::Action,
	];

	/// Wire name, as used in the serialized `type` field and in generated ids.
	pub fn as_str(self) -> &'static str {
		match self {
			NodeType::Message => "message",
			NodeType::Question => "question",
			NodeType::Condition => "condition",
			NodeType::Action => "action",
		}
	}
}

impl fmt::Display for NodeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for NodeType {
	type Err = FlowError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		NodeType::ALL
			.into_iter()
			.find(|kind| kind.as_str() == s)
			.ok_or_else(|| FlowError::InvalidNodeType(s.to_string()))
	}
}

/// Display metadata for one node type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeStyle {
	/// Human-readable name.
	pub label: &'static str,
	/// Glyph shown on palette items and nodes.
	pub icon: &'static str,
	/// CSS class for palette items.
	pub style_class: &'static str,
	/// Title given to a freshly dropped node.
	pub default_title: &'static str,
	/// Content given to a freshly dropped node, if any.
	pub default_content: Option<&'static str>,
}

/// Look up display metadata for a node type.
pub fn describe(kind: NodeType) -> NodeStyle {
	match kind {
		NodeType::Message => NodeStyle {
			label: "Message",
			icon: "💬",
			style_class: "node-message",
			default_title: "New message",
			default_content: Some("Type the message the bot will send"),
		},
		NodeType::Question => NodeStyle {
			label: "Question",
			icon: "❓",
			style_class: "node-question",
			default_title: "New question",
			default_content: Some("What would you like to ask?"),
		},
		NodeType::Condition => NodeStyle {
			label: "Condition",
			icon: "🔀",
			style_class: "node-condition",
			default_title: "New condition",
			default_content: None,
		},
		NodeType::Action => NodeStyle {
			label: "Action",
			icon: "⚡",
			style_class: "node-action",
			default_title: "New action",
			default_content: None,
		},
	}
}
