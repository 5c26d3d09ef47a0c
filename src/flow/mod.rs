//! Conversation-flow editing core.
//!
//! Everything in this module is plain Rust with no browser dependency:
//!
//! - [`registry`]: the closed set of node types and their display metadata
//! - [`graph`]: nodes and connections of one flow, with referential integrity
//! - [`interaction`]: the pointer gesture state machine for the canvas
//! - [`selection`]: the single selected node
//! - [`session`]: the editing session that owns all of the above
//!
//! # Example
//!
//! ```
//! use flow_builder::flow::{EditorSession, FlowNode, NodeType, Position};
//!
//! let mut session = EditorSession::new("welcome-template", 0);
//! session
//!     .add_node(FlowNode::new("n1", NodeType::Message, "Greeting", Position::new(100.0, 100.0)))
//!     .unwrap();
//! session
//!     .add_node(FlowNode::new("n2", NodeType::Question, "Ask name", Position::new(100.0, 250.0)))
//!     .unwrap();
//! session.connect("n1", "n2").unwrap();
//!
//! session.remove_node("n2").unwrap();
//! assert!(session.graph().get_node("n1").unwrap().connections.is_empty());
//! ```

pub mod error;
pub mod graph;
pub mod history;
pub mod interaction;
pub mod layout;
pub mod node;
pub mod registry;
pub mod selection;
pub mod session;
pub mod store;

pub use error::{EditorError, FlowError, StoreError};
pub use graph::FlowGraph;
pub use interaction::{CanvasConfig, CanvasEvent, CanvasState, DragSource, Effect, ViewTransform};
pub use node::{FlowNode, NodeBody, NodePatch, Position};
pub use registry::{NodeStyle, NodeType, describe};
pub use session::{EditorSession, SaveRequest};
pub use store::{FlowStore, MemoryStore};
