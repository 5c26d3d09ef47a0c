//! Error types for the flow editing core and its persistence collaborator.

use thiserror::Error;

/// Model-integrity errors raised by graph, selection, and registry operations.
///
/// These never reach the user as a dialog. A failing operation leaves the model
/// exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
	/// An id is already taken.
	#[error("a node with id '{0}' already exists in this flow")]
	DuplicateId(String),

	/// No node has this id.
	#[error("node '{0}' not found in this flow")]
	NotFound(String),

	/// A node would connect to itself.
	#[error("node '{0}' cannot connect to itself")]
	SelfLoop(String),

	/// A connection points at a node that is not in the flow.
	#[error("node '{from}' references missing node '{to}'")]
	DanglingConnection {
		/// Node holding the connection.
		from: String,
		/// Missing target.
		to: String,
	},

	/// A type string outside the known set.
	#[error("'{0}' is not a known node type")]
	InvalidNodeType(String),

	/// A node without an id.
	#[error("node id must not be empty")]
	EmptyId,
}

/// Failures reported by a [`FlowStore`](super::store::FlowStore) on load or save.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
	/// The store could not be reached.
	#[error("network error: {0}")]
	Network(String),

	/// The store refused the data.
	#[error("rejected by server: {0}")]
	Validation(String),

	/// Stored data could not be encoded or decoded.
	#[error("could not encode or decode flow: {0}")]
	Serialization(String),
}

impl From<serde_json::Error> for StoreError {
	fn from(err: serde_json::Error) -> Self {
		StoreError::Serialization(err.to_string())
	}
}

/// Anything a session load can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
	/// The stored flow breaks a model invariant.
	#[error(transparent)]
	Flow(#[from] FlowError),

	/// The store failed.
	#[error(transparent)]
	Store(#[from] StoreError),
}
