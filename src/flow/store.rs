//! Persistence collaborator contract for flow node sets.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use super::error::StoreError;
use super::node::FlowNode;

/// Loads and saves the node set of a template.
///
/// Futures are not required to be `Send`; the editor drives them on the
/// browser's single-threaded executor.
pub trait FlowStore {
	/// The stored nodes of a template; an unknown template has none.
	fn load_flow_nodes(&self, template_id: &str) -> impl Future<Output = Result<Vec<FlowNode>, StoreError>>;

	/// Replace the stored nodes of a template.
	fn save_flow_nodes(
		&self,
		template_id: &str,
		nodes: &[FlowNode],
	) -> impl Future<Output = Result<(), StoreError>>;
}

/// In-process store. Templates are kept as serialized JSON, so a load goes
/// through the same decoding as data from a real backend.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	templates: Rc<RefCell<HashMap<String, String>>>,
	fail_next: Rc<RefCell<Option<StoreError>>>,
}

impl MemoryStore {
	/// An empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed a template with raw JSON, as a backend would hold it.
	pub fn insert_json(&self, template_id: &str, json: impl Into<String>) {
		self.templates
			.borrow_mut()
			.insert(template_id.to_string(), json.into());
	}

	/// The JSON last written for a template.
	pub fn raw_json(&self, template_id: &str) -> Option<String> {
		self.templates.borrow().get(template_id).cloned()
	}

	/// Make the next load or save fail with `err`.
	pub fn fail_next(&self, err: StoreError) {
		*self.fail_next.borrow_mut() = Some(err);
	}

	fn take_failure(&self) -> Result<(), StoreError> {
		match self.fail_next.borrow_mut().take() {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}

impl FlowStore for MemoryStore {
	async fn load_flow_nodes(&self, template_id: &str) -> Result<Vec<FlowNode>, StoreError> {
		self.take_failure()?;
		match self.templates.borrow().get(template_id) {
			Some(json) => Ok(serde_json::from_str(json)?),
			None => Ok(Vec::new()),
		}
	}

	async fn save_flow_nodes(&self, template_id: &str, nodes: &[FlowNode]) -> Result<(), StoreError> {
		self.take_failure()?;
		let json = serde_json::to_string(nodes)?;
		self.insert_json(template_id, json);
		Ok(())
	}
}
