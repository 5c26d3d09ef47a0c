//! Template storage backed by the browser's `localStorage`.

use wasm_bindgen::JsValue;
use web_sys::Storage;

use crate::flow::{FlowNode, FlowStore, StoreError};

/// Keeps each template's node array as JSON under `<prefix><template id>`.
#[derive(Clone, Debug)]
pub struct BrowserStore {
	prefix: String,
}

impl Default for BrowserStore {
	fn default() -> Self {
		Self::new("flow-builder:template:")
	}
}

impl BrowserStore {
	/// Store templates under `<prefix><template id>`.
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
		}
	}

	fn key(&self, template_id: &str) -> String {
		format!("{}{}", self.prefix, template_id)
	}
}

fn js_error(context: &str, err: JsValue) -> StoreError {
	StoreError::Network(format!("{}: {:?}", context, err))
}

fn local_storage() -> Result<Storage, StoreError> {
	web_sys::window()
		.ok_or_else(|| StoreError::Network("no window".into()))?
		.local_storage()
		.map_err(|e| js_error("localStorage unavailable", e))?
		.ok_or_else(|| StoreError::Network("localStorage disabled".into()))
}

impl FlowStore for BrowserStore {
	async fn load_flow_nodes(&self, template_id: &str) -> Result<Vec<FlowNode>, StoreError> {
		let stored = local_storage()?
			.get_item(&self.key(template_id))
			.map_err(|e| js_error("read failed", e))?;
		match stored {
			Some(json) => Ok(serde_json::from_str(&json)?),
			None => Ok(Vec::new()),
		}
	}

	async fn save_flow_nodes(&self, template_id: &str, nodes: &[FlowNode]) -> Result<(), StoreError> {
		let json = serde_json::to_string(nodes)?;
		local_storage()?
			.set_item(&self.key(template_id), &json)
			.map_err(|e| js_error("write failed", e))
	}
}
