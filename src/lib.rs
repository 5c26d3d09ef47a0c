//! flow-builder: visual conversation-flow editor for chatbot templates.
//!
//! The [`flow`] module holds the browser-independent editing core: node
//! model, graph integrity, pointer interaction, undo history, layout, and
//! persistence contract. [`components`] wraps it in a Leptos canvas editor.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;
pub mod flow;

pub use components::flow_builder::{BrowserStore, FlowBuilder, Theme};
pub use flow::{EditorSession, FlowError, FlowGraph, FlowNode, FlowStore, NodeType, StoreError};

/// Template edited when the page does not name one.
pub const DEFAULT_TEMPLATE_ID: &str = "default";

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("flow-builder: logging initialized");
}

/// Page-level settings embedded by the dashboard.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowConfig {
	/// Template whose flow is edited.
	pub template_id: String,
	/// Canvas theme preset name, e.g. `"midnight"`.
	#[serde(default)]
	pub theme: Option<String>,
}

impl Default for FlowConfig {
	fn default() -> Self {
		Self {
			template_id: DEFAULT_TEMPLATE_ID.to_string(),
			theme: None,
		}
	}
}

impl FlowConfig {
	/// Parse the JSON carried by the `flow-config` script element.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}
}

/// Load page settings from a script element with id="flow-config".
/// Expected format: JSON with { "templateId": "..." }
fn load_flow_config() -> Option<FlowConfig> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id("flow-config")?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	let json_text = script.text().ok()?;

	match FlowConfig::from_json(&json_text) {
		Ok(config) => {
			info!("flow-builder: editing template {}", config.template_id);
			Some(config)
		}
		Err(e) => {
			warn!("flow-builder: failed to parse flow config: {}", e);
			None
		}
	}
}

/// Main application component.
/// Reads the page settings from the DOM and renders the editor.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = load_flow_config().unwrap_or_default();
	let theme = config.theme.as_deref().and_then(|name| {
		let theme = Theme::named(name);
		if theme.is_none() {
			warn!("flow-builder: unknown theme {:?}, using default", name);
		}
		theme
	});

	view! {
		<Html attr:lang="en" attr:dir="ltr" />
		<Title text="Flow Builder" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-editor">
			<FlowBuilder template_id=config.template_id theme=theme.unwrap_or_default() />
		</div>
	}
}
