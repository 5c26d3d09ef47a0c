//! Visual conversation-flow editor component.
//!
//! Renders a template's flow on an HTML canvas with:
//! - A palette of node types that can be dragged onto the canvas
//! - Node dragging, shift-drag connections, pan, and zoom
//! - An inspector for the selected node and a list of all nodes
//! - Undo/redo, automatic arrangement, and explicit save
//!
//! # Example
//!
//! ```ignore
//! use flow_builder::FlowBuilder;
//!
//! view! {
//!     <FlowBuilder
//!         template_id="onboarding"
//!         on_change=Callback::new(|nodes: Vec<FlowNode>| log::info!("{} nodes", nodes.len()))
//!     />
//! }
//! ```

mod component;
mod render;
pub mod storage;
pub mod theme;

pub use component::FlowBuilder;
pub use storage::BrowserStore;
pub use theme::Theme;
