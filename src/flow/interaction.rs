//! Pointer gesture state machine for the flow canvas.
//!
//! [`step`] is a pure function of `(state, event) -> (state, effects)`. It never
//! touches the graph; the caller applies the returned [`Effect`]s. This keeps
//! the gesture protocol testable without a browser.
//!
//! # Gestures
//!
//! - **Idle**: nothing in progress.
//! - **Dragging**: a node, a palette item, or a new connection follows the
//!   pointer. The model is not touched until drop; the canvas draws a ghost at
//!   [`DragSession::preview`] meanwhile.
//! - **Panning**: the empty background is being dragged to scroll the view.
//!
//! Every gesture ends back in Idle on pointer-up or pointer-cancel. Only one
//! gesture is ever active.
//!
//! # Coordinates
//!
//! Events carry screen coordinates relative to the canvas element's top-left.
//! [`ViewTransform`] maps them into canvas space, where node positions live.

use super::graph::FlowGraph;
use super::node::{FlowNode, Position};
use super::registry::NodeType;

/// Canvas geometry and zoom limits.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasConfig {
	/// Node footprint in canvas units; hit-testing uses this box.
	pub node_width: f64,
	/// Node footprint height in canvas units.
	pub node_height: f64,
	/// Smallest zoom factor.
	pub min_zoom: f64,
	/// Largest zoom factor.
	pub max_zoom: f64,
	/// Multiplicative zoom change per wheel notch.
	pub zoom_step: f64,
}

impl Default for CanvasConfig {
	fn default() -> Self {
		Self {
			node_width: 200.0,
			node_height: 80.0,
			min_zoom: 0.25,
			max_zoom: 4.0,
			zoom_step: 1.1,
		}
	}
}

/// Pan and zoom transform applied to the whole canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal pan in screen pixels.
	pub x: f64,
	/// Vertical pan in screen pixels.
	pub y: f64,
	/// Zoom factor (1.0 = 100%).
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	/// Map a screen point to canvas units.
	pub fn screen_to_canvas(&self, sx: f64, sy: f64) -> Position {
		Position::new((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// Zoom about a screen point so that point stays fixed under the cursor.
	fn zoom_at(&mut self, sx: f64, sy: f64, delta_y: f64, config: &CanvasConfig) {
		let factor = if delta_y > 0.0 {
			1.0 / config.zoom_step
		} else {
			config.zoom_step
		};
		let new_k = (self.k * factor).clamp(config.min_zoom, config.max_zoom);
		let ratio = new_k / self.k;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.k = new_k;
	}
}

/// What a drag is carrying.
#[derive(Clone, Debug, PartialEq)]
pub enum DragSource {
	/// A node type pulled off the palette; no node exists yet.
	Palette(NodeType),
	/// An existing node being moved.
	Node(String),
	/// A connection being drawn out of an existing node.
	Link(String),
}

/// Transient state between pointer-down and pointer-up.
#[derive(Clone, Debug, PartialEq)]
pub struct DragSession {
	/// What is being dragged.
	pub source: DragSource,
	/// Grab point relative to the dragged element's top-left, in canvas units.
	pub pointer_offset: Position,
	/// Latest pointer position in canvas units.
	pub pointer: Position,
}

impl DragSession {
	/// Where the dragged element's top-left would land if dropped now.
	pub fn preview(&self) -> Position {
		self.pointer
			.offset(-self.pointer_offset.x, -self.pointer_offset.y)
	}
}

/// Tracks an in-progress background pan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanSession {
	/// Pointer position when the pan started.
	pub start_x: f64,
	/// See `start_x`.
	pub start_y: f64,
	/// Pan offset when the pan started.
	pub transform_start_x: f64,
	/// See `transform_start_x`.
	pub transform_start_y: f64,
}

/// The single gesture in progress, if any.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Gesture {
	/// No button held.
	#[default]
	Idle,
	/// Moving a node, dropping a palette item, or drawing a link.
	Dragging(DragSession),
	/// Dragging the background.
	Panning(PanSession),
}

/// Canvas element size in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	/// Width in pixels.
	pub width: f64,
	/// Height in pixels.
	pub height: f64,
}

impl Default for Viewport {
	fn default() -> Self {
		Self {
			width: 800.0,
			height: 600.0,
		}
	}
}

impl Viewport {
	fn contains(&self, sx: f64, sy: f64) -> bool {
		sx >= 0.0 && sy >= 0.0 && sx < self.width && sy < self.height
	}
}

/// Everything the interaction engine owns between events.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanvasState {
	/// Current gesture.
	pub gesture: Gesture,
	/// Current pan and zoom.
	pub transform: ViewTransform,
	/// Canvas size, for drop bounds.
	pub viewport: Viewport,
}

impl CanvasState {
	/// The drag in progress, if any.
	pub fn drag(&self) -> Option<&DragSession> {
		match &self.gesture {
			Gesture::Dragging(session) => Some(session),
			_ => None,
		}
	}

	/// True when no gesture is in progress.
	pub fn is_idle(&self) -> bool {
		self.gesture == Gesture::Idle
	}
}

/// Input to the state machine. Coordinates are canvas-element-relative screen pixels.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasEvent {
	/// Primary button pressed over the canvas.
	PointerDown {
		/// Pointer x.
		x: f64,
		/// Pointer y.
		y: f64,
		/// Start a connection instead of a move.
		link: bool,
	},
	/// Drag started on a palette item.
	PaletteDown {
		/// Type of the node to create.
		kind: NodeType,
		/// Pointer x.
		x: f64,
		/// Pointer y.
		y: f64,
		/// Grab point from the item's left edge, in pixels.
		grab_x: f64,
		/// Grab point from the item's top edge, in pixels.
		grab_y: f64,
	},
	/// Pointer moved.
	PointerMove {
		/// Pointer x.
		x: f64,
		/// Pointer y.
		y: f64,
	},
	/// Button released anywhere; outside the viewport counts as a cancel.
	PointerUp {
		/// Pointer x.
		x: f64,
		/// Pointer y.
		y: f64,
	},
	/// Gesture aborted (pointer left, Escape).
	PointerCancel,
	/// Wheel turned over a screen point.
	Wheel {
		/// Pointer x.
		x: f64,
		/// Pointer y.
		y: f64,
		/// Negative zooms in.
		delta_y: f64,
	},
	/// Canvas element resized.
	Resize {
		/// New width.
		width: f64,
		/// New height.
		height: f64,
	},
}

/// Model changes requested by a gesture.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
	/// Select the node.
	Select(String),
	/// Drop the selection.
	ClearSelection,
	/// Create a node from the palette.
	Create {
		/// Type of the new node.
		kind: NodeType,
		/// Its top-left corner.
		position: Position,
	},
	/// Move a node.
	Move {
		/// Node to move.
		id: String,
		/// New top-left corner.
		position: Position,
	},
	/// Add an edge.
	Connect {
		/// Source node.
		from: String,
		/// Target node.
		to: String,
	},
}

/// Topmost node whose footprint contains `at` (canvas units).
pub fn node_at<'a>(graph: &'a FlowGraph, config: &CanvasConfig, at: Position) -> Option<&'a FlowNode> {
	graph.iter().rev().find(|node| {
		let p = node.position;
		at.x >= p.x && at.x < p.x + config.node_width && at.y >= p.y && at.y < p.y + config.node_height
	})
}

/// Advance the gesture state machine by one event.
pub fn step(
	state: CanvasState,
	event: CanvasEvent,
	graph: &FlowGraph,
	config: &CanvasConfig,
) -> (CanvasState, Vec<Effect>) {
	let CanvasState {
		gesture,
		mut transform,
		mut viewport,
	} = state;
	let mut effects = Vec::new();

	let gesture = match (gesture, event) {
		(Gesture::Idle, CanvasEvent::PointerDown { x, y, link }) => {
			let at = transform.screen_to_canvas(x, y);
			match node_at(graph, config, at) {
				Some(node) => {
					effects.push(Effect::Select(node.id.clone()));
					let source = if link {
						DragSource::Link(node.id.clone())
					} else {
						DragSource::Node(node.id.clone())
					};
					Gesture::Dragging(DragSession {
						source,
						pointer_offset: Position::new(at.x - node.position.x, at.y - node.position.y),
						pointer: at,
					})
				}
				None => {
					effects.push(Effect::ClearSelection);
					Gesture::Panning(PanSession {
						start_x: x,
						start_y: y,
						transform_start_x: transform.x,
						transform_start_y: transform.y,
					})
				}
			}
		}

		(
			Gesture::Idle,
			CanvasEvent::PaletteDown {
				kind,
				x,
				y,
				grab_x,
				grab_y,
			},
		) => Gesture::Dragging(DragSession {
			source: DragSource::Palette(kind),
			pointer_offset: Position::new(grab_x / transform.k, grab_y / transform.k),
			pointer: transform.screen_to_canvas(x, y),
		}),

		(Gesture::Dragging(mut session), CanvasEvent::PointerMove { x, y }) => {
			session.pointer = transform.screen_to_canvas(x, y);
			Gesture::Dragging(session)
		}

		(Gesture::Panning(pan), CanvasEvent::PointerMove { x, y }) => {
			transform.x = pan.transform_start_x + (x - pan.start_x);
			transform.y = pan.transform_start_y + (y - pan.start_y);
			Gesture::Panning(pan)
		}

		(Gesture::Dragging(mut session), CanvasEvent::PointerUp { x, y }) => {
			if viewport.contains(x, y) {
				session.pointer = transform.screen_to_canvas(x, y);
				effects.extend(drop_effect(&session, graph, config));
			}
			Gesture::Idle
		}

		(_, CanvasEvent::PointerUp { .. }) | (_, CanvasEvent::PointerCancel) => Gesture::Idle,

		(gesture, CanvasEvent::Wheel { x, y, delta_y }) => {
			if !matches!(gesture, Gesture::Panning(_)) {
				transform.zoom_at(x, y, delta_y, config);
			}
			gesture
		}

		(gesture, CanvasEvent::Resize { width, height }) => {
			viewport = Viewport { width, height };
			gesture
		}

		// Presses during a gesture and moves while idle change nothing.
		(gesture, _) => gesture,
	};

	(
		CanvasState {
			gesture,
			transform,
			viewport,
		},
		effects,
	)
}

fn drop_effect(session: &DragSession, graph: &FlowGraph, config: &CanvasConfig) -> Option<Effect> {
	let position = session.preview();
	match &session.source {
		DragSource::Palette(kind) => Some(Effect::Create {
			kind: *kind,
			position,
		}),
		DragSource::Node(id) => {
			let node = graph.get_node(id)?;
			(node.position != position).then(|| Effect::Move {
				id: id.clone(),
				position,
			})
		}
		DragSource::Link(from) => {
			let target = node_at(graph, config, session.pointer)?;
			(target.id != *from).then(|| Effect::Connect {
				from: from.clone(),
				to: target.id.clone(),
			})
		}
	}
}
