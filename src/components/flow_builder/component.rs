//! Leptos component composing the palette, canvas, node list, and inspector.
//!
//! The [`EditorSession`] lives in a local `StoredValue` next to the canvas
//! surface. DOM handlers translate browser events into [`CanvasEvent`]s or
//! session calls, then push a fresh snapshot into a few signals that the
//! panels render from. The canvas itself is redrawn directly after each event.

use std::cell::{Cell, RefCell};

use leptos::prelude::*;
use log::{debug, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, Element, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent,
};

use super::render::{self, Frame};
use super::storage::BrowserStore;
use super::theme::Theme;
use crate::flow::layout::LayoutParams;
use crate::flow::{
	CanvasEvent, EditorSession, FlowError, FlowNode, FlowStore, NodeBody, NodePatch, NodeType,
	StoreError, describe,
};

/// Message shown in the editor's status bar.
#[derive(Clone, Debug, PartialEq)]
enum Status {
	Info(String),
	Error(String),
}

/// Signals the panels render from.
#[derive(Clone, Copy)]
struct ViewSignals {
	nodes: RwSignal<Vec<FlowNode>>,
	selected: RwSignal<Option<String>>,
	/// Bumped whenever the inspector must rebuild its inputs.
	inspector_rev: RwSignal<u64>,
	status: RwSignal<Option<Status>>,
	dirty: RwSignal<bool>,
	saving: RwSignal<bool>,
	can_undo: RwSignal<bool>,
	can_redo: RwSignal<bool>,
}

impl ViewSignals {
	fn new() -> Self {
		Self {
			nodes: RwSignal::new(Vec::new()),
			selected: RwSignal::new(None),
			inspector_rev: RwSignal::new(0),
			status: RwSignal::new(None),
			dirty: RwSignal::new(false),
			saving: RwSignal::new(false),
			can_undo: RwSignal::new(false),
			can_redo: RwSignal::new(false),
		}
	}
}

/// Canvas element plus its 2D context, set once the element is mounted.
struct Surface {
	canvas: HtmlCanvasElement,
	ctx: CanvasRenderingContext2d,
}

/// Editor state owned by one mounted `FlowBuilder`.
struct Editor {
	session: RefCell<EditorSession>,
	surface: RefCell<Option<Surface>>,
	theme: Theme,
	store: BrowserStore,
	view: ViewSignals,
	synced_revision: Cell<u64>,
}

impl Editor {
	/// Feed a pointer event to the session.
	fn dispatch(&self, event: CanvasEvent) {
		if let Err(err) = self.session.borrow_mut().handle(event) {
			debug!("flow-builder: gesture dropped: {}", err);
		}
		self.sync(true);
		self.redraw();
	}

	/// Run a toolbar or inspector action against the session.
	fn run<T>(&self, refresh_inspector: bool, action: impl FnOnce(&mut EditorSession) -> Result<T, FlowError>) {
		if let Err(err) = action(&mut self.session.borrow_mut()) {
			warn!("flow-builder: action rejected: {}", err);
		}
		self.sync(refresh_inspector);
		self.redraw();
	}

	fn sync(&self, refresh_inspector: bool) {
		let session = self.session.borrow();
		let view = self.view;

		let selected = session.selected_id().map(str::to_string);
		let selection_changed = view.selected.with_untracked(|s| *s != selected);
		if selection_changed {
			view.selected.set(selected);
		}

		let revision = session.revision();
		let revised = revision != self.synced_revision.get();
		if revised {
			self.synced_revision.set(revision);
			view.nodes.set(session.graph().list_nodes());
			view.dirty.set(session.is_dirty());
			view.can_undo.set(session.can_undo());
			view.can_redo.set(session.can_redo());
		}

		if selection_changed || (revised && refresh_inspector) {
			view.inspector_rev.update(|r| *r += 1);
		}
	}

	fn redraw(&self) {
		let surface = self.surface.borrow();
		let Some(surface) = surface.as_ref() else {
			return;
		};
		let session = self.session.borrow();
		let frame = Frame {
			graph: session.graph(),
			canvas: session.canvas(),
			config: session.config(),
			selected: session.selected_id(),
		};
		render::render(&frame, &surface.ctx, &self.theme);
	}

	/// Pointer position relative to the canvas element.
	fn canvas_point(&self, ev: &MouseEvent) -> Option<(f64, f64)> {
		let surface = self.surface.borrow();
		let rect = surface.as_ref()?.canvas.get_bounding_client_rect();
		Some((
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		))
	}

	fn resize(&self, width: f64, height: f64) {
		if let Some(surface) = self.surface.borrow().as_ref() {
			surface.canvas.set_width(width as u32);
			surface.canvas.set_height(height as u32);
		}
		self.dispatch(CanvasEvent::Resize { width, height });
	}
}

fn parent_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
	canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.filter(|(w, h)| *w > 0.0 && *h > 0.0)
		.unwrap_or((800.0, 600.0))
}

fn set_status(view: ViewSignals, status: Status) {
	view.status.set(Some(status));
}

/// Visual editor for one template's conversation flow.
///
/// Nodes are created by dragging palette items onto the canvas and moved by
/// dragging them. Shift-drag from one node to another connects them; drag the
/// background to pan and use the wheel to zoom. The inspector edits the
/// selected node in place. Save writes the node set to the template store;
/// a failed save keeps every local edit so it can be retried.
#[component]
pub fn FlowBuilder(
	/// Template whose flow is edited.
	#[prop(into)]
	template_id: String,
	/// Canvas colors; the light preset when omitted.
	#[prop(optional)]
	theme: Option<Theme>,
	/// Invoked with the full node list after every change.
	#[prop(optional)]
	on_change: Option<Callback<Vec<FlowNode>>>,
	/// Invoked with the id of a node selected on the canvas.
	#[prop(optional)]
	on_node_select: Option<Callback<String>>,
	/// Invoked with the id of a deleted node.
	#[prop(optional)]
	on_node_delete: Option<Callback<String>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let view = ViewSignals::new();

	let mut session = EditorSession::new(template_id.clone(), js_sys::Date::now() as u64);
	if let Some(cb) = on_change {
		session.on_subflows_update(move |nodes| cb.run(nodes.to_vec()));
	}
	if let Some(cb) = on_node_select {
		session.on_node_select(move |id| cb.run(id.to_string()));
	}
	if let Some(cb) = on_node_delete {
		session.on_node_delete(move |id| cb.run(id.to_string()));
	}

	let editor = StoredValue::new_local(Editor {
		session: RefCell::new(session),
		surface: RefCell::new(None),
		theme: theme.unwrap_or_default(),
		store: BrowserStore::default(),
		view,
		synced_revision: Cell::new(u64::MAX),
	});

	// Initial load from the template store.
	{
		let store = editor.with_value(|ed| ed.store.clone());
		let template_id = template_id.clone();
		wasm_bindgen_futures::spawn_local(async move {
			let result = store.load_flow_nodes(&template_id).await;
			editor.try_with_value(|ed| {
				match result {
					Ok(nodes) => {
						let count = nodes.len();
						match ed.session.borrow_mut().load_nodes(nodes) {
							Ok(()) => info!("flow-builder: loaded {} nodes for {}", count, template_id),
							Err(err) => {
								warn!("flow-builder: stored flow is inconsistent: {}", err);
								set_status(ed.view, Status::Error(format!("Could not open flow: {}", err)));
							}
						}
					}
					Err(err) => {
						warn!("flow-builder: loading {} failed: {}", template_id, err);
						set_status(ed.view, Status::Error(format!("Could not load flow: {}", err)));
					}
				}
				ed.sync(true);
				ed.redraw();
			});
		});
	}

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			warn!("flow-builder: 2d canvas context unavailable");
			return;
		};

		let on_resize: Closure<dyn FnMut()> = Closure::new(move || {
			editor.try_with_value(|ed| {
				let size = ed.surface.borrow().as_ref().map(|s| parent_size(&s.canvas));
				if let Some((w, h)) = size {
					ed.resize(w, h);
				}
			});
		});
		if let Some(window) = web_sys::window() {
			let _ = window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref());
		}
		// Outlives the component; it is a no-op once the editor is disposed.
		on_resize.forget();

		let (w, h) = parent_size(&canvas);
		editor.with_value(|ed| {
			*ed.surface.borrow_mut() = Some(Surface { canvas, ctx });
			ed.resize(w, h);
		});
	});

	// Canvas gestures. Moves and releases are tracked on the whole editor so
	// palette drags can travel from the sidebar onto the canvas.
	let on_canvas_mousedown = move |ev: MouseEvent| {
		if ev.button() != 0 {
			return;
		}
		editor.with_value(|ed| {
			if let Some((x, y)) = ed.canvas_point(&ev) {
				ed.dispatch(CanvasEvent::PointerDown {
					x,
					y,
					link: ev.shift_key(),
				});
			}
		});
	};

	let on_mousemove = move |ev: MouseEvent| {
		editor.with_value(|ed| {
			if ed.session.borrow().canvas().is_idle() {
				return;
			}
			if let Some((x, y)) = ed.canvas_point(&ev) {
				ed.dispatch(CanvasEvent::PointerMove { x, y });
			}
		});
	};

	let on_mouseup = move |ev: MouseEvent| {
		editor.with_value(|ed| {
			if ed.session.borrow().canvas().is_idle() {
				return;
			}
			if let Some((x, y)) = ed.canvas_point(&ev) {
				ed.dispatch(CanvasEvent::PointerUp { x, y });
			}
		});
	};

	let on_mouseleave = move |_: MouseEvent| {
		editor.with_value(|ed| {
			if !ed.session.borrow().canvas().is_idle() {
				ed.dispatch(CanvasEvent::PointerCancel);
			}
		});
	};

	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		editor.with_value(|ed| {
			if let Some((x, y)) = ed.canvas_point(&ev) {
				ed.dispatch(CanvasEvent::Wheel {
					x,
					y,
					delta_y: ev.delta_y(),
				});
			}
		});
	};

	let on_keydown = move |ev: KeyboardEvent| {
		let command = ev.ctrl_key() || ev.meta_key();
		editor.with_value(|ed| match ev.key().as_str() {
			"Delete" | "Backspace" => ed.run(true, |s| s.delete_selected()),
			"Escape" => ed.dispatch(CanvasEvent::PointerCancel),
			"z" if command && ev.shift_key() => ed.run(true, |s| s.redo()),
			"z" if command => ed.run(true, |s| s.undo()),
			"y" if command => ed.run(true, |s| s.redo()),
			_ => {}
		});
	};

	// Toolbar.
	let on_save = move |_: MouseEvent| {
		let Some((request, store)) = editor.try_with_value(|ed| (ed.session.borrow().begin_save(), ed.store.clone())) else {
			return;
		};
		view.saving.set(true);
		set_status(view, Status::Info("Saving…".into()));
		wasm_bindgen_futures::spawn_local(async move {
			let result: Result<(), StoreError> = store
				.save_flow_nodes(&request.template_id, &request.nodes)
				.await;
			editor.try_with_value(|ed| {
				let outcome = ed.session.borrow_mut().finish_save(request.revision, result);
				ed.view.saving.set(false);
				match outcome {
					Ok(()) => set_status(ed.view, Status::Info("Flow saved".into())),
					Err(err) => set_status(ed.view, Status::Error(format!("Save failed: {}. Your changes are kept; try again.", err))),
				}
				ed.view.dirty.set(ed.session.borrow().is_dirty());
			});
		});
	};

	let palette = NodeType::ALL
		.into_iter()
		.map(|kind| {
			let style = describe(kind);
			let on_palette_down = move |ev: MouseEvent| {
				if ev.button() != 0 {
					return;
				}
				ev.prevent_default();
				let (grab_x, grab_y) = ev
					.current_target()
					.and_then(|t| t.dyn_into::<Element>().ok())
					.map(|el| {
						let r = el.get_bounding_client_rect();
						(ev.client_x() as f64 - r.left(), ev.client_y() as f64 - r.top())
					})
					.unwrap_or((0.0, 0.0));
				editor.with_value(|ed| {
					if let Some((x, y)) = ed.canvas_point(&ev) {
						ed.dispatch(CanvasEvent::PaletteDown {
							kind,
							x,
							y,
							grab_x,
							grab_y,
						});
					}
				});
			};
			view! {
				<div class=format!("palette-item {}", style.style_class) on:mousedown=on_palette_down>
					<span class="palette-icon">{style.icon}</span>
					<span class="palette-label">{style.label}</span>
				</div>
			}
		})
		.collect_view();

	let node_list = move || {
		view.nodes
			.get()
			.into_iter()
			.map(|node| {
				let id = node.id.clone();
				let is_selected = {
					let id = id.clone();
					move || view.selected.get().as_deref() == Some(id.as_str())
				};
				let style = describe(node.node_type());
				view! {
					<li
						class="node-list-item"
						class:selected=is_selected
						on:click=move |_| {
							let id = id.clone();
							editor.with_value(|ed| ed.run(false, |s| s.select(&id)));
						}
					>
						<span class="node-list-icon">{style.icon}</span>
						<span class="node-list-title">{node.title.clone()}</span>
					</li>
				}
			})
			.collect_view()
	};

	view! {
		<div
			class="flow-builder"
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
		>
			<div class="flow-toolbar">
				<button on:click=on_save disabled=move || view.saving.get()>
					{move || if view.saving.get() { "Saving…" } else { "Save" }}
				</button>
				<button
					on:click=move |_| editor.with_value(|ed| ed.run(true, |s| s.undo()))
					disabled=move || !view.can_undo.get()
				>
					"Undo"
				</button>
				<button
					on:click=move |_| editor.with_value(|ed| ed.run(true, |s| s.redo()))
					disabled=move || !view.can_redo.get()
				>
					"Redo"
				</button>
				<button on:click=move |_| {
					editor.with_value(|ed| ed.run(true, |s| s.arrange(&LayoutParams::default())))
				}>"Arrange"</button>
				<button
					on:click=move |_| editor.with_value(|ed| ed.run(true, |s| s.delete_selected()))
					disabled=move || view.selected.get().is_none()
				>
					"Delete node"
				</button>
				<span class="flow-dirty">{move || if view.dirty.get() { "Unsaved changes" } else { "" }}</span>
				{move || {
					view.status
						.get()
						.map(|status| match status {
							Status::Info(text) => view! { <span class="flow-status">{text}</span> }.into_any(),
							Status::Error(text) => {
								view! { <span class="flow-status flow-status-error">{text}</span> }.into_any()
							}
						})
				}}
			</div>
			<div class="flow-body">
				<aside class="flow-palette">
					<h3>"Nodes"</h3>
					{palette}
					<h3>"In this flow"</h3>
					<ul class="node-list">{node_list}</ul>
				</aside>
				<div class="flow-canvas-wrap">
					<canvas
						node_ref=canvas_ref
						class="flow-canvas"
						tabindex="0"
						on:mousedown=on_canvas_mousedown
						on:wheel=on_wheel
						on:keydown=on_keydown
						style="display: block; cursor: default;"
					/>
				</div>
				<Inspector editor=editor view=view />
			</div>
		</div>
	}
}

/// Property panel for the selected node. Edits apply to the model immediately.
#[component]
fn Inspector(editor: StoredValue<Editor, LocalStorage>, view: ViewSignals) -> impl IntoView {
	let edit = move |patch: NodePatch, refresh: bool| {
		editor.with_value(|ed| ed.run(refresh, |s| s.edit_selected(patch)));
	};

	move || {
		view.inspector_rev.track();
		let Some(node) = view
			.selected
			.get()
			.and_then(|_| editor.try_with_value(|ed| ed.session.borrow().current_selection().cloned()))
			.flatten()
		else {
			return view! {
				<aside class="flow-inspector">
					<p class="inspector-empty">"Select a node to edit it."</p>
				</aside>
			}
			.into_any();
		};

		let kind = node.node_type();
		let type_options = NodeType::ALL
			.into_iter()
			.map(|k| view! { <option value=k.as_str() selected={k == kind}>{describe(k).label}</option> })
			.collect_view();

		let body_fields = match node.body.clone() {
			NodeBody::Message => ().into_any(),
			NodeBody::Question { options } => view! {
				<label>
					"Options (one per line)"
					<textarea
						prop:value=options.join("\n")
						on:input=move |ev| {
							let options = event_target_value(&ev)
								.lines()
								.map(str::trim)
								.filter(|l| !l.is_empty())
								.map(str::to_string)
								.collect();
							edit(NodePatch::body(NodeBody::Question { options }), false);
						}
					></textarea>
				</label>
			}
			.into_any(),
			NodeBody::Condition { expression } => view! {
				<label>
					"Condition"
					<input
						type="text"
						prop:value=expression
						on:input=move |ev| {
							edit(NodePatch::body(NodeBody::Condition { expression: event_target_value(&ev) }), false)
						}
					/>
				</label>
			}
			.into_any(),
			NodeBody::Action { action } => view! {
				<label>
					"Action"
					<input
						type="text"
						prop:value=action
						on:input=move |ev| {
							edit(NodePatch::body(NodeBody::Action { action: event_target_value(&ev) }), false)
						}
					/>
				</label>
			}
			.into_any(),
		};

		let others: Vec<FlowNode> = view.nodes.with_untracked(|nodes| {
			nodes
				.iter()
				.filter(|n| n.id != node.id && !node.connections.contains(&n.id))
				.cloned()
				.collect()
		});
		let from_id = node.id.clone();
		let connections = node
			.connections
			.iter()
			.map(|target| {
				let label = view.nodes.with_untracked(|nodes| {
					nodes
						.iter()
						.find(|n| n.id == *target)
						.map(|n| n.title.clone())
						.unwrap_or_else(|| target.clone())
				});
				let (from, to) = (from_id.clone(), target.clone());
				view! {
					<li>
						<span>{label}</span>
						<button on:click=move |_| {
							let (from, to) = (from.clone(), to.clone());
							editor.with_value(|ed| ed.run(true, |s| s.disconnect(&from, &to)));
						}>"×"</button>
					</li>
				}
			})
			.collect_view();
		let connect_from = node.id.clone();

		view! {
			<aside class="flow-inspector">
				<h3>{describe(kind).icon}" "{describe(kind).label}</h3>
				<label>
					"Type"
					<select on:change=move |ev| {
						if let Ok(kind) = event_target_value(&ev).parse::<NodeType>() {
							edit(NodePatch::body(NodeBody::empty(kind)), true);
						}
					}>{type_options}</select>
				</label>
				<label>
					"Title"
					<input
						type="text"
						prop:value=node.title.clone()
						on:input=move |ev| edit(NodePatch::title(event_target_value(&ev)), false)
					/>
				</label>
				<label>
					"Content"
					<textarea
						prop:value=node.content.clone().unwrap_or_default()
						on:input=move |ev| {
							let text = event_target_value(&ev);
							let content = (!text.is_empty()).then_some(text);
							edit(NodePatch::content(content), false);
						}
					></textarea>
				</label>
				{body_fields}
				<h4>"Goes to"</h4>
				<ul class="inspector-connections">{connections}</ul>
				<select on:change=move |ev| {
					let to = event_target_value(&ev);
					if !to.is_empty() {
						let from = connect_from.clone();
						editor.with_value(|ed| ed.run(true, |s| s.connect(&from, &to)));
					}
				}>
					<option value="" selected=true>"Connect to…"</option>
					{others
						.into_iter()
						.map(|n| view! { <option value=n.id.clone()>{n.title.clone()}</option> })
						.collect_view()}
				</select>
			</aside>
		}
		.into_any()
	}
}
