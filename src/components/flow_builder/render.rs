//! Canvas renderer for the flow editor.
//!
//! Rendering uses multiple passes for correct z-ordering:
//! 1. Background and grid
//! 2. Connections, then the pending link while one is being drawn
//! 3. Nodes in graph order (later nodes on top), selection ring, drag ghost

use web_sys::CanvasRenderingContext2d;

use super::theme::Theme;
use crate::flow::interaction::{CanvasConfig, CanvasState, DragSource};
use crate::flow::{FlowGraph, NodeType, Position, describe};

/// Everything needed to draw one frame.
pub struct Frame<'a> {
	/// Model to draw.
	pub graph: &'a FlowGraph,
	/// Gesture and view state.
	pub canvas: &'a CanvasState,
	/// Node geometry.
	pub config: &'a CanvasConfig,
	/// Node drawn with a selection ring.
	pub selected: Option<&'a str>,
}

const TITLE_FONT: &str = "600 14px sans-serif";
const BODY_FONT: &str = "12px sans-serif";
const PADDING: f64 = 12.0;

/// Renders the complete flow to the canvas.
pub fn render(frame: &Frame<'_>, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let view = frame.canvas.transform;
	let viewport = frame.canvas.viewport;

	ctx.set_fill_style_str(&theme.background.color.to_css());
	ctx.fill_rect(0.0, 0.0, viewport.width, viewport.height);

	ctx.save();
	let _ = ctx.translate(view.x, view.y);
	let _ = ctx.scale(view.k, view.k);

	draw_grid(frame, ctx, theme);
	draw_edges(frame, ctx, theme);
	draw_pending_link(frame, ctx, theme);

	for node in frame.graph.iter() {
		draw_node(
			ctx,
			node.node_type(),
			node.position,
			&node.title,
			node.content.as_deref(),
			frame.config,
			theme,
			1.0,
		);
		if frame.selected == Some(node.id.as_str()) {
			draw_selection_ring(ctx, node.position, frame.config, theme);
		}
	}

	draw_ghost(frame, ctx, theme);

	ctx.restore();
}

fn draw_grid(frame: &Frame<'_>, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let spacing = theme.background.grid_spacing;
	if spacing <= 0.0 {
		return;
	}
	let view = frame.canvas.transform;
	let viewport = frame.canvas.viewport;
	let top_left = view.screen_to_canvas(0.0, 0.0);
	let bottom_right = view.screen_to_canvas(viewport.width, viewport.height);

	ctx.set_stroke_style_str(&theme.background.grid_color.to_css());
	ctx.set_line_width(1.0 / view.k);
	ctx.begin_path();
	let mut x = (top_left.x / spacing).floor() * spacing;
	while x <= bottom_right.x {
		ctx.move_to(x, top_left.y);
		ctx.line_to(x, bottom_right.y);
		x += spacing;
	}
	let mut y = (top_left.y / spacing).floor() * spacing;
	while y <= bottom_right.y {
		ctx.move_to(top_left.x, y);
		ctx.line_to(bottom_right.x, y);
		y += spacing;
	}
	ctx.stroke();
}

fn draw_edges(frame: &Frame<'_>, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let style = &theme.edge;
	ctx.set_stroke_style_str(&style.color.to_css());
	ctx.set_fill_style_str(&style.color.to_css());
	ctx.set_line_width(style.line_width / frame.canvas.transform.k);

	for node in frame.graph.iter() {
		for target in &node.connections {
			let Some(target) = frame.graph.get_node(target) else {
				continue;
			};
			let (start, end) = edge_anchors(node.position, target.position, frame.config);
			draw_curve(ctx, start, end, style.curve_tension);
			draw_arrow_head(ctx, end, style.arrow_size);
		}
	}
}

fn draw_pending_link(frame: &Frame<'_>, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let Some(session) = frame.canvas.drag() else {
		return;
	};
	let DragSource::Link(from) = &session.source else {
		return;
	};
	let Some(source) = frame.graph.get_node(from) else {
		return;
	};
	let start = (
		source.position.x + frame.config.node_width,
		source.position.y + frame.config.node_height / 2.0,
	);
	let end = (session.pointer.x, session.pointer.y);

	ctx.set_stroke_style_str(&theme.edge.pending_color.to_css());
	ctx.set_line_width(theme.edge.line_width / frame.canvas.transform.k);
	draw_curve(ctx, start, end, theme.edge.curve_tension);
}

fn draw_ghost(frame: &Frame<'_>, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let Some(session) = frame.canvas.drag() else {
		return;
	};
	let at = session.preview();
	match &session.source {
		DragSource::Palette(kind) => {
			let style = describe(*kind);
			draw_node(
				ctx,
				*kind,
				at,
				style.default_title,
				style.default_content,
				frame.config,
				theme,
				theme.node.ghost_alpha,
			);
		}
		DragSource::Node(id) => {
			if let Some(node) = frame.graph.get_node(id) {
				draw_node(
					ctx,
					node.node_type(),
					at,
					&node.title,
					node.content.as_deref(),
					frame.config,
					theme,
					theme.node.ghost_alpha,
				);
			}
		}
		DragSource::Link(_) => {}
	}
}

#[allow(clippy::too_many_arguments)]
fn draw_node(
	ctx: &CanvasRenderingContext2d,
	kind: NodeType,
	at: Position,
	title: &str,
	content: Option<&str>,
	config: &CanvasConfig,
	theme: &Theme,
	alpha: f64,
) {
	let style = describe(kind);
	let fill = theme.node.fill(kind);

	ctx.set_global_alpha(alpha);
	rounded_rect(ctx, at, config.node_width, config.node_height, theme.node.corner_radius);
	ctx.set_fill_style_str(&fill.to_css());
	ctx.fill();
	ctx.set_stroke_style_str(&fill.lighten(0.3).to_css());
	ctx.set_line_width(1.0);
	ctx.stroke();

	let max_chars = ((config.node_width - 2.0 * PADDING) / 7.5).max(4.0) as usize;
	ctx.set_text_baseline("top");
	ctx.set_fill_style_str(&theme.node.text.to_css());
	ctx.set_font(TITLE_FONT);
	let heading = format!("{} {}", style.icon, title);
	let _ = ctx.fill_text(&ellipsize(&heading, max_chars), at.x + PADDING, at.y + PADDING);

	ctx.set_fill_style_str(&theme.node.muted_text.to_css());
	ctx.set_font(BODY_FONT);
	let body = content.unwrap_or(style.label);
	let _ = ctx.fill_text(&ellipsize(body, max_chars + 4), at.x + PADDING, at.y + PADDING + 24.0);

	ctx.set_global_alpha(1.0);
}

fn draw_selection_ring(ctx: &CanvasRenderingContext2d, at: Position, config: &CanvasConfig, theme: &Theme) {
	let gap = 4.0;
	rounded_rect(
		ctx,
		at.offset(-gap, -gap),
		config.node_width + 2.0 * gap,
		config.node_height + 2.0 * gap,
		theme.node.corner_radius + gap,
	);
	ctx.set_stroke_style_str(&theme.node.selection_ring.to_css());
	ctx.set_line_width(2.0);
	ctx.stroke();
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, at: Position, w: f64, h: f64, r: f64) {
	let r = r.min(w / 2.0).min(h / 2.0);
	let (x, y) = (at.x, at.y);
	ctx.begin_path();
	ctx.move_to(x + r, y);
	let _ = ctx.arc_to(x + w, y, x + w, y + h, r);
	let _ = ctx.arc_to(x + w, y + h, x, y + h, r);
	let _ = ctx.arc_to(x, y + h, x, y, r);
	let _ = ctx.arc_to(x, y, x + w, y, r);
	ctx.close_path();
}

fn draw_curve(ctx: &CanvasRenderingContext2d, start: (f64, f64), end: (f64, f64), tension: f64) {
	let reach = ((end.0 - start.0).abs() * tension).max(40.0 * tension);
	ctx.begin_path();
	ctx.move_to(start.0, start.1);
	ctx.bezier_curve_to(start.0 + reach, start.1, end.0 - reach, end.1, end.0, end.1);
	ctx.stroke();
}

fn draw_arrow_head(ctx: &CanvasRenderingContext2d, tip: (f64, f64), size: f64) {
	ctx.begin_path();
	ctx.move_to(tip.0, tip.1);
	ctx.line_to(tip.0 - size, tip.1 - size * 0.5);
	ctx.line_to(tip.0 - size, tip.1 + size * 0.5);
	ctx.close_path();
	ctx.fill();
}

/// Edge endpoints: right-middle of the source box to left-middle of the target box.
pub(crate) fn edge_anchors(from: Position, to: Position, config: &CanvasConfig) -> ((f64, f64), (f64, f64)) {
	(
		(from.x + config.node_width, from.y + config.node_height / 2.0),
		(to.x, to.y + config.node_height / 2.0),
	)
}

/// Shorten `text` to at most `max_chars` characters, ending in an ellipsis when cut.
pub(crate) fn ellipsize(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}
	let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
	format!("{}…", kept.trim_end())
}
