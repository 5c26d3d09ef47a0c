//! Visual theming for the flow canvas.
//!
//! Colors per node type, canvas background and grid, edge style, and the
//! selection ring.

use crate::flow::NodeType;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red.
	pub r: u8,
	/// Green.
	pub g: u8,
	/// Blue.
	pub b: u8,
	/// Opacity, 0.0 to 1.0.
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with opacity.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Same color, different opacity.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Lighten the color by a factor (0.0 = unchanged, 1.0 = white)
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 + (255.0 - self.r as f64) * f) as u8,
			g: (self.g as f64 + (255.0 - self.g as f64) * f) as u8,
			b: (self.b as f64 + (255.0 - self.b as f64) * f) as u8,
			a: self.a,
		}
	}

	/// CSS color string: hex when opaque, `rgba()` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Canvas background.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	/// Fill color.
	pub color: Color,
	/// Grid line color.
	pub grid_color: Color,
	/// Grid spacing in canvas units; 0 disables the grid.
	pub grid_spacing: f64,
}

/// Connection lines.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	/// Line and arrow color.
	pub color: Color,
	/// Color of the line that follows the pointer while linking.
	pub pending_color: Color,
	/// Line width in screen pixels.
	pub line_width: f64,
	/// Arrow size in canvas units.
	pub arrow_size: f64,
	/// Curve tension (0.0 = straight, 1.0 = very curved)
	pub curve_tension: f64,
}

/// Node boxes.
#[derive(Clone, Debug)]
pub struct NodePaint {
	/// Message node fill.
	pub message: Color,
	/// Question node fill.
	pub question: Color,
	/// Condition node fill.
	pub condition: Color,
	/// Action node fill.
	pub action: Color,
	/// Title color.
	pub text: Color,
	/// Body text color.
	pub muted_text: Color,
	/// Box corner radius in canvas units.
	pub corner_radius: f64,
	/// Ring around the selected node.
	pub selection_ring: Color,
	/// Opacity of the drag ghost.
	pub ghost_alpha: f64,
}

impl NodePaint {
	/// Fill color for a node type.
	pub fn fill(&self, kind: NodeType) -> Color {
		match kind {
			NodeType::Message => self.message,
			NodeType::Question => self.question,
			NodeType::Condition => self.condition,
			NodeType::Action => self.action,
		}
	}
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Preset name.
	pub name: &'static str,
	/// Background and grid.
	pub background: BackgroundStyle,
	/// Connections.
	pub edge: EdgeStyle,
	/// Node boxes.
	pub node: NodePaint,
}

impl Theme {
	/// Light dashboard theme (default)
	pub fn light() -> Self {
		Self {
			name: "light",
			background: BackgroundStyle {
				color: Color::rgb(248, 250, 252),
				grid_color: Color::rgba(148, 163, 184, 0.25),
				grid_spacing: 20.0,
			},
			edge: EdgeStyle {
				color: Color::rgb(100, 116, 139),
				pending_color: Color::rgba(59, 130, 246, 0.8),
				line_width: 2.0,
				arrow_size: 10.0,
				curve_tension: 0.5,
			},
			node: NodePaint {
				message: Color::rgb(59, 130, 246),
				question: Color::rgb(34, 197, 94),
				condition: Color::rgb(234, 179, 8),
				action: Color::rgb(168, 85, 247),
				text: Color::rgb(255, 255, 255),
				muted_text: Color::rgba(255, 255, 255, 0.8),
				corner_radius: 8.0,
				selection_ring: Color::rgb(15, 23, 42),
				ghost_alpha: 0.45,
			},
		}
	}

	/// Dark theme for low-light dashboards
	pub fn midnight() -> Self {
		let mut theme = Self::light();
		theme.name = "midnight";
		theme.background = BackgroundStyle {
			color: Color::rgb(18, 20, 28),
			grid_color: Color::rgb(100, 120, 150).with_alpha(0.15),
			grid_spacing: 20.0,
		};
		theme.edge.color = Color::rgb(140, 160, 180);
		theme.node.selection_ring = Color::rgb(255, 255, 255);
		theme
	}

	/// Look up a preset by its `name`.
	pub fn named(name: &str) -> Option<Self> {
		match name {
			"light" => Some(Self::light()),
			"midnight" => Some(Self::midnight()),
			_ => None,
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::light()
	}
}
