//! Force-directed auto-arrange for a flow.
//!
//! Runs the `force_graph` simulation seeded from the current node positions,
//! with every connection acting as a spring, and reports where each node
//! settles. The result is shifted so the layout keeps its original top-left
//! corner and stays where the user was looking.

use std::f64::consts::PI;

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::graph::FlowGraph;
use super::node::Position;

/// Simulation tuning for [`arrange`].
#[derive(Clone, Debug)]
pub struct LayoutParams {
	/// Repulsion between nodes.
	pub force_charge: f32,
	/// Spring strength along connections.
	pub force_spring: f32,
	/// Cap on the force applied per tick.
	pub force_max: f32,
	/// Cap on node velocity.
	pub node_speed: f32,
	/// Velocity kept per tick.
	pub damping_factor: f32,
	/// Number of fixed-step simulation ticks.
	pub ticks: usize,
	/// Seconds per tick.
	pub dt: f32,
}

impl Default for LayoutParams {
	fn default() -> Self {
		Self {
			force_charge: 2500.0,
			force_spring: 0.05,
			force_max: 200.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
			ticks: 300,
			dt: 0.016,
		}
	}
}

/// Compute settled positions for every node, in graph order.
pub fn arrange(graph: &FlowGraph, params: &LayoutParams) -> Vec<(String, Position)> {
	if graph.is_empty() {
		return Vec::new();
	}

	let mut sim: ForceGraph<String, ()> = ForceGraph::new(SimulationParameters {
		force_charge: params.force_charge,
		force_spring: params.force_spring,
		force_max: params.force_max,
		node_speed: params.node_speed,
		damping_factor: params.damping_factor,
	});

	let mut seen: Vec<Position> = Vec::with_capacity(graph.len());
	let mut indices = Vec::with_capacity(graph.len());
	for (i, node) in graph.iter().enumerate() {
		// Coincident nodes have no repulsion direction; spread them on a small circle.
		let mut p = node.position;
		if seen.contains(&p) {
			let angle = (i as f64) * 2.0 * PI / graph.len() as f64;
			p = p.offset(40.0 * angle.cos(), 40.0 * angle.sin());
		}
		seen.push(node.position);

		let idx = sim.add_node(NodeData {
			x: p.x as f32,
			y: p.y as f32,
			mass: 10.0,
			is_anchor: false,
			user_data: node.id.clone(),
		});
		indices.push((node.id.as_str(), idx));
	}

	for node in graph.iter() {
		let Some(&(_, src)) = indices.iter().find(|(id, _)| *id == node.id) else {
			continue;
		};
		for target in &node.connections {
			if let Some(&(_, tgt)) = indices.iter().find(|(id, _)| id == target) {
				sim.add_edge(src, tgt, EdgeData::default());
			}
		}
	}

	for _ in 0..params.ticks {
		sim.update(params.dt);
	}

	let mut settled: Vec<(String, Position)> = Vec::with_capacity(graph.len());
	sim.visit_nodes(|node| {
		settled.push((
			node.data.user_data.clone(),
			Position::new(node.x() as f64, node.y() as f64),
		));
	});

	let finite = settled
		.iter()
		.all(|(_, p)| p.x.is_finite() && p.y.is_finite());
	if !finite {
		return graph.iter().map(|n| (n.id.clone(), n.position)).collect();
	}

	let (old_x, old_y) = top_left(graph.iter().map(|n| n.position));
	let (new_x, new_y) = top_left(settled.iter().map(|(_, p)| *p));
	graph
		.iter()
		.filter_map(|node| {
			let (_, p) = settled.iter().find(|(id, _)| *id == node.id)?;
			Some((
				node.id.clone(),
				Position::new(p.x - new_x + old_x, p.y - new_y + old_y),
			))
		})
		.collect()
}

fn top_left(points: impl Iterator<Item = Position>) -> (f64, f64) {
	points.fold((f64::INFINITY, f64::INFINITY), |(x, y), p| {
		(x.min(p.x), y.min(p.y))
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::flow::node::FlowNode;
	use crate::flow::registry::NodeType;

	fn graph(nodes: &[(&str, f64, f64)]) -> FlowGraph {
		let mut g = FlowGraph::new();
		for (id, x, y) in nodes {
			g.add_node(FlowNode::new(*id, NodeType::Message, *id, Position::new(*x, *y)))
				.unwrap();
		}
		g
	}

	#[test]
	fn empty_graph_has_no_positions() {
		assert!(arrange(&FlowGraph::new(), &LayoutParams::default()).is_empty());
	}

	#[test]
	fn single_node_stays_put() {
		let g = graph(&[("only", 120.0, 80.0)]);
		let out = arrange(&g, &LayoutParams::default());
		assert_eq!(out, vec![("only".to_string(), Position::new(120.0, 80.0))]);
	}

	#[test]
	fn every_node_gets_a_finite_position_in_graph_order() {
		let mut g = graph(&[("a", 0.0, 0.0), ("b", 0.0, 0.0), ("c", 10.0, 5.0)]);
		g.connect("a", "b").unwrap();
		g.connect("b", "c").unwrap();

		let out = arrange(&g, &LayoutParams::default());
		let ids: Vec<_> = out.iter().map(|(id, _)| id.as_str()).collect();
		assert_eq!(ids, vec!["a", "b", "c"]);
		assert!(out.iter().all(|(_, p)| p.x.is_finite() && p.y.is_finite()));

		let min_x = out.iter().map(|(_, p)| p.x).fold(f64::INFINITY, f64::min);
		let min_y = out.iter().map(|(_, p)| p.y).fold(f64::INFINITY, f64::min);
		assert!(min_x.abs() < 1e-6);
		assert!(min_y.abs() < 1e-6);
	}
}
