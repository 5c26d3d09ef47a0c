//! End-to-end editing scenarios against the public API.

use flow_builder::flow::{CanvasConfig, CanvasEvent, EditorSession, FlowError, FlowGraph, FlowNode, NodePatch, NodeType, Position};
use pretty_assertions::assert_eq;

fn message(id: &str, x: f64, y: f64) -> FlowNode {
	FlowNode::new(id, NodeType::Message, "Saudação", Position::new(x, y))
}

#[test]
fn add_duplicate_move_remove() {
	let mut flow = FlowGraph::new();
	flow.add_node(message("n1", 100.0, 100.0)).unwrap();

	let before = flow.clone();
	assert_eq!(
		flow.add_node(message("n1", 300.0, 300.0)),
		Err(FlowError::DuplicateId("n1".into()))
	);
	assert_eq!(flow, before);

	flow.update_node("n1", NodePatch::position(Position::new(150.0, 120.0)))
		.unwrap();
	assert_eq!(flow.get_node("n1").unwrap().position, Position::new(150.0, 120.0));

	flow.remove_node("n1").unwrap();
	assert!(flow.list_nodes().is_empty());
}

#[test]
fn removing_a_target_cleans_up_connections() {
	let mut flow = FlowGraph::new();
	flow.add_node(message("n1", 0.0, 0.0)).unwrap();
	flow.add_node(message("n2", 0.0, 200.0)).unwrap();

	flow.connect("n1", "n2").unwrap();
	assert_eq!(flow.get_node("n1").unwrap().connections, vec!["n2".to_string()]);

	flow.remove_node("n2").unwrap();
	assert!(flow.get_node("n1").unwrap().connections.is_empty());
	flow.validate().unwrap();
}

#[test]
fn dragging_a_node_moves_it_by_the_pointer_delta() {
	let mut session = EditorSession::new("t", 1);
	session.add_node(message("n1", 100.0, 100.0)).unwrap();
	session.add_node(message("n2", 400.0, 100.0)).unwrap();

	session
		.handle(CanvasEvent::PointerDown { x: 110.0, y: 110.0, link: false })
		.unwrap();
	session.handle(CanvasEvent::PointerMove { x: 140.0, y: 125.0 }).unwrap();
	session.handle(CanvasEvent::PointerUp { x: 160.0, y: 130.0 }).unwrap();

	assert_eq!(session.graph().get_node("n1").unwrap().position, Position::new(150.0, 120.0));
	assert_eq!(session.graph().get_node("n2").unwrap().position, Position::new(400.0, 100.0));
	assert_eq!(session.selected_id(), Some("n1"));
}

#[test]
fn deleting_the_selected_node_clears_the_inspector() {
	let mut session = EditorSession::new("t", 1);
	session.add_node(message("n1", 0.0, 0.0)).unwrap();
	session.select("n1").unwrap();
	assert!(session.current_selection().is_some());

	session.remove_node("n1").unwrap();
	assert!(session.current_selection().is_none());
}

#[test]
fn a_flow_built_through_the_api_survives_serialization() {
	let mut flow = FlowGraph::new();
	flow.add_node(message("a", 0.0, 0.0).with_content("Olá!")).unwrap();
	flow.add_node(FlowNode::from_palette("b", NodeType::Question, Position::new(250.0, 0.0)))
		.unwrap();
	flow.add_node(FlowNode::from_palette("c", NodeType::Condition, Position::new(500.0, 0.0)))
		.unwrap();
	flow.add_node(FlowNode::from_palette("d", NodeType::Action, Position::new(500.0, 200.0)))
		.unwrap();
	flow.connect("a", "c").unwrap();
	flow.connect("a", "b").unwrap();
	flow.connect("b", "d").unwrap();

	let json = serde_json::to_string(&flow.list_nodes()).unwrap();
	let decoded: Vec<FlowNode> = serde_json::from_str(&json).unwrap();
	let restored = FlowGraph::from_nodes(decoded).unwrap();

	assert_eq!(restored, flow);
	assert_eq!(
		restored.get_node("a").unwrap().connections,
		vec!["c".to_string(), "b".to_string()]
	);
}

#[test]
fn palette_drop_then_undo_and_redo() {
	let mut session = EditorSession::new("t", 9);
	session
		.handle(CanvasEvent::PaletteDown {
			kind: NodeType::Action,
			x: -150.0,
			y: 40.0,
			grab_x: 20.0,
			grab_y: 10.0,
		})
		.unwrap();
	session.handle(CanvasEvent::PointerMove { x: 220.0, y: 210.0 }).unwrap();
	session.handle(CanvasEvent::PointerUp { x: 220.0, y: 210.0 }).unwrap();

	let nodes = session.graph().list_nodes();
	assert_eq!(nodes.len(), 1);
	assert_eq!(nodes[0].node_type(), NodeType::Action);
	assert_eq!(nodes[0].position, Position::new(200.0, 200.0));

	assert!(session.undo().unwrap());
	assert!(session.graph().is_empty());
	assert!(session.selected_id().is_none());

	assert!(session.redo().unwrap());
	assert_eq!(session.graph().list_nodes(), nodes);
}

#[test]
fn hit_testing_follows_the_configured_node_size() {
	let config = CanvasConfig {
		node_width: 50.0,
		node_height: 20.0,
		..CanvasConfig::default()
	};
	let mut session = EditorSession::new("t", 1).with_config(config);
	session.add_node(message("n1", 0.0, 0.0)).unwrap();

	// Inside the default 200x80 footprint but outside the configured one.
	session
		.handle(CanvasEvent::PointerDown { x: 120.0, y: 40.0, link: false })
		.unwrap();
	session.handle(CanvasEvent::PointerUp { x: 120.0, y: 40.0 }).unwrap();
	assert_eq!(session.selected_id(), None);

	session
		.handle(CanvasEvent::PointerDown { x: 40.0, y: 10.0, link: false })
		.unwrap();
	session.handle(CanvasEvent::PointerUp { x: 40.0, y: 10.0 }).unwrap();
	assert_eq!(session.selected_id(), Some("n1"));
}
