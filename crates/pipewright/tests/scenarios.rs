//! End-to-end editing scenarios
//!
//! Each test drives the orchestrator the way a host does: text in, diagram
//! events in, markup and render out.

use pipewright::prelude::*;
use proptest::prelude::*;

fn adapter(stages: &str) -> String {
    format!(
        "<Configuration>\n  <Adapter name=\"Main\">\n    <Pipeline>\n{}      <Exit path=\"Exit\" state=\"success\"/>\n    </Pipeline>\n  </Adapter>\n</Configuration>\n",
        stages
    )
}

fn edges(render: &DiagramRender) -> Vec<(String, String, String)> {
    render
        .edges
        .iter()
        .map(|e| (e.source.clone(), e.target.clone(), e.label.clone()))
        .collect()
}

fn edge(source: &str, target: &str, label: &str) -> (String, String, String) {
    (source.to_string(), target.to_string(), label.to_string())
}

#[test]
fn test_forward_to_exit_leaves_sibling_isolated() {
    let text = adapter(
        "      <EchoPipe name=\"A\">\n        <Forward name=\"success\" path=\"Exit\"/>\n      </EchoPipe>\n      <EchoPipe name=\"B\"/>\n",
    );
    let mut editor = Orchestrator::default();
    let render = editor.text_changed(&text).unwrap().clone();

    let names: Vec<&str> = render.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "Exit"]);
    assert_eq!(edges(&render), vec![edge("A", "Exit", "success")]);
}

#[test]
fn test_move_inserts_then_updates_coordinates() {
    let text = adapter("      <EchoPipe name=\"A\"/>\n      <EchoPipe name=\"B\" x=\"1\" y=\"1\"/>\n");
    let mut editor = Orchestrator::new(EditorConfig::default().with_commit_layout(false));
    editor.text_changed(&text).unwrap();

    editor
        .handle_event(DiagramEvent::Move {
            name: "A".into(),
            x: 120,
            y: 340,
        })
        .unwrap();
    assert!(editor.text().contains(r#"<EchoPipe name="A" x="120" y="340"/>"#));

    editor
        .handle_event(DiagramEvent::Move {
            name: "A".into(),
            x: 50,
            y: 60,
        })
        .unwrap();
    assert!(editor.text().contains(r#"<EchoPipe name="A" x="50" y="60"/>"#));
    assert_eq!(editor.text().matches("x=").count(), 2);
}

#[test]
fn test_implicit_edges_follow_siblings() {
    let text = adapter(
        "      <EchoPipe name=\"S1\"/>\n      <EchoPipe name=\"S2\"/>\n      <EchoPipe name=\"S3\"/>\n",
    );
    let render = pipewright::build_diagram(&text).unwrap();
    assert_eq!(
        edges(&render),
        vec![edge("S1", "S2", "success"), edge("S2", "S3", "success")]
    );
}

#[test]
fn test_rename_updates_every_reference() {
    let text = adapter(
        "      <EchoPipe name=\"Start\">\n        <Forward name=\"success\" path=\"A\"/>\n      </EchoPipe>\n      <EchoPipe name=\"Other\">\n        <Forward name=\"retry\" path=\"A\"/>\n      </EchoPipe>\n      <EchoPipe name=\"A\">\n        <Forward name=\"success\" path=\"Exit\"/>\n      </EchoPipe>\n",
    );
    let mut editor = Orchestrator::default();
    editor.text_changed(&text).unwrap();
    let render = editor
        .handle_event(DiagramEvent::Rename {
            old: "A".into(),
            new: "B".into(),
        })
        .unwrap()
        .clone();

    assert!(render.edges.iter().all(|e| e.source != "A" && e.target != "A"));
    assert!(render.edges.iter().filter(|e| e.target == "B").count() >= 1);
    assert_eq!(
        edges(&render),
        vec![
            edge("Start", "B", "success"),
            edge("Other", "B", "retry"),
            edge("B", "Exit", "success"),
        ]
    );
}

#[test]
fn test_rename_onto_existing_name_is_ignored() {
    let text = adapter("      <EchoPipe name=\"A\" x=\"1\" y=\"1\"/>\n      <EchoPipe name=\"B\" x=\"1\" y=\"2\"/>\n");
    let mut editor = Orchestrator::default();
    editor.text_changed(&text).unwrap();
    editor
        .handle_event(DiagramEvent::Rename {
            old: "A".into(),
            new: "B".into(),
        })
        .unwrap();
    assert!(editor.text().contains(r#"name="A""#));
}

#[test]
fn test_connect_twice_yields_one_edge() {
    let text = adapter("      <EchoPipe name=\"A\"/>\n      <EchoPipe name=\"B\"/>\n");
    let mut editor = Orchestrator::default();
    editor.text_changed(&text).unwrap();

    for _ in 0..2 {
        editor
            .handle_event(DiagramEvent::Connect {
                source: "A".into(),
                target: "Exit".into(),
            })
            .unwrap();
    }
    editor.rebuild().unwrap();
    let render = editor.rebuild().unwrap();
    let count = render
        .edges
        .iter()
        .filter(|e| e.source == "A" && e.target == "Exit")
        .count();
    assert_eq!(count, 1);
    assert_eq!(editor.text().matches("<Forward").count(), 1);
}

#[test]
fn test_duplicate_forwards_in_text_collapse_in_render() {
    let text = adapter(
        "      <EchoPipe name=\"A\">\n        <Forward name=\"success\" path=\"Exit\"/>\n        <Forward name=\"again\" path=\"Exit\"/>\n      </EchoPipe>\n",
    );
    let render = pipewright::build_diagram(&text).unwrap();
    assert_eq!(edges(&render), vec![edge("A", "Exit", "success")]);
}

#[test]
fn test_dangling_forward_is_dropped() {
    let text = adapter(
        "      <EchoPipe name=\"A\">\n        <Forward name=\"success\" path=\"Nowhere\"/>\n      </EchoPipe>\n",
    );
    let render = pipewright::build_diagram(&text).unwrap();
    assert!(render.edges.is_empty());
}

#[test]
fn test_disconnect_exit_in_any_case() {
    let text = adapter(
        "      <EchoPipe name=\"A\">\n        <Forward name=\"success\" path=\"Exit\"/>\n      </EchoPipe>\n      <EchoPipe name=\"B\"/>\n",
    );
    let mut editor = Orchestrator::default();
    editor.text_changed(&text).unwrap();
    editor
        .handle_event(DiagramEvent::Disconnect {
            source: "A".into(),
            target: "EXIT".into(),
        })
        .unwrap();
    assert!(!editor.text().contains("<Forward"));
    // with no forwards left, A falls back to its next sibling
    assert_eq!(editor.graph().unwrap().successors("A"), vec!["B"]);
}

#[test]
fn test_add_stage_lands_before_exit() {
    let text = adapter("      <EchoPipe name=\"A\" x=\"100\" y=\"250\"/>\n");
    let mut editor = Orchestrator::default();
    editor.text_changed(&text).unwrap();
    editor
        .handle_event(DiagramEvent::AddStage {
            name: "Transform".into(),
            x: 300,
            y: 400,
            kind: "XsltPipe".into(),
        })
        .unwrap();
    assert!(editor.text().contains(
        "      <XsltPipe name=\"Transform\" x=\"300\" y=\"400\">\n      </XsltPipe>\n      <Exit path=\"Exit\""
    ));
    let stages: Vec<String> = editor
        .graph()
        .unwrap()
        .stages()
        .map(|n| n.name.clone())
        .collect();
    assert_eq!(stages, vec!["A", "Transform"]);
}

#[test]
fn test_layout_commit_converges_in_one_pass() {
    let text = adapter("      <EchoPipe name=\"A\"/>\n      <EchoPipe name=\"B\"/>\n");
    let mut editor = Orchestrator::default();
    editor.text_changed(&text).unwrap();
    let committed = editor.text().to_string();
    assert_ne!(committed, text);

    let graph = editor.graph().unwrap().clone();
    let plan = LayoutOffsetter::new().compute_layout(&graph, CanvasExtent::default());
    assert!(plan.placements.is_empty());

    editor.rebuild().unwrap();
    assert_eq!(editor.text(), committed);
}

#[test]
fn test_error_state_clears_diagram_and_recovers() {
    let good = adapter("      <EchoPipe name=\"A\"/>\n");
    let mut editor = Orchestrator::default();
    editor.text_changed(&good).unwrap();
    assert!(!editor.render().nodes.is_empty());

    let broken = good.replace("</Pipeline>", "");
    assert!(editor.text_changed(&broken).is_err());
    assert_eq!(editor.state(), EditorState::Error);
    assert!(editor.render().nodes.is_empty());

    // events in the error state leave the broken text alone
    let result = editor.handle_event(DiagramEvent::Move {
        name: "A".into(),
        x: 1,
        y: 1,
    });
    assert!(result.is_err());
    assert_eq!(editor.text(), broken);

    editor.text_changed(&good).unwrap();
    assert_eq!(editor.state(), EditorState::Idle);
    assert_eq!(editor.render().nodes.len(), 2);
}

#[test]
fn test_modules_select_by_name() {
    let text = r#"<Configuration>
  <Module>
    <Adapter name="First"><Pipeline><EchoPipe name="F" x="1" y="1"/><Exit path="E" x="1" y="2"/></Pipeline></Adapter>
  </Module>
  <Module>
    <Adapter name="Second"><Pipeline><EchoPipe name="S" x="1" y="1"/><Exit path="E" x="1" y="2"/></Pipeline></Adapter>
  </Module>
</Configuration>"#;
    let mut editor = Orchestrator::default();
    editor.text_changed(text).unwrap();
    assert_eq!(editor.selected_adapter(), Some("First"));
    editor.select_adapter("Second").unwrap();
    assert!(editor.graph().unwrap().has_node("S"));
    assert_eq!(editor.adapters(), vec!["First", "Second"]);
}

proptest! {
    #[test]
    fn prop_rebuild_is_idempotent(count in 1usize..8, horizontal in any::<bool>()) {
        let stages: String = (0..count)
            .map(|i| format!("      <EchoPipe name=\"S{}\"/>\n", i))
            .collect();
        let text = adapter(&stages);
        let mode = if horizontal { LayoutMode::Horizontal } else { LayoutMode::Vertical };

        let mut editor = Orchestrator::new(EditorConfig::default().with_layout_mode(mode));
        let first = editor.text_changed(&text).unwrap().clone();
        let second = editor.rebuild().unwrap().clone();
        prop_assert_eq!(&first.nodes, &second.nodes);
        prop_assert_eq!(&first.edges, &second.edges);
        prop_assert_eq!(first.edges.len(), count - 1);
    }

    #[test]
    fn prop_every_slot_is_distinct(count in 1usize..12) {
        let mut graph = FlowGraph::new();
        for i in 0..count {
            graph.add_node(Node::new(format!("S{}", i), "EchoPipe")).unwrap();
        }
        let plan = LayoutOffsetter::new().compute_layout(&graph, CanvasExtent::default());
        prop_assert_eq!(plan.placements.len(), count);
        for (i, placement) in plan.placements.iter().enumerate() {
            prop_assert_eq!(placement.y, (i as i64 + 1) * 250);
            prop_assert_eq!(placement.x, 100);
        }
        prop_assert!(plan.extent.height >= count as i64 * 250);
    }
}
