/// Graph integration tests: loading the shipped content and rejecting broken node files.

use ember_narrative::core::graph::{
    available_elements, available_exits, ConfigurationError, GraphError, NarrativeGraph, NodeSet,
};
use ember_narrative::schema::ledger::TraitLedger;
use ember_narrative::schema::node::ElementKind;
use std::path::Path;

fn load_content() -> NodeSet {
    NodeSet::load_from_dir(Path::new("content/ember_throne")).unwrap()
}

#[test]
fn shipped_content_validates() {
    let set = load_content();
    let problems = set.validate("forest-journey");
    assert!(problems.is_empty(), "content problems: {:?}", problems);
}

#[test]
fn shipped_content_is_fully_reachable() {
    let graph = NarrativeGraph::new(load_content(), "forest-journey").unwrap();
    assert!(
        graph.unreachable().is_empty(),
        "unreachable: {:?}",
        graph.unreachable()
    );
}

#[test]
fn dungeon_files_merge_in_name_order() {
    let set = load_content();
    // dungeon.ron sorts before forest.ron
    assert_eq!(set.nodes[0].id.as_str(), "dungeon-entrance");
    assert!(set.nodes.iter().any(|n| n.id.as_str() == "traveler-farewell"));
}

#[test]
fn hazard_room_outcome_blocks() {
    let graph = NarrativeGraph::new(load_content(), "forest-journey").unwrap();
    let room = graph.node("dungeon-room-8").unwrap();
    let flame = room.element("flame_wall").unwrap();
    match &flame.kind {
        ElementKind::Hazard(h) => {
            assert_eq!(h.kind, "fire");
            assert_eq!(h.damage, 4);
            assert!((h.resistance - 0.35).abs() < 1e-9);
        }
        other => panic!("expected hazard, got {:?}", other),
    }

    let vault = graph.node("dungeon-room-4").unwrap();
    match &vault.element("golden_chest").unwrap().kind {
        ElementKind::Treasure(t) => assert_eq!((t.difficulty, t.value), (3, 100)),
        other => panic!("expected treasure, got {:?}", other),
    }
}

#[test]
fn forest_challenges_carry_time_limits() {
    let graph = NarrativeGraph::new(load_content(), "forest-journey").unwrap();
    let forest = graph.node("forest-haste").unwrap();
    let limits: Vec<u64> = forest
        .elements
        .iter()
        .filter_map(|e| match &e.kind {
            ElementKind::Challenge(c) => Some(c.time_limit_ms),
            _ => None,
        })
        .collect();
    assert_eq!(limits, vec![5000, 7000, 9000]);
}

#[test]
fn stealth_exit_hidden_below_minimum() {
    let graph = NarrativeGraph::new(load_content(), "forest-journey").unwrap();
    let room = graph.node("dungeon-room-7").unwrap();
    let mut ledger = TraitLedger::new();
    ledger.add("stealth", 2);

    let exits: Vec<&str> = available_exits(room, &ledger)
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(exits, vec!["return_corridor"]);

    ledger.add("stealth", 1);
    assert_eq!(available_exits(room, &ledger).len(), 2);
}

#[test]
fn dialogue_option_gated_on_item() {
    let graph = NarrativeGraph::new(load_content(), "forest-journey").unwrap();
    let node = graph.node("traveler-approach").unwrap();
    let mut ledger = TraitLedger::new();
    assert_eq!(available_exits(node, &ledger).len(), 1);
    ledger.grant_item("healing_herb");
    assert_eq!(available_exits(node, &ledger).len(), 2);
}

#[test]
fn first_chamber_listing_follows_traits() {
    let graph = NarrativeGraph::new(load_content(), "forest-journey").unwrap();
    let room = graph.node("dungeon-room-1").unwrap();
    let mut ledger = TraitLedger::new();
    let consumed = Default::default();
    assert!(available_elements(room, &ledger, &consumed).is_empty());

    ledger.add("observant", 1);
    ledger.add("knowledgeable", 1);
    let ids: Vec<&str> = available_elements(room, &ledger, &consumed)
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(ids, vec!["ancient_inscription", "strange_plant"]);
}

#[test]
fn broken_fixture_rejected_with_every_problem() {
    let set = NodeSet::load_from_ron(Path::new("tests/fixtures/broken_exits.ron")).unwrap();
    let err = NarrativeGraph::new(set, "dungeon-room-3").unwrap_err();
    let problems = match err {
        GraphError::Invalid(problems) => problems,
        other => panic!("expected validation failure, got {other}"),
    };
    assert_eq!(problems.len(), 2);
    assert!(problems.iter().all(|p| matches!(p, ConfigurationError::DanglingTarget { .. })));
    assert!(problems.contains(&ConfigurationError::DanglingTarget {
        node: "dungeon-room-3".to_string(),
        from: "east_corridor".to_string(),
        target: "dungeon-room-8".to_string(),
    }));
}

#[test]
fn invalid_outcome_fixture_rejected() {
    let err = NodeSet::load_from_ron(Path::new("tests/fixtures/patrol_without_difficulty.ron"))
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidOutcome(ref spec) if spec.kind == "stealth"));
}

#[test]
fn missing_file_is_io_error() {
    assert!(matches!(
        NodeSet::load_from_ron(Path::new("tests/fixtures/does_not_exist.ron")),
        Err(GraphError::Io(_))
    ));
}
