/// Narrative node graph: RON loading, load-time validation and
/// requirement-filtered views of a node.
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::core::outcome::DIFFICULTY_RANGE;
use crate::core::requirement::satisfies;
use crate::schema::ledger::TraitView;
use crate::schema::node::{
    Branch, Element, ElementKind, Exit, HazardOutcome, NarrativeNode, NodeId, Reward,
    StealthOutcome, TimedChallenge, TreasureOutcome,
};
use crate::schema::requirement::RequirementSpec;

/// Element ids already consumed in one node.
pub type ConsumedSet = FxHashSet<String>;

/// A structural mistake in the node definitions. Always fatal at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("graph has no nodes")]
    EmptyGraph,
    #[error("start node '{0}' does not exist")]
    UnknownStart(String),
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),
    #[error("node '{node}': duplicate element id '{element}'")]
    DuplicateElement { node: String, element: String },
    #[error("node '{node}': duplicate exit id '{exit}'")]
    DuplicateExit { node: String, exit: String },
    #[error("node '{node}': '{from}' leads to missing node '{target}'")]
    DanglingTarget {
        node: String,
        from: String,
        target: String,
    },
    #[error("node '{node}': malformed {context} key '{key}'")]
    MalformedKey {
        node: String,
        context: &'static str,
        key: String,
    },
    #[error("node '{node}': element '{element}' declares more than one outcome block")]
    ConflictingOutcome { node: String, element: String },
}

/// A treasure, hazard, stealth or challenge block with missing or unusable numbers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("node '{node}': {kind} block on element '{element}' {problem}")]
pub struct InvalidOutcomeSpec {
    pub node: String,
    pub element: String,
    pub kind: &'static str,
    pub problem: String,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid outcome spec: {0}")]
    InvalidOutcome(#[from] InvalidOutcomeSpec),
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("node graph failed validation with {} problem(s): {}", .0.len(), summarize(.0))]
    Invalid(Vec<ConfigurationError>),
}

fn summarize(problems: &[ConfigurationError]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// RON deserialization helpers: content files use the loose authoring
// shape (optional outcome blocks, flat reward fields), which is turned
// into the tagged internal types here.

#[derive(Debug, Default, Deserialize)]
struct RonReward {
    #[serde(default)]
    traits: BTreeMap<String, i64>,
    #[serde(default)]
    items: Vec<String>,
    #[serde(default)]
    gold: i64,
}

#[derive(Debug, Default, Deserialize)]
struct RonBranch {
    #[serde(default)]
    traits: BTreeMap<String, i64>,
    #[serde(default)]
    items: Vec<String>,
    #[serde(default)]
    gold: i64,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RonTreasure {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    difficulty: Option<i64>,
    #[serde(default)]
    value: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RonHazard {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    difficulty: Option<i64>,
    #[serde(default)]
    damage: Option<i64>,
    #[serde(default)]
    resistance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RonStealth {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    difficulty: Option<i64>,
    #[serde(default)]
    detection: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RonChallenge {
    #[serde(default)]
    difficulty: Option<i64>,
    #[serde(default)]
    time_limit_ms: Option<u64>,
    #[serde(default)]
    success: RonBranch,
    #[serde(default)]
    failure: RonBranch,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Element")]
struct RonElement {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    examine: Option<String>,
    #[serde(default)]
    requires: BTreeMap<String, i64>,
    #[serde(default)]
    requires_items: Vec<String>,
    #[serde(default)]
    traits: BTreeMap<String, i64>,
    #[serde(default)]
    items: Vec<String>,
    #[serde(default)]
    failure: RonReward,
    #[serde(default)]
    treasure: Option<RonTreasure>,
    #[serde(default)]
    hazard: Option<RonHazard>,
    #[serde(default)]
    stealth: Option<RonStealth>,
    #[serde(default)]
    challenge: Option<RonChallenge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Exit")]
struct RonExit {
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    requires: BTreeMap<String, i64>,
    #[serde(default)]
    requires_items: Vec<String>,
    #[serde(default)]
    traits: BTreeMap<String, i64>,
    #[serde(default)]
    items: Vec<String>,
    target: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Node")]
struct RonNode {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    elements: Vec<RonElement>,
    #[serde(default)]
    exits: Vec<RonExit>,
}

fn requirement(traits: BTreeMap<String, i64>, items: Vec<String>) -> Option<RequirementSpec> {
    let spec = RequirementSpec { traits, items };
    if spec.is_empty() {
        None
    } else {
        Some(spec)
    }
}

fn branch(raw: RonBranch) -> Branch {
    Branch {
        reward: Reward {
            traits: raw.traits,
            items: raw.items,
            gold: raw.gold,
        },
        next: raw.next.map(NodeId),
    }
}

fn convert_element(node: &str, raw: RonElement) -> Result<Element, GraphError> {
    let blocks = [
        raw.treasure.is_some(),
        raw.hazard.is_some(),
        raw.stealth.is_some(),
        raw.challenge.is_some(),
    ];
    if blocks.iter().filter(|b| **b).count() > 1 {
        return Err(ConfigurationError::ConflictingOutcome {
            node: node.to_string(),
            element: raw.id,
        }
        .into());
    }

    let invalid = |kind: &'static str, problem: &str| InvalidOutcomeSpec {
        node: node.to_string(),
        element: raw.id.clone(),
        kind,
        problem: problem.to_string(),
    };
    let difficulty_of =
        |kind: &'static str, difficulty: Option<i64>| -> Result<i64, InvalidOutcomeSpec> {
            let difficulty =
                difficulty.ok_or_else(|| invalid(kind, "is missing `difficulty`"))?;
            if !DIFFICULTY_RANGE.contains(&difficulty) {
                return Err(invalid(kind, "has `difficulty` outside [-100, 100]"));
            }
            Ok(difficulty)
        };

    let kind = if let Some(t) = &raw.treasure {
        let difficulty = difficulty_of("treasure", t.difficulty)?;
        let value = t.value.ok_or_else(|| invalid("treasure", "is missing `value`"))?;
        if value < 0 {
            return Err(invalid("treasure", "has a negative `value`").into());
        }
        ElementKind::Treasure(TreasureOutcome {
            kind: t.kind.clone(),
            difficulty,
            value,
        })
    } else if let Some(h) = &raw.hazard {
        let difficulty = difficulty_of("hazard", h.difficulty)?;
        let damage = h.damage.ok_or_else(|| invalid("hazard", "is missing `damage`"))?;
        if damage < 0 {
            return Err(invalid("hazard", "has a negative `damage`").into());
        }
        let resistance = h.resistance.unwrap_or(0.0);
        if !resistance.is_finite() || !(-1.0..=1.0).contains(&resistance) {
            return Err(invalid("hazard", "has `resistance` outside [-1, 1]").into());
        }
        ElementKind::Hazard(HazardOutcome {
            kind: h.kind.clone(),
            difficulty,
            damage,
            resistance,
        })
    } else if let Some(s) = &raw.stealth {
        let difficulty = difficulty_of("stealth", s.difficulty)?;
        if s.detection.is_some_and(|d| !d.is_finite()) {
            return Err(invalid("stealth", "has a non-finite `detection`").into());
        }
        ElementKind::Stealth(StealthOutcome {
            kind: s.kind.clone(),
            difficulty,
            detection: s.detection,
        })
    } else if let Some(c) = raw.challenge {
        let difficulty = difficulty_of("challenge", c.difficulty)?;
        let time_limit_ms = c
            .time_limit_ms
            .ok_or_else(|| invalid("challenge", "is missing `time_limit_ms`"))?;
        if time_limit_ms == 0 {
            return Err(invalid("challenge", "has a zero `time_limit_ms`").into());
        }
        ElementKind::Challenge(TimedChallenge {
            difficulty,
            time_limit_ms,
            success: branch(c.success),
            failure: branch(c.failure),
        })
    } else {
        ElementKind::Reward
    };

    Ok(Element {
        id: raw.id,
        title: raw.title,
        description: raw.description,
        examine_text: raw.examine,
        requires: requirement(raw.requires, raw.requires_items),
        reward: Reward {
            traits: raw.traits,
            items: raw.items,
            gold: 0,
        },
        failure: Reward {
            traits: raw.failure.traits,
            items: raw.failure.items,
            gold: raw.failure.gold,
        },
        kind,
    })
}

fn convert_node(raw: RonNode) -> Result<NarrativeNode, GraphError> {
    let mut elements = Vec::with_capacity(raw.elements.len());
    for element in raw.elements {
        elements.push(convert_element(&raw.id, element)?);
    }
    let exits = raw
        .exits
        .into_iter()
        .map(|e| Exit {
            id: e.id,
            label: e.label,
            description: e.description,
            requires: requirement(e.requires, e.requires_items),
            target: NodeId(e.target),
            reward: Reward {
                traits: e.traits,
                items: e.items,
                gold: 0,
            },
        })
        .collect();
    Ok(NarrativeNode {
        id: NodeId(raw.id),
        title: raw.title,
        description: raw.description,
        elements,
        exits,
    })
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// An unvalidated, ordered collection of node definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSet {
    pub nodes: Vec<NarrativeNode>,
}

impl NodeSet {
    /// Load a node set from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<NodeSet, GraphError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a node set from a RON string: a list of `Node(...)` entries.
    pub fn parse_ron(input: &str) -> Result<NodeSet, GraphError> {
        let raw: Vec<RonNode> = ron::from_str(input)?;
        let mut nodes = Vec::with_capacity(raw.len());
        for node in raw {
            nodes.push(convert_node(node)?);
        }
        Ok(NodeSet { nodes })
    }

    /// Load and merge every `.ron` file in `dir`, in file-name order.
    pub fn load_from_dir(dir: &Path) -> Result<NodeSet, GraphError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut set = NodeSet::default();
        for path in paths {
            set.merge(Self::load_from_ron(&path)?);
        }
        Ok(set)
    }

    /// Merge another set into this one. Nodes from `other` replace nodes
    /// with the same id in place; new ids are appended.
    pub fn merge(&mut self, other: NodeSet) {
        for node in other.nodes {
            match self.nodes.iter_mut().find(|n| n.id == node.id) {
                Some(existing) => *existing = node,
                None => self.nodes.push(node),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Collect every structural problem. An empty result means the set can
    /// become a [`NarrativeGraph`] rooted at `start`.
    pub fn validate(&self, start: &str) -> Vec<ConfigurationError> {
        let mut problems = Vec::new();
        if self.nodes.is_empty() {
            problems.push(ConfigurationError::EmptyGraph);
            return problems;
        }

        let mut ids: FxHashSet<&str> = FxHashSet::default();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                problems.push(ConfigurationError::DuplicateNode(node.id.0.clone()));
            }
        }
        if !ids.contains(start) {
            problems.push(ConfigurationError::UnknownStart(start.to_string()));
        }

        for node in &self.nodes {
            validate_node(node, &ids, &mut problems);
        }
        problems
    }
}

fn validate_node(node: &NarrativeNode, ids: &FxHashSet<&str>, problems: &mut Vec<ConfigurationError>) {
    let name = node.id.as_str();
    let mut check_key = |context: &'static str, key: &str, problems: &mut Vec<ConfigurationError>| {
        if !is_valid_key(key) {
            problems.push(ConfigurationError::MalformedKey {
                node: name.to_string(),
                context,
                key: key.to_string(),
            });
        }
    };

    check_key("node", name, problems);

    let mut seen = FxHashSet::default();
    for element in &node.elements {
        check_key("element", &element.id, problems);
        if !seen.insert(element.id.as_str()) {
            problems.push(ConfigurationError::DuplicateElement {
                node: name.to_string(),
                element: element.id.clone(),
            });
        }
        if let Some(spec) = &element.requires {
            check_requirement(spec, &mut check_key, problems);
        }
        check_reward(&element.reward, &mut check_key, problems);
        check_reward(&element.failure, &mut check_key, problems);
        if let ElementKind::Challenge(challenge) = &element.kind {
            for side in [&challenge.success, &challenge.failure] {
                check_reward(&side.reward, &mut check_key, problems);
                if let Some(next) = &side.next {
                    if !ids.contains(next.as_str()) {
                        problems.push(ConfigurationError::DanglingTarget {
                            node: name.to_string(),
                            from: element.id.clone(),
                            target: next.0.clone(),
                        });
                    }
                }
            }
        }
    }

    let mut seen = FxHashSet::default();
    for exit in &node.exits {
        check_key("exit", &exit.id, problems);
        if !seen.insert(exit.id.as_str()) {
            problems.push(ConfigurationError::DuplicateExit {
                node: name.to_string(),
                exit: exit.id.clone(),
            });
        }
        if let Some(spec) = &exit.requires {
            check_requirement(spec, &mut check_key, problems);
        }
        check_reward(&exit.reward, &mut check_key, problems);
        if !ids.contains(exit.target.as_str()) {
            problems.push(ConfigurationError::DanglingTarget {
                node: name.to_string(),
                from: exit.id.clone(),
                target: exit.target.0.clone(),
            });
        }
    }
}

fn check_requirement<F>(spec: &RequirementSpec, check_key: &mut F, problems: &mut Vec<ConfigurationError>)
where
    F: FnMut(&'static str, &str, &mut Vec<ConfigurationError>),
{
    for name in spec.traits.keys() {
        check_key("trait", name, problems);
    }
    for id in &spec.items {
        check_key("item", id, problems);
    }
}

fn check_reward<F>(reward: &Reward, check_key: &mut F, problems: &mut Vec<ConfigurationError>)
where
    F: FnMut(&'static str, &str, &mut Vec<ConfigurationError>),
{
    for name in reward.traits.keys() {
        check_key("trait", name, problems);
    }
    for id in &reward.items {
        check_key("item", id, problems);
    }
}

/// Position of a node in the graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// A validated arena of nodes keyed by id. Static after construction.
#[derive(Debug, Clone)]
pub struct NarrativeGraph {
    nodes: Vec<NarrativeNode>,
    index: FxHashMap<NodeId, usize>,
    start: NodeId,
}

impl NarrativeGraph {
    /// Validate `set` and build the graph. Any problem aborts the load.
    pub fn new(set: NodeSet, start: &str) -> Result<Self, GraphError> {
        let problems = set.validate(start);
        if !problems.is_empty() {
            return Err(GraphError::Invalid(problems));
        }

        let index = set
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.clone(), i))
            .collect();

        info!(nodes = set.nodes.len(), start, "narrative graph loaded");

        Ok(Self {
            nodes: set.nodes,
            index,
            start: NodeId::from(start),
        })
    }

    pub fn start(&self) -> &NodeId {
        &self.start
    }

    pub fn node(&self, id: &str) -> Option<&NarrativeNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied().map(NodeIndex)
    }

    /// The node at `index`. Indices only come from this graph, so they
    /// are always in bounds.
    pub fn get(&self, index: NodeIndex) -> &NarrativeNode {
        &self.nodes[index.0]
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NarrativeNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes no exit or challenge branch can reach from the start node,
    /// in declaration order.
    pub fn unreachable(&self) -> Vec<&NodeId> {
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut queue = VecDeque::from([self.start.as_str()]);
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(node) = self.node(id) {
                queue.extend(node.targets().map(NodeId::as_str));
            }
        }
        self.nodes
            .iter()
            .map(|n| &n.id)
            .filter(|id| !visited.contains(id.as_str()))
            .collect()
    }
}

/// A listed element or exit plus whether its requirement is met.
#[derive(Debug, Clone, Serialize)]
pub struct Choice<'a, T> {
    pub item: &'a T,
    pub enabled: bool,
}

/// Unconsumed elements whose requirements hold, in declaration order.
pub fn available_elements<'a, V: TraitView + ?Sized>(
    node: &'a NarrativeNode,
    ledger: &V,
    consumed: &ConsumedSet,
) -> Vec<&'a Element> {
    node.elements
        .iter()
        .filter(|e| !consumed.contains(&e.id))
        .filter(|e| satisfies(e.requires.as_ref(), ledger))
        .collect()
}

/// Exits whose requirements hold, in declaration order.
pub fn available_exits<'a, V: TraitView + ?Sized>(node: &'a NarrativeNode, ledger: &V) -> Vec<&'a Exit> {
    node.exits
        .iter()
        .filter(|e| satisfies(e.requires.as_ref(), ledger))
        .collect()
}

/// Every unconsumed element with its enabled state.
pub fn element_choices<'a, V: TraitView + ?Sized>(
    node: &'a NarrativeNode,
    ledger: &V,
    consumed: &ConsumedSet,
) -> Vec<Choice<'a, Element>> {
    node.elements
        .iter()
        .filter(|e| !consumed.contains(&e.id))
        .map(|e| Choice {
            item: e,
            enabled: satisfies(e.requires.as_ref(), ledger),
        })
        .collect()
}

/// Every exit with its enabled state.
pub fn exit_choices<'a, V: TraitView + ?Sized>(node: &'a NarrativeNode, ledger: &V) -> Vec<Choice<'a, Exit>> {
    node.exits
        .iter()
        .map(|e| Choice {
            item: e,
            enabled: satisfies(e.requires.as_ref(), ledger),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ledger::TraitLedger;

    const HAZARD_ROOM: &str = r#"#![enable(implicit_some)]
[
    Node(
        id: "dungeon-room-3",
        title: "The Hazard Chamber",
        description: "Poisonous mist hangs in the air.",
        elements: [
            Element(
                id: "poisonous_mist",
                title: "Poisonous Mist",
                requires: {"observant": 2},
                traits: {"cautious": 1},
                items: ["antidote"],
                hazard: (kind: "poison", difficulty: 2, damage: 3),
            ),
            Element(
                id: "loose_stone",
                title: "Loose Stone",
                traits: {"curious": 1},
            ),
        ],
        exits: [
            Exit(id: "north_passage", label: "North Passage", requires: {"stealth": 2}, target: "dungeon-room-7"),
            Exit(id: "return_corridor", label: "Return Corridor", target: "dungeon-room-1"),
        ],
    ),
    Node(id: "dungeon-room-1", title: "The First Chamber"),
    Node(id: "dungeon-room-7", title: "The Shadow Chamber"),
]"#;

    fn load_graph() -> NarrativeGraph {
        let set = NodeSet::parse_ron(HAZARD_ROOM).unwrap();
        NarrativeGraph::new(set, "dungeon-room-3").unwrap()
    }

    #[test]
    fn parse_converts_outcome_blocks_to_tagged_kinds() {
        let set = NodeSet::parse_ron(HAZARD_ROOM).unwrap();
        assert_eq!(set.len(), 3);
        let room = &set.nodes[0];
        let mist = room.element("poisonous_mist").unwrap();
        match &mist.kind {
            ElementKind::Hazard(h) => {
                assert_eq!(h.damage, 3);
                assert_eq!(h.resistance, 0.0);
            }
            other => panic!("expected hazard, got {:?}", other),
        }
        assert_eq!(mist.requires.as_ref().unwrap().traits["observant"], 2);
        assert_eq!(mist.reward.items, vec!["antidote".to_string()]);
        assert_eq!(room.element("loose_stone").unwrap().kind, ElementKind::Reward);
        assert!(room.element("loose_stone").unwrap().requires.is_none());
    }

    #[test]
    fn graph_lookup_by_id() {
        let graph = load_graph();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.start().as_str(), "dungeon-room-3");
        assert!(graph.contains("dungeon-room-7"));
        assert!(graph.node("dungeon-room-99").is_none());
    }

    #[test]
    fn dangling_exit_rejected_at_load() {
        let input = r#"[
            Node(id: "dungeon-room-3", exits: [Exit(id: "far", target: "dungeon-room-12")]),
        ]"#;
        let set = NodeSet::parse_ron(input).unwrap();
        let err = NarrativeGraph::new(set, "dungeon-room-3").unwrap_err();
        match err {
            GraphError::Invalid(problems) => {
                assert_eq!(
                    problems,
                    vec![ConfigurationError::DanglingTarget {
                        node: "dungeon-room-3".to_string(),
                        from: "far".to_string(),
                        target: "dungeon-room-12".to_string(),
                    }]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dangling_challenge_branch_rejected() {
        let input = r#"#![enable(implicit_some)]
        [
            Node(id: "forest-haste", elements: [
                Element(id: "narrow_path", challenge: (
                    difficulty: 2,
                    time_limit_ms: 5000,
                    success: (next: "path-success"),
                )),
            ]),
        ]"#;
        let set = NodeSet::parse_ron(input).unwrap();
        let problems = set.validate("forest-haste");
        assert!(matches!(
            &problems[..],
            [ConfigurationError::DanglingTarget { target, .. }] if target == "path-success"
        ));
    }

    #[test]
    fn missing_numeric_field_is_invalid_outcome() {
        let input = r#"#![enable(implicit_some)]
        [
            Node(id: "dungeon-room-7", elements: [
                Element(id: "patrolling_guard", stealth: (kind: "patrol", detection: 0.3)),
            ]),
        ]"#;
        let err = NodeSet::parse_ron(input).unwrap_err();
        match err {
            GraphError::InvalidOutcome(spec) => {
                assert_eq!(spec.kind, "stealth");
                assert_eq!(spec.element, "patrolling_guard");
                assert!(spec.problem.contains("difficulty"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn hazard_without_damage_is_invalid() {
        let input = r#"#![enable(implicit_some)]
        [Node(id: "a", elements: [Element(id: "trap", hazard: (kind: "trap", difficulty: 2))])]"#;
        assert!(matches!(
            NodeSet::parse_ron(input),
            Err(GraphError::InvalidOutcome(_))
        ));
    }

    #[test]
    fn extreme_difficulty_is_invalid() {
        let input = r#"#![enable(implicit_some)]
        [Node(id: "a", elements: [Element(id: "trap", hazard: (difficulty: -9223372036854775807, damage: 1))])]"#;
        match NodeSet::parse_ron(input) {
            Err(GraphError::InvalidOutcome(spec)) => {
                assert_eq!(spec.kind, "hazard");
                assert!(spec.problem.contains("difficulty"));
            }
            other => panic!("unexpected result: {:?}", other.map(|set| set.len())),
        }
    }

    #[test]
    fn out_of_range_resistance_is_invalid() {
        let input = r#"#![enable(implicit_some)]
        [Node(id: "a", elements: [Element(id: "fire", hazard: (difficulty: 2, damage: 1, resistance: 1.5))])]"#;
        assert!(matches!(
            NodeSet::parse_ron(input),
            Err(GraphError::InvalidOutcome(_))
        ));
    }

    #[test]
    fn two_outcome_blocks_conflict() {
        let input = r#"#![enable(implicit_some)]
        [Node(id: "a", elements: [Element(
            id: "chest",
            treasure: (difficulty: 2, value: 10),
            hazard: (difficulty: 2, damage: 1),
        )])]"#;
        assert!(matches!(
            NodeSet::parse_ron(input),
            Err(GraphError::Configuration(ConfigurationError::ConflictingOutcome { .. }))
        ));
    }

    #[test]
    fn malformed_keys_reported() {
        let input = r#"[
            Node(id: "a", elements: [Element(id: "x", requires: {"": 1}, items: ["bad item"])]),
        ]"#;
        let set = NodeSet::parse_ron(input).unwrap();
        let problems = set.validate("a");
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().all(|p| matches!(p, ConfigurationError::MalformedKey { .. })));
    }

    #[test]
    fn duplicates_and_unknown_start_reported() {
        let input = r#"[
            Node(id: "a", elements: [Element(id: "x"), Element(id: "x")], exits: [
                Exit(id: "go", target: "a"),
                Exit(id: "go", target: "a"),
            ]),
            Node(id: "a"),
        ]"#;
        let set = NodeSet::parse_ron(input).unwrap();
        let problems = set.validate("b");
        assert!(problems.contains(&ConfigurationError::DuplicateNode("a".to_string())));
        assert!(problems.contains(&ConfigurationError::UnknownStart("b".to_string())));
        assert!(problems.contains(&ConfigurationError::DuplicateElement {
            node: "a".to_string(),
            element: "x".to_string(),
        }));
        assert!(problems.contains(&ConfigurationError::DuplicateExit {
            node: "a".to_string(),
            exit: "go".to_string(),
        }));
    }

    #[test]
    fn empty_set_rejected() {
        let problems = NodeSet::default().validate("anything");
        assert_eq!(problems, vec![ConfigurationError::EmptyGraph]);
    }

    #[test]
    fn merge_overrides_in_place() {
        let mut base = NodeSet::parse_ron(HAZARD_ROOM).unwrap();
        let patch = NodeSet::parse_ron(
            r#"[Node(id: "dungeon-room-1", title: "Rebuilt"), Node(id: "dungeon-room-2")]"#,
        )
        .unwrap();
        base.merge(patch);
        assert_eq!(base.len(), 4);
        assert_eq!(base.nodes[1].title, "Rebuilt");
        assert_eq!(base.nodes[3].id.as_str(), "dungeon-room-2");
    }

    #[test]
    fn available_elements_filter_and_keep_order() {
        let graph = load_graph();
        let room = graph.node("dungeon-room-3").unwrap();
        let mut ledger = TraitLedger::new();
        let consumed = ConsumedSet::default();

        let ids: Vec<&str> = available_elements(room, &ledger, &consumed)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["loose_stone"]);

        ledger.add("observant", 2);
        let ids: Vec<&str> = available_elements(room, &ledger, &consumed)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["poisonous_mist", "loose_stone"]);
    }

    #[test]
    fn consumed_elements_hidden() {
        let graph = load_graph();
        let room = graph.node("dungeon-room-3").unwrap();
        let ledger = TraitLedger::new();
        let mut consumed = ConsumedSet::default();
        consumed.insert("loose_stone".to_string());
        assert!(available_elements(room, &ledger, &consumed).is_empty());
        assert_eq!(element_choices(room, &ledger, &consumed).len(), 1);
    }

    #[test]
    fn exits_filtered_by_requirement() {
        let graph = load_graph();
        let room = graph.node("dungeon-room-3").unwrap();
        let mut ledger = TraitLedger::new();
        ledger.add("stealth", 2);
        assert_eq!(available_exits(room, &ledger).len(), 2);

        let ledger = TraitLedger::new();
        let exits = available_exits(room, &ledger);
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].id, "return_corridor");

        let choices = exit_choices(room, &ledger);
        assert!(!choices[0].enabled);
        assert!(choices[1].enabled);
    }

    #[test]
    fn unreachable_nodes_listed() {
        let input = r#"[
            Node(id: "start", exits: [Exit(id: "go", target: "middle")]),
            Node(id: "middle"),
            Node(id: "island"),
        ]"#;
        let graph = NarrativeGraph::new(NodeSet::parse_ron(input).unwrap(), "start").unwrap();
        let lost: Vec<&str> = graph.unreachable().into_iter().map(NodeId::as_str).collect();
        assert_eq!(lost, vec!["island"]);
    }
}
