use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use super::requirement::RequirementSpec;

/// Newtype wrapper for narrative node ids (`"dungeon-room-3"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

/// Trait deltas, item grants and gold applied together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    #[serde(default)]
    pub traits: BTreeMap<String, i64>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub gold: i64,
}

impl Reward {
    pub fn is_empty(&self) -> bool {
        self.traits.is_empty() && self.items.is_empty() && self.gold == 0
    }

    /// Both rewards combined: trait deltas summed, items in order without repeats.
    pub fn merged(&self, other: &Reward) -> Reward {
        let mut combined = self.clone();
        for (name, delta) in &other.traits {
            let value = combined.traits.entry(name.clone()).or_insert(0);
            *value = value.saturating_add(*delta);
        }
        for item in &other.items {
            if !combined.items.contains(item) {
                combined.items.push(item.clone());
            }
        }
        combined.gold = combined.gold.saturating_add(other.gold);
        combined
    }
}

/// One side of a timed challenge: what it grants and where it leads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default)]
    pub reward: Reward,
    #[serde(default)]
    pub next: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasureOutcome {
    /// Flavor label: "chest", "knowledge", ...
    pub kind: String,
    pub difficulty: i64,
    /// Gold granted on success.
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardOutcome {
    /// Flavor label: "poison", "trap", "enemy", ...
    pub kind: String,
    pub difficulty: i64,
    /// Health lost on failure.
    pub damage: i64,
    /// Additive modifier on the success chance.
    pub resistance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StealthOutcome {
    /// Flavor label: "patrol", "hidden", ...
    pub kind: String,
    pub difficulty: i64,
    /// Informational; does not enter the chance formula.
    pub detection: Option<f64>,
}

/// A time-boxed challenge. Expiry without an attempt resolves as failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedChallenge {
    pub difficulty: i64,
    pub time_limit_ms: u64,
    pub success: Branch,
    pub failure: Branch,
}

/// What selecting an element does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    /// Grant the reward unconditionally.
    Reward,
    Treasure(TreasureOutcome),
    Hazard(HazardOutcome),
    Stealth(StealthOutcome),
    Challenge(TimedChallenge),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    Treasure,
    Hazard,
    Stealth,
    Challenge,
}

impl OutcomeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Treasure => "treasure",
            Self::Hazard => "hazard",
            Self::Stealth => "stealth",
            Self::Challenge => "challenge",
        }
    }
}

/// The numeric inputs of a randomized outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSpec {
    pub kind: OutcomeKind,
    pub difficulty: i64,
    pub resistance: f64,
}

impl ElementKind {
    /// The randomized outcome this element carries, if any.
    pub fn outcome(&self) -> Option<OutcomeSpec> {
        match self {
            Self::Reward => None,
            Self::Treasure(t) => Some(OutcomeSpec {
                kind: OutcomeKind::Treasure,
                difficulty: t.difficulty,
                resistance: 0.0,
            }),
            Self::Hazard(h) => Some(OutcomeSpec {
                kind: OutcomeKind::Hazard,
                difficulty: h.difficulty,
                resistance: h.resistance,
            }),
            Self::Stealth(s) => Some(OutcomeSpec {
                kind: OutcomeKind::Stealth,
                difficulty: s.difficulty,
                resistance: 0.0,
            }),
            Self::Challenge(c) => Some(OutcomeSpec {
                kind: OutcomeKind::Challenge,
                difficulty: c.difficulty,
                resistance: 0.0,
            }),
        }
    }
}

/// An interactive thing inside a node: a search spot, a trap, a chest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    pub title: String,
    pub description: String,
    pub examine_text: Option<String>,
    pub requires: Option<RequirementSpec>,
    /// Applied on plain selection or on a successful outcome.
    pub reward: Reward,
    /// Applied when the outcome fails.
    pub failure: Reward,
    pub kind: ElementKind,
}

impl Element {
    pub fn outcome(&self) -> Option<OutcomeSpec> {
        self.kind.outcome()
    }

    pub fn is_challenge(&self) -> bool {
        matches!(self.kind, ElementKind::Challenge(_))
    }
}

/// A gated transition to another node. Dialogue options are exits that
/// carry a reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exit {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub requires: Option<RequirementSpec>,
    pub target: NodeId,
    pub reward: Reward,
}

/// A room, page or dialogue step. Static after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeNode {
    pub id: NodeId,
    pub title: String,
    pub description: String,
    pub elements: Vec<Element>,
    pub exits: Vec<Exit>,
}

impl NarrativeNode {
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn exit(&self, id: &str) -> Option<&Exit> {
        self.exits.iter().find(|e| e.id == id)
    }

    /// Every node id this node can lead to: exit targets and challenge branches.
    pub fn targets(&self) -> impl Iterator<Item = &NodeId> {
        let exits = self.exits.iter().map(|e| &e.target);
        let branches = self.elements.iter().flat_map(|e| match &e.kind {
            ElementKind::Challenge(c) => {
                vec![c.success.next.as_ref(), c.failure.next.as_ref()]
            }
            _ => Vec::new(),
        });
        exits.chain(branches.flatten())
    }
}
