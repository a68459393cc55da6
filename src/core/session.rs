/// The transition controller: one play session walking the node graph.
///
/// Every player action goes through here. The session looks up the current
/// node, filters its choices through the requirement evaluator, rolls
/// outcomes against its random source, mutates the ledger and moves
/// between nodes. Time-boxed challenges run on a virtual clock that the
/// caller advances.
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::config::{ConfigError, SessionConfig};
use crate::core::graph::{
    self, Choice, ConsumedSet, GraphError, NarrativeGraph, NodeIndex, NodeSet,
};
use crate::core::outcome::{self, RandomSource, Resolution};
use crate::core::requirement::{self, Unmet};
use crate::core::schedule::{Scheduler, TaskHandle};
use crate::core::typewriter::Typewriter;
use crate::schema::ledger::{LedgerSnapshot, TraitLedger};
use crate::schema::node::{Element, ElementKind, Exit, NarrativeNode, NodeId, Reward, TimedChallenge};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("no narrative content was supplied")]
    NoContent,
    #[error("node '{0}' does not exist")]
    UnknownNode(String),
    #[error("node '{node}' has no element '{element}'")]
    UnknownElement { node: String, element: String },
    #[error("node '{node}' has no exit '{exit}'")]
    UnknownExit { node: String, exit: String },
    #[error("element '{element}' in node '{node}' was already consumed")]
    ElementConsumed { node: String, element: String },
    #[error("no challenge is running")]
    NoActiveChallenge,
    #[error("challenge '{0}' was already started on this visit")]
    ChallengeAlreadyStarted(String),
}

/// How a selected element played out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InteractionOutcome {
    /// Plain element: reward applied.
    Granted,
    Succeeded(Resolution),
    Failed(Resolution),
    /// A countdown is running; attempt or let it expire.
    ChallengeStarted { time_limit_ms: u64 },
    /// The countdown ran out before an attempt.
    TimedOut,
    /// Requirement not met; nothing changed.
    Blocked(Vec<Unmet>),
}

/// Everything one interaction changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionReport {
    pub node: NodeId,
    pub element: String,
    pub outcome: InteractionOutcome,
    /// The reward actually applied to the ledger.
    pub applied: Reward,
    pub damage: i64,
    pub moved_to: Option<NodeId>,
    pub defeated: bool,
}

/// Result of picking an exit or dialogue option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Transition {
    Moved { from: NodeId, to: NodeId },
    Blocked(Vec<Unmet>),
}

/// The countdown currently running, as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeStatus {
    pub element: String,
    pub remaining_ms: u64,
}

/// Saveable session state: where the player is and what they have done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub current: NodeId,
    pub ledger: LedgerSnapshot,
    #[serde(default)]
    pub consumed: BTreeMap<NodeId, BTreeSet<String>>,
    #[serde(default)]
    pub history: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct ChallengeExpiry {
    node: NodeIndex,
    element: String,
}

#[derive(Debug, Clone)]
struct ActiveChallenge {
    node: NodeIndex,
    element: String,
    handle: TaskHandle,
}

/// A play session. Built via `NarrativeSession::builder()`.
pub struct NarrativeSession {
    graph: Arc<NarrativeGraph>,
    ledger: TraitLedger,
    current: NodeIndex,
    /// per node, indexed like the graph arena
    consumed: Vec<ConsumedSet>,
    history: Vec<NodeId>,
    timers: Scheduler<ChallengeExpiry>,
    active: Option<ActiveChallenge>,
    /// challenges started since entering the current node; none restart
    started: ConsumedSet,
    rng: Box<dyn RandomSource>,
    config: SessionConfig,
}

/// Builder for constructing a `NarrativeSession`.
pub struct NarrativeSessionBuilder {
    content_dirs: Vec<PathBuf>,
    content_files: Vec<PathBuf>,
    nodes: Option<NodeSet>,
    graph: Option<Arc<NarrativeGraph>>,
    config: SessionConfig,
    rng: Option<Box<dyn RandomSource>>,
    ledger: Option<TraitLedger>,
}

impl NarrativeSession {
    pub fn builder() -> NarrativeSessionBuilder {
        NarrativeSessionBuilder {
            content_dirs: Vec::new(),
            content_files: Vec::new(),
            nodes: None,
            graph: None,
            config: SessionConfig::default(),
            rng: None,
            ledger: None,
        }
    }

    pub fn graph(&self) -> &Arc<NarrativeGraph> {
        &self.graph
    }

    pub fn ledger(&self) -> &TraitLedger {
        &self.ledger
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn current_node(&self) -> &NarrativeNode {
        self.graph.get(self.current)
    }

    /// Nodes entered so far, oldest first, including the current one.
    pub fn history(&self) -> &[NodeId] {
        &self.history
    }

    pub fn is_defeated(&self) -> bool {
        self.ledger.is_defeated()
    }

    /// Virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.timers.now()
    }

    fn consumed_here(&self) -> &ConsumedSet {
        &self.consumed[self.current.as_usize()]
    }

    pub fn is_consumed(&self, element: &str) -> bool {
        self.consumed_here().contains(element)
    }

    pub fn available_elements(&self) -> Vec<&Element> {
        graph::available_elements(self.current_node(), &self.ledger, self.consumed_here())
    }

    pub fn available_exits(&self) -> Vec<&Exit> {
        graph::available_exits(self.current_node(), &self.ledger)
    }

    pub fn element_choices(&self) -> Vec<Choice<'_, Element>> {
        graph::element_choices(self.current_node(), &self.ledger, self.consumed_here())
    }

    pub fn exit_choices(&self) -> Vec<Choice<'_, Exit>> {
        graph::exit_choices(self.current_node(), &self.ledger)
    }

    /// A typewriter for the current node's description.
    pub fn narration(&self) -> Typewriter {
        Typewriter::new(
            self.current_node().description.clone(),
            self.config.typing_ms_per_char,
        )
    }

    pub fn active_challenge(&self) -> Option<ChallengeStatus> {
        let active = self.active.as_ref()?;
        Some(ChallengeStatus {
            element: active.element.clone(),
            remaining_ms: self.timers.remaining(active.handle)?,
        })
    }

    /// Interact with an element of the current node.
    pub fn select_element(&mut self, element_id: &str) -> Result<InteractionReport, SessionError> {
        let graph = Arc::clone(&self.graph);
        let node = graph.get(self.current);
        let element = node
            .element(element_id)
            .ok_or_else(|| SessionError::UnknownElement {
                node: node.id.0.clone(),
                element: element_id.to_string(),
            })?;

        if self.is_consumed(element_id) {
            return Err(SessionError::ElementConsumed {
                node: node.id.0.clone(),
                element: element_id.to_string(),
            });
        }

        let unmet = requirement::unmet(element.requires.as_ref(), &self.ledger);
        if !unmet.is_empty() {
            warn!(node = %node.id, element = element_id, "element requirement not met");
            return Ok(self.report(node, element, InteractionOutcome::Blocked(unmet)));
        }

        match &element.kind {
            ElementKind::Reward => {
                self.apply_reward(&element.reward);
                self.consume(element_id);
                let mut report = self.report(node, element, InteractionOutcome::Granted);
                report.applied = element.reward.clone();
                Ok(report)
            }
            ElementKind::Challenge(challenge) => {
                if self.started.contains(element_id) {
                    return Err(SessionError::ChallengeAlreadyStarted(element_id.to_string()));
                }
                self.start_challenge(element_id, challenge);
                Ok(self.report(
                    node,
                    element,
                    InteractionOutcome::ChallengeStarted {
                        time_limit_ms: challenge.time_limit_ms,
                    },
                ))
            }
            ElementKind::Treasure(_) | ElementKind::Hazard(_) | ElementKind::Stealth(_) => {
                Ok(self.resolve_element(node, element))
            }
        }
    }

    fn resolve_element(&mut self, node: &NarrativeNode, element: &Element) -> InteractionReport {
        // Only called for outcome-bearing kinds.
        let Some(spec) = element.outcome() else {
            return self.report(node, element, InteractionOutcome::Granted);
        };
        let resolution = outcome::resolve(
            &spec,
            element.requires.as_ref(),
            &self.ledger,
            self.rng.as_mut(),
        );

        if resolution.success {
            let mut applied = element.reward.clone();
            if let ElementKind::Treasure(treasure) = &element.kind {
                applied.gold += treasure.value;
            }
            self.apply_reward(&applied);
            self.consume(&element.id);
            let mut report = self.report(node, element, InteractionOutcome::Succeeded(resolution));
            report.applied = applied;
            report
        } else {
            self.apply_reward(&element.failure);
            let damage = match &element.kind {
                ElementKind::Hazard(hazard) => hazard.damage,
                _ => 0,
            };
            if damage > 0 {
                let health = self.ledger.damage(damage);
                debug!(damage, health, "hazard damage applied");
                if health == 0 {
                    warn!(node = %node.id, element = %element.id, "player defeated");
                }
            }
            let mut report = self.report(node, element, InteractionOutcome::Failed(resolution));
            report.applied = element.failure.clone();
            report.damage = damage;
            report
        }
    }

    fn start_challenge(&mut self, element_id: &str, challenge: &TimedChallenge) {
        self.cancel_challenge();
        self.started.insert(element_id.to_string());
        let handle = self.timers.schedule(
            challenge.time_limit_ms,
            ChallengeExpiry {
                node: self.current,
                element: element_id.to_string(),
            },
        );
        self.active = Some(ActiveChallenge {
            node: self.current,
            element: element_id.to_string(),
            handle,
        });
        info!(
            element = element_id,
            time_limit_ms = challenge.time_limit_ms,
            "challenge started"
        );
    }

    /// Cancel the running countdown, if any. No ledger change.
    pub fn cancel_challenge(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                self.timers.cancel(active.handle);
                debug!(element = %active.element, "challenge cancelled");
                true
            }
            None => false,
        }
    }

    /// Act on the running challenge before its countdown expires.
    pub fn attempt_challenge(&mut self) -> Result<InteractionReport, SessionError> {
        let active = self.active.take().ok_or(SessionError::NoActiveChallenge)?;
        self.timers.cancel(active.handle);

        let graph = Arc::clone(&self.graph);
        let node = graph.get(active.node);
        let element = node
            .element(&active.element)
            .ok_or_else(|| SessionError::UnknownElement {
                node: node.id.0.clone(),
                element: active.element.clone(),
            })?;
        let ElementKind::Challenge(challenge) = &element.kind else {
            return Err(SessionError::NoActiveChallenge);
        };
        let Some(spec) = element.outcome() else {
            return Err(SessionError::NoActiveChallenge);
        };

        let resolution = outcome::resolve(
            &spec,
            element.requires.as_ref(),
            &self.ledger,
            self.rng.as_mut(),
        );
        let result = if resolution.success {
            InteractionOutcome::Succeeded(resolution)
        } else {
            InteractionOutcome::Failed(resolution)
        };
        Ok(self.finish_challenge(node, element, challenge, resolution.success, result))
    }

    /// Advance the virtual clock. Expired countdowns resolve as failures.
    pub fn advance_time(&mut self, elapsed_ms: u64) -> Vec<InteractionReport> {
        let graph = Arc::clone(&self.graph);
        let mut reports = Vec::new();
        for expiry in self.timers.advance(elapsed_ms) {
            let is_active = self
                .active
                .as_ref()
                .is_some_and(|a| a.node == expiry.node && a.element == expiry.element);
            if !is_active {
                continue;
            }
            self.active = None;

            let node = graph.get(expiry.node);
            let Some(element) = node.element(&expiry.element) else {
                continue;
            };
            let ElementKind::Challenge(challenge) = &element.kind else {
                continue;
            };
            warn!(node = %node.id, element = %element.id, "challenge timed out");
            reports.push(self.finish_challenge(
                node,
                element,
                challenge,
                false,
                InteractionOutcome::TimedOut,
            ));
        }
        reports
    }

    fn finish_challenge(
        &mut self,
        node: &NarrativeNode,
        element: &Element,
        challenge: &TimedChallenge,
        success: bool,
        result: InteractionOutcome,
    ) -> InteractionReport {
        let (branch, own) = if success {
            (&challenge.success, &element.reward)
        } else {
            (&challenge.failure, &element.failure)
        };
        let applied = own.merged(&branch.reward);
        self.apply_reward(&applied);
        self.consume(&element.id);

        let mut report = self.report(node, element, result);
        report.applied = applied;
        if let Some(next) = &branch.next {
            if let Some(index) = self.graph.index_of(next.as_str()) {
                self.enter(index);
                report.moved_to = Some(next.clone());
            }
        }
        report
    }

    /// Take an exit or dialogue option from the current node.
    pub fn select_exit(&mut self, exit_id: &str) -> Result<Transition, SessionError> {
        let graph = Arc::clone(&self.graph);
        let node = graph.get(self.current);
        let exit = node.exit(exit_id).ok_or_else(|| SessionError::UnknownExit {
            node: node.id.0.clone(),
            exit: exit_id.to_string(),
        })?;

        let unmet = requirement::unmet(exit.requires.as_ref(), &self.ledger);
        if !unmet.is_empty() {
            warn!(node = %node.id, exit = exit_id, "exit requirement not met");
            return Ok(Transition::Blocked(unmet));
        }

        let target = graph
            .index_of(exit.target.as_str())
            .ok_or_else(|| SessionError::UnknownNode(exit.target.0.clone()))?;
        self.apply_reward(&exit.reward);
        self.enter(target);
        Ok(Transition::Moved {
            from: node.id.clone(),
            to: exit.target.clone(),
        })
    }

    fn enter(&mut self, index: NodeIndex) {
        self.cancel_challenge();
        self.started.clear();
        let from = self.graph.get(self.current).id.clone();
        self.current = index;
        let to = self.graph.get(index).id.clone();
        info!(%from, %to, "entered node");
        self.history.push(to);
    }

    fn consume(&mut self, element_id: &str) {
        self.consumed[self.current.as_usize()].insert(element_id.to_string());
    }

    fn apply_reward(&mut self, reward: &Reward) {
        for (name, delta) in &reward.traits {
            self.ledger.add(name, *delta);
        }
        for item in &reward.items {
            self.ledger.grant_item(item);
        }
        if reward.gold != 0 {
            self.ledger.add_gold(reward.gold);
        }
        if !reward.is_empty() {
            debug!(
                traits = reward.traits.len(),
                items = reward.items.len(),
                gold = reward.gold,
                "reward applied"
            );
        }
    }

    fn report(
        &self,
        node: &NarrativeNode,
        element: &Element,
        outcome: InteractionOutcome,
    ) -> InteractionReport {
        InteractionReport {
            node: node.id.clone(),
            element: element.id.clone(),
            outcome,
            applied: Reward::default(),
            damage: 0,
            moved_to: None,
            defeated: self.ledger.is_defeated(),
        }
    }

    /// Capture the session for the save collaborator.
    pub fn snapshot(&self) -> SessionSnapshot {
        let consumed = self
            .graph
            .nodes()
            .zip(&self.consumed)
            .filter(|(_, set)| !set.is_empty())
            .map(|(node, set)| (node.id.clone(), set.iter().cloned().collect()))
            .collect();
        SessionSnapshot {
            current: self.current_node().id.clone(),
            ledger: self.ledger.snapshot(),
            consumed,
            history: self.history.clone(),
        }
    }

    /// Replace the session state with a snapshot. Pending countdowns are
    /// dropped. Snapshots naming unknown nodes are rejected untouched.
    pub fn restore(&mut self, snapshot: SessionSnapshot) -> Result<(), SessionError> {
        let current = self
            .graph
            .index_of(snapshot.current.as_str())
            .ok_or_else(|| SessionError::UnknownNode(snapshot.current.0.clone()))?;

        let mut consumed = vec![ConsumedSet::default(); self.graph.len()];
        for (id, elements) in snapshot.consumed {
            let index = self
                .graph
                .index_of(id.as_str())
                .ok_or_else(|| SessionError::UnknownNode(id.0.clone()))?;
            consumed[index.as_usize()].extend(elements);
        }

        self.cancel_challenge();
        self.timers.clear();
        self.started.clear();
        self.current = current;
        self.consumed = consumed;
        self.ledger = TraitLedger::restore(snapshot.ledger);
        self.history = if snapshot.history.is_empty() {
            vec![snapshot.current]
        } else {
            snapshot.history
        };
        info!(node = %self.current_node().id, "session restored");
        Ok(())
    }

    /// Start over: fresh ledger, nothing consumed, back at the start node.
    pub fn reset(&mut self) {
        self.cancel_challenge();
        self.timers.clear();
        self.started.clear();
        self.ledger = TraitLedger::with_health(self.config.starting_health);
        self.consumed = vec![ConsumedSet::default(); self.graph.len()];
        self.current = start_index(&self.graph, &self.config).unwrap_or(self.current);
        self.history = vec![self.current_node().id.clone()];
        info!(node = %self.current_node().id, "session reset");
    }
}

fn start_index(graph: &NarrativeGraph, config: &SessionConfig) -> Option<NodeIndex> {
    let start = config.start.as_deref().unwrap_or(graph.start().as_str());
    graph.index_of(start)
}

impl NarrativeSessionBuilder {
    /// Load every `.ron` node file in `path`.
    pub fn content_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.content_dirs.push(path.as_ref().to_path_buf());
        self
    }

    /// Load a single `.ron` node file.
    pub fn content_file(mut self, path: impl AsRef<Path>) -> Self {
        self.content_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Provide nodes directly (for testing without files).
    pub fn with_nodes(mut self, nodes: NodeSet) -> Self {
        self.nodes = Some(nodes);
        self
    }

    /// Share an already validated graph between sessions.
    pub fn with_graph(mut self, graph: Arc<NarrativeGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn start(mut self, node: &str) -> Self {
        self.config.start = Some(node.to_string());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn starting_health(mut self, health: i64) -> Self {
        self.config.starting_health = health;
        self
    }

    pub fn typing_ms_per_char(mut self, ms: u64) -> Self {
        self.config.typing_ms_per_char = ms;
        self
    }

    /// Replace the seeded generator (for scripted rolls in tests).
    pub fn random_source(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Start from an existing ledger instead of a fresh one.
    pub fn ledger(mut self, ledger: TraitLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn build(self) -> Result<NarrativeSession, SessionError> {
        let graph = match self.graph {
            Some(graph) => graph,
            None => {
                let mut nodes = self.nodes.unwrap_or_default();
                for path in &self.content_files {
                    nodes.merge(NodeSet::load_from_ron(path)?);
                }
                for dir in &self.content_dirs {
                    nodes.merge(NodeSet::load_from_dir(dir)?);
                }
                let start = match (&self.config.start, nodes.nodes.first()) {
                    (Some(start), _) => start.clone(),
                    (None, Some(first)) => first.id.0.clone(),
                    (None, None) => return Err(SessionError::NoContent),
                };
                Arc::new(NarrativeGraph::new(nodes, &start)?)
            }
        };

        let current = start_index(&graph, &self.config).ok_or_else(|| {
            SessionError::UnknownNode(self.config.start.clone().unwrap_or_default())
        })?;
        let ledger = self
            .ledger
            .unwrap_or_else(|| TraitLedger::with_health(self.config.starting_health));
        let rng: Box<dyn RandomSource> = match self.rng {
            Some(rng) => rng,
            None => Box::new(StdRng::seed_from_u64(self.config.seed)),
        };

        let start_id = graph.get(current).id.clone();
        info!(start = %start_id, seed = self.config.seed, "session started");

        Ok(NarrativeSession {
            consumed: vec![ConsumedSet::default(); graph.len()],
            history: vec![start_id],
            graph,
            ledger,
            current,
            timers: Scheduler::new(),
            active: None,
            started: ConsumedSet::default(),
            rng,
            config: self.config,
        })
    }
}
