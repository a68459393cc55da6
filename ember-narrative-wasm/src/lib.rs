//! WASM bindings for ember-narrative: powers the browser build of The Ember Throne Chronicles.

use std::sync::Arc;
use wasm_bindgen::prelude::*;

use ember_narrative::core::config::SessionConfig;
use ember_narrative::core::graph::{Choice, NarrativeGraph, NodeSet};
use ember_narrative::core::session::{ChallengeStatus, NarrativeSession, SessionSnapshot};
use ember_narrative::schema::ledger::LedgerSnapshot;
use ember_narrative::schema::node::{Element, Exit};

// ---------------------------------------------------------------------------
// Embedded content: compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const DUNGEON: &str = include_str!("../../content/ember_throne/dungeon.ron");
    pub const FOREST: &str = include_str!("../../content/ember_throne/forest.ron");
    pub const SESSION: &str = include_str!("../../content/session.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct NodeView<'a> {
    id: &'a str,
    title: &'a str,
    description: &'a str,
    elements: Vec<Choice<'a, Element>>,
    exits: Vec<Choice<'a, Exit>>,
    ledger: LedgerSnapshot,
    challenge: Option<ChallengeStatus>,
    defeated: bool,
    now_ms: u64,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn load_graph(config: &SessionConfig) -> Result<Arc<NarrativeGraph>, JsError> {
    let mut nodes = NodeSet::parse_ron(data::DUNGEON)
        .map_err(|e| JsError::new(&format!("Content parse error: {e}")))?;
    nodes.merge(
        NodeSet::parse_ron(data::FOREST)
            .map_err(|e| JsError::new(&format!("Content parse error: {e}")))?,
    );
    let start = config
        .start
        .clone()
        .unwrap_or_else(|| "forest-journey".to_string());
    let graph = NarrativeGraph::new(nodes, &start)
        .map_err(|e| JsError::new(&format!("Content validation error: {e}")))?;
    Ok(Arc::new(graph))
}

// ---------------------------------------------------------------------------
// EmberSession: the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct EmberSession {
    session: NarrativeSession,
}

#[wasm_bindgen]
impl EmberSession {
    /// Start a new play session with the given seed.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Result<EmberSession, JsError> {
        let mut config = SessionConfig::parse_ron(data::SESSION)
            .map_err(|e| JsError::new(&format!("Config parse error: {e}")))?;
        config.seed = seed;

        let session = NarrativeSession::builder()
            .with_graph(load_graph(&config)?)
            .config(config)
            .build()
            .map_err(|e| JsError::new(&format!("Session build error: {e}")))?;

        Ok(EmberSession { session })
    }

    /// JSON view of the current node: text, choices with their enabled
    /// state, the ledger and any running countdown.
    pub fn view(&self) -> Result<String, JsError> {
        let node = self.session.current_node();
        let view = NodeView {
            id: node.id.as_str(),
            title: &node.title,
            description: &node.description,
            elements: self.session.element_choices(),
            exits: self.session.exit_choices(),
            ledger: self.session.ledger().snapshot(),
            challenge: self.session.active_challenge(),
            defeated: self.session.is_defeated(),
            now_ms: self.session.now_ms(),
        };
        to_json(&view)
    }

    /// Interact with an element. Returns the interaction report as JSON.
    pub fn select_element(&mut self, element_id: &str) -> Result<String, JsError> {
        let report = self
            .session
            .select_element(element_id)
            .map_err(|e| JsError::new(&e.to_string()))?;
        to_json(&report)
    }

    /// Take an exit or dialogue option. Returns the transition as JSON.
    pub fn select_exit(&mut self, exit_id: &str) -> Result<String, JsError> {
        let transition = self
            .session
            .select_exit(exit_id)
            .map_err(|e| JsError::new(&e.to_string()))?;
        to_json(&transition)
    }

    /// Act on the running challenge.
    pub fn attempt_challenge(&mut self) -> Result<String, JsError> {
        let report = self
            .session
            .attempt_challenge()
            .map_err(|e| JsError::new(&e.to_string()))?;
        to_json(&report)
    }

    /// Advance the clock from the page's animation loop. Returns a JSON
    /// array of reports for any countdown that ran out.
    pub fn tick(&mut self, elapsed_ms: u32) -> Result<String, JsError> {
        let reports = self.session.advance_time(u64::from(elapsed_ms));
        to_json(&reports)
    }

    /// Serialize the session for local storage.
    pub fn save(&self) -> Result<String, JsError> {
        to_json(&self.session.snapshot())
    }

    /// Restore a session saved with [`save`](Self::save).
    pub fn load(&mut self, snapshot_json: &str) -> Result<(), JsError> {
        let snapshot: SessionSnapshot = serde_json::from_str(snapshot_json)
            .map_err(|e| JsError::new(&format!("Invalid save JSON: {e}")))?;
        self.session
            .restore(snapshot)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Start over from the first node.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Milliseconds per revealed character for the typing animation.
    pub fn typing_ms_per_char(&self) -> u32 {
        u32::try_from(self.session.config().typing_ms_per_char).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_content_builds() {
        let config = SessionConfig::parse_ron(data::SESSION).unwrap();
        let session = NarrativeSession::builder()
            .with_graph(load_graph(&config).ok().unwrap())
            .config(config)
            .build()
            .unwrap();
        assert_eq!(session.current_node().id.as_str(), "forest-journey");
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let config = SessionConfig::parse_ron(data::SESSION).unwrap();
        let mut session = NarrativeSession::builder()
            .with_graph(load_graph(&config).ok().unwrap())
            .config(config)
            .build()
            .unwrap();
        session.select_element("abandoned_pack").unwrap();
        session.select_exit("take_time").unwrap();

        let json = serde_json::to_string(&session.snapshot()).unwrap();
        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session.snapshot());
    }
}
