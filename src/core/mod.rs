//! Runtime pieces: requirement evaluation, outcome rolls, the node graph
//! and the session that drives transitions.

pub mod config;
pub mod graph;
pub mod outcome;
pub mod requirement;
pub mod schedule;
pub mod session;
pub mod typewriter;
