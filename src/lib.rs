//! Ember Narrative: the requirement-gated narrative state machine behind
//! The Ember Throne Chronicles.
//!
//! Rooms, pages and dialogue steps are data: nodes with gated elements and
//! exits, loaded from RON and validated up front. A session threads one
//! trait ledger through every choice, rolls randomized outcomes from an
//! injected random source and drives time-boxed challenges on a virtual
//! clock.

pub mod core;
pub mod schema;
