//! Data types shared by the narrative core: the ledger, requirements and
//! the static node definitions.

pub mod ledger;
pub mod node;
pub mod requirement;
