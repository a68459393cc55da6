/// Requirement evaluation: pure reads of a [`TraitView`].
use serde::Serialize;

use crate::schema::ledger::TraitView;
use crate::schema::requirement::RequirementSpec;

/// True iff every trait minimum is met and every item is owned.
/// An absent or empty spec always satisfies.
pub fn satisfies<V: TraitView + ?Sized>(spec: Option<&RequirementSpec>, ledger: &V) -> bool {
    let Some(spec) = spec else {
        return true;
    };
    spec.traits
        .iter()
        .all(|(name, min)| ledger.trait_value(name) >= *min)
        && spec.items.iter().all(|id| ledger.has_item(id))
}

/// A single failing requirement entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Unmet {
    Trait { name: String, required: i64, actual: i64 },
    Item(String),
}

/// List the entries of `spec` the ledger does not meet, in spec order.
pub fn unmet<V: TraitView + ?Sized>(spec: Option<&RequirementSpec>, ledger: &V) -> Vec<Unmet> {
    let Some(spec) = spec else {
        return Vec::new();
    };
    let mut missing = Vec::new();
    for (name, min) in &spec.traits {
        let actual = ledger.trait_value(name);
        if actual < *min {
            missing.push(Unmet::Trait {
                name: name.clone(),
                required: *min,
                actual,
            });
        }
    }
    for id in &spec.items {
        if !ledger.has_item(id) {
            missing.push(Unmet::Item(id.clone()));
        }
    }
    missing
}
