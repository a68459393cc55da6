/// Outcome resolution: one random draw against a clamped success chance.
use rand::RngCore;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

use crate::schema::ledger::TraitView;
use crate::schema::node::OutcomeSpec;
use crate::schema::requirement::RequirementSpec;

/// Starting chance before bonuses.
pub const BASE_CHANCE: f64 = 0.5;
/// Added once per satisfied requirement entry.
pub const TRAIT_BONUS: f64 = 0.2;
/// Difficulty at which no penalty applies.
pub const BASELINE_DIFFICULTY: i64 = 2;
/// Chance removed per difficulty step above the baseline.
pub const DIFFICULTY_STEP: f64 = 0.1;
pub const MIN_CHANCE: f64 = 0.1;
/// Difficulties accepted at load time.
pub const DIFFICULTY_RANGE: std::ops::RangeInclusive<i64> = -100..=100;
pub const MAX_CHANCE: f64 = 0.9;

/// A source of uniform draws in `[0, 1)`.
///
/// Any `rand` generator works; tests and replays use [`ScriptedRolls`].
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl<R: RngCore> RandomSource for R {
    fn next_unit(&mut self) -> f64 {
        rand::Rng::gen::<f64>(self)
    }
}

/// Replays a fixed sequence of draws. Once exhausted, keeps returning
/// the last value (or 0.0 if it never had one).
#[derive(Debug, Clone, Default)]
pub struct ScriptedRolls {
    rolls: VecDeque<f64>,
    last: f64,
}

impl ScriptedRolls {
    pub fn new(rolls: impl IntoIterator<Item = f64>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            last: 0.0,
        }
    }

    pub fn push(&mut self, roll: f64) {
        self.rolls.push_back(roll);
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl RandomSource for ScriptedRolls {
    fn next_unit(&mut self) -> f64 {
        if let Some(roll) = self.rolls.pop_front() {
            self.last = roll;
        }
        self.last
    }
}

/// The result of a single outcome roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolution {
    pub success: bool,
    pub chance: f64,
    pub roll: f64,
}

/// Success chance for `outcome` given the element's requirement spec.
///
/// Every satisfied trait minimum adds [`TRAIT_BONUS`] (bonuses stack past
/// the ceiling before clamping), each difficulty step above
/// [`BASELINE_DIFFICULTY`] removes [`DIFFICULTY_STEP`], resistance is added
/// as-is, and the total is clamped to `[MIN_CHANCE, MAX_CHANCE]`.
pub fn success_chance<V: TraitView + ?Sized>(
    outcome: &OutcomeSpec,
    requires: Option<&RequirementSpec>,
    ledger: &V,
) -> f64 {
    let mut chance = BASE_CHANCE;

    if let Some(spec) = requires {
        for (name, min) in &spec.traits {
            if ledger.trait_value(name) >= *min {
                chance += TRAIT_BONUS;
            }
        }
    }

    chance -= (outcome.difficulty as f64 - BASELINE_DIFFICULTY as f64) * DIFFICULTY_STEP;
    chance += outcome.resistance;

    chance.clamp(MIN_CHANCE, MAX_CHANCE)
}

/// Resolve an outcome with exactly one draw from `rng`.
pub fn resolve<V, R>(
    outcome: &OutcomeSpec,
    requires: Option<&RequirementSpec>,
    ledger: &V,
    rng: &mut R,
) -> Resolution
where
    V: TraitView + ?Sized,
    R: RandomSource + ?Sized,
{
    let chance = success_chance(outcome, requires, ledger);
    let roll = rng.next_unit();
    let success = roll < chance;
    debug!(
        kind = outcome.kind.label(),
        difficulty = outcome.difficulty,
        chance,
        roll,
        success,
        "outcome resolved"
    );
    Resolution {
        success,
        chance,
        roll,
    }
}
