/// Trait ledger: the player's accumulated traits, owned items and vitals.
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Health a fresh character starts with.
pub const DEFAULT_HEALTH: i64 = 20;

/// Read-only view over trait values and item ownership.
///
/// Requirement checks and outcome rolls only ever see this interface, so
/// they cannot mutate the ledger while evaluating.
pub trait TraitView {
    /// Current value of a trait; traits never granted read as 0.
    fn trait_value(&self, name: &str) -> i64;

    /// Whether the item is owned.
    fn has_item(&self, id: &str) -> bool;
}

/// Health and gold. Not traits: they move by damage and treasure,
/// not by narrative choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: i64,
    pub gold: i64,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            health: DEFAULT_HEALTH,
            gold: 0,
        }
    }
}

/// Named trait values plus the set of owned item identifiers.
///
/// Created once per play session and threaded explicitly through the
/// session; there is no ambient global copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "LedgerSnapshot", from = "LedgerSnapshot")]
pub struct TraitLedger {
    traits: FxHashMap<String, i64>,
    inventory: FxHashSet<String>,
    vitals: Vitals,
}

impl TraitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh ledger with the given starting health.
    pub fn with_health(health: i64) -> Self {
        Self {
            vitals: Vitals {
                health: health.max(0),
                gold: 0,
            },
            ..Self::default()
        }
    }

    /// Current value of `name`, 0 when never granted.
    pub fn get(&self, name: &str) -> i64 {
        self.traits.get(name).copied().unwrap_or(0)
    }

    /// Adjust a trait by an additive delta.
    pub fn add(&mut self, name: &str, delta: i64) {
        let value = self.traits.entry(name.to_string()).or_insert(0);
        *value = value.saturating_add(delta);
    }

    pub fn has_item(&self, id: &str) -> bool {
        self.inventory.contains(id)
    }

    /// Grant an item. Granting an owned item is a no-op.
    /// Returns true if the item was newly added.
    pub fn grant_item(&mut self, id: &str) -> bool {
        if self.inventory.contains(id) {
            return false;
        }
        self.inventory.insert(id.to_string())
    }

    pub fn traits(&self) -> impl Iterator<Item = (&str, i64)> {
        self.traits.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.inventory.iter().map(String::as_str)
    }

    pub fn vitals(&self) -> Vitals {
        self.vitals
    }

    pub fn health(&self) -> i64 {
        self.vitals.health
    }

    pub fn gold(&self) -> i64 {
        self.vitals.gold
    }

    /// Apply damage, saturating at zero. Returns the remaining health.
    pub fn damage(&mut self, amount: i64) -> i64 {
        self.vitals.health = self.vitals.health.saturating_sub(amount.max(0)).max(0);
        self.vitals.health
    }

    pub fn add_gold(&mut self, amount: i64) {
        self.vitals.gold = self.vitals.gold.saturating_add(amount);
    }

    pub fn is_defeated(&self) -> bool {
        self.vitals.health <= 0
    }

    /// Plain key/value snapshot for the save collaborator.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            traits: self.traits.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            inventory: self.inventory.iter().cloned().collect(),
            health: self.vitals.health,
            gold: self.vitals.gold,
        }
    }

    /// Rebuild a ledger from a snapshot. Lossless inverse of [`snapshot`](Self::snapshot).
    pub fn restore(snapshot: LedgerSnapshot) -> Self {
        Self {
            traits: snapshot.traits.into_iter().collect(),
            inventory: snapshot.inventory.into_iter().collect(),
            vitals: Vitals {
                health: snapshot.health,
                gold: snapshot.gold,
            },
        }
    }
}

impl TraitView for TraitLedger {
    fn trait_value(&self, name: &str) -> i64 {
        self.get(name)
    }

    fn has_item(&self, id: &str) -> bool {
        TraitLedger::has_item(self, id)
    }
}

/// Ordered, serializable form of a [`TraitLedger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub traits: BTreeMap<String, i64>,
    #[serde(default)]
    pub inventory: BTreeSet<String>,
    #[serde(default = "default_health")]
    pub health: i64,
    #[serde(default)]
    pub gold: i64,
}

fn default_health() -> i64 {
    DEFAULT_HEALTH
}

impl From<TraitLedger> for LedgerSnapshot {
    fn from(ledger: TraitLedger) -> Self {
        ledger.snapshot()
    }
}

impl From<LedgerSnapshot> for TraitLedger {
    fn from(snapshot: LedgerSnapshot) -> Self {
        TraitLedger::restore(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ledger() -> TraitLedger {
        let mut ledger = TraitLedger::new();
        ledger.add("observant", 2);
        ledger.add("brave", 1);
        ledger.grant_item("antidote");
        ledger.grant_item("floor_map");
        ledger
    }

    #[test]
    fn missing_trait_reads_zero() {
        let ledger = TraitLedger::new();
        assert_eq!(ledger.get("stealth"), 0);
        assert!(!ledger.has_item("guard_key"));
    }

    #[test]
    fn add_is_additive() {
        let mut ledger = TraitLedger::new();
        ledger.add("cautious", 1);
        ledger.add("cautious", 2);
        ledger.add("cautious", -1);
        assert_eq!(ledger.get("cautious"), 2);
    }

    #[test]
    fn counters_saturate() {
        let mut ledger = TraitLedger::new();
        ledger.add("brave", i64::MAX);
        ledger.add("brave", 1);
        assert_eq!(ledger.get("brave"), i64::MAX);
        ledger.add_gold(i64::MAX);
        ledger.add_gold(i64::MAX);
        assert_eq!(ledger.gold(), i64::MAX);
        assert_eq!(ledger.damage(i64::MAX), 0);
    }

    #[test]
    fn grant_item_is_idempotent() {
        let mut ledger = TraitLedger::new();
        assert!(ledger.grant_item("golden_key"));
        assert!(!ledger.grant_item("golden_key"));
        assert_eq!(ledger.items().count(), 1);
    }

    #[test]
    fn damage_saturates_at_zero() {
        let mut ledger = TraitLedger::with_health(5);
        assert_eq!(ledger.damage(3), 2);
        assert!(!ledger.is_defeated());
        assert_eq!(ledger.damage(10), 0);
        assert!(ledger.is_defeated());
    }

    #[test]
    fn default_vitals() {
        let ledger = TraitLedger::new();
        assert_eq!(ledger.health(), DEFAULT_HEALTH);
        assert_eq!(ledger.gold(), 0);
    }

    #[test]
    fn snapshot_restore_is_lossless() {
        let mut ledger = make_ledger();
        ledger.add_gold(150);
        ledger.damage(4);
        let restored = TraitLedger::restore(ledger.snapshot());
        assert_eq!(restored, ledger);
    }

    #[test]
    fn snapshot_is_ordered() {
        let snapshot = make_ledger().snapshot();
        let keys: Vec<_> = snapshot.traits.keys().cloned().collect();
        assert_eq!(keys, vec!["brave".to_string(), "observant".to_string()]);
    }

    #[test]
    fn ron_round_trip_through_serde() {
        let ledger = make_ledger();
        let text = ron::to_string(&ledger).unwrap();
        let back: TraitLedger = ron::from_str(&text).unwrap();
        assert_eq!(back, ledger);
    }

    #[test]
    fn snapshot_missing_health_uses_default() {
        let snapshot: LedgerSnapshot = ron::from_str("(traits: {\"brave\": 1})").unwrap();
        assert_eq!(snapshot.health, DEFAULT_HEALTH);
        assert!(snapshot.inventory.is_empty());
    }
}
