//! Resource stockpiles.

use crate::types::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A faction's stockpile, keyed by resource name in the game document.
///
/// Amounts are unsigned, so a stockpile can never go negative; spending
/// more than is held fails without touching the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resources(BTreeMap<ResourceKind, u32>);

/// Not enough of one resource to pay a cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("not enough {kind}: need {needed}, have {available}")]
pub struct ResourceShortfall {
    pub kind: ResourceKind,
    pub needed: u32,
    pub available: u32,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stockpile from `(kind, amount)` pairs.
    pub fn from_pairs(pairs: &[(ResourceKind, u32)]) -> Self {
        let mut resources = Self::new();
        for &(kind, amount) in pairs {
            resources.add(kind, amount);
        }
        resources
    }

    /// Amount held; zero for resources never recorded.
    pub fn get(&self, kind: ResourceKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn add(&mut self, kind: ResourceKind, amount: u32) {
        let entry = self.0.entry(kind).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// First resource that falls short of the cost, if any.
    ///
    /// Entries naming the same kind more than once are summed.
    pub fn shortfall(&self, cost: &[(ResourceKind, u32)]) -> Option<ResourceShortfall> {
        total_cost(cost).into_iter().find_map(|(kind, needed)| {
            let available = self.get(kind);
            (available < needed).then_some(ResourceShortfall {
                kind,
                needed,
                available,
            })
        })
    }

    /// Deduct a cost, all or nothing.
    pub fn spend(&mut self, cost: &[(ResourceKind, u32)]) -> Result<(), ResourceShortfall> {
        if let Some(shortfall) = self.shortfall(cost) {
            return Err(shortfall);
        }
        for (kind, amount) in total_cost(cost) {
            let entry = self.0.entry(kind).or_insert(0);
            *entry = entry.saturating_sub(amount);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }
}

fn total_cost(cost: &[(ResourceKind, u32)]) -> BTreeMap<ResourceKind, u32> {
    let mut totals = BTreeMap::new();
    for &(kind, amount) in cost {
        let entry = totals.entry(kind).or_insert(0u32);
        *entry = entry.saturating_add(amount);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut r = Resources::new();
        assert_eq!(r.get(ResourceKind::Gold), 0);
        r.add(ResourceKind::Gold, 5);
        r.add(ResourceKind::Gold, 7);
        assert_eq!(r.get(ResourceKind::Gold), 12);
    }

    #[test]
    fn test_spend_all_or_nothing() {
        let mut r = Resources::from_pairs(&[(ResourceKind::Gold, 10), (ResourceKind::Wood, 2)]);
        let err = r
            .spend(&[(ResourceKind::Gold, 5), (ResourceKind::Wood, 3)])
            .unwrap_err();
        assert_eq!(err.kind, ResourceKind::Wood);
        assert_eq!(r.get(ResourceKind::Gold), 10);

        r.spend(&[(ResourceKind::Gold, 5), (ResourceKind::Wood, 2)])
            .unwrap();
        assert_eq!(r.get(ResourceKind::Gold), 5);
        assert_eq!(r.get(ResourceKind::Wood), 0);
    }

    #[test]
    fn test_spend_sums_repeated_kinds() {
        let mut r = Resources::from_pairs(&[(ResourceKind::Gold, 10)]);
        let err = r
            .spend(&[(ResourceKind::Gold, 6), (ResourceKind::Gold, 6)])
            .unwrap_err();
        assert_eq!(err.needed, 12);
        assert_eq!(err.available, 10);
        assert_eq!(r.get(ResourceKind::Gold), 10);

        r.spend(&[(ResourceKind::Gold, 4), (ResourceKind::Gold, 5)])
            .unwrap();
        assert_eq!(r.get(ResourceKind::Gold), 1);
    }

    #[test]
    fn test_serializes_by_name() {
        let r = Resources::from_pairs(&[(ResourceKind::Gold, 3), (ResourceKind::Iron, 1)]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"gold":3,"iron":1}"#);
    }
}
