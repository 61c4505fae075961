use crate::domain::value_objects::ConsumableKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 消費型アイテムの残高。値は常に 0 以上。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumableBalance(BTreeMap<ConsumableKind, u32>);

impl ConsumableBalance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ConsumableKind, quantity: u32) -> Self {
        self.set(kind, quantity);
        self
    }

    pub fn get(&self, kind: ConsumableKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn set(&mut self, kind: ConsumableKind, quantity: u32) {
        if quantity == 0 {
            self.0.remove(&kind);
        } else {
            self.0.insert(kind, quantity);
        }
    }

    /// 符号付きの差分を適用する。結果は 0 で下限クランプされる。
    pub fn apply_delta(&mut self, kind: ConsumableKind, delta: i64) {
        let next = (self.get(kind) as i64).saturating_add(delta);
        self.set(kind, next.clamp(0, u32::MAX as i64) as u32);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConsumableKind, u32)> + '_ {
        self.0.iter().map(|(kind, quantity)| (*kind, *quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_delta_clamps_at_zero() {
        let mut balance = ConsumableBalance::new().with(ConsumableKind::Boost, 2);
        balance.apply_delta(ConsumableKind::Boost, -5);
        assert_eq!(balance.get(ConsumableKind::Boost), 0);
        assert!(balance.is_empty());
    }

    #[test]
    fn test_missing_kind_reads_as_zero() {
        let balance = ConsumableBalance::new().with(ConsumableKind::SuperLike, 3);
        assert_eq!(balance.get(ConsumableKind::SuperLike), 3);
        assert_eq!(balance.get(ConsumableKind::Gift), 0);
    }
}
