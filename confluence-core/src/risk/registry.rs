//! PositionRegistry — at most one open position per symbol.

use std::collections::BTreeMap;

use crate::domain::Position;

/// Open positions keyed by symbol, iterated in symbol order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionRegistry {
    positions: BTreeMap<String, Position>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `position`, returning any position it replaced.
    pub fn open(&mut self, position: Position) -> Option<Position> {
        self.positions.insert(position.symbol.clone(), position)
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn get_mut(&mut self, symbol: &str) -> Option<&mut Position> {
        self.positions.get_mut(symbol)
    }

    pub fn remove(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}
