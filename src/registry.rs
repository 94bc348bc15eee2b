//! Append-only, insertion-ordered store of registered operations.

use crate::operation::Operation;
use log::debug;

/// Position of an operation in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub usize);

/// Operations in the order they were registered. No update or delete.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: Vec<Operation>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an already validated operation.
    pub fn register(&mut self, operation: Operation) -> RecordId {
        let id = RecordId(self.operations.len());
        debug!("Registered {} operation as record {}", operation.kind(), id.0);
        self.operations.push(operation);
        id
    }

    /// Read-only view in insertion order.
    pub fn all(&self) -> &[Operation] {
        &self.operations
    }

    pub fn get(&self, id: RecordId) -> Option<&Operation> {
        self.operations.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Amount;
    use crate::operation::{OperationBase, Trade};
    use chrono::{FixedOffset, TimeZone};

    fn trade(symbol: &str) -> Operation {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2019, 5, 25, 0, 0, 0)
            .unwrap();
        Operation::Buy(Trade {
            base: OperationBase {
                date,
                id: None,
                brl_fees: Amount::ZERO,
                coin_symbol: symbol.to_string(),
                coin_quantity: Amount::ZERO,
            },
            brl_value: Amount::ZERO,
            buyer: None,
            seller: None,
        })
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut registry = OperationRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.register(trade("BTC")), RecordId(0));
        assert_eq!(registry.register(trade("ETH")), RecordId(1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_all_preserves_insertion_order() {
        let mut registry = OperationRegistry::new();
        for symbol in ["ETH", "BTC", "ADA"] {
            registry.register(trade(symbol));
        }
        let symbols: Vec<String> = registry
            .all()
            .iter()
            .map(|op| match op {
                Operation::Buy(t) => t.base.coin_symbol.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(symbols, vec!["ETH", "BTC", "ADA"]);
        assert!(registry.get(RecordId(1)).is_some());
        assert!(registry.get(RecordId(3)).is_none());
    }
}
