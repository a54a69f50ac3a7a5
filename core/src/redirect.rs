//! Per-receipt GIA redirection queue.
//!
//! Amounts a wrapper rule sends away from their target account are summed
//! per pot and written to the pot's GIA account once every proposed split
//! has been processed. The queue lives for one `allocate` call only.

use crate::{
    error::{AllocError, AllocResult},
    types::{MinorUnits, PotId},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GiaRedirects {
    by_pot: BTreeMap<PotId, MinorUnits>,
}

impl GiaRedirects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `amount` for the pot's GIA account. Zero is ignored.
    pub fn add(&mut self, pot_id: PotId, amount: MinorUnits) -> AllocResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let queued = self.by_pot.entry(pot_id).or_insert(0);
        *queued = queued
            .checked_add(amount)
            .ok_or(AllocError::InvalidAmount { amount })?;
        Ok(())
    }

    #[cfg(test)]
    fn get(&self, pot_id: PotId) -> MinorUnits {
        self.by_pot.get(&pot_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.by_pot.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_pot.len()
    }
}

impl IntoIterator for GiaRedirects {
    type Item = (PotId, MinorUnits);
    type IntoIter = std::collections::btree_map::IntoIter<PotId, MinorUnits>;

    /// Pots in ascending id order.
    fn into_iter(self) -> Self::IntoIter {
        self.by_pot.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_for_the_same_pot_accumulate() {
        let mut q = GiaRedirects::new();
        q.add(1, 10).unwrap();
        q.add(1, 5).unwrap();
        q.add(2, 5).unwrap();
        assert_eq!(q.get(1), 15);
        assert_eq!(q.get(2), 5);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn overflowing_pot_total_is_an_error() {
        let mut q = GiaRedirects::new();
        q.add(1, i64::MAX).unwrap();
        assert!(matches!(q.add(1, 1), Err(AllocError::InvalidAmount { amount: 1 })));
        assert_eq!(q.get(1), i64::MAX);
    }

    #[test]
    fn zero_is_not_queued() {
        let mut q = GiaRedirects::new();
        q.add(3, 0).unwrap();
        assert!(q.is_empty());
        assert_eq!(q.get(3), 0);
    }

    #[test]
    fn drains_in_pot_order() {
        let mut q = GiaRedirects::new();
        q.add(9, 1).unwrap();
        q.add(2, 1).unwrap();
        q.add(5, 1).unwrap();
        let pots: Vec<PotId> = q.into_iter().map(|(pot, _)| pot).collect();
        assert_eq!(pots, vec![2, 5, 9]);
    }
}
