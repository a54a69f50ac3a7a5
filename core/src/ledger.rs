//! Contribution ledger reader: how much a client has already put into
//! each wrapper.
//!
//! The total is a lifetime running sum. There is no tax-year window.

use crate::{
    error::AllocResult,
    models::WrapperKind,
    store::AllocStore,
    types::{ClientId, MinorUnits},
};

/// Read side of the allocation ledger, as seen by the wrapper rules.
pub trait ContributionLedger {
    /// Sum of live allocations into `wrapper` accounts owned by `client_id`.
    /// Returns 0 when nothing matches; storage failures are returned, never masked.
    fn current_allocated(&self, wrapper: WrapperKind, client_id: ClientId) -> AllocResult<MinorUnits>;
}

impl ContributionLedger for AllocStore {
    fn current_allocated(&self, wrapper: WrapperKind, client_id: ClientId) -> AllocResult<MinorUnits> {
        self.sum_allocated(wrapper, client_id).inspect_err(|e| {
            log::error!("Error reading current {wrapper} total for client {client_id}: {e}");
        })
    }
}
