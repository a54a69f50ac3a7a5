//! Wrapper rules, one handler per wrapper kind.
//!
//! RULE: Every wrapper kind is handled by a WrapperRule.
//! A rule decides how much of an incoming amount stays with the target
//! account and how much is redirected to the pot's GIA account.
//! It never writes; the engine persists what the rule decides.
//!
//! Adding a wrapper kind means adding a variant and registering a rule,
//! not editing a shared conditional.

use crate::{
    error::{AllocError, AllocResult},
    ledger::ContributionLedger,
    models::{Account, WrapperKind},
    types::{ClientId, MinorUnits},
};

/// How one incoming amount is divided. `retained + redirected` always
/// equals the amount handed to the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOutcome {
    pub retained: MinorUnits,
    pub redirected: MinorUnits,
}

impl RuleOutcome {
    pub fn retain(amount: MinorUnits) -> Self {
        Self { retained: amount, redirected: 0 }
    }

    pub fn redirect(amount: MinorUnits) -> Self {
        Self { retained: 0, redirected: amount }
    }

    pub fn total(&self) -> AllocResult<MinorUnits> {
        self.retained
            .checked_add(self.redirected)
            .ok_or(AllocError::InvalidAmount { amount: self.retained })
    }
}

/// The contract every wrapper handler must fulfil.
pub trait WrapperRule: Send {
    /// The wrapper kind this rule handles.
    fn kind(&self) -> WrapperKind;

    /// Error stage label, e.g. "processing SIPP allocation".
    fn stage(&self) -> &'static str;

    /// Decide the split of `amount` destined for `account`.
    ///
    /// `ledger` reads inside the caller's transaction, so amounts retained
    /// earlier in the same receipt are already counted.
    fn apply(
        &self,
        ledger: &dyn ContributionLedger,
        client_id: ClientId,
        account: &Account,
        amount: MinorUnits,
    ) -> AllocResult<RuleOutcome>;
}

// ── Ceiling rule (SIPP, ISA) ───────────────────────────────────────

/// Retain up to a lifetime contribution ceiling, redirect the overflow.
#[derive(Debug, Clone, Copy)]
pub struct CeilingRule {
    kind: WrapperKind,
    ceiling: MinorUnits,
    stage: &'static str,
}

impl CeilingRule {
    pub fn new(kind: WrapperKind, ceiling: MinorUnits, stage: &'static str) -> Self {
        Self { kind, ceiling, stage }
    }

    pub fn sipp(ceiling: MinorUnits) -> Self {
        Self::new(WrapperKind::Sipp, ceiling, "processing SIPP allocation")
    }

    pub fn isa(ceiling: MinorUnits) -> Self {
        Self::new(WrapperKind::Isa, ceiling, "processing ISA allocation")
    }

    /// Pure limit arithmetic, given the client's current total.
    ///
    /// When the current total is already above the ceiling the overflow is
    /// capped at `amount`: nothing is retained and nothing is lost.
    /// A total that does not fit in `MinorUnits` is an `InvalidAmount`.
    pub fn divide(&self, current: MinorUnits, amount: MinorUnits) -> AllocResult<RuleOutcome> {
        let projected = current
            .checked_add(amount)
            .ok_or(AllocError::InvalidAmount { amount })?;
        if projected <= self.ceiling {
            return Ok(RuleOutcome::retain(amount));
        }
        let overflow = (projected - self.ceiling).min(amount);
        Ok(RuleOutcome {
            retained: amount - overflow,
            redirected: overflow,
        })
    }
}

impl WrapperRule for CeilingRule {
    fn kind(&self) -> WrapperKind {
        self.kind
    }

    fn stage(&self) -> &'static str {
        self.stage
    }

    fn apply(
        &self,
        ledger: &dyn ContributionLedger,
        client_id: ClientId,
        account: &Account,
        amount: MinorUnits,
    ) -> AllocResult<RuleOutcome> {
        let current = ledger.current_allocated(self.kind, client_id)?;
        let outcome = self.divide(current, amount)?;
        if outcome.redirected > 0 {
            log::warn!(
                "{} ceiling {} breached for client {client_id} (current {current}, incoming {amount}); \
                 redirecting {} from account {} to pot {} GIA",
                self.kind,
                self.ceiling,
                outcome.redirected,
                account.id,
                account.pot_id,
            );
        }
        Ok(outcome)
    }
}

// ── Redirect rule (GIA, unclassified) ──────────────────────────────

/// Send the whole amount to the pot's GIA account.
#[derive(Debug, Clone, Copy)]
pub struct RedirectRule {
    kind: WrapperKind,
}

impl RedirectRule {
    pub const fn new(kind: WrapperKind) -> Self {
        Self { kind }
    }
}

impl WrapperRule for RedirectRule {
    fn kind(&self) -> WrapperKind {
        self.kind
    }

    fn stage(&self) -> &'static str {
        "processing GIA allocation"
    }

    fn apply(
        &self,
        _ledger: &dyn ContributionLedger,
        _client_id: ClientId,
        _account: &Account,
        amount: MinorUnits,
    ) -> AllocResult<RuleOutcome> {
        Ok(RuleOutcome::redirect(amount))
    }
}
