//! Integration tests for the wrapper rules.
//!
//! The rules are exercised against a fixed ledger so the limit arithmetic
//! can be checked without a database.

use allocation_core::{
    config::{YEARLY_ISA_LIMIT, YEARLY_PENSION_LIMIT},
    error::{AllocError, AllocResult},
    ledger::ContributionLedger,
    models::{Account, WrapperKind},
    rules::{CeilingRule, RedirectRule, RuleOutcome, WrapperRule},
    types::{ClientId, MinorUnits},
};
use std::cell::RefCell;

/// Returns a fixed total and records what it was asked for.
struct FixedLedger {
    total: MinorUnits,
    asked: RefCell<Vec<(WrapperKind, ClientId)>>,
}

impl FixedLedger {
    fn new(total: MinorUnits) -> Self {
        Self { total, asked: RefCell::new(Vec::new()) }
    }
}

impl ContributionLedger for FixedLedger {
    fn current_allocated(&self, wrapper: WrapperKind, client_id: ClientId) -> AllocResult<MinorUnits> {
        self.asked.borrow_mut().push((wrapper, client_id));
        Ok(self.total)
    }
}

struct FailingLedger;

impl ContributionLedger for FailingLedger {
    fn current_allocated(&self, _: WrapperKind, _: ClientId) -> AllocResult<MinorUnits> {
        Err(AllocError::Other(anyhow::anyhow!("connection reset")))
    }
}

fn account(wrapper: WrapperKind) -> Account {
    Account {
        id: 1,
        pot_id: 7,
        wrapper,
        created_at: allocation_core::models::now(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ceiling arithmetic
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn under_ceiling_retains_everything() {
    let rule = CeilingRule::sipp(YEARLY_PENSION_LIMIT);
    assert_eq!(rule.divide(0, 1_000).unwrap(), RuleOutcome::retain(1_000));
}

#[test]
fn landing_exactly_on_ceiling_retains_everything() {
    let rule = CeilingRule::isa(YEARLY_ISA_LIMIT);
    assert_eq!(
        rule.divide(YEARLY_ISA_LIMIT - 1_000, 1_000).unwrap(),
        RuleOutcome::retain(1_000)
    );
}

#[test]
fn crossing_ceiling_splits_at_the_limit() {
    let rule = CeilingRule::sipp(YEARLY_PENSION_LIMIT);
    let outcome = rule.divide(YEARLY_PENSION_LIMIT - 400, 1_000).unwrap();
    assert_eq!(outcome.retained, 400);
    assert_eq!(outcome.redirected, 600);
    assert_eq!(outcome.total().unwrap(), 1_000);
}

#[test]
fn at_ceiling_redirects_everything() {
    let rule = CeilingRule::sipp(YEARLY_PENSION_LIMIT);
    assert_eq!(
        rule.divide(YEARLY_PENSION_LIMIT, 1_000).unwrap(),
        RuleOutcome::redirect(1_000)
    );
}

#[test]
fn above_ceiling_caps_overflow_at_incoming_amount() {
    let rule = CeilingRule::isa(YEARLY_ISA_LIMIT);
    let outcome = rule.divide(YEARLY_ISA_LIMIT + 50_000, 1_000).unwrap();
    assert_eq!(outcome, RuleOutcome::redirect(1_000));
}

#[test]
fn total_past_i64_is_rejected_not_wrapped() {
    let rule = CeilingRule::sipp(YEARLY_PENSION_LIMIT);
    assert!(matches!(
        rule.divide(i64::MAX - 10, 1_000),
        Err(AllocError::InvalidAmount { amount: 1_000 })
    ));

    let ledger = FixedLedger::new(i64::MAX);
    let err = rule
        .apply(&ledger, 1, &account(WrapperKind::Sipp), 1)
        .unwrap_err();
    assert!(matches!(err, AllocError::InvalidAmount { amount: 1 }));
}

#[test]
fn outcome_total_past_i64_is_rejected() {
    let outcome = RuleOutcome { retained: i64::MAX, redirected: 1 };
    assert!(outcome.total().is_err());
}

// ─────────────────────────────────────────────────────────────────────────────
// Rule dispatch against a ledger
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn ceiling_rule_reads_its_own_wrapper_for_the_client() {
    let ledger = FixedLedger::new(0);
    let rule = CeilingRule::sipp(YEARLY_PENSION_LIMIT);
    let outcome = rule
        .apply(&ledger, 2, &account(WrapperKind::Sipp), 1_000)
        .unwrap();

    assert_eq!(outcome, RuleOutcome::retain(1_000));
    assert_eq!(*ledger.asked.borrow(), vec![(WrapperKind::Sipp, 2)]);
}

#[test]
fn isa_rule_at_ceiling_redirects() {
    let ledger = FixedLedger::new(YEARLY_ISA_LIMIT);
    let rule = CeilingRule::isa(YEARLY_ISA_LIMIT);
    let outcome = rule
        .apply(&ledger, 3, &account(WrapperKind::Isa), 1_000)
        .unwrap();
    assert_eq!(outcome, RuleOutcome::redirect(1_000));
}

#[test]
fn ledger_failure_is_surfaced() {
    let rule = CeilingRule::sipp(YEARLY_PENSION_LIMIT);
    let err = rule
        .apply(&FailingLedger, 1, &account(WrapperKind::Sipp), 1_000)
        .unwrap_err();
    assert!(err.to_string().contains("connection reset"));
}

#[test]
fn redirect_rule_never_reads_the_ledger() {
    let ledger = FixedLedger::new(0);
    let rule = RedirectRule::new(WrapperKind::Unclassified);
    let outcome = rule
        .apply(&ledger, 1, &account(WrapperKind::Unclassified), 2_500)
        .unwrap();
    assert_eq!(outcome, RuleOutcome::redirect(2_500));
    assert!(ledger.asked.borrow().is_empty());
}

#[test]
fn rule_stages_name_their_wrapper() {
    assert_eq!(CeilingRule::sipp(1).stage(), "processing SIPP allocation");
    assert_eq!(CeilingRule::isa(1).stage(), "processing ISA allocation");
    assert_eq!(
        RedirectRule::new(WrapperKind::Gia).stage(),
        "processing GIA allocation"
    );
}
