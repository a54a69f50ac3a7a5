//! Integration tests for deposit intake and deposit statements.

use allocation_core::{
    engine::AllocationEngine,
    error::AllocError,
    models::{NewDeposit, NewProposedAllocation, Receipt, WrapperKind},
};
use rust_decimal_macros::dec;

fn new_deposit(splits: &[(i64, rust_decimal::Decimal)]) -> NewDeposit {
    NewDeposit {
        client_id: 1,
        amount: 10_000_000,
        proposed_allocation: splits
            .iter()
            .map(|(account_id, split)| NewProposedAllocation {
                account_id: *account_id,
                split: *split,
            })
            .collect(),
    }
}

fn invalid_reason(err: AllocError) -> String {
    match err {
        AllocError::InvalidDeposit { reason } => reason,
        other => panic!("expected InvalidDeposit, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn full_split_is_valid() {
    let d = new_deposit(&[(1, dec!(0.56)), (2, dec!(0.24)), (4, dec!(0.20))]);
    assert!(d.validate().is_ok());
}

#[test]
fn split_over_one_hundred_percent_is_rejected() {
    let d = new_deposit(&[(1, dec!(0.6)), (2, dec!(0.5))]);
    assert_eq!(invalid_reason(d.validate().unwrap_err()), "Allocation split exceeds 100%");
}

#[test]
fn split_under_one_hundred_percent_is_rejected() {
    let d = new_deposit(&[(1, dec!(0.6)), (2, dec!(0.3))]);
    assert_eq!(
        invalid_reason(d.validate().unwrap_err()),
        "Allocation split requires 100% allocation"
    );
}

#[test]
fn empty_proposal_zero_split_and_bad_amount_are_rejected() {
    assert!(matches!(
        new_deposit(&[]).validate(),
        Err(AllocError::InvalidDeposit { .. })
    ));
    assert!(matches!(
        new_deposit(&[(1, dec!(0)), (2, dec!(1))]).validate(),
        Err(AllocError::InvalidSplit { .. })
    ));

    let mut d = new_deposit(&[(1, dec!(1))]);
    d.amount = 0;
    assert!(matches!(d.validate(), Err(AllocError::InvalidAmount { amount: 0 })));
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn created_deposit_loads_with_splits_in_order() {
    let engine = AllocationEngine::build_test().unwrap();
    let store = &engine.store;
    let client = store.insert_client("Ada").unwrap();

    let mut new = new_deposit(&[(3, dec!(0.5)), (1, dec!(0.25)), (2, dec!(0.25))]);
    new.client_id = client.id;
    let created = store.create_deposit(&new).unwrap();
    assert_eq!(store.find_client(client.id).unwrap().expect("client").name, "Ada");

    let loaded = store.load_deposit(created.id).unwrap().expect("deposit");
    assert_eq!(loaded, created);
    let accounts: Vec<i64> = loaded.proposed_allocation.iter().map(|p| p.account_id).collect();
    assert_eq!(accounts, vec![3, 1, 2]);
    assert_eq!(loaded.proposed_allocation[0].split, dec!(0.5));
}

#[test]
fn invalid_deposit_is_not_persisted() {
    let engine = AllocationEngine::build_test().unwrap();
    let client = engine.store.insert_client("Ada").unwrap();

    let mut new = new_deposit(&[(1, dec!(0.4))]);
    new.client_id = client.id;
    assert!(engine.store.create_deposit(&new).is_err());
    assert!(engine.store.load_deposit(1).unwrap().is_none());
}

#[test]
fn missing_deposit_loads_as_none() {
    let engine = AllocationEngine::build_test().unwrap();
    assert!(engine.store.load_deposit(42).unwrap().is_none());
    assert!(engine.store.deposit_statement(42).unwrap().is_none());
}

#[test]
fn statement_lists_receipts_and_their_allocations() {
    let engine = AllocationEngine::build_test().unwrap();
    let store = &engine.store;
    let client = store.insert_client("Ada").unwrap();
    let pot = store.insert_pot(client.id, "Main").unwrap();
    let isa = store.insert_account(pot.id, WrapperKind::Isa).unwrap();
    let sipp = store.insert_account(pot.id, WrapperKind::Sipp).unwrap();

    let deposit = store
        .create_deposit(&NewDeposit {
            client_id: client.id,
            amount: 3_000,
            proposed_allocation: vec![
                NewProposedAllocation { account_id: isa.id, split: dec!(0.5) },
                NewProposedAllocation { account_id: sipp.id, split: dec!(0.5) },
            ],
        })
        .unwrap();

    let mut first = Receipt::new(deposit.id, 1_000);
    engine.allocate(&mut first, &deposit).unwrap();
    let mut second = Receipt::new(deposit.id, 2_000);
    engine.allocate(&mut second, &deposit).unwrap();

    let statement = store.deposit_statement(deposit.id).unwrap().expect("statement");
    assert_eq!(statement.client_id, client.id);
    assert_eq!(statement.receipts.len(), 2);
    assert_eq!(statement.receipts[0].id, first.id.unwrap());
    assert_eq!(statement.receipts[1].amount, 2_000);
    for r in &statement.receipts {
        assert_eq!(r.allocations.len(), 2);
        assert_eq!(r.allocations.iter().map(|a| a.amount).sum::<i64>(), r.amount);
    }
}
