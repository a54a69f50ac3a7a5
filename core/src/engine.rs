//! The allocation engine. Turns a receipt into ledger rows.
//!
//! EXECUTION ORDER (fixed, one IMMEDIATE transaction):
//!   1. Persist the receipt.
//!   2. For each proposed split, in the deposit's order:
//!        load the account, split the receipt amount, carry the flooring
//!        remainder, hand the amount to the account's wrapper rule,
//!        persist what the rule retains, queue what it redirects.
//!   3. For each pot with a queued amount: resolve-or-create its GIA
//!      account and persist one allocation.
//!   4. Commit.
//!
//! RULES:
//!   - The sum of allocations written for a receipt equals the receipt amount.
//!   - Any failure rolls back everything, including the receipt row.
//!   - The last split absorbs the rounded sum of all flooring remainders.

use crate::{
    config::AllocationConfig,
    error::{AllocError, AllocResult, StageExt},
    models::{Account, Deposit, Receipt, WrapperKind},
    money::{self, RemainderCarry},
    redirect::GiaRedirects,
    rules::{CeilingRule, RedirectRule, WrapperRule},
    store::AllocStore,
    types::{AccountId, MinorUnits, ReceiptId},
};
use std::panic::{self, AssertUnwindSafe};

/// Used for any wrapper kind without a registered rule.
static FALLBACK_RULE: RedirectRule = RedirectRule::new(WrapperKind::Unclassified);

pub struct AllocationEngine {
    pub store: AllocStore,
    config: AllocationConfig,
    rules: Vec<Box<dyn WrapperRule>>,
}

impl AllocationEngine {
    /// An engine with no wrapper rules registered. Every kind redirects.
    pub fn new(store: AllocStore, config: AllocationConfig) -> Self {
        Self {
            store,
            config,
            rules: Vec::new(),
        }
    }

    /// Build a fully wired engine with a rule for every wrapper kind.
    /// Call this instead of new() + manual register() calls.
    pub fn build(store: AllocStore, config: AllocationConfig) -> Self {
        let sipp = CeilingRule::sipp(config.sipp_ceiling);
        let isa = CeilingRule::isa(config.isa_ceiling);
        let mut engine = AllocationEngine::new(store, config);
        engine.register(Box::new(sipp));
        engine.register(Box::new(isa));
        engine.register(Box::new(RedirectRule::new(WrapperKind::Gia)));
        engine.register(Box::new(RedirectRule::new(WrapperKind::Unclassified)));
        engine
    }

    /// Build against a fresh migrated in-memory store with default ceilings.
    pub fn build_test() -> AllocResult<Self> {
        let store = AllocStore::in_memory()?;
        store.migrate()?;
        Ok(Self::build(store, AllocationConfig::default_test()))
    }

    /// Register a rule, replacing any rule already registered for its kind.
    pub fn register(&mut self, rule: Box<dyn WrapperRule>) {
        self.rules.retain(|r| r.kind() != rule.kind());
        self.rules.push(rule);
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    fn rule_for(&self, kind: WrapperKind) -> &dyn WrapperRule {
        self.rules
            .iter()
            .find(|r| r.kind() == kind)
            .map(|r| &**r)
            .unwrap_or(&FALLBACK_RULE)
    }

    /// Allocate `receipt` across the deposit's proposed splits.
    ///
    /// On success the receipt's `id` is set. On failure nothing from this
    /// call is persisted and `receipt.id` is left untouched.
    pub fn allocate(&self, receipt: &mut Receipt, deposit: &Deposit) -> AllocResult<()> {
        if deposit.proposed_allocation.is_empty() {
            return Err(AllocError::EmptyProposal { deposit_id: deposit.id });
        }
        if receipt.amount < 0 {
            return Err(AllocError::InvalidAmount { amount: receipt.amount });
        }
        if receipt.deposit_id != deposit.id {
            return Err(AllocError::InvalidDeposit {
                reason: format!(
                    "receipt belongs to deposit {}, not {}",
                    receipt.deposit_id, deposit.id
                ),
            });
        }

        // The transaction is dropped while unwinding, which rolls it back.
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.allocate_in_tx(receipt, deposit)));

        match result {
            Ok(Ok(receipt_id)) => {
                receipt.id = Some(receipt_id);
                Ok(())
            }
            Ok(Err(e)) => {
                log::error!("Allocation of deposit {} rolled back: {e}", deposit.id);
                Err(e)
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                log::error!("Panic recovered while allocating deposit {}: {message}", deposit.id);
                Err(AllocError::Panicked { message })
            }
        }
    }

    fn allocate_in_tx(&self, receipt: &Receipt, deposit: &Deposit) -> AllocResult<ReceiptId> {
        let tx = self.store.begin().stage("beginning transaction")?;

        let receipt_id = self
            .store
            .insert_receipt(deposit.id, receipt.amount)
            .stage("creating receipt")?;

        let mut redirects = GiaRedirects::new();
        let mut carry = RemainderCarry::new();
        let mut covered: MinorUnits = 0;
        let last = deposit.proposed_allocation.len() - 1;

        for (i, proposed) in deposit.proposed_allocation.iter().enumerate() {
            let account = self
                .fetch_account(proposed.account_id)
                .stage("fetching account")?;

            let split = money::split(receipt.amount, proposed.split).stage("splitting receipt")?;
            let mut amount = split.allocated;
            carry.add(split.remainder);
            if i == last && !carry.is_zero() {
                amount = amount
                    .checked_add(carry.settle())
                    .ok_or(AllocError::InvalidAmount { amount: receipt.amount })
                    .stage("splitting receipt")?;
            }

            let rule = self.rule_for(account.wrapper);
            log::debug!(
                "Receipt {receipt_id}: {} of {} to account {} ({})",
                amount,
                receipt.amount,
                account.id,
                account.wrapper
            );
            let outcome = rule
                .apply(&self.store, deposit.client_id, &account, amount)
                .stage(rule.stage())?;

            if outcome.retained > 0 {
                self.store
                    .insert_allocation(receipt_id, account.id, outcome.retained)
                    .stage(rule.stage())?;
            }
            redirects
                .add(account.pot_id, outcome.redirected)
                .stage(rule.stage())?;
            covered = outcome
                .total()
                .and_then(|t| {
                    covered
                        .checked_add(t)
                        .ok_or(AllocError::InvalidAmount { amount: t })
                })
                .stage(rule.stage())?;
        }

        if covered != receipt.amount {
            // Only reachable when the proposed splits do not total 1.
            log::warn!(
                "Receipt {receipt_id}: splits cover {covered} of {} minor units",
                receipt.amount
            );
        }
        if !redirects.is_empty() {
            log::debug!(
                "Receipt {receipt_id}: redirecting to GIA in {} pot(s)",
                redirects.len()
            );
        }

        for (pot_id, amount) in redirects {
            let (gia, created) = self
                .store
                .resolve_or_create_gia(pot_id)
                .stage("resolving GIA account")?;
            if created {
                log::info!("Opened GIA account {} for pot {pot_id}", gia.id);
            }
            self.store
                .insert_allocation(receipt_id, gia.id, amount)
                .stage("processing GIA allocation")?;
            log::debug!("Receipt {receipt_id}: {amount} to GIA account {}", gia.id);
        }

        tx.commit().stage("committing transaction")?;
        log::info!(
            "Receipt {receipt_id} for deposit {} allocated ({} minor units)",
            deposit.id,
            receipt.amount
        );
        Ok(receipt_id)
    }

    fn fetch_account(&self, account_id: AccountId) -> AllocResult<Account> {
        self.store
            .find_account(account_id)?
            .ok_or(AllocError::AccountNotFound { account_id })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
