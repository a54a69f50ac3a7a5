//! Domain records: clients own pots, pots own accounts, deposits own
//! proposed splits and receipts, receipts own allocations.

use crate::{
    error::{AllocError, AllocResult},
    types::{AccountId, AllocationId, ClientId, DepositId, MinorUnits, PotId, ReceiptId},
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp format used for every `created_at` / `deleted_at` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Regulatory category of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WrapperKind {
    Sipp,
    Isa,
    Gia,
    #[serde(rename = "")]
    Unclassified,
}

impl WrapperKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WrapperKind::Sipp         => "SIPP",
            WrapperKind::Isa          => "ISA",
            WrapperKind::Gia          => "GIA",
            WrapperKind::Unclassified => "",
        }
    }

    /// Exact match on the stored text. Anything else, including a
    /// differently cased "sipp", is unclassified: the ledger queries and
    /// the GIA index compare the same exact text.
    pub fn from_db(s: &str) -> Self {
        match s {
            "SIPP" => WrapperKind::Sipp,
            "ISA"  => WrapperKind::Isa,
            "GIA"  => WrapperKind::Gia,
            _      => WrapperKind::Unclassified,
        }
    }
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WrapperKind::Unclassified => f.write_str("unclassified"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pot {
    pub id: PotId,
    pub client_id: ClientId,
    pub name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub pot_id: PotId,
    pub wrapper: WrapperKind,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAllocation {
    pub id: i64,
    pub deposit_id: DepositId,
    pub account_id: AccountId,
    pub split: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: DepositId,
    pub client_id: ClientId,
    pub amount: MinorUnits,
    pub proposed_allocation: Vec<ProposedAllocation>,
    pub created_at: NaiveDateTime,
}

/// Money received against a deposit. `id` is `None` until persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Option<ReceiptId>,
    pub deposit_id: DepositId,
    pub amount: MinorUnits,
}

impl Receipt {
    pub fn new(deposit_id: DepositId, amount: MinorUnits) -> Self {
        Self { id: None, deposit_id, amount }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub receipt_id: ReceiptId,
    pub account_id: AccountId,
    pub amount: MinorUnits,
    pub created_at: NaiveDateTime,
}

/// A receipt together with the ledger rows it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptStatement {
    pub id: ReceiptId,
    pub amount: MinorUnits,
    pub allocations: Vec<Allocation>,
    pub created_at: NaiveDateTime,
}

/// A deposit with every receipt posted against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositStatement {
    pub id: DepositId,
    pub client_id: ClientId,
    pub amount: MinorUnits,
    pub receipts: Vec<ReceiptStatement>,
}

// ── Intake ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProposedAllocation {
    pub account_id: AccountId,
    pub split: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeposit {
    pub client_id: ClientId,
    pub amount: MinorUnits,
    #[serde(default)]
    pub proposed_allocation: Vec<NewProposedAllocation>,
}

impl NewDeposit {
    /// Splits must each lie in (0, 1] and total exactly 1.
    pub fn validate(&self) -> AllocResult<()> {
        if self.amount <= 0 {
            return Err(AllocError::InvalidAmount { amount: self.amount });
        }
        if self.proposed_allocation.is_empty() {
            return Err(AllocError::InvalidDeposit {
                reason: "proposed_allocation is required".into(),
            });
        }

        let mut total = Decimal::ZERO;
        for p in &self.proposed_allocation {
            if p.split <= Decimal::ZERO || p.split > Decimal::ONE {
                return Err(AllocError::InvalidSplit { split: p.split });
            }
            total += p.split;
            if total > Decimal::ONE {
                return Err(AllocError::InvalidDeposit {
                    reason: "Allocation split exceeds 100%".into(),
                });
            }
        }
        if total != Decimal::ONE {
            return Err(AllocError::InvalidDeposit {
                reason: "Allocation split requires 100% allocation".into(),
            });
        }
        Ok(())
    }
}

/// Current UTC time at whole-second precision, matching what the store keeps.
pub fn now() -> NaiveDateTime {
    use chrono::SubsecRound;
    chrono::Utc::now().naive_utc().trunc_subsecs(0)
}
