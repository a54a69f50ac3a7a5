//! Shared primitive types used across the allocation engine.

/// Money in integer minor units (pennies). Never a float.
pub type MinorUnits = i64;

pub type ClientId = i64;
pub type PotId = i64;
pub type AccountId = i64;
pub type DepositId = i64;
pub type ReceiptId = i64;
pub type AllocationId = i64;
