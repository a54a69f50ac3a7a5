use crate::types::{AccountId, DepositId};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Account {account_id} not found")]
    AccountNotFound { account_id: AccountId },

    #[error("Deposit does not exist: {deposit_id}")]
    DepositNotFound { deposit_id: DepositId },

    #[error("Deposit {deposit_id} has no proposed allocations")]
    EmptyProposal { deposit_id: DepositId },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: i64 },

    #[error("Invalid split fraction: {split}")]
    InvalidSplit { split: Decimal },

    #[error("Invalid deposit: {reason}")]
    InvalidDeposit { reason: String },

    #[error("failed {stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<AllocError>,
    },

    #[error("Allocation aborted by panic: {message}")]
    Panicked { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AllocError {
    /// The stage annotation, if this error was raised inside one.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            AllocError::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// The innermost error beneath any stage annotations.
    pub fn root(&self) -> &AllocError {
        match self {
            AllocError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type AllocResult<T> = Result<T, AllocError>;

/// Attach a processing stage to a failing result.
pub trait StageExt<T> {
    fn stage(self, stage: &'static str) -> AllocResult<T>;
}

impl<T, E: Into<AllocError>> StageExt<T> for Result<T, E> {
    fn stage(self, stage: &'static str) -> AllocResult<T> {
        self.map_err(|e| AllocError::Stage {
            stage,
            source: Box::new(e.into()),
        })
    }
}
