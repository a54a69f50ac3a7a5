//! Receipt allocation across a client's wrapper accounts (SIPP, ISA, GIA),
//! with exact-penny splitting, yearly ceilings and all-or-nothing persistence.

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod models;
pub mod money;
pub mod redirect;
pub mod rules;
pub mod store;
pub mod types;
