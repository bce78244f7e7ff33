//! Core domain types and logic.

pub mod error;
pub mod position;
pub mod price_book;
pub mod ledger;
pub mod execution;
pub mod valuation;
pub mod metrics;
pub mod random;
pub mod strategy;
pub mod goal;
pub mod session_config;
pub mod config_validation;
