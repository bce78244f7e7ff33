//! simtrader: simulated spot-trading ledger, execution engine and
//! auto-trader.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], the async runtime in [`session`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod session;
pub mod cli;
