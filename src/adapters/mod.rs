//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
pub mod static_feed;
pub mod random_walk_feed;
pub mod csv_replay_feed;
pub mod text_report;
pub mod csv_trade_log;
