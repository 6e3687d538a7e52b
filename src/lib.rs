//! Expiring response cache
//!
//! Persists slow-changing API responses (news feed, vehicle search and
//! details) as timestamped JSON files so repeat lookups skip the network.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
