//! Core types and trait definitions for the Tollgate ledger.
//!
//! Tollgate is the financial core of a pay-per-view content platform: the
//! purchase lifecycle with access-token issuance, the earnings hold/release
//! ledger, and the payout eligibility gate.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod balance;
pub mod creator;
pub mod error;
pub mod payout;
pub mod policy;
pub mod purchase;
pub mod release;
pub mod session;
pub mod store;
pub mod token;

pub use error::{Error, Result};
