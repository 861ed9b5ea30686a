//! HTTP client for Ledger L's JSON Ledger API: offset reads, active-contract
//! queries with a defensive template re-filter, command submission, and a
//! classified retry policy.

mod client;
mod error;
mod retry;

pub use client::{ActiveContract, LedgerClient, PayloadFilter};
pub use error::{LedgerError, RetryClass, classify};
pub use retry::{MAX_ATTEMPTS_READ, MAX_ATTEMPTS_WRITE, retrying};
