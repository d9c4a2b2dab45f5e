//! Fraud screening for Turnstile
//!
//! Advisory tri-state judgment over proposed ticket transactions. The
//! ledger itself never consults this crate: callers screen a transaction
//! before invoking mint, block on `Fraud`, and log `Suspect`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod screen;
pub mod types;

pub use screen::{FraudScreen, RuleScreen};
pub use types::{Judgment, TxContext, Verdict};
