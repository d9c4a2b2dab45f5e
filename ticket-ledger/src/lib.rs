//! Turnstile Ticket Ledger
//!
//! Append-only event-ticketing ledger with proof-of-work sealed blocks.
//!
//! # Architecture
//!
//! - **Single Writer**: all mutation funnels through one actor task
//! - **Append Only**: completed operations become transaction records;
//!   mining seals the pending buffer into a hash-linked block
//! - **Two-Phase Transfers**: ownership changes only on confirmation
//! - **Advisory Signatures**: callers may attach ECDSA P-256 authorizations
//!
//! # Invariants
//!
//! - Owner index and `Ticket::owner` agree at every instant
//! - `available[class]` decrements exactly once per mint, never increments
//! - Transfer history is append-only, never edited or reordered
//! - Blocks are immutable once appended; each links to the previous digest

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod heuristics;
pub mod ledger;
pub mod metrics;
pub mod refund;
pub mod state;
pub mod types;

// Re-exports
pub use chain::{Block, Chain};
pub use config::Config;
pub use crypto::{KeyPair, SignedRequest};
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use state::LedgerState;
pub use types::{
    Address, Event, EventStats, NewEvent, PendingTransfer, Ticket, TicketClass, TicketStatus,
    TransferRecord, TxPayload, TxRecord,
};
