//! Error types for the ticket ledger

use crate::types::TicketStatus;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// The taxonomy is enumerable: not-found, authorization, invalid-state,
/// policy-violation, and expiry. None of these are retried by the engine;
/// callers decide whether to retry.
#[derive(Error, Debug)]
pub enum Error {
    /// Event not found
    #[error("event not found: {0}")]
    EventNotFound(Uuid),

    /// Ticket not found
    #[error("ticket not found: {0}")]
    TicketNotFound(Uuid),

    /// Caller does not own the ticket
    #[error("{caller} does not own ticket {ticket_id}")]
    NotOwner {
        /// Address that attempted the operation
        caller: String,
        /// Ticket in question
        ticket_id: Uuid,
    },

    /// Caller is not the event organizer
    #[error("{caller} is not the organizer of event {event_id}")]
    NotOrganizer {
        /// Address that attempted the operation
        caller: String,
        /// Event in question
        event_id: Uuid,
    },

    /// Ticket is in the wrong state for the requested operation
    #[error("ticket {ticket_id} is {actual:?}, expected {expected:?}")]
    InvalidStatus {
        /// Ticket in question
        ticket_id: Uuid,
        /// Current status
        actual: TicketStatus,
        /// Status the operation requires
        expected: TicketStatus,
    },

    /// Event date has already passed
    #[error("event {0} has already taken place")]
    EventPassed(Uuid),

    /// Event is cancelled
    #[error("event {0} is cancelled")]
    EventCancelled(Uuid),

    /// No inventory remains for the requested ticket class
    #[error("no {class} tickets remain for event {event_id}")]
    SoldOut {
        /// Event in question
        event_id: Uuid,
        /// Requested ticket class
        class: String,
    },

    /// Buyer already holds the per-user maximum for this event
    #[error("per-user cap of {cap} tickets reached for event {event_id}")]
    CapExceeded {
        /// Event in question
        event_id: Uuid,
        /// Configured cap
        cap: u32,
    },

    /// Offered resale price is below the event's floor for the class
    #[error("price {offered} is below the minimum resale price {minimum}")]
    PriceBelowMinimum {
        /// Price the seller asked for
        offered: rust_decimal::Decimal,
        /// Floor derived at event creation
        minimum: rust_decimal::Decimal,
    },

    /// Transfer cooldown since the last ownership change has not elapsed
    #[error("transfer cooldown active until {until}")]
    CooldownActive {
        /// Instant at which the cooldown elapses
        until: DateTime<Utc>,
    },

    /// Purchase throttle tripped for the buyer
    #[error("purchase limit reached: {count} tickets minted in the trailing {window_hours}h")]
    PurchaseThrottled {
        /// Mints counted inside the window
        count: usize,
        /// Window length
        window_hours: i64,
    },

    /// Transfer-initiation rate limit tripped for the sender
    #[error("transfer limit reached: {count} initiations in the trailing {window_hours}h")]
    TransferThrottled {
        /// Initiations counted inside the window
        count: usize,
        /// Window length
        window_hours: i64,
    },

    /// Supplied signature failed verification
    #[error("signature rejected")]
    SignatureRejected,

    /// Refund policy reports the ticket ineligible
    #[error("ticket {0} is not eligible for a refund")]
    RefundIneligible(Uuid),

    /// No pending transfer exists on the ticket
    #[error("no pending transfer on ticket {0}")]
    NoPendingTransfer(Uuid),

    /// Confirmation presented by an address other than the pending recipient
    #[error("pending transfer is addressed to {expected}, not {presented}")]
    WrongRecipient {
        /// Recipient named at initiation
        expected: String,
        /// Address that tried to confirm
        presented: String,
    },

    /// Pending transfer window elapsed before confirmation
    #[error("pending transfer expired at {expired_at}")]
    TransferExpired {
        /// Expiry instant of the pending record
        expired_at: DateTime<Utc>,
    },

    /// Block does not extend the current chain tip
    #[error("block does not extend the tip: expected previous hash {expected}, got {actual}")]
    BlockLinkMismatch {
        /// Digest of the current tip
        expected: String,
        /// Previous-hash field of the rejected block
        actual: String,
    },

    /// Block's stated digest does not match its contents
    #[error("block digest mismatch: expected {expected}, got {actual}")]
    BlockDigestMismatch {
        /// Digest recomputed from the block contents
        expected: String,
        /// Digest the block claims
        actual: String,
    },

    /// Cryptographic error
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("concurrency error: {0}")]
    Concurrency(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
