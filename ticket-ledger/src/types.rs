//! Core types for the ticket ledger
//!
//! All types are designed for:
//! - Deterministic serialization (fixed field order, sorted maps)
//! - Exact arithmetic (Decimal for prices)
//! - Auditability (tickets are never deleted, history is append-only)

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Wallet address identifying a buyer, seller, organizer, or miner
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create new address
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sentinel source address recorded for the first history entry of a
    /// minted ticket.
    pub fn mint_source() -> Self {
        Self("mint".to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ticket class offered by an event
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TicketClass {
    /// General admission
    Regular,
    /// VIP admission
    Vip,
    /// Discounted early-bird admission
    EarlyBird,
}

impl TicketClass {
    /// Stable wire code
    pub fn code(&self) -> &'static str {
        match self {
            TicketClass::Regular => "regular",
            TicketClass::Vip => "vip",
            TicketClass::EarlyBird => "early_bird",
        }
    }

    /// Parse from a wire code
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(TicketClass::Regular),
            "vip" => Some(TicketClass::Vip),
            "early_bird" => Some(TicketClass::EarlyBird),
            _ => None,
        }
    }

    /// All classes, in canonical order
    pub fn all() -> [TicketClass; 3] {
        [TicketClass::Regular, TicketClass::Vip, TicketClass::EarlyBird]
    }
}

impl fmt::Display for TicketClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Ticket lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Held by its owner and usable
    Valid,
    /// A transfer has been initiated and awaits recipient confirmation
    PendingTransfer,
    /// Presented at the venue (terminal)
    Used,
    /// Refunded or voided by event cancellation (terminal)
    Cancelled,
    /// Reserved for tickets past their event date; not currently produced
    /// by any transition
    Expired,
}

impl TicketStatus {
    /// Check if the status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Used | TicketStatus::Cancelled)
    }
}

/// Request payload for creating an event
///
/// The engine performs no date-ordering validation; callers are expected to
/// supply a sane `date`/`refundable_until` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    /// Event name
    pub name: String,
    /// Venue name
    pub venue: String,
    /// Scheduled date
    pub date: DateTime<Utc>,
    /// Tickets issued per class
    pub class_counts: BTreeMap<TicketClass, u32>,
    /// Issue price per class
    pub class_prices: BTreeMap<TicketClass, Decimal>,
    /// Organizer address
    pub organizer: Address,
    /// Free-form description
    pub description: String,
    /// Category label
    pub category: String,
    /// Maximum tickets a single address may hold for this event
    pub max_per_user: u32,
    /// Deadline after which refund requests are rejected outright
    pub refundable_until: DateTime<Utc>,
}

/// An event with per-class inventory and pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID (UUIDv7 for time-ordering)
    pub event_id: Uuid,
    /// Event name
    pub name: String,
    /// Venue name
    pub venue: String,
    /// Scheduled date
    pub date: DateTime<Utc>,
    /// Tickets issued per class
    pub total: BTreeMap<TicketClass, u32>,
    /// Issue price per class
    pub prices: BTreeMap<TicketClass, Decimal>,
    /// Organizer address
    pub organizer: Address,
    /// Free-form description
    pub description: String,
    /// Category label
    pub category: String,
    /// Maximum tickets a single address may hold for this event
    pub max_per_user: u32,
    /// Deadline after which refund requests are rejected outright
    pub refundable_until: DateTime<Utc>,
    /// Remaining inventory per class; decremented once per mint, never
    /// restored by refunds or cancellation
    pub available: BTreeMap<TicketClass, u32>,
    /// Resale floor per class, fixed at half the issue price at creation
    pub min_resale: BTreeMap<TicketClass, Decimal>,
    /// Cancellation flag set by the organizer
    pub is_cancelled: bool,
    /// Addresses waiting on inventory or reinstatement
    pub waitlist: BTreeSet<Address>,
    /// Hours that must elapse after an ownership change before the ticket
    /// may be transferred again
    pub transfer_cooldown_hours: i64,
}

impl Event {
    /// Construct an event, deriving availability and the resale floor
    pub fn new(event_id: Uuid, spec: NewEvent, transfer_cooldown_hours: i64) -> Self {
        let available = spec.class_counts.clone();
        let min_resale = spec
            .class_prices
            .iter()
            .map(|(class, price)| (*class, *price * Decimal::new(5, 1)))
            .collect();

        Self {
            event_id,
            name: spec.name,
            venue: spec.venue,
            date: spec.date,
            total: spec.class_counts,
            prices: spec.class_prices,
            organizer: spec.organizer,
            description: spec.description,
            category: spec.category,
            max_per_user: spec.max_per_user,
            refundable_until: spec.refundable_until,
            available,
            min_resale,
            is_cancelled: false,
            waitlist: BTreeSet::new(),
            transfer_cooldown_hours,
        }
    }

    /// Transfer cooldown as a duration
    pub fn transfer_cooldown(&self) -> Duration {
        Duration::hours(self.transfer_cooldown_hours)
    }
}

/// One entry in a ticket's append-only transfer history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// When ownership changed
    pub at: DateTime<Utc>,
    /// Previous owner, or the mint sentinel for the first entry
    pub from: Address,
    /// New owner
    pub to: Address,
    /// Agreed price
    pub price: Decimal,
}

/// A proposed ownership change awaiting confirmation by the recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransfer {
    /// Recipient who must confirm
    pub to: Address,
    /// Agreed price
    pub price: Decimal,
    /// Instant after which confirmation fails with an expiry error
    pub expires_at: DateTime<Utc>,
}

/// A ticket, retained for audit even after terminal transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket ID (UUIDv7 for time-ordering)
    pub ticket_id: Uuid,
    /// Owning event
    pub event_id: Uuid,
    /// Ticket class
    pub class: TicketClass,
    /// Issue price, fixed at mint
    pub price: Decimal,
    /// Current owner; exactly one address at any instant
    pub owner: Address,
    /// Free-form metadata captured at mint
    pub metadata: BTreeMap<String, String>,
    /// Append-only transfer history; the first entry records the mint
    pub history: Vec<TransferRecord>,
    /// Lifecycle status
    pub status: TicketStatus,
    /// Content-derived admission token: hex SHA-256 over ticket ID, event
    /// ID, original owner, and issuance time
    pub qr_token: String,
    /// Issuance timestamp
    pub issued_at: DateTime<Utc>,
    /// Timestamp of the most recent ownership change
    pub last_ownership_change: DateTime<Utc>,
    /// Pending transfer, if one is in flight
    pub pending: Option<PendingTransfer>,
}

/// A completed mutation, queued for mining
///
/// `TxPayload` is a closed tagged union over the operation kinds; each
/// variant carries its own strongly-typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxRecord {
    /// Unique record ID
    pub tx_id: Uuid,
    /// When the mutation completed
    pub timestamp: DateTime<Utc>,
    /// Operation-specific payload, tagged by operation kind
    #[serde(flatten)]
    pub payload: TxPayload,
}

/// Operation-specific transaction payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TxPayload {
    /// An event was created
    #[serde(rename = "create_event")]
    CreateEvent {
        /// New event
        event_id: Uuid,
        /// Event name
        name: String,
        /// Venue name
        venue: String,
        /// Scheduled date
        date: DateTime<Utc>,
        /// Organizer address
        organizer: Address,
        /// Category label
        category: String,
    },

    /// A ticket was minted
    #[serde(rename = "mint_ticket")]
    MintTicket {
        /// New ticket
        ticket_id: Uuid,
        /// Owning event
        event_id: Uuid,
        /// Buyer address
        buyer: Address,
        /// Ticket class
        class: TicketClass,
        /// Issue price
        price: Decimal,
    },

    /// A transfer was initiated (ownership unchanged until confirmation)
    #[serde(rename = "init_transfer")]
    InitTransfer {
        /// Ticket being transferred
        ticket_id: Uuid,
        /// Current owner
        from: Address,
        /// Proposed recipient
        to: Address,
        /// Agreed price
        price: Decimal,
        /// Confirmation deadline
        expires_at: DateTime<Utc>,
    },

    /// A pending transfer was confirmed and ownership changed
    #[serde(rename = "confirm_transfer")]
    ConfirmTransfer {
        /// Ticket transferred
        ticket_id: Uuid,
        /// Previous owner
        from: Address,
        /// New owner
        to: Address,
        /// Agreed price
        price: Decimal,
    },

    /// A ticket was refunded, either on request or by event cancellation
    #[serde(rename = "refund_ticket")]
    RefundTicket {
        /// Ticket refunded
        ticket_id: Uuid,
        /// Owning event
        event_id: Uuid,
        /// Owner at refund time
        owner: Address,
        /// Amount owed
        amount: Decimal,
    },

    /// An event was cancelled by its organizer
    #[serde(rename = "cancel_event")]
    CancelEvent {
        /// Cancelled event
        event_id: Uuid,
        /// Organizer address
        organizer: Address,
    },

    /// A ticket was presented and consumed at the venue
    #[serde(rename = "use_ticket")]
    UseTicket {
        /// Ticket used
        ticket_id: Uuid,
        /// Address that presented it
        presented_by: Address,
    },

    /// Mining reward credited to the sealer of a block
    #[serde(rename = "reward")]
    Reward {
        /// Miner address
        miner: Address,
        /// Fixed reward amount
        amount: Decimal,
    },
}

impl TxRecord {
    /// Create a record stamped with a fresh ID
    pub fn new(timestamp: DateTime<Utc>, payload: TxPayload) -> Self {
        Self {
            tx_id: Uuid::now_v7(),
            timestamp,
            payload,
        }
    }
}

/// Aggregate statistics for one event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStats {
    /// Event the statistics describe
    pub event_id: Uuid,
    /// Tickets issued across all classes
    pub total_tickets: u32,
    /// Remaining inventory across all classes
    pub available_tickets: u32,
    /// Tickets minted across all classes
    pub sold_tickets: u32,
    /// Addresses on the waitlist
    pub waitlist_size: usize,
    /// Gross issue-price revenue over all minted tickets
    pub revenue: Decimal,
    /// Minted tickets per class
    pub sold_by_class: BTreeMap<TicketClass, u32>,
    /// Tickets in the `Used` state
    pub used_tickets: u32,
    /// Tickets in the `Cancelled` state
    pub cancelled_tickets: u32,
}
