//! Core types for fraud screening

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tri-state fraud verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Nothing noteworthy
    Normal,
    /// Worth logging, not worth blocking
    Suspect,
    /// Block before the transaction reaches the ledger
    Fraud,
}

impl Verdict {
    /// Whether the calling layer should block the transaction
    pub fn is_blocking(&self) -> bool {
        matches!(self, Verdict::Fraud)
    }
}

/// Features describing one proposed transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxContext {
    /// Wallet proposing the transaction
    pub wallet: String,

    /// Target event
    pub event_id: Uuid,

    /// Requested ticket class code
    pub ticket_class: String,

    /// Proposal timestamp
    pub timestamp: DateTime<Utc>,

    /// Caller-supplied hint that the wallet has a dubious track record
    pub fraud_prone: bool,

    /// Successful purchases by this wallet in the recent window
    pub recent_purchases: u32,
}

/// Screening result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judgment {
    /// Wallet that was screened
    pub wallet: String,

    /// Verdict
    pub verdict: Verdict,

    /// Factors that contributed to the verdict
    pub factors: Vec<String>,

    /// When the judgment was made
    pub judged_at: DateTime<Utc>,
}
