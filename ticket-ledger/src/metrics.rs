//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_tickets_minted_total` - Tickets minted
//! - `ledger_transfers_initiated_total` - Transfer initiations accepted
//! - `ledger_transfers_confirmed_total` - Transfers confirmed
//! - `ledger_refunds_total` - Refunds granted
//! - `ledger_tickets_used_total` - Tickets consumed at the venue
//! - `ledger_blocks_mined_total` - Blocks sealed and appended
//! - `ledger_seal_duration_seconds` - Histogram of sealing latencies
//!
//! Collectors are registered on a per-instance registry rather than the
//! process-global one, so independent ledgers (and tests) never collide.

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Tickets minted
    pub tickets_minted: IntCounter,

    /// Transfer initiations accepted
    pub transfers_initiated: IntCounter,

    /// Transfers confirmed
    pub transfers_confirmed: IntCounter,

    /// Refunds granted
    pub refunds: IntCounter,

    /// Tickets consumed at the venue
    pub tickets_used: IntCounter,

    /// Blocks sealed and appended
    pub blocks_mined: IntCounter,

    /// Sealing latency histogram
    pub seal_duration: Histogram,

    /// Prometheus registry
    registry: Arc<Registry>,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("tickets_minted", &self.tickets_minted.get())
            .field("transfers_initiated", &self.transfers_initiated.get())
            .field("transfers_confirmed", &self.transfers_confirmed.get())
            .field("refunds", &self.refunds.get())
            .field("tickets_used", &self.tickets_used.get())
            .field("blocks_mined", &self.blocks_mined.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let tickets_minted =
            IntCounter::new("ledger_tickets_minted_total", "Tickets minted")?;
        registry.register(Box::new(tickets_minted.clone()))?;

        let transfers_initiated = IntCounter::new(
            "ledger_transfers_initiated_total",
            "Transfer initiations accepted",
        )?;
        registry.register(Box::new(transfers_initiated.clone()))?;

        let transfers_confirmed =
            IntCounter::new("ledger_transfers_confirmed_total", "Transfers confirmed")?;
        registry.register(Box::new(transfers_confirmed.clone()))?;

        let refunds = IntCounter::new("ledger_refunds_total", "Refunds granted")?;
        registry.register(Box::new(refunds.clone()))?;

        let tickets_used =
            IntCounter::new("ledger_tickets_used_total", "Tickets consumed at the venue")?;
        registry.register(Box::new(tickets_used.clone()))?;

        let blocks_mined =
            IntCounter::new("ledger_blocks_mined_total", "Blocks sealed and appended")?;
        registry.register(Box::new(blocks_mined.clone()))?;

        let seal_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_seal_duration_seconds",
                "Histogram of sealing latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 5.0, 30.0]),
        )?;
        registry.register(Box::new(seal_duration.clone()))?;

        Ok(Self {
            tickets_minted,
            transfers_initiated,
            transfers_confirmed,
            refunds,
            tickets_used,
            blocks_mined,
            seal_duration,
            registry,
        })
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
