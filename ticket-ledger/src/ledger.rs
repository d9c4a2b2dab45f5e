//! Main ledger orchestration layer
//!
//! This module ties the state, actor, and metrics components into a
//! high-level API for ticketing operations.
//!
//! # Example
//!
//! ```no_run
//! use ticket_ledger::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> ticket_ledger::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config)?;
//!
//!     // let event = ledger.create_event(...).await?;
//!     // let ticket = ledger.mint_ticket(...).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::actor::{spawn_ledger_actor, LedgerHandle};
use crate::chain::Block;
use crate::config::Config;
use crate::crypto::SignedRequest;
use crate::metrics::Metrics;
use crate::state::LedgerState;
use crate::types::{Address, Event, EventStats, NewEvent, Ticket, TicketClass};
use crate::{Error, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Instant;
use uuid::Uuid;

/// Main ledger interface
///
/// Cheap to share: clones talk to the same single-writer actor.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Actor handle for all operations
    handle: LedgerHandle,

    /// Operation metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open a ledger with the given configuration
    ///
    /// Spawns the writer actor; must be called within a Tokio runtime.
    pub fn open(config: Config) -> Result<Self> {
        let metrics = Metrics::new().map_err(|e| Error::Config(e.to_string()))?;
        let state = LedgerState::new(config.clone(), Utc::now());
        let handle = spawn_ledger_actor(state);

        tracing::info!(
            service = %config.service_name,
            difficulty = config.mining.difficulty,
            "opened ledger"
        );

        Ok(Self {
            handle,
            metrics,
            config,
        })
    }

    /// Create an event
    pub async fn create_event(&self, spec: NewEvent) -> Result<Event> {
        self.handle.create_event(spec).await
    }

    /// Add an address to an event's waitlist
    pub async fn join_waitlist(&self, event_id: Uuid, address: Address) -> Result<()> {
        self.handle.join_waitlist(event_id, address).await
    }

    /// Mint a ticket, optionally carrying a signed authorization
    pub async fn mint_ticket(
        &self,
        event_id: Uuid,
        buyer: Address,
        class: TicketClass,
        auth: Option<SignedRequest>,
    ) -> Result<Ticket> {
        let ticket = self.handle.mint_ticket(event_id, buyer, class, auth).await?;
        self.metrics.tickets_minted.inc();
        Ok(ticket)
    }

    /// Initiate a two-phase transfer
    pub async fn transfer_ticket(
        &self,
        ticket_id: Uuid,
        from: Address,
        to: Address,
        price: Decimal,
        auth: Option<SignedRequest>,
    ) -> Result<()> {
        self.handle
            .transfer_ticket(ticket_id, from, to, price, auth)
            .await?;
        self.metrics.transfers_initiated.inc();
        Ok(())
    }

    /// Confirm a pending transfer as its named recipient
    pub async fn confirm_transfer(&self, ticket_id: Uuid, to: Address) -> Result<()> {
        self.handle.confirm_transfer(ticket_id, to).await?;
        self.metrics.transfers_confirmed.inc();
        Ok(())
    }

    /// Request a refund, returning the amount owed
    pub async fn request_refund(&self, ticket_id: Uuid, owner: Address) -> Result<Decimal> {
        let amount = self.handle.request_refund(ticket_id, owner).await?;
        self.metrics.refunds.inc();
        Ok(amount)
    }

    /// Consume a ticket at the venue
    pub async fn use_ticket(&self, ticket_id: Uuid, presented_by: Address) -> Result<()> {
        self.handle.use_ticket(ticket_id, presented_by).await?;
        self.metrics.tickets_used.inc();
        Ok(())
    }

    /// Check ticket validity and ownership without mutating anything
    pub async fn verify_ticket(&self, ticket_id: Uuid, presented_by: Address) -> Result<bool> {
        self.handle.verify_ticket(ticket_id, presented_by).await
    }

    /// Cancel an event as its organizer
    pub async fn cancel_event(&self, event_id: Uuid, organizer: Address) -> Result<()> {
        self.handle.cancel_event(event_id, organizer).await
    }

    /// Aggregate statistics for one event
    pub async fn event_stats(&self, event_id: Uuid) -> Result<EventStats> {
        self.handle.event_stats(event_id).await
    }

    /// Get a ticket by ID
    pub async fn ticket(&self, ticket_id: Uuid) -> Result<Ticket> {
        self.handle.ticket(ticket_id).await
    }

    /// All tickets owned by an address
    pub async fn user_tickets(&self, address: Address) -> Result<Vec<Ticket>> {
        self.handle.user_tickets(address).await
    }

    /// All tickets minted for an event
    pub async fn event_tickets(&self, event_id: Uuid) -> Result<Vec<Ticket>> {
        self.handle.event_tickets(event_id).await
    }

    /// Seal the pending buffer into a block
    ///
    /// Returns `None` when the buffer was empty. Sealing runs to
    /// completion inside the writer; there is no timeout.
    pub async fn mine_pending(&self, miner: Address) -> Result<Option<Block>> {
        let started = Instant::now();
        let block = self.handle.mine_pending(miner).await?;

        if block.is_some() {
            self.metrics.blocks_mined.inc();
            self.metrics
                .seal_duration
                .observe(started.elapsed().as_secs_f64());
        }

        Ok(block)
    }

    /// Snapshot the chain, genesis first
    pub async fn chain(&self) -> Result<Vec<Block>> {
        self.handle.chain().await
    }

    /// Number of transaction records awaiting mining
    pub async fn pending_count(&self) -> Result<usize> {
        self.handle.pending_count().await
    }

    /// Operation metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration the ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown the writer actor
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TicketClass;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn test_ledger() -> Ledger {
        let mut config = Config::default();
        config.mining.difficulty = 1;
        Ledger::open(config).unwrap()
    }

    fn sample_spec() -> NewEvent {
        let now = Utc::now();
        let mut counts = BTreeMap::new();
        counts.insert(TicketClass::Regular, 10);
        counts.insert(TicketClass::Vip, 2);
        let mut prices = BTreeMap::new();
        prices.insert(TicketClass::Regular, dec!(50));
        prices.insert(TicketClass::Vip, dec!(150));

        NewEvent {
            name: "Facade Fest".to_string(),
            venue: "Dome".to_string(),
            date: now + Duration::days(14),
            class_counts: counts,
            class_prices: prices,
            organizer: Address::new("org"),
            description: String::new(),
            category: "festival".to_string(),
            max_per_user: 4,
            refundable_until: now + Duration::days(12),
        }
    }

    #[tokio::test]
    async fn test_open_and_shutdown() {
        let ledger = test_ledger();
        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_facade_records_metrics() {
        let ledger = test_ledger();

        let event = ledger.create_event(sample_spec()).await.unwrap();
        let ticket = ledger
            .mint_ticket(
                event.event_id,
                Address::new("alice"),
                TicketClass::Regular,
                None,
            )
            .await
            .unwrap();
        assert_eq!(ledger.metrics().tickets_minted.get(), 1);

        ledger
            .transfer_ticket(
                ticket.ticket_id,
                Address::new("alice"),
                Address::new("bob"),
                dec!(30),
                None,
            )
            .await
            .unwrap();
        ledger
            .confirm_transfer(ticket.ticket_id, Address::new("bob"))
            .await
            .unwrap();
        assert_eq!(ledger.metrics().transfers_initiated.get(), 1);
        assert_eq!(ledger.metrics().transfers_confirmed.get(), 1);

        let mined = ledger.mine_pending(Address::new("miner")).await.unwrap();
        assert!(mined.is_some());
        assert_eq!(ledger.metrics().blocks_mined.get(), 1);

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_operations_do_not_count() {
        let ledger = test_ledger();

        let missing = Uuid::now_v7();
        assert!(ledger
            .mint_ticket(missing, Address::new("alice"), TicketClass::Regular, None)
            .await
            .is_err());
        assert_eq!(ledger.metrics().tickets_minted.get(), 0);

        ledger.shutdown().await.unwrap();
    }
}
