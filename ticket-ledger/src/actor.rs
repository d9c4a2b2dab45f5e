//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One logical writer task owns the whole [`LedgerState`], so every
//!   operation is a complete critical section with no fine-grained locking
//! - Async message passing with a bounded mailbox for backpressure
//! - Block sealing runs inside the writer task; it is CPU-bound and holds
//!   the critical section until the block is sealed, so difficulty must be
//!   chosen for bounded practical sealing time
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Callers (UI, simulation drivers, CLI)          │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ LedgerHandle (Clone)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              mpsc::channel (bounded)                  │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │             LedgerActor (single task)                 │
//! │   owns LedgerState: events, tickets, owner index,     │
//! │   pending buffer, chain, surveillance                 │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::chain::Block;
use crate::crypto::SignedRequest;
use crate::state::LedgerState;
use crate::types::{Address, Event, EventStats, NewEvent, Ticket, TicketClass};
use crate::{Error, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Create an event
    CreateEvent {
        /// Event parameters
        spec: NewEvent,
        /// Reply channel
        response: oneshot::Sender<Result<Event>>,
    },

    /// Add an address to an event's waitlist
    JoinWaitlist {
        /// Target event
        event_id: Uuid,
        /// Address to enlist
        address: Address,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Mint a ticket
    MintTicket {
        /// Target event
        event_id: Uuid,
        /// Buyer address
        buyer: Address,
        /// Requested class
        class: TicketClass,
        /// Optional signed authorization
        auth: Option<SignedRequest>,
        /// Reply channel
        response: oneshot::Sender<Result<Ticket>>,
    },

    /// Initiate a transfer
    TransferTicket {
        /// Ticket to transfer
        ticket_id: Uuid,
        /// Current owner
        from: Address,
        /// Proposed recipient
        to: Address,
        /// Agreed price
        price: Decimal,
        /// Optional signed authorization
        auth: Option<SignedRequest>,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Confirm a pending transfer
    ConfirmTransfer {
        /// Ticket with the pending transfer
        ticket_id: Uuid,
        /// Confirming recipient
        to: Address,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Request a refund
    RequestRefund {
        /// Ticket to refund
        ticket_id: Uuid,
        /// Requesting owner
        owner: Address,
        /// Reply channel
        response: oneshot::Sender<Result<Decimal>>,
    },

    /// Consume a ticket at the venue
    UseTicket {
        /// Ticket presented
        ticket_id: Uuid,
        /// Presenting address
        presented_by: Address,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Check ticket validity and ownership
    VerifyTicket {
        /// Ticket to check
        ticket_id: Uuid,
        /// Presenting address
        presented_by: Address,
        /// Reply channel
        response: oneshot::Sender<bool>,
    },

    /// Cancel an event
    CancelEvent {
        /// Event to cancel
        event_id: Uuid,
        /// Organizer address
        organizer: Address,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Get aggregate event statistics
    GetEventStats {
        /// Event to summarize
        event_id: Uuid,
        /// Reply channel
        response: oneshot::Sender<Result<EventStats>>,
    },

    /// Get a ticket by ID
    GetTicket {
        /// Ticket to fetch
        ticket_id: Uuid,
        /// Reply channel
        response: oneshot::Sender<Result<Ticket>>,
    },

    /// Get all tickets owned by an address
    GetUserTickets {
        /// Owner address
        address: Address,
        /// Reply channel
        response: oneshot::Sender<Vec<Ticket>>,
    },

    /// Get all tickets for an event
    GetEventTickets {
        /// Event to enumerate
        event_id: Uuid,
        /// Reply channel
        response: oneshot::Sender<Vec<Ticket>>,
    },

    /// Seal the pending buffer into a block
    MinePending {
        /// Miner credited with the reward
        miner: Address,
        /// Reply channel
        response: oneshot::Sender<Result<Option<Block>>>,
    },

    /// Snapshot the chain
    GetChain {
        /// Reply channel
        response: oneshot::Sender<Vec<Block>>,
    },

    /// Number of transaction records awaiting mining
    PendingCount {
        /// Reply channel
        response: oneshot::Sender<usize>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
#[derive(Debug)]
pub struct LedgerActor {
    /// Owned ledger state
    state: LedgerState,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(state: LedgerState, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { state, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                _ => self.handle_message(msg),
            }
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        let now = Utc::now();

        match msg {
            LedgerMessage::CreateEvent { spec, response } => {
                let _ = response.send(self.state.create_event(spec, now));
            }

            LedgerMessage::JoinWaitlist {
                event_id,
                address,
                response,
            } => {
                let _ = response.send(self.state.join_waitlist(event_id, address));
            }

            LedgerMessage::MintTicket {
                event_id,
                buyer,
                class,
                auth,
                response,
            } => {
                let result = self
                    .state
                    .mint_ticket(event_id, buyer, class, auth.as_ref(), now);
                let _ = response.send(result);
            }

            LedgerMessage::TransferTicket {
                ticket_id,
                from,
                to,
                price,
                auth,
                response,
            } => {
                let result =
                    self.state
                        .transfer_ticket(ticket_id, &from, to, price, auth.as_ref(), now);
                let _ = response.send(result);
            }

            LedgerMessage::ConfirmTransfer {
                ticket_id,
                to,
                response,
            } => {
                let _ = response.send(self.state.confirm_transfer(ticket_id, &to, now));
            }

            LedgerMessage::RequestRefund {
                ticket_id,
                owner,
                response,
            } => {
                let _ = response.send(self.state.request_refund(ticket_id, &owner, now));
            }

            LedgerMessage::UseTicket {
                ticket_id,
                presented_by,
                response,
            } => {
                let _ = response.send(self.state.use_ticket(ticket_id, &presented_by, now));
            }

            LedgerMessage::VerifyTicket {
                ticket_id,
                presented_by,
                response,
            } => {
                let _ = response.send(self.state.verify_ticket(ticket_id, &presented_by, now));
            }

            LedgerMessage::CancelEvent {
                event_id,
                organizer,
                response,
            } => {
                let _ = response.send(self.state.cancel_event(event_id, &organizer, now));
            }

            LedgerMessage::GetEventStats { event_id, response } => {
                let _ = response.send(self.state.event_stats(event_id));
            }

            LedgerMessage::GetTicket {
                ticket_id,
                response,
            } => {
                let result = self
                    .state
                    .ticket(ticket_id)
                    .cloned()
                    .ok_or(Error::TicketNotFound(ticket_id));
                let _ = response.send(result);
            }

            LedgerMessage::GetUserTickets { address, response } => {
                let tickets = self
                    .state
                    .tickets_owned_by(&address)
                    .into_iter()
                    .cloned()
                    .collect();
                let _ = response.send(tickets);
            }

            LedgerMessage::GetEventTickets { event_id, response } => {
                let tickets = self
                    .state
                    .tickets_for_event(event_id)
                    .into_iter()
                    .cloned()
                    .collect();
                let _ = response.send(tickets);
            }

            LedgerMessage::MinePending { miner, response } => {
                let _ = response.send(self.state.mine_pending(miner, now));
            }

            LedgerMessage::GetChain { response } => {
                let _ = response.send(self.state.chain().blocks().to_vec());
            }

            LedgerMessage::PendingCount { response } => {
                let _ = response.send(self.state.pending_transactions().len());
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| Error::Concurrency("actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("response channel closed".to_string()))
    }

    /// Create an event
    pub async fn create_event(&self, spec: NewEvent) -> Result<Event> {
        self.request(|response| LedgerMessage::CreateEvent { spec, response })
            .await?
    }

    /// Add an address to an event's waitlist
    pub async fn join_waitlist(&self, event_id: Uuid, address: Address) -> Result<()> {
        self.request(|response| LedgerMessage::JoinWaitlist {
            event_id,
            address,
            response,
        })
        .await?
    }

    /// Mint a ticket
    pub async fn mint_ticket(
        &self,
        event_id: Uuid,
        buyer: Address,
        class: TicketClass,
        auth: Option<SignedRequest>,
    ) -> Result<Ticket> {
        self.request(|response| LedgerMessage::MintTicket {
            event_id,
            buyer,
            class,
            auth,
            response,
        })
        .await?
    }

    /// Initiate a transfer
    pub async fn transfer_ticket(
        &self,
        ticket_id: Uuid,
        from: Address,
        to: Address,
        price: Decimal,
        auth: Option<SignedRequest>,
    ) -> Result<()> {
        self.request(|response| LedgerMessage::TransferTicket {
            ticket_id,
            from,
            to,
            price,
            auth,
            response,
        })
        .await?
    }

    /// Confirm a pending transfer
    pub async fn confirm_transfer(&self, ticket_id: Uuid, to: Address) -> Result<()> {
        self.request(|response| LedgerMessage::ConfirmTransfer {
            ticket_id,
            to,
            response,
        })
        .await?
    }

    /// Request a refund
    pub async fn request_refund(&self, ticket_id: Uuid, owner: Address) -> Result<Decimal> {
        self.request(|response| LedgerMessage::RequestRefund {
            ticket_id,
            owner,
            response,
        })
        .await?
    }

    /// Consume a ticket at the venue
    pub async fn use_ticket(&self, ticket_id: Uuid, presented_by: Address) -> Result<()> {
        self.request(|response| LedgerMessage::UseTicket {
            ticket_id,
            presented_by,
            response,
        })
        .await?
    }

    /// Check ticket validity and ownership
    pub async fn verify_ticket(&self, ticket_id: Uuid, presented_by: Address) -> Result<bool> {
        self.request(|response| LedgerMessage::VerifyTicket {
            ticket_id,
            presented_by,
            response,
        })
        .await
    }

    /// Cancel an event
    pub async fn cancel_event(&self, event_id: Uuid, organizer: Address) -> Result<()> {
        self.request(|response| LedgerMessage::CancelEvent {
            event_id,
            organizer,
            response,
        })
        .await?
    }

    /// Get aggregate event statistics
    pub async fn event_stats(&self, event_id: Uuid) -> Result<EventStats> {
        self.request(|response| LedgerMessage::GetEventStats { event_id, response })
            .await?
    }

    /// Get a ticket by ID
    pub async fn ticket(&self, ticket_id: Uuid) -> Result<Ticket> {
        self.request(|response| LedgerMessage::GetTicket {
            ticket_id,
            response,
        })
        .await?
    }

    /// Get all tickets owned by an address
    pub async fn user_tickets(&self, address: Address) -> Result<Vec<Ticket>> {
        self.request(|response| LedgerMessage::GetUserTickets { address, response })
            .await
    }

    /// Get all tickets for an event
    pub async fn event_tickets(&self, event_id: Uuid) -> Result<Vec<Ticket>> {
        self.request(|response| LedgerMessage::GetEventTickets { event_id, response })
            .await
    }

    /// Seal the pending buffer into a block
    pub async fn mine_pending(&self, miner: Address) -> Result<Option<Block>> {
        self.request(|response| LedgerMessage::MinePending { miner, response })
            .await?
    }

    /// Snapshot the chain
    pub async fn chain(&self) -> Result<Vec<Block>> {
        self.request(|response| LedgerMessage::GetChain { response })
            .await
    }

    /// Number of transaction records awaiting mining
    pub async fn pending_count(&self) -> Result<usize> {
        self.request(|response| LedgerMessage::PendingCount { response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(state: LedgerState) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let actor = LedgerActor::new(state, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn test_state() -> LedgerState {
        let mut config = Config::default();
        config.mining.difficulty = 1;
        LedgerState::new(config, Utc::now())
    }

    fn sample_spec() -> NewEvent {
        let now = Utc::now();
        let mut counts = BTreeMap::new();
        counts.insert(TicketClass::Regular, 10);
        let mut prices = BTreeMap::new();
        prices.insert(TicketClass::Regular, dec!(50));

        NewEvent {
            name: "Actor Night".to_string(),
            venue: "Hall".to_string(),
            date: now + Duration::days(10),
            class_counts: counts,
            class_prices: prices,
            organizer: Address::new("org"),
            description: String::new(),
            category: "theatre".to_string(),
            max_per_user: 4,
            refundable_until: now + Duration::days(8),
        }
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let handle = spawn_ledger_actor(test_state());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_round_trip() {
        let handle = spawn_ledger_actor(test_state());

        let event = handle.create_event(sample_spec()).await.unwrap();
        let ticket = handle
            .mint_ticket(
                event.event_id,
                Address::new("alice"),
                TicketClass::Regular,
                None,
            )
            .await
            .unwrap();

        let fetched = handle.ticket(ticket.ticket_id).await.unwrap();
        assert_eq!(fetched.owner, Address::new("alice"));

        let owned = handle.user_tickets(Address::new("alice")).await.unwrap();
        assert_eq!(owned.len(), 1);

        let block = handle
            .mine_pending(Address::new("miner"))
            .await
            .unwrap()
            .unwrap();
        assert!(block.hash.starts_with('0'));
        assert_eq!(handle.pending_count().await.unwrap(), 0);
        assert_eq!(handle.chain().await.unwrap().len(), 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_errors() {
        let handle = spawn_ledger_actor(test_state());
        handle.shutdown().await.unwrap();

        // Give the actor a moment to drain and drop the mailbox.
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;

        let result = handle.pending_count().await;
        assert!(matches!(result, Err(Error::Concurrency(_))));
    }
}
