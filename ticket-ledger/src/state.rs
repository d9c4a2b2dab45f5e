//! In-memory ledger state and engine operations
//!
//! [`LedgerState`] is the single aggregate holding events, tickets, the
//! owner index, the pending-transaction buffer, and the chain. Every
//! mutation goes through one of its methods, each of which is a complete
//! critical section: it validates, mutates, and appends a transaction
//! record, or fails without side effects (except for the documented
//! waitlist additions on cancelled or sold-out mints).
//!
//! Methods take `now` explicitly so sliding windows, cooldowns, and
//! expiries can be exercised in tests without sleeping; the async facade
//! supplies wall-clock time.

use crate::chain::{Block, Chain};
use crate::config::Config;
use crate::crypto::{self, SignedRequest};
use crate::heuristics::{count_in_window, TransferSurveillance};
use crate::refund;
use crate::types::{
    Address, Event, EventStats, NewEvent, PendingTransfer, Ticket, TicketClass, TicketStatus,
    TransferRecord, TxPayload, TxRecord,
};
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// The in-memory ledger aggregate
#[derive(Debug)]
pub struct LedgerState {
    config: Config,
    events: HashMap<Uuid, Event>,
    tickets: HashMap<Uuid, Ticket>,
    // Map: owner -> owned ticket IDs; kept consistent with Ticket::owner
    // on every ownership change
    owner_index: HashMap<Address, HashSet<Uuid>>,
    pending_transactions: Vec<TxRecord>,
    chain: Chain,
    surveillance: TransferSurveillance,
}

impl LedgerState {
    /// Create an empty ledger with its genesis block
    pub fn new(config: Config, genesis_at: DateTime<Utc>) -> Self {
        let surveillance = TransferSurveillance::new(config.surveillance.clone());
        Self {
            config,
            events: HashMap::new(),
            tickets: HashMap::new(),
            owner_index: HashMap::new(),
            pending_transactions: Vec::new(),
            chain: Chain::new(genesis_at),
            surveillance,
        }
    }

    /// Create an event, deriving availability and the per-class resale floor
    ///
    /// No date-ordering validation is performed here; that is the caller's
    /// responsibility.
    pub fn create_event(&mut self, spec: NewEvent, now: DateTime<Utc>) -> Result<Event> {
        let event_id = Uuid::now_v7();
        let event = Event::new(
            event_id,
            spec,
            self.config.transfers.default_cooldown_hours,
        );

        self.record_tx(
            now,
            TxPayload::CreateEvent {
                event_id,
                name: event.name.clone(),
                venue: event.venue.clone(),
                date: event.date,
                organizer: event.organizer.clone(),
                category: event.category.clone(),
            },
        );
        self.events.insert(event_id, event.clone());

        tracing::info!(%event_id, name = %event.name, "created event");
        Ok(event)
    }

    /// Add an address to an event's waitlist
    pub fn join_waitlist(&mut self, event_id: Uuid, address: Address) -> Result<()> {
        let event = self
            .events
            .get_mut(&event_id)
            .ok_or(Error::EventNotFound(event_id))?;
        event.waitlist.insert(address);
        Ok(())
    }

    /// Mint a ticket for a buyer
    ///
    /// Cancelled and sold-out events add the buyer to the waitlist before
    /// failing. A supplied authorization is verified against the canonical
    /// mint payload; an absent authorization is accepted.
    pub fn mint_ticket(
        &mut self,
        event_id: Uuid,
        buyer: Address,
        class: TicketClass,
        auth: Option<&SignedRequest>,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let (price, cap, event_name, venue, event_date) = {
            let event = self
                .events
                .get_mut(&event_id)
                .ok_or(Error::EventNotFound(event_id))?;

            if event.date <= now {
                return Err(Error::EventPassed(event_id));
            }

            if event.is_cancelled {
                event.waitlist.insert(buyer);
                return Err(Error::EventCancelled(event_id));
            }

            let price = match (
                event.available.get(&class).copied(),
                event.prices.get(&class).copied(),
            ) {
                (Some(remaining), Some(price)) if remaining > 0 => price,
                _ => {
                    event.waitlist.insert(buyer);
                    return Err(Error::SoldOut {
                        event_id,
                        class: class.code().to_string(),
                    });
                }
            };

            (
                price,
                event.max_per_user,
                event.name.clone(),
                event.venue.clone(),
                event.date,
            )
        };

        let minted_recently = count_in_window(
            self.tickets_owned_by(&buyer).iter().map(|t| t.issued_at),
            now,
            self.config.throttle.window_hours,
        );
        if minted_recently >= self.config.throttle.max_mints_per_window {
            return Err(Error::PurchaseThrottled {
                count: minted_recently,
                window_hours: self.config.throttle.window_hours,
            });
        }

        if let Some(auth) = auth {
            let payload = crypto::mint_payload(&event_id, &buyer, class);
            if !crypto::verify_signature(&payload, &auth.signature, &auth.public_key) {
                return Err(Error::SignatureRejected);
            }
        }

        let held_for_event = self
            .tickets_owned_by(&buyer)
            .iter()
            .filter(|t| t.event_id == event_id)
            .count();
        if held_for_event >= cap as usize {
            return Err(Error::CapExceeded { event_id, cap });
        }

        let ticket_id = Uuid::now_v7();
        let mut metadata = BTreeMap::new();
        metadata.insert("event_name".to_string(), event_name);
        metadata.insert("venue".to_string(), venue);
        metadata.insert("date".to_string(), event_date.to_rfc3339());
        metadata.insert("class".to_string(), class.code().to_string());

        let ticket = Ticket {
            ticket_id,
            event_id,
            class,
            price,
            owner: buyer.clone(),
            metadata,
            history: vec![TransferRecord {
                at: now,
                from: Address::mint_source(),
                to: buyer.clone(),
                price,
            }],
            status: TicketStatus::Valid,
            qr_token: crypto::qr_token(&ticket_id, &event_id, &buyer, now),
            issued_at: now,
            last_ownership_change: now,
            pending: None,
        };

        let event = self
            .events
            .get_mut(&event_id)
            .ok_or(Error::EventNotFound(event_id))?;
        if let Some(remaining) = event.available.get_mut(&class) {
            *remaining = remaining.saturating_sub(1);
        }

        self.owner_index
            .entry(buyer.clone())
            .or_default()
            .insert(ticket_id);
        self.tickets.insert(ticket_id, ticket.clone());

        self.record_tx(
            now,
            TxPayload::MintTicket {
                ticket_id,
                event_id,
                buyer: buyer.clone(),
                class,
                price,
            },
        );

        tracing::info!(%ticket_id, %event_id, buyer = %buyer, class = %class, "minted ticket");
        Ok(ticket)
    }

    /// Initiate a two-phase transfer
    ///
    /// Ownership and history are untouched until the recipient confirms;
    /// the ticket parks in `PendingTransfer` with a confirmation deadline.
    pub fn transfer_ticket(
        &mut self,
        ticket_id: Uuid,
        from: &Address,
        to: Address,
        price: Decimal,
        auth: Option<&SignedRequest>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        {
            let ticket = self
                .tickets
                .get(&ticket_id)
                .ok_or(Error::TicketNotFound(ticket_id))?;

            if ticket.owner != *from {
                return Err(Error::NotOwner {
                    caller: from.to_string(),
                    ticket_id,
                });
            }

            if ticket.status != TicketStatus::Valid {
                return Err(Error::InvalidStatus {
                    ticket_id,
                    actual: ticket.status,
                    expected: TicketStatus::Valid,
                });
            }

            let event = self
                .events
                .get(&ticket.event_id)
                .ok_or(Error::EventNotFound(ticket.event_id))?;

            if event.date <= now {
                return Err(Error::EventPassed(event.event_id));
            }

            if let Some(auth) = auth {
                let payload = crypto::transfer_payload(&ticket_id, from, &to, &price);
                if !crypto::verify_signature(&payload, &auth.signature, &auth.public_key) {
                    return Err(Error::SignatureRejected);
                }
            }

            let minimum = event
                .min_resale
                .get(&ticket.class)
                .copied()
                .unwrap_or(Decimal::ZERO);
            if price < minimum {
                return Err(Error::PriceBelowMinimum {
                    offered: price,
                    minimum,
                });
            }

            let cooldown = event.transfer_cooldown();
            if cooldown > Duration::zero() {
                let until = ticket.last_ownership_change + cooldown;
                if now < until {
                    return Err(Error::CooldownActive { until });
                }
            }

            self.surveillance.check(from, now)?;
        }

        let expires_at = now + Duration::hours(self.config.transfers.pending_ttl_hours);
        let ticket = self
            .tickets
            .get_mut(&ticket_id)
            .ok_or(Error::TicketNotFound(ticket_id))?;
        ticket.status = TicketStatus::PendingTransfer;
        ticket.pending = Some(PendingTransfer {
            to: to.clone(),
            price,
            expires_at,
        });

        self.surveillance.record(from, now);
        self.record_tx(
            now,
            TxPayload::InitTransfer {
                ticket_id,
                from: from.clone(),
                to: to.clone(),
                price,
                expires_at,
            },
        );

        tracing::info!(%ticket_id, from = %from, to = %to, %price, "initiated transfer");
        Ok(())
    }

    /// Confirm a pending transfer as its named recipient
    ///
    /// A confirmation attempt after the deadline clears the pending record,
    /// reverts the ticket to `Valid` under its original owner, and fails
    /// with an expiry error.
    pub fn confirm_transfer(
        &mut self,
        ticket_id: Uuid,
        to: &Address,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let ticket = self
            .tickets
            .get_mut(&ticket_id)
            .ok_or(Error::TicketNotFound(ticket_id))?;

        let pending = ticket
            .pending
            .clone()
            .ok_or(Error::NoPendingTransfer(ticket_id))?;

        if pending.to != *to {
            return Err(Error::WrongRecipient {
                expected: pending.to.to_string(),
                presented: to.to_string(),
            });
        }

        if now > pending.expires_at {
            ticket.status = TicketStatus::Valid;
            ticket.pending = None;
            return Err(Error::TransferExpired {
                expired_at: pending.expires_at,
            });
        }

        let previous_owner = ticket.owner.clone();
        ticket.history.push(TransferRecord {
            at: now,
            from: previous_owner.clone(),
            to: to.clone(),
            price: pending.price,
        });
        ticket.owner = to.clone();
        ticket.last_ownership_change = now;
        ticket.pending = None;
        ticket.status = TicketStatus::Valid;

        if let Some(owned) = self.owner_index.get_mut(&previous_owner) {
            owned.remove(&ticket_id);
        }
        self.owner_index
            .entry(to.clone())
            .or_default()
            .insert(ticket_id);

        self.record_tx(
            now,
            TxPayload::ConfirmTransfer {
                ticket_id,
                from: previous_owner.clone(),
                to: to.clone(),
                price: pending.price,
            },
        );

        tracing::info!(%ticket_id, from = %previous_owner, to = %to, "confirmed transfer");
        Ok(())
    }

    /// Request a refund as the ticket's owner
    ///
    /// The amount is decided by the refund policy; inventory is not
    /// restored.
    pub fn request_refund(
        &mut self,
        ticket_id: Uuid,
        owner: &Address,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        let (event_id, amount) = {
            let ticket = self
                .tickets
                .get(&ticket_id)
                .ok_or(Error::TicketNotFound(ticket_id))?;

            if ticket.owner != *owner {
                return Err(Error::NotOwner {
                    caller: owner.to_string(),
                    ticket_id,
                });
            }

            if ticket.status != TicketStatus::Valid {
                return Err(Error::InvalidStatus {
                    ticket_id,
                    actual: ticket.status,
                    expected: TicketStatus::Valid,
                });
            }

            let event = self
                .events
                .get(&ticket.event_id)
                .ok_or(Error::EventNotFound(ticket.event_id))?;

            let amount = refund::compute_refund(ticket, event, now)
                .ok_or(Error::RefundIneligible(ticket_id))?;
            (ticket.event_id, amount)
        };

        if let Some(ticket) = self.tickets.get_mut(&ticket_id) {
            ticket.status = TicketStatus::Cancelled;
        }

        self.record_tx(
            now,
            TxPayload::RefundTicket {
                ticket_id,
                event_id,
                owner: owner.clone(),
                amount,
            },
        );

        tracing::info!(%ticket_id, owner = %owner, %amount, "refunded ticket");
        Ok(amount)
    }

    /// Consume a ticket at the venue
    pub fn use_ticket(
        &mut self,
        ticket_id: Uuid,
        presented_by: &Address,
        now: DateTime<Utc>,
    ) -> Result<()> {
        {
            let ticket = self
                .tickets
                .get(&ticket_id)
                .ok_or(Error::TicketNotFound(ticket_id))?;

            if ticket.owner != *presented_by {
                return Err(Error::NotOwner {
                    caller: presented_by.to_string(),
                    ticket_id,
                });
            }

            if ticket.status != TicketStatus::Valid {
                return Err(Error::InvalidStatus {
                    ticket_id,
                    actual: ticket.status,
                    expected: TicketStatus::Valid,
                });
            }

            let event = self
                .events
                .get(&ticket.event_id)
                .ok_or(Error::EventNotFound(ticket.event_id))?;

            if event.is_cancelled {
                return Err(Error::EventCancelled(event.event_id));
            }

            if event.date <= now {
                return Err(Error::EventPassed(event.event_id));
            }
        }

        if let Some(ticket) = self.tickets.get_mut(&ticket_id) {
            ticket.status = TicketStatus::Used;
        }

        self.record_tx(
            now,
            TxPayload::UseTicket {
                ticket_id,
                presented_by: presented_by.clone(),
            },
        );

        tracing::info!(%ticket_id, presented_by = %presented_by, "used ticket");
        Ok(())
    }

    /// Check ticket validity and ownership without mutating anything
    pub fn verify_ticket(
        &self,
        ticket_id: Uuid,
        presented_by: &Address,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(ticket) = self.tickets.get(&ticket_id) else {
            return false;
        };
        let Some(event) = self.events.get(&ticket.event_id) else {
            return false;
        };

        ticket.status == TicketStatus::Valid
            && ticket.owner == *presented_by
            && event.date > now
            && !event.is_cancelled
    }

    /// Cancel an event as its organizer
    ///
    /// Every still-valid ticket is cancelled with an unconditional
    /// full-price refund record; the day-banded refund policy does not
    /// apply to organizer-side cancellation. Inventory is not restored.
    pub fn cancel_event(
        &mut self,
        event_id: Uuid,
        organizer: &Address,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let event = self
            .events
            .get_mut(&event_id)
            .ok_or(Error::EventNotFound(event_id))?;

        if event.organizer != *organizer {
            return Err(Error::NotOrganizer {
                caller: organizer.to_string(),
                event_id,
            });
        }

        event.is_cancelled = true;
        self.record_tx(
            now,
            TxPayload::CancelEvent {
                event_id,
                organizer: organizer.clone(),
            },
        );

        let mut affected: Vec<(Uuid, Address, Decimal)> = self
            .tickets
            .values()
            .filter(|t| t.event_id == event_id && t.status == TicketStatus::Valid)
            .map(|t| (t.ticket_id, t.owner.clone(), t.price))
            .collect();
        affected.sort_by_key(|(ticket_id, _, _)| *ticket_id);

        let refunded = affected.len();
        for (ticket_id, owner, price) in affected {
            if let Some(ticket) = self.tickets.get_mut(&ticket_id) {
                ticket.status = TicketStatus::Cancelled;
            }
            self.record_tx(
                now,
                TxPayload::RefundTicket {
                    ticket_id,
                    event_id,
                    owner,
                    amount: price,
                },
            );
        }

        tracing::info!(%event_id, refunded, "cancelled event");
        Ok(())
    }

    /// Aggregate statistics for one event
    pub fn event_stats(&self, event_id: Uuid) -> Result<EventStats> {
        let event = self
            .events
            .get(&event_id)
            .ok_or(Error::EventNotFound(event_id))?;

        let tickets: Vec<&Ticket> = self
            .tickets
            .values()
            .filter(|t| t.event_id == event_id)
            .collect();

        let total_tickets: u32 = event.total.values().sum();
        let available_tickets: u32 = event.available.values().sum();

        let mut sold_by_class = BTreeMap::new();
        for class in TicketClass::all() {
            let sold = tickets.iter().filter(|t| t.class == class).count() as u32;
            sold_by_class.insert(class, sold);
        }

        Ok(EventStats {
            event_id,
            total_tickets,
            available_tickets,
            sold_tickets: total_tickets - available_tickets,
            waitlist_size: event.waitlist.len(),
            revenue: tickets.iter().map(|t| t.price).sum(),
            sold_by_class,
            used_tickets: tickets
                .iter()
                .filter(|t| t.status == TicketStatus::Used)
                .count() as u32,
            cancelled_tickets: tickets
                .iter()
                .filter(|t| t.status == TicketStatus::Cancelled)
                .count() as u32,
        })
    }

    /// Seal the pending buffer into a new block
    ///
    /// A no-op on an empty buffer. Otherwise a fixed reward record is
    /// appended for the miner, the buffer is sealed over the current tip,
    /// and the buffer is cleared. Sealing runs inside the writer critical
    /// section; choose the difficulty accordingly.
    pub fn mine_pending(&mut self, miner: Address, now: DateTime<Utc>) -> Result<Option<Block>> {
        if self.pending_transactions.is_empty() {
            tracing::debug!("no pending transactions to mine");
            return Ok(None);
        }

        self.record_tx(
            now,
            TxPayload::Reward {
                miner: miner.clone(),
                amount: self.config.mining.reward,
            },
        );

        let transactions = std::mem::take(&mut self.pending_transactions);
        let mut block = Block::new(now, transactions, self.chain.tip().hash.clone());
        block.seal(self.config.mining.difficulty);

        tracing::info!(
            nonce = block.nonce,
            hash = %block.hash,
            miner = %miner,
            "sealed block"
        );

        self.chain.append(block.clone())?;
        Ok(Some(block))
    }

    /// Look up an event
    pub fn event(&self, event_id: Uuid) -> Option<&Event> {
        self.events.get(&event_id)
    }

    /// Look up a ticket
    pub fn ticket(&self, ticket_id: Uuid) -> Option<&Ticket> {
        self.tickets.get(&ticket_id)
    }

    /// All tickets currently owned by an address
    pub fn tickets_owned_by(&self, address: &Address) -> Vec<&Ticket> {
        self.owner_index
            .get(address)
            .map(|ids| ids.iter().filter_map(|id| self.tickets.get(id)).collect())
            .unwrap_or_default()
    }

    /// All tickets minted for an event
    pub fn tickets_for_event(&self, event_id: Uuid) -> Vec<&Ticket> {
        self.tickets
            .values()
            .filter(|t| t.event_id == event_id)
            .collect()
    }

    /// Ticket IDs recorded against an address in the owner index
    pub fn owned_ticket_ids(&self, address: &Address) -> Option<&HashSet<Uuid>> {
        self.owner_index.get(address)
    }

    /// The block chain
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Transaction records awaiting mining
    pub fn pending_transactions(&self) -> &[TxRecord] {
        &self.pending_transactions
    }

    /// All tickets, in no particular order
    pub fn tickets(&self) -> impl Iterator<Item = &Ticket> + '_ {
        self.tickets.values()
    }

    /// All events, in no particular order
    pub fn events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.values()
    }

    fn record_tx(&mut self, now: DateTime<Utc>, payload: TxPayload) {
        self.pending_transactions.push(TxRecord::new(now, payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crypto::KeyPair;
    use rust_decimal_macros::dec;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.mining.difficulty = 1;
        config
    }

    fn state_at(now: DateTime<Utc>) -> LedgerState {
        LedgerState::new(test_config(), now)
    }

    fn event_spec(regular: u32, max_per_user: u32, now: DateTime<Utc>) -> NewEvent {
        let mut counts = BTreeMap::new();
        counts.insert(TicketClass::Regular, regular);
        let mut prices = BTreeMap::new();
        prices.insert(TicketClass::Regular, dec!(50));

        NewEvent {
            name: "Night Show".to_string(),
            venue: "Arena".to_string(),
            date: now + Duration::days(30),
            class_counts: counts,
            class_prices: prices,
            organizer: Address::new("org-1"),
            description: "one night only".to_string(),
            category: "music".to_string(),
            max_per_user,
            refundable_until: now + Duration::days(25),
        }
    }

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    #[test]
    fn test_mint_updates_inventory_index_and_history() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();

        let ticket = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();

        let stored = state.event(event.event_id).unwrap();
        assert_eq!(stored.available[&TicketClass::Regular], 4);

        assert_eq!(ticket.owner, addr("alice"));
        assert_eq!(ticket.history.len(), 1);
        assert_eq!(ticket.history[0].from, Address::mint_source());
        assert_eq!(ticket.qr_token.len(), 64);

        let owned = state.owned_ticket_ids(&addr("alice")).unwrap();
        assert!(owned.contains(&ticket.ticket_id));
        assert_eq!(state.pending_transactions().len(), 2); // create + mint
    }

    #[test]
    fn test_mint_unknown_event() {
        let now = Utc::now();
        let mut state = state_at(now);
        let err = state
            .mint_ticket(Uuid::now_v7(), addr("alice"), TicketClass::Regular, None, now)
            .unwrap_err();
        assert!(matches!(err, Error::EventNotFound(_)));
    }

    #[test]
    fn test_mint_after_event_date_fails() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();

        let after = event.date + Duration::hours(1);
        let err = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, after)
            .unwrap_err();
        assert!(matches!(err, Error::EventPassed(_)));
    }

    #[test]
    fn test_mint_cancelled_event_joins_waitlist() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        state.cancel_event(event.event_id, &addr("org-1"), now).unwrap();

        let err = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap_err();
        assert!(matches!(err, Error::EventCancelled(_)));
        assert!(state
            .event(event.event_id)
            .unwrap()
            .waitlist
            .contains(&addr("alice")));
    }

    #[test]
    fn test_sellout_joins_waitlist_and_never_restocks() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(2, 4, now), now).unwrap();

        state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();
        state
            .mint_ticket(event.event_id, addr("bob"), TicketClass::Regular, None, now)
            .unwrap();

        let err = state
            .mint_ticket(event.event_id, addr("carol"), TicketClass::Regular, None, now)
            .unwrap_err();
        assert!(matches!(err, Error::SoldOut { .. }));

        let stored = state.event(event.event_id).unwrap();
        assert_eq!(stored.available[&TicketClass::Regular], 0);
        assert!(stored.waitlist.contains(&addr("carol")));
    }

    #[test]
    fn test_per_user_cap() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(10, 2, now), now).unwrap();

        for _ in 0..2 {
            state
                .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
                .unwrap();
        }

        let err = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap_err();
        assert!(matches!(err, Error::CapExceeded { cap: 2, .. }));
    }

    #[test]
    fn test_purchase_throttle_across_events() {
        let now = Utc::now();
        let mut state = state_at(now);
        let first = state.create_event(event_spec(20, 20, now), now).unwrap();
        let second = state.create_event(event_spec(20, 20, now), now).unwrap();

        for i in 0..10 {
            let event_id = if i % 2 == 0 {
                first.event_id
            } else {
                second.event_id
            };
            state
                .mint_ticket(event_id, addr("scalper"), TicketClass::Regular, None, now)
                .unwrap();
        }

        let err = state
            .mint_ticket(first.event_id, addr("scalper"), TicketClass::Regular, None, now)
            .unwrap_err();
        assert!(matches!(err, Error::PurchaseThrottled { count: 10, .. }));

        // Outside the window the same buyer can mint again.
        let later = now + Duration::hours(25);
        state
            .mint_ticket(first.event_id, addr("scalper"), TicketClass::Regular, None, later)
            .unwrap();
    }

    #[test]
    fn test_mint_signature_paths() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        let wallet = KeyPair::generate();
        let buyer = addr("alice");

        let payload = crypto::mint_payload(&event.event_id, &buyer, TicketClass::Regular);
        let good = wallet.authorize(&payload);
        state
            .mint_ticket(event.event_id, buyer.clone(), TicketClass::Regular, Some(&good), now)
            .unwrap();

        // Signature over the wrong payload is rejected before any mutation.
        let bad = wallet.authorize(b"mint:something-else");
        let before = state.event(event.event_id).unwrap().available[&TicketClass::Regular];
        let err = state
            .mint_ticket(event.event_id, buyer, TicketClass::Regular, Some(&bad), now)
            .unwrap_err();
        assert!(matches!(err, Error::SignatureRejected));
        assert_eq!(
            state.event(event.event_id).unwrap().available[&TicketClass::Regular],
            before
        );
    }

    #[test]
    fn test_two_phase_transfer() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        let ticket = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();

        state
            .transfer_ticket(ticket.ticket_id, &addr("alice"), addr("bob"), dec!(30), None, now)
            .unwrap();

        // Ownership is unchanged between initiate and confirm.
        let parked = state.ticket(ticket.ticket_id).unwrap();
        assert_eq!(parked.status, TicketStatus::PendingTransfer);
        assert_eq!(parked.owner, addr("alice"));
        assert_eq!(parked.history.len(), 1);
        assert!(state.owned_ticket_ids(&addr("bob")).is_none());

        state
            .confirm_transfer(ticket.ticket_id, &addr("bob"), now + Duration::hours(1))
            .unwrap();

        let moved = state.ticket(ticket.ticket_id).unwrap();
        assert_eq!(moved.status, TicketStatus::Valid);
        assert_eq!(moved.owner, addr("bob"));
        assert_eq!(moved.history.len(), 2);
        assert!(moved.pending.is_none());
        assert!(!state
            .owned_ticket_ids(&addr("alice"))
            .unwrap()
            .contains(&ticket.ticket_id));
        assert!(state
            .owned_ticket_ids(&addr("bob"))
            .unwrap()
            .contains(&ticket.ticket_id));
    }

    #[test]
    fn test_resale_price_floor() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        let ticket = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();

        // Floor for a 50 issue price is 25; one cent below fails.
        let err = state
            .transfer_ticket(ticket.ticket_id, &addr("alice"), addr("bob"), dec!(24.99), None, now)
            .unwrap_err();
        assert!(matches!(err, Error::PriceBelowMinimum { .. }));

        state
            .transfer_ticket(ticket.ticket_id, &addr("alice"), addr("bob"), dec!(25), None, now)
            .unwrap();
    }

    #[test]
    fn test_transfer_requires_owner_and_valid_status() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        let ticket = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();

        let err = state
            .transfer_ticket(ticket.ticket_id, &addr("mallory"), addr("bob"), dec!(30), None, now)
            .unwrap_err();
        assert!(matches!(err, Error::NotOwner { .. }));

        state
            .transfer_ticket(ticket.ticket_id, &addr("alice"), addr("bob"), dec!(30), None, now)
            .unwrap();
        let err = state
            .transfer_ticket(ticket.ticket_id, &addr("alice"), addr("carol"), dec!(30), None, now)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStatus { .. }));
    }

    #[test]
    fn test_cooldown_blocks_quick_flip() {
        let now = Utc::now();
        let mut config = test_config();
        config.transfers.default_cooldown_hours = 2;
        let mut state = LedgerState::new(config, now);

        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        let ticket = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();

        let err = state
            .transfer_ticket(
                ticket.ticket_id,
                &addr("alice"),
                addr("bob"),
                dec!(30),
                None,
                now + Duration::minutes(30),
            )
            .unwrap_err();
        assert!(matches!(err, Error::CooldownActive { .. }));

        state
            .transfer_ticket(
                ticket.ticket_id,
                &addr("alice"),
                addr("bob"),
                dec!(30),
                None,
                now + Duration::hours(3),
            )
            .unwrap();
    }

    #[test]
    fn test_transfer_surveillance_limits_initiations() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(20, 20, now), now).unwrap();

        let mut tickets = Vec::new();
        for _ in 0..6 {
            tickets.push(
                state
                    .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
                    .unwrap(),
            );
        }

        for (i, ticket) in tickets.iter().take(5).enumerate() {
            state
                .transfer_ticket(
                    ticket.ticket_id,
                    &addr("alice"),
                    addr("bob"),
                    dec!(30),
                    None,
                    now + Duration::minutes(i as i64),
                )
                .unwrap();
        }

        let err = state
            .transfer_ticket(
                tickets[5].ticket_id,
                &addr("alice"),
                addr("bob"),
                dec!(30),
                None,
                now + Duration::minutes(10),
            )
            .unwrap_err();
        assert!(matches!(err, Error::TransferThrottled { .. }));

        // 24h past the first initiation the window has slid open again.
        state
            .transfer_ticket(
                tickets[5].ticket_id,
                &addr("alice"),
                addr("bob"),
                dec!(30),
                None,
                now + Duration::hours(24) + Duration::minutes(1),
            )
            .unwrap();
    }

    #[test]
    fn test_confirm_wrong_recipient() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        let ticket = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();
        state
            .transfer_ticket(ticket.ticket_id, &addr("alice"), addr("bob"), dec!(30), None, now)
            .unwrap();

        let err = state
            .confirm_transfer(ticket.ticket_id, &addr("mallory"), now)
            .unwrap_err();
        assert!(matches!(err, Error::WrongRecipient { .. }));
        // Still pending for the real recipient.
        assert_eq!(
            state.ticket(ticket.ticket_id).unwrap().status,
            TicketStatus::PendingTransfer
        );
    }

    #[test]
    fn test_confirm_after_expiry_reverts() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        let ticket = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();
        state
            .transfer_ticket(ticket.ticket_id, &addr("alice"), addr("bob"), dec!(30), None, now)
            .unwrap();

        let late = now + Duration::hours(25);
        let err = state
            .confirm_transfer(ticket.ticket_id, &addr("bob"), late)
            .unwrap_err();
        assert!(matches!(err, Error::TransferExpired { .. }));

        let reverted = state.ticket(ticket.ticket_id).unwrap();
        assert_eq!(reverted.status, TicketStatus::Valid);
        assert_eq!(reverted.owner, addr("alice"));
        assert!(reverted.pending.is_none());
        assert_eq!(reverted.history.len(), 1);
    }

    #[test]
    fn test_refund_cancels_without_restocking() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        let ticket = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();

        // 30 days out: full refund.
        let amount = state
            .request_refund(ticket.ticket_id, &addr("alice"), now)
            .unwrap();
        assert_eq!(amount, dec!(50));

        let refunded = state.ticket(ticket.ticket_id).unwrap();
        assert_eq!(refunded.status, TicketStatus::Cancelled);
        assert_eq!(
            state.event(event.event_id).unwrap().available[&TicketClass::Regular],
            4
        );

        // Terminal: a second refund is an invalid-state error.
        let err = state
            .request_refund(ticket.ticket_id, &addr("alice"), now)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStatus { .. }));
    }

    #[test]
    fn test_use_ticket_and_verify() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        let ticket = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();

        assert!(state.verify_ticket(ticket.ticket_id, &addr("alice"), now));
        assert!(!state.verify_ticket(ticket.ticket_id, &addr("bob"), now));

        let err = state
            .use_ticket(ticket.ticket_id, &addr("bob"), now)
            .unwrap_err();
        assert!(matches!(err, Error::NotOwner { .. }));

        state.use_ticket(ticket.ticket_id, &addr("alice"), now).unwrap();
        assert_eq!(
            state.ticket(ticket.ticket_id).unwrap().status,
            TicketStatus::Used
        );
        assert!(!state.verify_ticket(ticket.ticket_id, &addr("alice"), now));
    }

    #[test]
    fn test_cancel_event_refunds_valid_tickets_in_full() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        let kept = state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();
        let used = state
            .mint_ticket(event.event_id, addr("bob"), TicketClass::Regular, None, now)
            .unwrap();
        state.use_ticket(used.ticket_id, &addr("bob"), now).unwrap();

        let err = state
            .cancel_event(event.event_id, &addr("mallory"), now)
            .unwrap_err();
        assert!(matches!(err, Error::NotOrganizer { .. }));

        state.cancel_event(event.event_id, &addr("org-1"), now).unwrap();

        assert!(state.event(event.event_id).unwrap().is_cancelled);
        assert_eq!(
            state.ticket(kept.ticket_id).unwrap().status,
            TicketStatus::Cancelled
        );
        // Used tickets are terminal and untouched by cancellation.
        assert_eq!(
            state.ticket(used.ticket_id).unwrap().status,
            TicketStatus::Used
        );

        let refunds: Vec<_> = state
            .pending_transactions()
            .iter()
            .filter(|tx| {
                matches!(
                    tx.payload,
                    TxPayload::RefundTicket { amount, .. } if amount == dec!(50)
                )
            })
            .collect();
        assert_eq!(refunds.len(), 1);
    }

    #[test]
    fn test_event_stats() {
        let now = Utc::now();
        let mut state = state_at(now);
        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();
        let refunded = state
            .mint_ticket(event.event_id, addr("bob"), TicketClass::Regular, None, now)
            .unwrap();
        state
            .request_refund(refunded.ticket_id, &addr("bob"), now)
            .unwrap();

        let stats = state.event_stats(event.event_id).unwrap();
        assert_eq!(stats.total_tickets, 5);
        assert_eq!(stats.available_tickets, 3);
        assert_eq!(stats.sold_tickets, 2);
        assert_eq!(stats.sold_by_class[&TicketClass::Regular], 2);
        assert_eq!(stats.sold_by_class[&TicketClass::Vip], 0);
        assert_eq!(stats.cancelled_tickets, 1);
        assert_eq!(stats.revenue, dec!(100));
    }

    #[test]
    fn test_mining_seals_buffer_and_extends_chain() {
        let now = Utc::now();
        let mut state = state_at(now);

        // Empty buffer: no block.
        assert!(state.mine_pending(addr("miner"), now).unwrap().is_none());

        let event = state.create_event(event_spec(5, 4, now), now).unwrap();
        state
            .mint_ticket(event.event_id, addr("alice"), TicketClass::Regular, None, now)
            .unwrap();

        let block = state.mine_pending(addr("miner"), now).unwrap().unwrap();
        assert!(block.hash.starts_with('0'));
        assert!(state.pending_transactions().is_empty());
        assert_eq!(state.chain().len(), 2);
        assert!(state.chain().is_valid());

        // create_event + mint + reward
        assert_eq!(block.transactions.len(), 3);
        assert!(matches!(
            block.transactions.last().map(|tx| &tx.payload),
            Some(TxPayload::Reward { .. })
        ));
    }
}
