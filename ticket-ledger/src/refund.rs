//! Refund policy
//!
//! A pure step function of whole days between now and the event date.
//! The band boundaries are exact policy cutoffs, not approximations.

use crate::types::{Event, Ticket};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Days-to-event threshold for a full refund
pub const FULL_REFUND_DAYS: i64 = 7;

/// Days-to-event threshold for a 75% refund
pub const THREE_QUARTER_REFUND_DAYS: i64 = 3;

/// Days-to-event threshold for a half refund
pub const HALF_REFUND_DAYS: i64 = 1;

/// Compute the refund owed for a ticket, or `None` if ineligible
///
/// Ineligible past the event's refund deadline and within one day of the
/// event. Otherwise, with `d` whole days to the event date:
/// `d >= 7` pays in full, `3 <= d < 7` pays 75%, `1 <= d < 3` pays 50%.
pub fn compute_refund(ticket: &Ticket, event: &Event, now: DateTime<Utc>) -> Option<Decimal> {
    if now > event.refundable_until {
        return None;
    }

    let days_until_event = (event.date - now).num_days();

    if days_until_event >= FULL_REFUND_DAYS {
        Some(ticket.price)
    } else if days_until_event >= THREE_QUARTER_REFUND_DAYS {
        Some(ticket.price * Decimal::new(75, 2))
    } else if days_until_event >= HALF_REFUND_DAYS {
        Some(ticket.price * Decimal::new(5, 1))
    } else {
        None
    }
}
