//! Abuse-rate heuristics
//!
//! Two independent sliding-window checks keyed by address:
//! - a purchase throttle, computed by scanning the buyer's owned-ticket
//!   issuance timestamps at mint time
//! - a transfer-suspicion tracker that remembers initiation timestamps per
//!   source address and rejects rapid-fire initiations
//!
//! Timestamps are recorded only for operations that pass every other check,
//! so failed attempts never consume quota.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::types::Address;

/// Purchase-throttle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Mints allowed per address inside the window
    pub max_mints_per_window: usize,

    /// Sliding window duration in hours
    pub window_hours: i64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_mints_per_window: 10,
            window_hours: 24,
        }
    }
}

/// Transfer-surveillance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveillanceConfig {
    /// Transfer initiations allowed per source address inside the window
    pub max_initiations_per_window: usize,

    /// Sliding window duration in hours
    pub window_hours: i64,
}

impl Default for SurveillanceConfig {
    fn default() -> Self {
        Self {
            max_initiations_per_window: 5,
            window_hours: 24,
        }
    }
}

/// Count how many of the given timestamps fall inside the trailing window
pub fn count_in_window<I>(timestamps: I, now: DateTime<Utc>, window_hours: i64) -> usize
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let window_start = now - Duration::hours(window_hours);
    timestamps
        .into_iter()
        .filter(|ts| *ts >= window_start && *ts <= now)
        .count()
}

/// Per-address transfer-initiation tracker
pub struct TransferSurveillance {
    config: SurveillanceConfig,
    // Map: source address -> initiation timestamps
    initiations: DashMap<Address, Vec<DateTime<Utc>>>,
}

impl std::fmt::Debug for TransferSurveillance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSurveillance")
            .field("config", &self.config)
            .field("tracked_addresses", &self.initiations.len())
            .finish()
    }
}

impl TransferSurveillance {
    /// Create a tracker with the given configuration
    pub fn new(config: SurveillanceConfig) -> Self {
        Self {
            config,
            initiations: DashMap::new(),
        }
    }

    /// Check whether a new initiation from `from` would exceed the limit
    ///
    /// Does not record anything; call [`TransferSurveillance::record`] once
    /// the initiation has passed every other check.
    pub fn check(&self, from: &Address, now: DateTime<Utc>) -> Result<()> {
        let window_start = now - Duration::hours(self.config.window_hours);

        if let Some(mut entry) = self.initiations.get_mut(from) {
            let timestamps = entry.value_mut();
            timestamps.retain(|ts| *ts >= window_start);

            if timestamps.len() >= self.config.max_initiations_per_window {
                return Err(Error::TransferThrottled {
                    count: timestamps.len(),
                    window_hours: self.config.window_hours,
                });
            }
        }

        Ok(())
    }

    /// Record a successful initiation
    pub fn record(&self, from: &Address, now: DateTime<Utc>) {
        self.initiations.entry(from.clone()).or_default().push(now);
    }

    /// Initiations currently remembered for an address inside the window
    pub fn recent_initiations(&self, from: &Address, now: DateTime<Utc>) -> usize {
        self.initiations
            .get(from)
            .map(|entry| count_in_window(entry.value().iter().copied(), now, self.config.window_hours))
            .unwrap_or(0)
    }

    /// Number of addresses with remembered initiations
    pub fn tracked_addresses(&self) -> usize {
        self.initiations.len()
    }
}
