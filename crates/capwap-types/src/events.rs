//! Oracle notification types.
//!
//! Every accepted observation that advances the oracle clock produces a
//! [`PriceUpdated`] record. Consumers that forward notifications elsewhere wrap
//! it in an [`Event`] envelope.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{Cumulative, Price, Timestamp};

/// Envelope for oracle notifications.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: Timestamp,
    pub payload: serde_json::Value,
}

/// All event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// The oracle recorded a new (capped) price.
    PriceUpdated,
}

/// Emitted by the oracle for each accepted observation.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdated {
    /// Timestamp of the observation.
    pub timestamp: Timestamp,
    /// The price actually recorded, after capping.
    pub price: Price,
    /// Baseline the next window is capped against.
    pub last_window_twap: Price,
    /// Cumulative `price * ms` since the measurement period began.
    ///
    /// Encoded as a decimal string; JSON numbers stop at `u64::MAX`.
    #[serde_as(as = "DisplayFromStr")]
    pub total_cumulative_price: Cumulative,
    /// Number of windows closed by this observation.
    pub windows_closed: u64,
}

impl Event {
    /// Wrap a [`PriceUpdated`] notification in an event envelope.
    pub fn price_updated(update: &PriceUpdated) -> serde_json::Result<Self> {
        Ok(Self {
            event_type: EventType::PriceUpdated,
            timestamp: update.timestamp,
            payload: serde_json::to_value(update)?,
        })
    }
}
