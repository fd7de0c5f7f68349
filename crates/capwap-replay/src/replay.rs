//! Feed a recorded observation log through an oracle.

use capwap_oracle::twap::TwapOracle;
use capwap_types::events::PriceUpdated;
use capwap_types::{Price, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One entry of the observation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: Timestamp,
    pub price: Price,
    /// Read the TWAP right after writing this observation.
    #[serde(default)]
    pub read: bool,
}

/// Outcome of replaying one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub timestamp: Timestamp,
    pub observed: Price,
    /// Notification for the write; `None` if it was a same-tick no-op or failed.
    pub update: Option<PriceUpdated>,
    pub twap: Option<Price>,
    pub error: Option<String>,
}

/// Parse a JSON array of observations.
pub fn parse_observations(json: &str) -> serde_json::Result<Vec<Observation>> {
    serde_json::from_str(json)
}

/// Write every observation in order, reading in the same tick when requested.
///
/// Rejected writes and reads are reported in the record and do not stop the
/// replay.
pub fn replay(oracle: &mut TwapOracle, observations: &[Observation]) -> Vec<ReplayRecord> {
    observations
        .iter()
        .map(|obs| {
            let mut record = ReplayRecord {
                timestamp: obs.timestamp,
                observed: obs.price,
                update: None,
                twap: None,
                error: None,
            };

            match oracle.write_observation(obs.timestamp, obs.price) {
                Ok(update) => record.update = update,
                Err(e) => {
                    warn!(timestamp = obs.timestamp, error = %e, "observation rejected");
                    record.error = Some(e.to_string());
                    return record;
                }
            }

            if obs.read {
                match oracle.get_twap(obs.timestamp) {
                    Ok(twap) => record.twap = Some(twap),
                    Err(e) => record.error = Some(e.to_string()),
                }
            }
            record
        })
        .collect()
}
