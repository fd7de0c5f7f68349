//! The TWAP oracle: observation writer and reader.
//!
//! ```text
//! TWAP = total_cumulative_price / ((now - market_start_time) - start_delay)
//! ```
//!
//! Observations during the warm-up (`start_delay` after activation) move the
//! capping baseline but are dropped from the sum when the delay threshold is
//! crossed, so the divisor and the sum always cover the same period.
//!
//! A read is only valid at the timestamp of the last write. Callers record an
//! observation at `now` and read in the same step; a read at any other time
//! fails with [`OracleError::StaleTwap`].
//!
//! Each instance needs a single writer. The oracle itself does no locking.

use capwap_types::events::PriceUpdated;
use capwap_types::{Price, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::accumulator::OracleState;
use crate::config::OracleConfig;
use crate::{OracleError, Result};

/// Persisted form of an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSnapshot {
    pub config: OracleConfig,
    pub state: OracleState,
}

/// A crankless, window-capped TWAP oracle for one venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwapOracle {
    config: OracleConfig,
    state: OracleState,
}

impl TwapOracle {
    /// Create an oracle; see [`OracleConfig::new`] for the parameters and errors.
    pub fn new(init_price: Price, start_delay: u64, cap_ppm: u32) -> Result<Self> {
        Ok(Self::with_config(OracleConfig::new(init_price, start_delay, cap_ppm)?))
    }

    /// Create an oracle from a validated config.
    pub fn with_config(config: OracleConfig) -> Self {
        Self {
            state: OracleState::new(config.init_price()),
            config,
        }
    }

    /// Rebuild an oracle from a persisted snapshot.
    ///
    /// # Errors
    ///
    /// - any [`OracleConfig::validate`] error for the stored config
    /// - [`OracleError::InvalidSnapshot`] if the stored state is inconsistent
    pub fn restore(snapshot: OracleSnapshot) -> Result<Self> {
        snapshot.config.validate()?;
        snapshot
            .state
            .check_invariants()
            .map_err(OracleError::InvalidSnapshot)?;
        Ok(Self {
            config: snapshot.config,
            state: snapshot.state,
        })
    }

    /// Capture the config and state for persistence.
    pub fn snapshot(&self) -> OracleSnapshot {
        OracleSnapshot {
            config: self.config,
            state: self.state,
        }
    }

    /// Activate the oracle at `start_time`.
    ///
    /// # Errors
    ///
    /// - [`OracleError::AlreadyStarted`] if the oracle was already activated
    pub fn set_start_time(&mut self, start_time: Timestamp) -> Result<()> {
        if let Some(existing) = self.state.market_start_time() {
            return Err(OracleError::AlreadyStarted {
                start_time: existing,
            });
        }
        self.state.activate(start_time);
        info!(
            start_time,
            threshold = start_time.saturating_add(self.config.start_delay()),
            "oracle activated"
        );
        Ok(())
    }

    /// Record that the venue traded at `price` as of `timestamp`.
    ///
    /// Returns the resulting notification, or `None` if `timestamp` equals the
    /// last accepted timestamp (a same-tick write changes nothing).
    ///
    /// # Errors
    ///
    /// - [`OracleError::MarketNotStarted`] before [`set_start_time`](Self::set_start_time)
    /// - [`OracleError::TimestampRegression`] if `timestamp` is older than the last write
    /// - [`OracleError::ArithmeticOverflow`] / [`OracleError::TimestampMismatch`] on
    ///   internal failures
    ///
    /// On error the oracle is left unchanged.
    pub fn write_observation(
        &mut self,
        timestamp: Timestamp,
        price: Price,
    ) -> Result<Option<PriceUpdated>> {
        let start = self
            .state
            .market_start_time()
            .ok_or(OracleError::MarketNotStarted)?;
        let last = self.state.last_timestamp();
        if timestamp < last {
            warn!(timestamp, last, "rejected observation: timestamp regression");
            return Err(OracleError::TimestampRegression { timestamp, last });
        }
        if timestamp == last {
            return Ok(None);
        }

        // A threshold past the last representable timestamp is never reached.
        let crossed = start
            .checked_add(self.config.start_delay())
            .filter(|threshold| last < *threshold && timestamp >= *threshold);
        let cap_step = self.config.cap_step();

        let mut next = self.state;
        let windows_closed = if let Some(threshold) = crossed {
            let warm_up = next.accumulate(threshold, price, cap_step)?;
            next.reset_measurement(threshold);
            info!(threshold, "warm-up complete, measurement period started");
            warm_up + next.accumulate(timestamp, price, cap_step)?
        } else {
            next.accumulate(timestamp, price, cap_step)?
        };
        self.state = next;

        let update = PriceUpdated {
            timestamp,
            price: self.state.last_price(),
            last_window_twap: self.state.last_window_twap(),
            total_cumulative_price: self.state.total_cumulative_price(),
            windows_closed,
        };
        debug!(
            timestamp,
            observed = price,
            recorded = update.price,
            windows_closed,
            "price updated"
        );
        Ok(Some(update))
    }

    /// Time-weighted average price over the measurement period ending at `now`.
    ///
    /// `now` must equal the timestamp of the last write.
    ///
    /// # Errors
    ///
    /// - [`OracleError::MarketNotStarted`] before activation
    /// - [`OracleError::StaleTwap`] if `now` is not the last written timestamp
    /// - [`OracleError::NoObservations`] if the oracle clock is still zero
    /// - [`OracleError::ZeroPeriod`] if the warm-up has not fully elapsed
    pub fn get_twap(&self, now: Timestamp) -> Result<Price> {
        let start = self
            .state
            .market_start_time()
            .ok_or(OracleError::MarketNotStarted)?;
        let last = self.state.last_timestamp();
        if now != last {
            warn!(now, last, "rejected read: no observation at read time");
            return Err(OracleError::StaleTwap { now, last });
        }
        if last == 0 {
            return Err(OracleError::NoObservations);
        }

        let period = now
            .checked_sub(start)
            .and_then(|elapsed| elapsed.checked_sub(self.config.start_delay()))
            .filter(|period| *period > 0)
            .ok_or(OracleError::ZeroPeriod)?;

        // The sum only covers [threshold, now] and every recorded price is a
        // `Price`, so the average fits; the conversion is still checked.
        let twap = self.state.total_cumulative_price() / u128::from(period);
        Price::try_from(twap).map_err(|_| OracleError::ArithmeticOverflow("twap"))
    }

    /// Construction parameters.
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Current accumulator state.
    pub fn state(&self) -> &OracleState {
        &self.state
    }

    /// Last recorded (capped) price.
    pub fn last_price(&self) -> Price {
        self.state.last_price()
    }

    /// Timestamp of the last accepted observation.
    pub fn last_timestamp(&self) -> Timestamp {
        self.state.last_timestamp()
    }

    /// Baseline the current window is capped against.
    pub fn last_window_twap(&self) -> Price {
        self.state.last_window_twap()
    }

    /// Activation time, if activated.
    pub fn market_start_time(&self) -> Option<Timestamp> {
        self.state.market_start_time()
    }

    /// Whether [`set_start_time`](Self::set_start_time) has been called.
    pub fn is_started(&self) -> bool {
        self.state.market_start_time().is_some()
    }

    /// `market_start_time + start_delay`, once activated.
    pub fn delay_threshold(&self) -> Option<Timestamp> {
        self.state
            .market_start_time()
            .and_then(|start| start.checked_add(self.config.start_delay()))
    }
}
