//! Window accumulation.
//!
//! The oracle integrates `capped_price * duration` into a cumulative sum. Time
//! is cut into fixed [`WINDOW`]s measured from `last_window_end`; when a window
//! completes, its average becomes the baseline the next window is capped
//! against.
//!
//! An elapsed interval is processed in up to three stages:
//!
//! ```text
//!  last_timestamp                                         timestamp
//!       |--stage 1--|------- stage 2: N windows -------|--stage 3--|
//!                   ^ window boundary                  ^ boundary
//! ```
//!
//! Stage 2 is a closed form, so an idle gap of any length costs O(1). With a
//! constant target `P` and baseline `B`, each whole window moves one `cap_step`
//! toward `P` until it gets there:
//!
//! ```text
//! p_i = B + sign(P - B) * min(i * cap_step, |P - B|)
//! ```
//!
//! so the per-window prices are an arithmetic ramp followed by a flat run, and
//! their sum has a closed form.

use capwap_types::{Cumulative, Price, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cap::cap;
use crate::config::WINDOW;
use crate::{OracleError, Result};

/// Mutable oracle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleState {
    /// Last recorded (capped) price.
    last_price: Price,
    /// Timestamp of the last accepted observation.
    last_timestamp: Timestamp,
    /// Sum of `capped_price * ms` since the measurement period began.
    total_cumulative_price: Cumulative,
    /// End of the most recently closed window.
    last_window_end: Timestamp,
    /// `total_cumulative_price` at `last_window_end`.
    last_window_end_cumulative_price: Cumulative,
    /// Average of the most recently closed window; the capping baseline.
    last_window_twap: Price,
    /// Set once on activation.
    market_start_time: Option<Timestamp>,
}

impl OracleState {
    /// Fresh state: both the last price and the baseline are `init_price`.
    pub fn new(init_price: Price) -> Self {
        Self {
            last_price: init_price,
            last_timestamp: 0,
            total_cumulative_price: 0,
            last_window_end: 0,
            last_window_end_cumulative_price: 0,
            last_window_twap: init_price,
            market_start_time: None,
        }
    }

    /// Last recorded (capped) price.
    pub fn last_price(&self) -> Price {
        self.last_price
    }

    /// Timestamp of the last accepted observation.
    pub fn last_timestamp(&self) -> Timestamp {
        self.last_timestamp
    }

    /// Sum of `capped_price * ms` since the measurement period began.
    pub fn total_cumulative_price(&self) -> Cumulative {
        self.total_cumulative_price
    }

    /// End of the most recently closed window.
    pub fn last_window_end(&self) -> Timestamp {
        self.last_window_end
    }

    /// Cumulative price when the last window closed.
    pub fn last_window_end_cumulative_price(&self) -> Cumulative {
        self.last_window_end_cumulative_price
    }

    /// Average of the last closed window; the capping baseline.
    pub fn last_window_twap(&self) -> Price {
        self.last_window_twap
    }

    /// Activation time, if activated.
    pub fn market_start_time(&self) -> Option<Timestamp> {
        self.market_start_time
    }

    /// Check the structural invariants, e.g. after loading from storage.
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        let Some(start) = self.market_start_time else {
            if self.last_timestamp != 0 || self.last_window_end != 0 || self.total_cumulative_price != 0 {
                return Err("clock advanced before activation".to_string());
            }
            return Ok(());
        };
        if self.last_window_end < start {
            return Err(format!(
                "window end {} precedes market start {start}",
                self.last_window_end
            ));
        }
        if (self.last_window_end - start) % WINDOW != 0 {
            return Err(format!(
                "window end {} is not aligned to market start {start}",
                self.last_window_end
            ));
        }
        if self.last_timestamp < self.last_window_end {
            return Err(format!(
                "last timestamp {} precedes window end {}",
                self.last_timestamp, self.last_window_end
            ));
        }
        if self.last_timestamp - self.last_window_end >= WINDOW {
            return Err(format!(
                "window ending at {} was never closed",
                self.last_window_end.saturating_add(WINDOW)
            ));
        }
        if self.last_window_end_cumulative_price > self.total_cumulative_price {
            return Err("window snapshot exceeds cumulative price".to_string());
        }
        Ok(())
    }

    /// Start the clock at `start_time`.
    pub(crate) fn activate(&mut self, start_time: Timestamp) {
        self.market_start_time = Some(start_time);
        self.last_window_end = start_time;
        self.last_timestamp = start_time;
    }

    /// Drop everything accumulated so far and begin measuring at `threshold`.
    ///
    /// The baseline and last price carry over; only the sums restart.
    pub(crate) fn reset_measurement(&mut self, threshold: Timestamp) {
        self.total_cumulative_price = 0;
        self.last_window_end_cumulative_price = 0;
        self.last_window_end = threshold;
    }

    /// Accumulate `price` over `[last_timestamp, timestamp]`.
    ///
    /// Returns the number of windows closed.
    ///
    /// # Errors
    ///
    /// - [`OracleError::TimestampRegression`] if `timestamp < last_timestamp`
    /// - [`OracleError::ArithmeticOverflow`] if an accumulator overflows
    /// - [`OracleError::TimestampMismatch`] if the window bookkeeping is inconsistent
    ///
    /// On error the state may be partially updated; callers work on a copy.
    pub(crate) fn accumulate(&mut self, timestamp: Timestamp, price: Price, cap_step: Price) -> Result<u64> {
        if timestamp < self.last_timestamp {
            return Err(OracleError::TimestampRegression {
                timestamp,
                last: self.last_timestamp,
            });
        }
        let into_window = self
            .last_timestamp
            .checked_sub(self.last_window_end)
            .ok_or(OracleError::TimestampMismatch {
                expected: self.last_window_end,
                actual: self.last_timestamp,
            })?;
        let to_boundary = WINDOW
            .checked_sub(into_window)
            .ok_or(OracleError::TimestampMismatch {
                expected: self.last_window_end.saturating_add(WINDOW),
                actual: self.last_timestamp,
            })?;

        let mut windows_closed = 0;

        // Stage 1: finish the current partial window.
        let stage1 = to_boundary.min(timestamp - self.last_timestamp);
        if stage1 > 0 && self.accumulate_partial_window(self.last_timestamp + stage1, price, cap_step)? {
            windows_closed += 1;
        }

        // Stage 2: whole windows in one step.
        let full_windows = (timestamp - self.last_timestamp) / WINDOW;
        if full_windows > 0 {
            self.accumulate_full_windows(full_windows, price, cap_step)?;
            windows_closed += full_windows;
        }

        // Stage 3: trailing partial window.
        if timestamp > self.last_timestamp {
            self.accumulate_partial_window(timestamp, price, cap_step)?;
        }

        if self.last_timestamp != timestamp {
            return Err(OracleError::TimestampMismatch {
                expected: timestamp,
                actual: self.last_timestamp,
            });
        }
        Ok(windows_closed)
    }

    /// Accumulate `price` from `last_timestamp` to `end_ts`, which must not lie
    /// past the end of the current window.
    ///
    /// Returns `true` if `end_ts` closes the window.
    pub(crate) fn accumulate_partial_window(
        &mut self,
        end_ts: Timestamp,
        price: Price,
        cap_step: Price,
    ) -> Result<bool> {
        let duration = end_ts
            .checked_sub(self.last_timestamp)
            .ok_or(OracleError::TimestampRegression {
                timestamp: end_ts,
                last: self.last_timestamp,
            })?;
        // `None` when the window would end past the last representable
        // timestamp; such a window never closes.
        let window_end = self.last_window_end.checked_add(WINDOW);
        if let Some(window_end) = window_end.filter(|window_end| end_ts > *window_end) {
            return Err(OracleError::TimestampMismatch {
                expected: window_end,
                actual: end_ts,
            });
        }

        let capped = cap(self.last_window_twap, price, cap_step);
        let weighted = Cumulative::from(capped)
            .checked_mul(Cumulative::from(duration))
            .ok_or(OracleError::ArithmeticOverflow("window price product"))?;
        self.total_cumulative_price = self
            .total_cumulative_price
            .checked_add(weighted)
            .ok_or(OracleError::ArithmeticOverflow("cumulative price"))?;
        self.last_timestamp = end_ts;
        self.last_price = capped;

        if window_end != Some(end_ts) {
            return Ok(false);
        }

        let window_sum = self
            .total_cumulative_price
            .checked_sub(self.last_window_end_cumulative_price)
            .ok_or(OracleError::ArithmeticOverflow("window sum"))?;
        self.last_window_twap = Price::try_from(window_sum / Cumulative::from(WINDOW))
            .map_err(|_| OracleError::ArithmeticOverflow("window twap"))?;
        self.last_window_end = end_ts;
        self.last_window_end_cumulative_price = self.total_cumulative_price;

        debug!(
            window_end = end_ts,
            window_twap = self.last_window_twap,
            "window closed"
        );
        Ok(true)
    }

    /// Accumulate `windows` whole windows of constant target `price`, starting
    /// on a window boundary.
    ///
    /// Produces the same state as `windows` sequential calls to
    /// [`accumulate_partial_window`](Self::accumulate_partial_window), each
    /// spanning one full window.
    pub(crate) fn accumulate_full_windows(&mut self, windows: u64, price: Price, cap_step: Price) -> Result<()> {
        if windows == 0 {
            return Ok(());
        }
        if cap_step == 0 {
            return Err(OracleError::ZeroStep);
        }
        if self.last_timestamp != self.last_window_end {
            return Err(OracleError::TimestampMismatch {
                expected: self.last_window_end,
                actual: self.last_timestamp,
            });
        }

        let baseline = self.last_window_twap;
        let rising = price >= baseline;
        let gap = price.abs_diff(baseline);

        // Windows strictly before the one that reaches the target move a full step.
        let steps_to_target = gap.div_ceil(cap_step);
        let ramp_windows = windows.min(steps_to_target.saturating_sub(1));
        let flat_windows = windows - ramp_windows;

        let ramp_sum = triangular(ramp_windows)
            .checked_mul(Cumulative::from(cap_step))
            .ok_or(OracleError::ArithmeticOverflow("ramp sum"))?;
        let flat_sum = Cumulative::from(gap)
            .checked_mul(Cumulative::from(flat_windows))
            .ok_or(OracleError::ArithmeticOverflow("flat sum"))?;
        let deviation = ramp_sum
            .checked_add(flat_sum)
            .ok_or(OracleError::ArithmeticOverflow("deviation sum"))?;
        let base_sum = Cumulative::from(windows)
            .checked_mul(Cumulative::from(baseline))
            .ok_or(OracleError::ArithmeticOverflow("base sum"))?;
        let price_sum = if rising {
            base_sum.checked_add(deviation)
        } else {
            base_sum.checked_sub(deviation)
        }
        .ok_or(OracleError::ArithmeticOverflow("window price sum"))?;

        let max_move = Cumulative::from(windows)
            .checked_mul(Cumulative::from(cap_step))
            .ok_or(OracleError::ArithmeticOverflow("ramp bound"))?;
        // Bounded by `gap`, so it fits a `Price`.
        let movement = max_move.min(Cumulative::from(gap)) as Price;
        let final_price = if rising {
            baseline.checked_add(movement)
        } else {
            baseline.checked_sub(movement)
        }
        .ok_or(OracleError::ArithmeticOverflow("final price"))?;

        let span = windows
            .checked_mul(WINDOW)
            .ok_or(OracleError::ArithmeticOverflow("window span"))?;
        let end_ts = self
            .last_timestamp
            .checked_add(span)
            .ok_or(OracleError::ArithmeticOverflow("window end"))?;
        let weighted = price_sum
            .checked_mul(Cumulative::from(WINDOW))
            .ok_or(OracleError::ArithmeticOverflow("window price product"))?;
        self.total_cumulative_price = self
            .total_cumulative_price
            .checked_add(weighted)
            .ok_or(OracleError::ArithmeticOverflow("cumulative price"))?;

        self.last_window_end_cumulative_price = self.total_cumulative_price;
        self.last_window_twap = final_price;
        self.last_price = final_price;
        self.last_timestamp = end_ts;
        self.last_window_end = end_ts;

        debug!(
            windows,
            window_end = end_ts,
            window_twap = final_price,
            "full windows closed"
        );
        Ok(())
    }
}

/// `n * (n + 1) / 2`
fn triangular(n: u64) -> Cumulative {
    let n = Cumulative::from(n);
    // n <= u64::MAX, so the product stays below u128::MAX.
    n * (n + 1) / 2
}
