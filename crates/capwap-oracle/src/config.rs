//! Construction parameters and compile-time constants.

use capwap_types::{Price, MILLIS_PER_MINUTE, MILLIS_PER_WEEK};
use serde::{Deserialize, Serialize};

use crate::{OracleError, Result};

/// Capping and window-close granularity (one minute).
pub const WINDOW: u64 = MILLIS_PER_MINUTE;

/// Parts-per-million denominator for the cap ratio.
pub const PPM_DENOMINATOR: u32 = 1_000_000;

/// Exclusive upper bound on the start delay (one week).
pub const MAX_START_DELAY: u64 = MILLIS_PER_WEEK;

/// Immutable oracle parameters, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    init_price: Price,
    start_delay: u64,
    cap_step: Price,
}

impl OracleConfig {
    /// Validate the parameters and derive the cap step.
    ///
    /// `cap_step = max(1, init_price * cap_ppm / 1_000_000)`.
    ///
    /// # Errors
    ///
    /// - [`OracleError::ZeroInitialization`] if `init_price` is zero
    /// - [`OracleError::ZeroStep`] if `cap_ppm` is zero
    /// - [`OracleError::InvalidCapPpm`] if `cap_ppm` exceeds [`PPM_DENOMINATOR`]
    /// - [`OracleError::LongDelay`] if `start_delay >= MAX_START_DELAY`
    /// - [`OracleError::MisalignedDelay`] if `start_delay` is not a multiple of [`WINDOW`]
    /// - [`OracleError::StepOverflow`] if `init_price * cap_ppm` overflows
    pub fn new(init_price: Price, start_delay: u64, cap_ppm: u32) -> Result<Self> {
        if init_price == 0 {
            return Err(OracleError::ZeroInitialization);
        }
        if cap_ppm == 0 {
            return Err(OracleError::ZeroStep);
        }
        if cap_ppm > PPM_DENOMINATOR {
            return Err(OracleError::InvalidCapPpm { cap_ppm });
        }
        let config = Self {
            init_price,
            start_delay,
            cap_step: derive_cap_step(init_price, cap_ppm)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants of an already-built config, e.g. one loaded from
    /// storage.
    pub fn validate(&self) -> Result<()> {
        if self.init_price == 0 {
            return Err(OracleError::ZeroInitialization);
        }
        if self.cap_step == 0 {
            return Err(OracleError::ZeroStep);
        }
        if self.start_delay >= MAX_START_DELAY {
            return Err(OracleError::LongDelay {
                start_delay: self.start_delay,
                max: MAX_START_DELAY,
            });
        }
        if self.start_delay % WINDOW != 0 {
            return Err(OracleError::MisalignedDelay {
                start_delay: self.start_delay,
                window: WINDOW,
            });
        }
        Ok(())
    }

    /// Initial price, used as the first window baseline.
    pub fn init_price(&self) -> Price {
        self.init_price
    }

    /// Warm-up duration in milliseconds.
    pub fn start_delay(&self) -> u64 {
        self.start_delay
    }

    /// Maximum absolute price movement per window.
    pub fn cap_step(&self) -> Price {
        self.cap_step
    }
}

fn derive_cap_step(init_price: Price, cap_ppm: u32) -> Result<Price> {
    let scaled = u128::from(init_price)
        .checked_mul(u128::from(cap_ppm))
        .ok_or(OracleError::StepOverflow)?
        / u128::from(PPM_DENOMINATOR);
    let step = Price::try_from(scaled).unwrap_or(Price::MAX);
    Ok(step.max(1))
}
