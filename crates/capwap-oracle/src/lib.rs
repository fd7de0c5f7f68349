//! # capwap-oracle
//!
//! Crankless, window-capped TWAP price oracle.
//!
//! The oracle turns a stream of `(timestamp, price)` observations from a trading
//! venue into a time-weighted average price. Each [`WINDOW`](config::WINDOW) the
//! recorded price may move at most `cap_step` away from the previous window's
//! average, so a short burst of manipulated trades cannot drag the average far.
//! Idle periods of any length are folded in with a closed-form sum, so no keeper
//! has to poke the oracle to keep it fresh.
//!
//! ## Modules
//!
//! - [`cap`] — per-window price capping
//! - [`config`] — construction parameters and compile-time constants
//! - [`accumulator`] — intra-window and multi-window accumulation
//! - [`twap`] — the [`TwapOracle`](twap::TwapOracle) writer/reader
//!
//! ## Calling convention
//!
//! Reads are only valid in the same tick as a write:
//!
//! ```
//! use capwap_oracle::twap::TwapOracle;
//!
//! let mut oracle = TwapOracle::new(10_000, 60_000, 1_000).unwrap();
//! oracle.set_start_time(0).unwrap();
//! oracle.write_observation(180_000, 10_000).unwrap();
//! assert_eq!(oracle.get_twap(180_000).unwrap(), 10_000);
//! assert!(oracle.get_twap(180_001).is_err());
//! ```

pub mod accumulator;
pub mod cap;
pub mod config;
pub mod twap;

use capwap_types::Timestamp;

/// Error types for oracle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The initial price is zero.
    #[error("initial price must be non-zero")]
    ZeroInitialization,

    /// The cap ratio is zero, which would freeze the price.
    #[error("cap ratio must be non-zero")]
    ZeroStep,

    /// The cap ratio exceeds one million parts per million.
    #[error("invalid cap ratio: {cap_ppm} ppm")]
    InvalidCapPpm {
        /// The rejected ratio.
        cap_ppm: u32,
    },

    /// The start delay is a week or longer.
    #[error("start delay too long: {start_delay}ms >= {max}ms")]
    LongDelay {
        /// The rejected delay.
        start_delay: u64,
        /// Exclusive upper bound.
        max: u64,
    },

    /// The start delay is not a whole number of windows.
    #[error("start delay {start_delay}ms is not a multiple of the {window}ms window")]
    MisalignedDelay {
        /// The rejected delay.
        start_delay: u64,
        /// The window size.
        window: u64,
    },

    /// Deriving the cap step overflowed.
    #[error("cap step derivation overflowed")]
    StepOverflow,

    /// `set_start_time` was called twice.
    #[error("market already started at {start_time}")]
    AlreadyStarted {
        /// The start time set by the first call.
        start_time: Timestamp,
    },

    /// The oracle has not been activated.
    #[error("market not started")]
    MarketNotStarted,

    /// An observation is older than the last accepted one.
    #[error("timestamp regression: {timestamp} < {last}")]
    TimestampRegression {
        /// The rejected timestamp.
        timestamp: Timestamp,
        /// The last accepted timestamp.
        last: Timestamp,
    },

    /// A read was attempted without a write in the same tick.
    #[error("stale twap: read at {now}, last observation at {last}")]
    StaleTwap {
        /// The read timestamp.
        now: Timestamp,
        /// The last accepted timestamp.
        last: Timestamp,
    },

    /// A read was attempted on an oracle with a zero clock.
    #[error("no observations recorded")]
    NoObservations,

    /// The measurement period has not started or is empty.
    #[error("measurement period is empty")]
    ZeroPeriod,

    /// Accumulator arithmetic overflowed.
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// The accumulation stages did not land on the requested timestamp.
    #[error("accumulation ended at {actual}, expected {expected}")]
    TimestampMismatch {
        /// The requested end timestamp.
        expected: Timestamp,
        /// Where accumulation actually ended.
        actual: Timestamp,
    },

    /// A persisted snapshot violates the oracle invariants.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
