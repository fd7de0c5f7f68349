//! Integration test: invariants under random observation streams.
//!
//! Drives oracles with arbitrary non-decreasing timestamp streams, including
//! same-tick repeats and multi-day gaps, and checks after every write that:
//!
//! - the persisted state passes restore validation
//! - the cumulative sum never decreases once measuring has begun
//! - the recorded price stays within one cap step of the window baseline
//! - the average stays within the range of observed prices
//! - reads succeed only in the tick of the last write

use capwap_oracle::config::WINDOW;
use capwap_oracle::twap::TwapOracle;
use capwap_oracle::OracleError;
use proptest::prelude::*;

const START: u64 = 1_000;
const DELAY: u64 = 3 * WINDOW;

fn stream() -> impl Strategy<Value = Vec<(u64, u64)>> {
    let gap = prop_oneof![
        Just(0u64),
        1u64..WINDOW,
        WINDOW..10 * WINDOW,
        10 * WINDOW..3 * 24 * 60 * WINDOW,
    ];
    proptest::collection::vec((gap, 1u64..10_000_000), 1..40)
}

proptest! {
    #[test]
    fn invariants_hold_after_every_write(observations in stream(), cap_ppm in 1u32..100_000) {
        let mut oracle = TwapOracle::new(5_000_000, DELAY, cap_ppm).expect("valid config");
        oracle.set_start_time(START).expect("activate");
        let cap_step = oracle.config().cap_step();
        let threshold = START + DELAY;

        let mut t = START;
        let mut last_total = 0u128;
        for (gap, price) in observations {
            t += gap;
            let baseline = oracle.last_window_twap();
            let crossed = oracle.last_timestamp() < threshold && t >= threshold;
            let update = oracle.write_observation(t, price).expect("monotonic write");

            prop_assert!(TwapOracle::restore(oracle.snapshot()).is_ok());
            prop_assert_eq!(oracle.last_timestamp(), t);

            match update {
                None => prop_assert_eq!(gap, 0),
                Some(update) => {
                    if update.windows_closed == 0 {
                        prop_assert!(update.price.abs_diff(baseline) <= cap_step);
                    }
                    if t > threshold && !crossed {
                        prop_assert!(update.total_cumulative_price > last_total);
                    }
                    last_total = update.total_cumulative_price;
                }
            }

            if t > threshold {
                prop_assert!(oracle.get_twap(t).is_ok());
            } else {
                prop_assert_eq!(oracle.get_twap(t).unwrap_err(), OracleError::ZeroPeriod);
            }
            let stale = matches!(oracle.get_twap(t + 1), Err(OracleError::StaleTwap { .. }));
            prop_assert!(stale);
        }
    }

    #[test]
    fn twap_stays_within_recorded_range(observations in stream()) {
        let mut oracle = TwapOracle::new(5_000_000, 0, 1_000_000).expect("valid config");
        oracle.set_start_time(START).expect("activate");

        // Every recorded price lies between a baseline and an observed price,
        // and every baseline is an average of recorded prices.
        let mut lo = 5_000_000u64;
        let mut hi = 5_000_000u64;
        let mut t = START;
        for (gap, price) in observations {
            t += gap;
            oracle.write_observation(t, price).expect("write");
            lo = lo.min(price);
            hi = hi.max(price);
            if t > START {
                let twap = oracle.get_twap(t).expect("twap");
                prop_assert!(lo <= twap && twap <= hi, "twap {} outside [{}, {}]", twap, lo, hi);
            }
        }
    }
}

#[test]
fn regression_after_stream_is_rejected() {
    let mut oracle = TwapOracle::new(5_000_000, DELAY, 1_000).expect("valid config");
    oracle.set_start_time(START).expect("activate");
    oracle.write_observation(START + 10 * WINDOW, 5_000_000).expect("write");

    let before = oracle.snapshot();
    let err = oracle
        .write_observation(START + 10 * WINDOW - 1, 5_000_000)
        .unwrap_err();
    assert!(matches!(err, OracleError::TimestampRegression { .. }));
    assert_eq!(oracle.snapshot(), before);
}
