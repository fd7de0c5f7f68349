//! Per-window price capping.
//!
//! The price recorded for a window may differ from the previous window's
//! average by at most one cap step. The step is an absolute amount, so a run of
//! capped windows toward a distant target forms an arithmetic ramp (see
//! [`accumulator`](crate::accumulator)).

use capwap_types::Price;

/// Move `target` to within `step` of `baseline`.
///
/// This is the only saturating operation in the oracle: a baseline near the
/// numeric edges clamps to `Price::MAX` or zero instead of failing.
///
/// # Examples
///
/// ```
/// use capwap_oracle::cap::cap;
///
/// assert_eq!(cap(10_000, 11_000, 10), 10_010);
/// assert_eq!(cap(10_000, 9_000, 10), 9_990);
/// assert_eq!(cap(10_000, 10_005, 10), 10_005);
/// ```
pub fn cap(baseline: Price, target: Price, step: Price) -> Price {
    if target > baseline {
        target.min(baseline.saturating_add(step))
    } else {
        target.max(baseline.saturating_sub(step))
    }
}
