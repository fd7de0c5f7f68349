//! Integration test crate for the capwap oracle.
//!
//! This crate has no library code — it only contains integration tests
//! that drive the oracle through complete venue lifecycles.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p capwap-integration-tests
//! ```
