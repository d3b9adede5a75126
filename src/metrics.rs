//! Metric helpers for `pdu_stream`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers do nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::stream::Direction;

/// Name of the counter tracking recorded fragments.
pub const FRAGMENTS_RECORDED: &str = "pdu_stream_fragments_total";
/// Name of the counter tracking completed PDUs.
pub const PDUS_COMPLETED: &str = "pdu_stream_pdus_completed_total";
/// Name of the counter tracking PDUs dropped after a reassembly failure.
pub const PDUS_ABANDONED: &str = "pdu_stream_pdus_abandoned_total";
/// Name of the counter tracking rejected forward-pass submissions.
pub const CONTRACT_VIOLATIONS: &str = "pdu_stream_contract_violations_total";
/// Name of the gauge tracking registered streams.
pub const STREAMS_ACTIVE: &str = "pdu_stream_streams_active";

/// Record a fragment accepted on a stream of the given direction.
pub fn inc_fragments(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_RECORDED, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a completed PDU.
pub fn inc_pdus_completed() {
    #[cfg(feature = "metrics")]
    counter!(PDUS_COMPLETED).increment(1);
}

/// Record an abandoned PDU.
pub fn inc_pdus_abandoned() {
    #[cfg(feature = "metrics")]
    counter!(PDUS_ABANDONED).increment(1);
}

/// Record a contract violation.
pub fn inc_contract_violations() {
    #[cfg(feature = "metrics")]
    counter!(CONTRACT_VIOLATIONS).increment(1);
}

/// Increment the registered streams gauge.
pub fn inc_streams() {
    #[cfg(feature = "metrics")]
    gauge!(STREAMS_ACTIVE).increment(1.0);
}

/// Lower the registered streams gauge after a bulk teardown.
#[cfg_attr(
    feature = "metrics",
    expect(
        clippy::cast_precision_loss,
        reason = "stream counts stay far below f64 precision limits"
    )
)]
pub fn sub_streams(count: usize) {
    #[cfg(feature = "metrics")]
    gauge!(STREAMS_ACTIVE).decrement(count as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}
