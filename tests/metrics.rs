#![cfg(feature = "metrics")]
//! Tests for `pdu_stream` metrics helpers.
//!
//! These tests verify that counters and gauges update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.
use std::num::NonZeroUsize;

use metrics::{SharedString, Unit};
use metrics_util::{
    CompositeKey,
    debugging::{DebugValue, DebuggingRecorder, Snapshotter},
};
use pdu_stream::{
    config::SessionConfig,
    metrics as stream_metrics,
    stream::{ConversationId, Direction, StreamSession},
};
use rstest::rstest;

type SnapshotEntry = (CompositeKey, Option<Unit>, Option<SharedString>, DebugValue);

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

#[rstest]
#[case(Direction::Inbound, "inbound")]
#[case(Direction::Outbound, "outbound")]
fn fragment_metric_is_labelled_by_direction(#[case] direction: Direction, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        stream_metrics::inc_fragments(direction);
    });

    let metrics = snapshotter.snapshot().into_vec();
    let found = metrics.iter().any(|(k, _, _, v)| {
        k.key().name() == stream_metrics::FRAGMENTS_RECORDED
            && k.key()
                .labels()
                .any(|l| l.key() == "direction" && l.value() == label)
            && matches!(v, DebugValue::Counter(c) if *c > 0)
    });
    assert!(found, "{label} fragment metric not recorded");
}

#[test]
fn session_activity_updates_counters() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let config =
            SessionConfig::default().with_max_pdu_size(NonZeroUsize::new(4).expect("non-zero"));
        let mut session = StreamSession::new(config);
        let stream = session.stream_for_conversation(ConversationId::new(1), Direction::Inbound);

        session
            .add_fragment(stream, 1, 0, b"AB", false)
            .expect("accepted");
        session
            .add_fragment(stream, 1, 0, b"AB", false)
            .expect_err("duplicate");
        session
            .add_fragment(stream, 2, 0, b"ABC", true)
            .expect("accepted");
        session
            .add_fragment(stream, 3, 0, b"DE", false)
            .expect_err("too large");
    });

    // Snapshots drain counters, so every check reads the same one.
    let metrics = snapshotter.snapshot().into_vec();
    assert_counter_eq(&metrics, stream_metrics::PDUS_COMPLETED, 1);
    assert_counter_eq(&metrics, stream_metrics::CONTRACT_VIOLATIONS, 1);
    assert_counter_eq(&metrics, stream_metrics::PDUS_ABANDONED, 1);
    assert_counter_eq(&metrics, stream_metrics::FRAGMENTS_RECORDED, 2);
}

#[test]
fn reset_lowers_stream_gauge() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let mut session = StreamSession::default();
        session.stream_for_conversation(ConversationId::new(1), Direction::Inbound);
        session.stream_for_conversation(ConversationId::new(1), Direction::Outbound);
        session.stream_for_conversation(ConversationId::new(1), Direction::Outbound);
        session.reset();
    });

    let metrics = snapshotter.snapshot().into_vec();
    assert!(
        metrics.iter().any(|(key, _, _, value)| {
            key.key().name() == stream_metrics::STREAMS_ACTIVE
                && matches!(value, DebugValue::Gauge(g) if g.into_inner().abs() < f64::EPSILON)
        }),
        "expected {} == 0, got {metrics:#?}",
        stream_metrics::STREAMS_ACTIVE
    );
}

#[test]
fn stale_handle_recreation_counts_stream() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let mut session = StreamSession::default();
        let stream = session.stream_for_conversation(ConversationId::new(1), Direction::Inbound);
        session.reset();
        session
            .add_fragment(stream, 1, 0, b"A", false)
            .expect("stale handle recreates its stream");
    });

    let metrics = snapshotter.snapshot().into_vec();
    assert!(
        metrics.iter().any(|(key, _, _, value)| {
            key.key().name() == stream_metrics::STREAMS_ACTIVE
                && matches!(value, DebugValue::Gauge(g) if (g.into_inner() - 1.0).abs() < f64::EPSILON)
        }),
        "expected {} == 1, got {metrics:#?}",
        stream_metrics::STREAMS_ACTIVE
    );
}

fn assert_counter_eq(metrics: &[SnapshotEntry], name: &str, expected: u64) {
    assert!(
        metrics.iter().any(|(key, _, _, value)| {
            key.key().name() == name && matches!(value, DebugValue::Counter(c) if *c == expected)
        }),
        "expected {name} == {expected}, got {metrics:#?}"
    );
}
