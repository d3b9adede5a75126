//! Unit tests for `StreamSession`.

use std::num::NonZeroUsize;

use rstest::{fixture, rstest};
use tracing_test::traced_test;

use super::{
    Annotation,
    CircuitId,
    ContractViolation,
    ConversationId,
    Direction,
    LookupError,
    NoopSink,
    ProcessOutcome,
    ReassemblyContext,
    SessionStats,
    StreamError,
    StreamHandle,
    StreamSession,
    StreamState,
};
use crate::{
    config::SessionConfig,
    test_helpers::{RecordingTable, TerminatorTable},
};

#[fixture]
fn session() -> StreamSession { StreamSession::default() }

fn inbound(session: &mut StreamSession) -> StreamHandle {
    session.stream_for_conversation(ConversationId::new(1), Direction::Inbound)
}

fn reassemble(
    session: &StreamSession,
    frame: u32,
    handle: StreamHandle,
    offset: u32,
) -> ProcessOutcome {
    let record = session
        .find_fragment(handle, frame, offset)
        .expect("fragment recorded");
    session
        .process_reassembled(ReassemblyContext::new(frame, "test"), &record, &mut NoopSink)
        .expect("pdu known")
}

#[rstest]
fn single_fragment_pdu(mut session: StreamSession) {
    let stream = inbound(&mut session);
    let record = session
        .add_fragment(stream, 1, 0, b"ABC", false)
        .expect("accepted");
    assert!(record.is_final());

    let pdu = reassemble(&session, 1, stream, 0)
        .into_reassembled()
        .expect("complete");
    assert_eq!(&pdu.data()[..], b"ABC");
    assert_eq!(pdu.sequence_number(), 0);
    assert_eq!(session.pdu_data(&record).as_deref(), Some(&b"ABC"[..]));
}

#[rstest]
fn two_fragment_pdu(mut session: StreamSession) {
    let stream = inbound(&mut session);
    let first = session
        .add_fragment(stream, 1, 0, b"AB", true)
        .expect("accepted");
    assert!(!first.is_final());
    assert_eq!(reassemble(&session, 1, stream, 0), ProcessOutcome::NotYetComplete);
    assert_eq!(session.pdu_data(&first), None);

    let last = session
        .add_fragment(stream, 2, 0, b"CD", false)
        .expect("accepted");
    assert!(last.is_final());
    let pdu = reassemble(&session, 2, stream, 0)
        .into_reassembled()
        .expect("complete");
    assert_eq!(&pdu.data()[..], b"ABCD");
    assert_eq!(pdu.fragments().len(), 2);
}

#[rstest]
fn out_of_order_submission_is_rejected(mut session: StreamSession) {
    let stream = inbound(&mut session);
    session
        .add_fragment(stream, 5, 0, b"X", true)
        .expect("accepted");
    let err = session
        .add_fragment(stream, 3, 0, b"Y", false)
        .expect_err("out of order");
    assert!(err.is_contract_violation());
    assert!(matches!(
        err,
        StreamError::Contract(ContractViolation::OutOfOrder { .. })
    ));
    assert_eq!(session.stats().fragments, 1);
    assert!(session.find_fragment(stream, 3, 0).is_none());
}

#[rstest]
fn opposite_directions_are_independent(mut session: StreamSession) {
    let inbound = inbound(&mut session);
    let outbound = session.stream_for_conversation(ConversationId::new(1), Direction::Outbound);
    assert_ne!(inbound, outbound);

    session
        .add_fragment(inbound, 1, 0, b"IN", true)
        .expect("accepted");
    let out = session
        .add_fragment(outbound, 1, 0, b"OUT", false)
        .expect("same position on the other direction");

    let inbound_state = session.stream_state(inbound).expect("registered");
    let outbound_state = session.stream_state(outbound).expect("registered");
    assert_eq!(inbound_state.state(), StreamState::AccumulatingPdu);
    assert_eq!(outbound_state.state(), StreamState::NoActivePdu);
    assert_eq!(inbound_state.pdu_counter(), 1);
    assert_eq!(outbound_state.pdu_counter(), 1);
    assert_eq!(out.pdu_sequence_number(), 0);
}

#[rstest]
fn conversations_and_circuits_do_not_collide(mut session: StreamSession) {
    let conversation = inbound(&mut session);
    let circuit = session.stream_for_circuit(CircuitId::new(1), Direction::Inbound);
    assert_ne!(conversation, circuit);
    assert_eq!(session.stats().streams, 2);
}

#[rstest]
fn completed_pdu_rolls_over_to_next_sequence(mut session: StreamSession) {
    let stream = inbound(&mut session);
    let first = session
        .add_fragment(stream, 1, 0, b"AB", true)
        .expect("accepted");
    session
        .add_fragment(stream, 2, 0, b"CD", false)
        .expect("accepted");
    let next = session
        .add_fragment(stream, 3, 0, b"EF", true)
        .expect("accepted");

    assert_ne!(next.pdu(), first.pdu());
    assert_eq!(next.pdu_sequence_number(), 1);
    assert_eq!(session.pdu_sequence_number(&next), 1);
}

#[rstest]
fn resubmitting_recorded_position_is_rejected(mut session: StreamSession) {
    let stream = inbound(&mut session);
    session
        .add_fragment(stream, 1, 0, b"AB", false)
        .expect("accepted");
    let err = session
        .add_fragment(stream, 1, 0, b"AB", false)
        .expect_err("duplicate");
    assert!(matches!(
        err,
        StreamError::Contract(ContractViolation::AlreadyRecorded { .. })
    ));
    assert_eq!(session.stats().pdus, 1);
}

#[rstest]
fn stream_lookup_is_idempotent(mut session: StreamSession) {
    let key = inbound(&mut session).key();
    assert_eq!(session.find_stream(key), Some(session.stream(key)));
    assert_eq!(session.stats().streams, 1);
    assert_eq!(session.find_stream(key.reversed()), None);
}

#[rstest]
fn find_fragment_is_idempotent(mut session: StreamSession) {
    let stream = inbound(&mut session);
    let record = session
        .add_fragment(stream, 7, 3, b"xyz", false)
        .expect("accepted");

    for _ in 0..3 {
        assert_eq!(session.find_fragment(stream, 7, 3), Some(record));
    }
    assert_eq!(session.fragment_length(&record), 3);
    assert!(session.find_fragment(stream, 7, 4).is_none());
}

#[rstest]
fn earlier_fragments_reference_completing_frame(mut session: StreamSession) {
    let stream = inbound(&mut session);
    let first = session
        .add_fragment(stream, 1, 0, b"AB", true)
        .expect("accepted");
    session
        .add_fragment(stream, 4, 0, b"CD", false)
        .expect("accepted");

    let mut annotations: Vec<Annotation> = Vec::new();
    let outcome = session
        .process_reassembled(ReassemblyContext::new(1, "test"), &first, &mut annotations)
        .expect("pdu known");
    assert_eq!(outcome, ProcessOutcome::NotYetComplete);
    assert_eq!(
        annotations,
        vec![Annotation::ReassembledIn {
            frame: 1,
            pdu: first.pdu(),
            reassembled_in: 4,
        }]
    );
    assert_eq!(annotations[0].to_string(), "[Reassembled in #4]");
}

#[rstest]
fn final_fragment_emits_summary_annotation(mut session: StreamSession) {
    let stream = inbound(&mut session);
    session
        .add_fragment(stream, 1, 0, b"AB", true)
        .expect("accepted");
    let last = session
        .add_fragment(stream, 2, 0, b"CD", false)
        .expect("accepted");

    let mut annotations: Vec<Annotation> = Vec::new();
    session
        .process_reassembled(ReassemblyContext::new(2, "Demo"), &last, &mut annotations)
        .expect("pdu known");
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].frame(), 2);
    assert_eq!(annotations[0].to_string(), "[2-fragment PDU (4 bytes): Demo]");
}

#[rstest]
fn fragments_in_frame_spans_streams(mut session: StreamSession) {
    let inbound = inbound(&mut session);
    let outbound = session.stream_for_conversation(ConversationId::new(1), Direction::Outbound);
    session
        .add_fragment(inbound, 9, 0, b"A", false)
        .expect("accepted");
    session
        .add_fragment(inbound, 9, 1, b"B", false)
        .expect("accepted");
    session
        .add_fragment(outbound, 9, 0, b"C", false)
        .expect("accepted");

    let found = session.fragments_in_frame(9);
    assert_eq!(found.len(), 3);
    assert_eq!(found[0].stream(), inbound.key());
    assert_eq!(found[0].offset(), 0);
    assert_eq!(found[1].offset(), 1);
    assert_eq!(found[2].stream(), outbound.key());
    assert!(session.fragments_in_frame(10).is_empty());
}

#[rstest]
fn oversized_pdu_is_abandoned() {
    let config =
        SessionConfig::default().with_max_pdu_size(NonZeroUsize::new(4).expect("non-zero"));
    let mut session = StreamSession::new(config);
    let stream = inbound(&mut session);

    let first = session
        .add_fragment(stream, 1, 0, b"ABC", true)
        .expect("accepted");
    let err = session
        .add_fragment(stream, 2, 0, b"DE", false)
        .expect_err("exceeds cap");
    assert!(!err.is_contract_violation());
    assert!(session.find_fragment(stream, 2, 0).is_none());
    assert_eq!(session.stats().buffered_bytes, 0);
    assert!(!session.pdu(first.pdu()).expect("pdu kept").is_complete());

    let err = session
        .add_fragment(stream, 2, 0, b"Z", false)
        .expect_err("watermark moved past refused fragment");
    assert!(err.is_contract_violation());

    let next = session
        .add_fragment(stream, 3, 0, b"Z", false)
        .expect("fresh pdu");
    assert_eq!(next.pdu_sequence_number(), 1);
}

#[rstest]
fn incomplete_trailing_pdu_is_never_delivered(mut session: StreamSession) {
    let stream = inbound(&mut session);
    let record = session
        .add_fragment(stream, 1, 0, b"partial", true)
        .expect("accepted");

    assert_eq!(reassemble(&session, 1, stream, 0), ProcessOutcome::NotYetComplete);
    assert_eq!(session.pdu_data(&record), None);
    let stats = session.stats();
    assert_eq!(stats.completed_pdus, 0);
    assert_eq!(stats.buffered_bytes, 7);
}

#[rstest]
fn reset_drops_everything(mut session: StreamSession) {
    let stream = inbound(&mut session);
    let stale = session
        .add_fragment(stream, 1, 0, b"AB", true)
        .expect("accepted");
    session.reset();

    assert_eq!(session.stats(), SessionStats::default());
    assert!(session.find_fragment(stream, 1, 0).is_none());
    assert_eq!(
        session.process_reassembled(ReassemblyContext::new(1, "test"), &stale, &mut NoopSink),
        Err(LookupError::UnknownPdu { pdu: stale.pdu() })
    );

    let fresh = session
        .add_fragment(stream, 1, 0, b"AB", false)
        .expect("stale handle recreates its stream");
    assert_ne!(fresh.pdu(), stale.pdu());
    assert_eq!(fresh.pdu_sequence_number(), 0);
}

#[rstest]
fn stale_records_never_alias_new_pdus(mut session: StreamSession) {
    let stream = inbound(&mut session);
    let stale = session
        .add_fragment(stream, 1, 0, b"OLD", true)
        .expect("accepted");
    session.reset();

    let other = session.stream_for_conversation(ConversationId::new(99), Direction::Outbound);
    let fresh = session
        .add_fragment(other, 1, 0, b"NEW", false)
        .expect("accepted");

    assert_ne!(fresh.pdu(), stale.pdu());
    assert_eq!(
        session.process_reassembled(ReassemblyContext::new(1, "test"), &stale, &mut NoopSink),
        Err(LookupError::UnknownPdu { pdu: stale.pdu() })
    );
    assert_eq!(session.pdu_data(&stale), None);
    assert_eq!(session.pdu_data(&fresh).as_deref(), Some(&b"NEW"[..]));
}

#[rstest]
fn lookups_never_touch_the_table() {
    let table: RecordingTable = RecordingTable::default();
    let mut session = StreamSession::with_table(table);
    let stream = session.stream_for_conversation(ConversationId::new(2), Direction::Outbound);
    session
        .add_fragment(stream, 1, 0, b"AB", true)
        .expect("accepted");
    session
        .add_fragment(stream, 2, 0, b"CD", false)
        .expect("accepted");
    assert_eq!(session.table().calls().len(), 2);

    for frame in [1, 2, 1, 2] {
        let record = session
            .find_fragment(stream, frame, 0)
            .expect("recorded");
        session
            .process_reassembled(ReassemblyContext::new(frame, "test"), &record, &mut NoopSink)
            .expect("pdu known");
    }
    assert_eq!(session.table().calls().len(), 2);
    assert!(session.table().discarded().is_empty());
}

#[rstest]
fn completion_policy_belongs_to_the_table() {
    let mut session = StreamSession::with_table(TerminatorTable::new(b'\n'));
    let stream = session.stream_for_conversation(ConversationId::new(3), Direction::Inbound);

    let first = session
        .add_fragment(stream, 1, 0, b"HEL", false)
        .expect("accepted");
    let last = session
        .add_fragment(stream, 2, 0, b"LO\n", false)
        .expect("accepted");

    assert!(!first.is_final());
    assert!(last.is_final());
    assert_eq!(first.pdu(), last.pdu());
    assert_eq!(session.pdu_data(&last).as_deref(), Some(&b"HELLO\n"[..]));
}

#[rstest]
#[traced_test]
fn refusals_carry_structured_fields() {
    let config =
        SessionConfig::default().with_max_pdu_size(NonZeroUsize::new(2).expect("non-zero"));
    let mut session = StreamSession::new(config);
    let stream = inbound(&mut session);

    session
        .add_fragment(stream, 3, 1, b"ABC", false)
        .expect_err("exceeds cap");
    session
        .add_fragment(stream, 2, 0, b"A", false)
        .expect_err("out of order");

    assert!(logs_contain("pdu abandoned"));
    assert!(logs_contain("fragment rejected"));
    assert!(logs_contain("stream=conversation 1 (inbound)"));
    assert!(logs_contain("frame=3"));
    assert!(logs_contain("offset=1"));
}

#[test]
fn session_can_move_between_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<StreamSession>();
}
