//! Session-wide owner of streams, PDUs and fragment records.
//!
//! [`StreamSession`] is the entry point dissectors talk to. The forward pass
//! calls [`StreamSession::add_fragment`] once per fragment in capture order;
//! any pass may then call [`StreamSession::find_fragment`] and
//! [`StreamSession::process_reassembled`], which never mutate the session.
//! Mutation requires `&mut self`, so a shared borrow held by a re-dissection
//! pass rules out accidental resubmission.

use bytes::Bytes;
use log::debug;

use super::{
    AnnotationSink,
    BufferedReassemblyTable,
    CircuitId,
    ContractViolation,
    ConversationId,
    Direction,
    FragmentPosition,
    FragmentRecord,
    FragmentRegistry,
    FragmentSpan,
    LookupError,
    Pdu,
    PduId,
    PduTable,
    ReassemblyTable,
    Stream,
    StreamError,
    StreamHandle,
    StreamKey,
    StreamRegistry,
    annotation::Annotation,
    fragment::FragmentKey,
    state::FragmentInput,
};
use crate::{config::SessionConfig, metrics};

/// Frame-level details supplied when processing a recorded fragment.
#[derive(Clone, Copy, Debug)]
pub struct ReassemblyContext<'a> {
    /// Frame currently being dissected.
    pub frame_number: u32,
    /// Human-readable label for the PDU, used in annotations.
    pub name: &'a str,
}

impl<'a> ReassemblyContext<'a> {
    /// Create a context for `frame_number`.
    #[must_use]
    pub const fn new(frame_number: u32, name: &'a str) -> Self { Self { frame_number, name } }
}

/// A complete PDU handed to the next-layer parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReassembledPdu {
    pdu: PduId,
    sequence_number: u32,
    data: Bytes,
    fragments: Vec<FragmentSpan>,
}

impl ReassembledPdu {
    /// Identifier of the PDU.
    #[must_use]
    pub const fn pdu(&self) -> PduId { self.pdu }

    /// Ordinal of the PDU within its stream.
    #[must_use]
    pub const fn sequence_number(&self) -> u32 { self.sequence_number }

    /// Assembled bytes.
    #[must_use]
    pub fn data(&self) -> &Bytes { &self.data }

    /// Consume the PDU and return its bytes.
    #[must_use]
    pub fn into_data(self) -> Bytes { self.data }

    /// Fragments that made up the PDU, in capture order.
    #[must_use]
    pub fn fragments(&self) -> &[FragmentSpan] { &self.fragments }
}

/// Result of [`StreamSession::process_reassembled`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The fragment is not the one that completed its PDU.
    NotYetComplete,
    /// The fragment completed its PDU; here are the bytes.
    Reassembled(ReassembledPdu),
}

impl ProcessOutcome {
    /// Return the reassembled PDU, if any.
    #[must_use]
    pub fn into_reassembled(self) -> Option<ReassembledPdu> {
        match self {
            Self::NotYetComplete => None,
            Self::Reassembled(pdu) => Some(pdu),
        }
    }
}

/// Snapshot of session bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Registered streams.
    pub streams: usize,
    /// PDUs allocated, complete or not.
    pub pdus: usize,
    /// PDUs whose final fragment has been seen.
    pub completed_pdus: usize,
    /// Recorded fragments.
    pub fragments: usize,
    /// Bytes buffered by the reassembly table for incomplete PDUs.
    pub buffered_bytes: usize,
}

/// Stream and PDU tracking for one capture-analysis session.
///
/// # Examples
///
/// ```
/// use pdu_stream::stream::{
///     ConversationId,
///     Direction,
///     NoopSink,
///     ReassemblyContext,
///     StreamSession,
/// };
///
/// let mut session = StreamSession::default();
/// let stream = session.stream_for_conversation(ConversationId::new(1), Direction::Inbound);
///
/// let first = session
///     .add_fragment(stream, 1, 0, b"AB", true)
///     .expect("first fragment");
/// let last = session
///     .add_fragment(stream, 2, 0, b"CD", false)
///     .expect("final fragment");
/// assert!(!first.is_final());
/// assert!(last.is_final());
///
/// let pdu = session
///     .process_reassembled(ReassemblyContext::new(2, "demo"), &last, &mut NoopSink)
///     .expect("known pdu")
///     .into_reassembled()
///     .expect("complete");
/// assert_eq!(&pdu.data()[..], b"ABCD");
/// ```
#[derive(Debug)]
pub struct StreamSession<T = BufferedReassemblyTable> {
    streams: StreamRegistry,
    pdus: PduTable,
    fragments: FragmentRegistry,
    table: T,
}

impl StreamSession<BufferedReassemblyTable> {
    /// Create a session backed by a [`BufferedReassemblyTable`].
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self::with_table(BufferedReassemblyTable::new(config.max_pdu_size))
    }
}

impl Default for StreamSession<BufferedReassemblyTable> {
    fn default() -> Self { Self::new(SessionConfig::default()) }
}

impl<T: ReassemblyTable> StreamSession<T> {
    /// Create a session that delegates byte accumulation to `table`.
    #[must_use]
    pub fn with_table(table: T) -> Self {
        Self {
            streams: StreamRegistry::default(),
            pdus: PduTable::default(),
            fragments: FragmentRegistry::default(),
            table,
        }
    }

    /// Return the stream for `key`, creating it on first use.
    pub fn stream(&mut self, key: StreamKey) -> StreamHandle {
        let (handle, created) = self.streams.get_or_create(key);
        if created {
            Self::note_stream_created(key);
        }
        handle
    }

    fn note_stream_created(key: StreamKey) {
        debug!("stream created: {key}");
        metrics::inc_streams();
    }

    /// Return the stream for one direction of a conversation.
    pub fn stream_for_conversation(
        &mut self,
        conversation: ConversationId,
        direction: Direction,
    ) -> StreamHandle {
        self.stream(StreamKey::conversation(conversation, direction))
    }

    /// Return the stream for one direction of a circuit.
    pub fn stream_for_circuit(&mut self, circuit: CircuitId, direction: Direction) -> StreamHandle {
        self.stream(StreamKey::circuit(circuit, direction))
    }

    /// Look up a stream without creating it.
    #[must_use]
    pub fn find_stream(&self, key: StreamKey) -> Option<StreamHandle> { self.streams.find(key) }

    /// Borrow the state of a stream.
    #[must_use]
    pub fn stream_state(&self, handle: StreamHandle) -> Option<&Stream> { self.streams.get(handle) }

    /// Submit one fragment during the forward pass.
    ///
    /// Fragments must arrive in strictly increasing `(frame_number, offset)`
    /// order per stream, and each position may be submitted only once. A
    /// handle issued before [`reset`](Self::reset) recreates its stream.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Contract`] when the position was already
    /// recorded or does not follow the stream's last fragment; the session is
    /// left untouched. Returns [`StreamError::Reassembly`] when the table
    /// refuses the bytes; the PDU in progress is abandoned and the next
    /// fragment starts a new one.
    pub fn add_fragment(
        &mut self,
        handle: StreamHandle,
        frame_number: u32,
        offset: u32,
        bytes: &[u8],
        more_fragments_follow: bool,
    ) -> Result<FragmentRecord, StreamError> {
        let key = handle.key();
        let position = FragmentPosition::new(frame_number, offset);

        let result = self.submit(key, position, bytes, more_fragments_follow);
        match &result {
            Ok(record) => {
                metrics::inc_fragments(key.direction());
                if record.is_final() {
                    metrics::inc_pdus_completed();
                }
                self.fragments.insert(*record);
            }
            Err(StreamError::Contract(violation)) => {
                metrics::inc_contract_violations();
                tracing::warn!(
                    stream = %key,
                    frame = frame_number,
                    offset,
                    error = %violation,
                    "fragment rejected"
                );
            }
            Err(StreamError::Reassembly(err)) => {
                metrics::inc_pdus_abandoned();
                tracing::warn!(
                    stream = %key,
                    frame = frame_number,
                    offset,
                    error = %err,
                    "pdu abandoned"
                );
            }
        }
        result
    }

    fn submit(
        &mut self,
        key: StreamKey,
        position: FragmentPosition,
        bytes: &[u8],
        more_follows: bool,
    ) -> Result<FragmentRecord, StreamError> {
        if self.fragments.contains(&FragmentKey::new(key, position)) {
            return Err(ContractViolation::AlreadyRecorded {
                stream: key,
                position,
            }
            .into());
        }

        let (stream, created) = self.streams.get_or_insert_mut(key);
        if created {
            Self::note_stream_created(key);
        }
        stream.add_fragment(
            FragmentInput {
                position,
                bytes,
                more_follows,
            },
            &mut self.pdus,
            &mut self.table,
        )
    }

    /// Look up a fragment recorded by an earlier call to
    /// [`add_fragment`](Self::add_fragment).
    #[must_use]
    pub fn find_fragment(
        &self,
        handle: StreamHandle,
        frame_number: u32,
        offset: u32,
    ) -> Option<FragmentRecord> {
        self.fragments
            .find(handle.key(), FragmentPosition::new(frame_number, offset))
    }

    /// Every fragment recorded in `frame_number`, across all streams.
    #[must_use]
    pub fn fragments_in_frame(&self, frame_number: u32) -> Vec<FragmentRecord> {
        self.fragments.in_frame(frame_number)
    }

    /// Resolve a recorded fragment to its PDU without mutating anything.
    ///
    /// Non-final fragments yield [`ProcessOutcome::NotYetComplete`]; if a
    /// later frame has since completed their PDU, a
    /// [`Annotation::ReassembledIn`] cross-reference is emitted first. The
    /// final fragment yields the assembled bytes and an
    /// [`Annotation::Reassembled`] summary.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownPdu`] when the record's PDU is not held
    /// by this session.
    pub fn process_reassembled(
        &self,
        context: ReassemblyContext<'_>,
        fragment: &FragmentRecord,
        sink: &mut dyn AnnotationSink,
    ) -> Result<ProcessOutcome, LookupError> {
        let pdu = self
            .pdus
            .get(fragment.pdu())
            .ok_or(LookupError::UnknownPdu {
                pdu: fragment.pdu(),
            })?;

        if !fragment.is_final() {
            if let Some(reassembled_in) = pdu.reassembled_in() {
                sink.annotate(Annotation::ReassembledIn {
                    frame: context.frame_number,
                    pdu: pdu.id(),
                    reassembled_in,
                });
            }
            return Ok(ProcessOutcome::NotYetComplete);
        }

        let Some(data) = pdu.completed_data() else {
            return Ok(ProcessOutcome::NotYetComplete);
        };
        Ok(ProcessOutcome::Reassembled(Self::assemble_and_annotate(
            context, pdu, data, sink,
        )))
    }

    fn assemble_and_annotate(
        context: ReassemblyContext<'_>,
        pdu: &Pdu,
        data: &Bytes,
        sink: &mut dyn AnnotationSink,
    ) -> ReassembledPdu {
        sink.annotate(Annotation::Reassembled {
            frame: context.frame_number,
            pdu: pdu.id(),
            name: context.name.to_owned(),
            length: data.len(),
            fragment_count: pdu.fragments().len(),
        });
        ReassembledPdu {
            pdu: pdu.id(),
            sequence_number: pdu.sequence_number(),
            data: data.clone(),
            fragments: pdu.fragments().to_vec(),
        }
    }

    /// Assembled bytes of the fragment's PDU, or `None` while incomplete.
    #[must_use]
    pub fn pdu_data(&self, fragment: &FragmentRecord) -> Option<Bytes> {
        self.pdus
            .get(fragment.pdu())
            .and_then(Pdu::completed_data)
            .cloned()
    }

    /// Payload length of a recorded fragment.
    #[must_use]
    pub fn fragment_length(&self, fragment: &FragmentRecord) -> u32 { fragment.length() }

    /// Ordinal of the fragment's PDU within its stream. Diagnostic only.
    #[must_use]
    pub fn pdu_sequence_number(&self, fragment: &FragmentRecord) -> u32 {
        fragment.pdu_sequence_number()
    }

    /// Borrow a PDU by id.
    #[must_use]
    pub fn pdu(&self, id: PduId) -> Option<&Pdu> { self.pdus.get(id) }

    /// Borrow the reassembly table.
    #[must_use]
    pub fn table(&self) -> &T { &self.table }

    /// Summarise current bookkeeping.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            streams: self.streams.len(),
            pdus: self.pdus.len(),
            completed_pdus: self.pdus.completed_count(),
            fragments: self.fragments.len(),
            buffered_bytes: self.table.buffered_bytes(),
        }
    }

    /// Tear the session down, dropping every stream, PDU, record and
    /// buffered byte. PDU identifiers keep counting, so records
    /// obtained before the reset resolve to [`LookupError::UnknownPdu`].
    pub fn reset(&mut self) {
        let streams = self.streams.len();
        self.streams.clear();
        self.pdus.clear();
        self.fragments.clear();
        self.table.clear();
        metrics::sub_streams(streams);
        debug!("stream session reset: dropped {streams} streams");
    }
}
