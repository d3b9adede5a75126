#![cfg(any(test, feature = "test-helpers"))]
//! Test-only helpers for shared test utilities.

use bytes::Bytes;

use crate::stream::{
    BufferedReassemblyTable,
    ConversationId,
    Direction,
    PduId,
    ReassemblyError,
    ReassemblyTable,
    StreamKey,
};

/// One call observed by a [`RecordingTable`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableCall {
    /// PDU the bytes were filed under.
    pub pdu: PduId,
    /// Bytes handed to the table.
    pub fragment: Vec<u8>,
    /// Continuation flag passed alongside.
    pub more_follows: bool,
}

/// Reassembly table that records every `add` before delegating.
///
/// Lets tests prove that lookups on later passes never resubmit bytes.
#[derive(Debug)]
pub struct RecordingTable<T = BufferedReassemblyTable> {
    inner: T,
    calls: Vec<TableCall>,
    discarded: Vec<PduId>,
}

impl<T> RecordingTable<T> {
    /// Wrap `inner`.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: Vec::new(),
            discarded: Vec::new(),
        }
    }

    /// Calls observed so far, in order.
    #[must_use]
    pub fn calls(&self) -> &[TableCall] { &self.calls }

    /// PDUs discarded so far, in order.
    #[must_use]
    pub fn discarded(&self) -> &[PduId] { &self.discarded }
}

impl Default for RecordingTable<BufferedReassemblyTable> {
    fn default() -> Self {
        Self::new(BufferedReassemblyTable::new(
            crate::config::SessionConfig::DEFAULT.max_pdu_size,
        ))
    }
}

impl<T: ReassemblyTable> ReassemblyTable for RecordingTable<T> {
    fn add(
        &mut self,
        pdu: PduId,
        fragment: &[u8],
        more_follows: bool,
    ) -> Result<Option<Bytes>, ReassemblyError> {
        self.calls.push(TableCall {
            pdu,
            fragment: fragment.to_vec(),
            more_follows,
        });
        self.inner.add(pdu, fragment, more_follows)
    }

    fn discard(&mut self, pdu: PduId) {
        self.discarded.push(pdu);
        self.inner.discard(pdu);
    }

    fn clear(&mut self) { self.inner.clear(); }

    fn buffered_bytes(&self) -> usize { self.inner.buffered_bytes() }
}

/// Reassembly table that completes a PDU when a terminator byte arrives,
/// ignoring the caller's continuation flag.
#[derive(Debug)]
pub struct TerminatorTable {
    terminator: u8,
    inner: BufferedReassemblyTable,
}

impl TerminatorTable {
    /// Complete PDUs on `terminator`.
    #[must_use]
    pub fn new(terminator: u8) -> Self {
        Self {
            terminator,
            inner: BufferedReassemblyTable::new(crate::config::SessionConfig::DEFAULT.max_pdu_size),
        }
    }
}

impl ReassemblyTable for TerminatorTable {
    fn add(
        &mut self,
        pdu: PduId,
        fragment: &[u8],
        _more_follows: bool,
    ) -> Result<Option<Bytes>, ReassemblyError> {
        let ends = fragment.last() == Some(&self.terminator);
        self.inner.add(pdu, fragment, !ends)
    }

    fn discard(&mut self, pdu: PduId) { self.inner.discard(pdu); }

    fn clear(&mut self) { self.inner.clear(); }

    fn buffered_bytes(&self) -> usize { self.inner.buffered_bytes() }
}

/// Key for one direction of conversation `id`.
#[must_use]
pub fn conversation_key(id: u64, direction: Direction) -> StreamKey {
    StreamKey::conversation(ConversationId::new(id), direction)
}
