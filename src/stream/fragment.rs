//! Fragment records and their registry.
//!
//! Every successful forward-pass submission leaves behind a
//! [`FragmentRecord`]. Later passes look records up by position instead of
//! resubmitting bytes, which would trip the ordering check or feed the
//! reassembly table twice.

use std::collections::HashMap;

use super::{FragmentPosition, PduId, StreamKey};

/// Immutable description of one recorded fragment.
///
/// Records can only be produced by the session, so every record refers to a
/// PDU that existed when it was minted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FragmentRecord {
    stream: StreamKey,
    position: FragmentPosition,
    length: u32,
    pdu: PduId,
    pdu_sequence: u32,
    is_final: bool,
}

impl FragmentRecord {
    pub(crate) const fn new(
        stream: StreamKey,
        position: FragmentPosition,
        length: u32,
        pdu: PduId,
        pdu_sequence: u32,
        is_final: bool,
    ) -> Self {
        Self {
            stream,
            position,
            length,
            pdu,
            pdu_sequence,
            is_final,
        }
    }

    /// Stream the fragment was submitted to.
    #[must_use]
    pub const fn stream(&self) -> StreamKey { self.stream }

    /// Frame number and offset of the fragment.
    #[must_use]
    pub const fn position(&self) -> FragmentPosition { self.position }

    /// Frame number carrying the fragment.
    #[must_use]
    pub const fn frame_number(&self) -> u32 { self.position.frame() }

    /// Byte offset of the fragment within its frame.
    #[must_use]
    pub const fn offset(&self) -> u32 { self.position.offset() }

    /// Number of payload bytes in the fragment.
    #[must_use]
    pub const fn length(&self) -> u32 { self.length }

    /// PDU the fragment belongs to.
    #[must_use]
    pub const fn pdu(&self) -> PduId { self.pdu }

    /// Ordinal of the owning PDU within its stream. Diagnostic only.
    #[must_use]
    pub const fn pdu_sequence_number(&self) -> u32 { self.pdu_sequence }

    /// Whether this fragment completed its PDU.
    #[must_use]
    pub const fn is_final(&self) -> bool { self.is_final }
}

/// Lookup key for a recorded fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct FragmentKey {
    stream: StreamKey,
    position: FragmentPosition,
}

impl FragmentKey {
    pub(crate) const fn new(stream: StreamKey, position: FragmentPosition) -> Self {
        Self { stream, position }
    }
}

/// Registry of every fragment recorded in a session.
#[derive(Debug, Default)]
pub struct FragmentRegistry {
    records: HashMap<FragmentKey, FragmentRecord>,
}

impl FragmentRegistry {
    /// Store a freshly minted record.
    pub(crate) fn insert(&mut self, record: FragmentRecord) {
        self.records
            .insert(FragmentKey::new(record.stream, record.position), record);
    }

    pub(crate) fn contains(&self, key: &FragmentKey) -> bool { self.records.contains_key(key) }

    /// Look up the record for `position` on `stream`.
    #[must_use]
    pub fn find(&self, stream: StreamKey, position: FragmentPosition) -> Option<FragmentRecord> {
        self.records
            .get(&FragmentKey::new(stream, position))
            .copied()
    }

    /// All records carried by `frame`, ordered by stream then offset.
    #[must_use]
    pub fn in_frame(&self, frame: u32) -> Vec<FragmentRecord> {
        let mut found: Vec<FragmentRecord> = self
            .records
            .values()
            .filter(|record| record.position.frame() == frame)
            .copied()
            .collect();
        found.sort_by_key(|record| (record.stream, record.position));
        found
    }

    /// Number of recorded fragments.
    #[must_use]
    pub fn len(&self) -> usize { self.records.len() }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub(crate) fn clear(&mut self) { self.records.clear(); }
}
