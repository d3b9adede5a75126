//! Protocol data units and the table that owns them.
//!
//! [`PduTable`] is the only owner of PDU storage. Streams and fragment records
//! refer to PDUs by [`PduId`].

use std::collections::HashMap;

use bytes::Bytes;
use derive_more::{Display, From, Into};

use super::{FragmentPosition, StreamKey};

/// Session-unique identifier of a PDU.
///
/// Identifiers are handed out monotonically across all streams of a session
/// and double as the key under which the reassembly table buffers bytes.
///
/// # Examples
///
/// ```
/// use pdu_stream::stream::PduId;
/// let id = PduId::new(3);
/// assert_eq!(id.get(), 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct PduId(u64);

impl PduId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

/// Position and length of one fragment of a PDU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentSpan {
    /// Where the fragment sits in the capture.
    pub position: FragmentPosition,
    /// Number of payload bytes the fragment contributed.
    pub length: u32,
}

/// A logical message, possibly still being assembled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pdu {
    id: PduId,
    sequence_number: u32,
    stream: StreamKey,
    fragments: Vec<FragmentSpan>,
    completed: Option<Completion>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Completion {
    data: Bytes,
    frame: u32,
}

impl Pdu {
    fn new(id: PduId, sequence_number: u32, stream: StreamKey) -> Self {
        Self {
            id,
            sequence_number,
            stream,
            fragments: Vec::new(),
            completed: None,
        }
    }

    /// Session-unique identifier.
    #[must_use]
    pub const fn id(&self) -> PduId { self.id }

    /// Zero-based ordinal within the owning stream.
    #[must_use]
    pub const fn sequence_number(&self) -> u32 { self.sequence_number }

    /// Stream that produced this PDU.
    #[must_use]
    pub const fn stream(&self) -> StreamKey { self.stream }

    /// Fragments recorded for this PDU, in submission order.
    #[must_use]
    pub fn fragments(&self) -> &[FragmentSpan] { &self.fragments }

    /// Whether the final fragment has been seen.
    #[must_use]
    pub const fn is_complete(&self) -> bool { self.completed.is_some() }

    /// Assembled bytes, once complete.
    #[must_use]
    pub fn completed_data(&self) -> Option<&Bytes> { self.completed.as_ref().map(|c| &c.data) }

    /// Frame whose fragment completed the PDU.
    #[must_use]
    pub fn reassembled_in(&self) -> Option<u32> { self.completed.as_ref().map(|c| c.frame) }
}

/// Owner of every PDU in a session.
#[derive(Debug, Default)]
pub struct PduTable {
    pdus: HashMap<PduId, Pdu>,
    next_id: u64,
}

impl PduTable {
    /// Allocate a fresh PDU for `stream` with the given ordinal.
    pub(crate) fn allocate(&mut self, stream: StreamKey, sequence_number: u32) -> PduId {
        let id = PduId::new(self.next_id);
        self.next_id += 1;
        self.pdus.insert(id, Pdu::new(id, sequence_number, stream));
        id
    }

    /// Append a fragment span to an in-progress PDU.
    pub(crate) fn push_fragment(&mut self, id: PduId, span: FragmentSpan) {
        if let Some(pdu) = self.pdus.get_mut(&id) {
            pdu.fragments.push(span);
        }
    }

    /// Store the assembled bytes. A PDU completes at most once; later calls
    /// leave the original data in place and return `false`.
    pub(crate) fn complete(&mut self, id: PduId, data: Bytes, frame: u32) -> bool {
        match self.pdus.get_mut(&id) {
            Some(pdu) if pdu.completed.is_none() => {
                pdu.completed = Some(Completion { data, frame });
                true
            }
            _ => false,
        }
    }

    /// Look up a PDU.
    #[must_use]
    pub fn get(&self, id: PduId) -> Option<&Pdu> { self.pdus.get(&id) }

    /// Number of PDUs ever allocated in this session.
    #[must_use]
    pub fn len(&self) -> usize { self.pdus.len() }

    /// Whether no PDU has been allocated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.pdus.is_empty() }

    /// Number of PDUs that have completed.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.pdus.values().filter(|pdu| pdu.is_complete()).count()
    }

    /// Drop every PDU. Identifiers keep counting so none is reused.
    pub(crate) fn clear(&mut self) {
        self.pdus.clear();
    }
}
