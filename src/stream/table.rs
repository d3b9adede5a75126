//! Byte accumulation for in-progress PDUs.
//!
//! The stream engine never concatenates bytes itself. It hands every fragment
//! to a [`ReassemblyTable`] under the owning PDU's id and learns from the
//! table when a PDU is finished. [`BufferedReassemblyTable`] is the default
//! table: it appends fragments in submission order and completes when the
//! caller reports that no more fragments follow.

use std::{
    collections::{HashMap, hash_map::Entry},
    num::NonZeroUsize,
};

use bytes::{Bytes, BytesMut};

use super::{PduId, ReassemblyError};

/// Accumulates fragment bytes keyed by PDU id.
pub trait ReassemblyTable {
    /// Add `fragment` to the PDU `pdu`.
    ///
    /// Returns `Ok(Some(bytes))` exactly when this fragment completes the PDU
    /// and `Ok(None)` while more fragments are expected.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when the table refuses the fragment. The
    /// stream then abandons the PDU and calls [`discard`](Self::discard).
    fn add(
        &mut self,
        pdu: PduId,
        fragment: &[u8],
        more_follows: bool,
    ) -> Result<Option<Bytes>, ReassemblyError>;

    /// Forget any partial bytes buffered for `pdu`.
    fn discard(&mut self, pdu: PduId);

    /// Drop every buffer.
    fn clear(&mut self);

    /// Bytes currently buffered for incomplete PDUs.
    fn buffered_bytes(&self) -> usize;
}

/// Default [`ReassemblyTable`] that concatenates fragments in order.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use pdu_stream::stream::{BufferedReassemblyTable, PduId, ReassemblyTable};
///
/// let mut table = BufferedReassemblyTable::new(NonZeroUsize::new(64).expect("non-zero"));
/// assert_eq!(table.add(PduId::new(0), b"AB", true), Ok(None));
/// let done = table
///     .add(PduId::new(0), b"CD", false)
///     .expect("within limit")
///     .expect("complete");
/// assert_eq!(&done[..], b"ABCD");
/// ```
#[derive(Debug)]
pub struct BufferedReassemblyTable {
    max_pdu_size: NonZeroUsize,
    buffers: HashMap<PduId, BytesMut>,
}

impl BufferedReassemblyTable {
    /// Create a table that refuses PDUs larger than `max_pdu_size`.
    #[must_use]
    pub fn new(max_pdu_size: NonZeroUsize) -> Self {
        Self {
            max_pdu_size,
            buffers: HashMap::new(),
        }
    }

    /// Maximum size of an assembled PDU.
    #[must_use]
    pub const fn max_pdu_size(&self) -> NonZeroUsize { self.max_pdu_size }

    /// Number of PDUs with buffered partial data.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.buffers.len() }

    fn assert_within_limit(
        limit: NonZeroUsize,
        pdu: PduId,
        attempted: usize,
    ) -> Result<(), ReassemblyError> {
        if attempted > limit.get() {
            return Err(ReassemblyError::PduTooLarge {
                pdu,
                attempted,
                limit,
            });
        }
        Ok(())
    }
}

impl ReassemblyTable for BufferedReassemblyTable {
    fn add(
        &mut self,
        pdu: PduId,
        fragment: &[u8],
        more_follows: bool,
    ) -> Result<Option<Bytes>, ReassemblyError> {
        let limit = self.max_pdu_size;

        match self.buffers.entry(pdu) {
            Entry::Occupied(mut occupied) => {
                let attempted = occupied.get().len().saturating_add(fragment.len());
                if let Err(err) = Self::assert_within_limit(limit, pdu, attempted) {
                    occupied.remove();
                    return Err(err);
                }
                occupied.get_mut().extend_from_slice(fragment);
                if more_follows {
                    Ok(None)
                } else {
                    Ok(Some(occupied.remove().freeze()))
                }
            }
            Entry::Vacant(vacant) => {
                Self::assert_within_limit(limit, pdu, fragment.len())?;
                if more_follows {
                    vacant.insert(BytesMut::from(fragment));
                    Ok(None)
                } else {
                    Ok(Some(Bytes::copy_from_slice(fragment)))
                }
            }
        }
    }

    fn discard(&mut self, pdu: PduId) { self.buffers.remove(&pdu); }

    fn clear(&mut self) { self.buffers.clear(); }

    fn buffered_bytes(&self) -> usize { self.buffers.values().map(BytesMut::len).sum() }
}
