//! Per-direction stream state machine.
//!
//! A [`Stream`] owns at most one PDU under construction. Every fragment is
//! validated against the stream's ordering watermark before any state
//! changes, then forwarded to the reassembly table under the current PDU's id.
//! When the table reports completion the stream stores the bytes on the PDU
//! and returns to [`StreamState::NoActivePdu`].

use log::debug;

use super::{
    ContractViolation,
    FragmentPosition,
    FragmentRecord,
    FragmentSpan,
    PduId,
    PduTable,
    ReassemblyTable,
    StreamError,
    StreamKey,
};

/// Observable state of a [`Stream`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// The next fragment starts a new PDU.
    NoActivePdu,
    /// A PDU has received fragments but is not complete yet.
    AccumulatingPdu,
}

/// A fragment offered to a stream during the forward pass.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FragmentInput<'a> {
    pub(crate) position: FragmentPosition,
    pub(crate) bytes: &'a [u8],
    pub(crate) more_follows: bool,
}

/// State tracked for one direction of one conversation or circuit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stream {
    key: StreamKey,
    current_pdu: Option<PduId>,
    pdu_counter: u32,
    /// Last accepted position; `None` until the first fragment.
    watermark: Option<FragmentPosition>,
}

impl Stream {
    pub(crate) const fn new(key: StreamKey) -> Self {
        Self {
            key,
            current_pdu: None,
            pdu_counter: 0,
            watermark: None,
        }
    }

    /// Identity of the stream.
    #[must_use]
    pub const fn key(&self) -> StreamKey { self.key }

    /// PDU currently being assembled, if any.
    #[must_use]
    pub const fn current_pdu(&self) -> Option<PduId> { self.current_pdu }

    /// Sequence number the next PDU of this stream will receive.
    #[must_use]
    pub const fn pdu_counter(&self) -> u32 { self.pdu_counter }

    /// Position of the last fragment the stream accepted.
    #[must_use]
    pub const fn watermark(&self) -> Option<FragmentPosition> { self.watermark }

    /// Current state-machine state.
    #[must_use]
    pub const fn state(&self) -> StreamState {
        if self.current_pdu.is_some() {
            StreamState::AccumulatingPdu
        } else {
            StreamState::NoActivePdu
        }
    }

    /// Reject positions at or before the watermark.
    fn check_order(&self, position: FragmentPosition) -> Result<(), ContractViolation> {
        match self.watermark {
            Some(watermark) if position <= watermark => Err(ContractViolation::OutOfOrder {
                stream: self.key,
                position,
                watermark,
            }),
            _ => Ok(()),
        }
    }

    /// Length of a fragment as stored on its record.
    pub(crate) fn checked_length(
        &self,
        position: FragmentPosition,
        length: usize,
    ) -> Result<u32, ContractViolation> {
        u32::try_from(length).map_err(|_| ContractViolation::FragmentTooLong {
            stream: self.key,
            position,
            length,
        })
    }

    /// Return the PDU to attach the next fragment to, allocating one when the
    /// stream is idle.
    fn current_or_allocate(&mut self, pdus: &mut PduTable) -> Result<PduId, ContractViolation> {
        if let Some(id) = self.current_pdu {
            return Ok(id);
        }
        let sequence = self.pdu_counter;
        let next = sequence
            .checked_add(1)
            .ok_or(ContractViolation::SequenceExhausted { stream: self.key })?;
        let id = pdus.allocate(self.key, sequence);
        self.pdu_counter = next;
        self.current_pdu = Some(id);
        debug!("pdu started: stream={}, pdu={id}, sequence={sequence}", self.key);
        Ok(id)
    }

    /// Feed one fragment through the stream.
    ///
    /// Duplicate detection against recorded fragments is the caller's job;
    /// this method enforces the ordering watermark only.
    pub(crate) fn add_fragment<T>(
        &mut self,
        input: FragmentInput<'_>,
        pdus: &mut PduTable,
        table: &mut T,
    ) -> Result<FragmentRecord, StreamError>
    where
        T: ReassemblyTable + ?Sized,
    {
        self.check_order(input.position)?;
        let length = self.checked_length(input.position, input.bytes.len())?;
        let pdu = self.current_or_allocate(pdus)?;

        // Watermark moves even when the table refuses the bytes.
        self.watermark = Some(input.position);

        let completed = match table.add(pdu, input.bytes, input.more_follows) {
            Ok(completed) => completed,
            Err(err) => {
                table.discard(pdu);
                self.current_pdu = None;
                return Err(err.into());
            }
        };

        pdus.push_fragment(
            pdu,
            FragmentSpan {
                position: input.position,
                length,
            },
        );
        // The current PDU is always the latest one this stream allocated.
        let sequence = self.pdu_counter.saturating_sub(1);

        let is_final = if let Some(data) = completed {
            debug!(
                "pdu completed: stream={}, pdu={pdu}, frame={}, len={}",
                self.key,
                input.position.frame(),
                data.len()
            );
            pdus.complete(pdu, data, input.position.frame());
            self.current_pdu = None;
            true
        } else {
            false
        };

        Ok(FragmentRecord::new(
            self.key,
            input.position,
            length,
            pdu,
            sequence,
            is_final,
        ))
    }
}
