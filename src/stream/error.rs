//! Error types for stream and PDU tracking.
//!
//! Contract violations signal a bug in the calling dissector, not malformed
//! traffic. They abort the current packet only; the session stays usable.

use std::num::NonZeroUsize;

use thiserror::Error;

use super::{FragmentPosition, PduId, StreamKey};

/// Misuse of the forward-pass API by a caller.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ContractViolation {
    /// A fragment arrived at or before the stream's ordering watermark.
    #[error("out-of-order fragment on {stream}: {position} is not after {watermark}")]
    OutOfOrder {
        /// Stream the fragment was submitted to.
        stream: StreamKey,
        /// Position of the rejected fragment.
        position: FragmentPosition,
        /// Last position accepted by the stream.
        watermark: FragmentPosition,
    },
    /// The fragment was already recorded, typically by an earlier pass.
    #[error("fragment at {position} on {stream} was already recorded")]
    AlreadyRecorded {
        /// Stream the fragment was submitted to.
        stream: StreamKey,
        /// Position of the duplicate fragment.
        position: FragmentPosition,
    },
    /// The fragment is longer than a record can describe.
    #[error("fragment at {position} on {stream} is {length} bytes, above the {max} byte maximum", max = u32::MAX)]
    FragmentTooLong {
        /// Stream the fragment was submitted to.
        stream: StreamKey,
        /// Position of the rejected fragment.
        position: FragmentPosition,
        /// Length of the rejected fragment.
        length: usize,
    },
    /// The stream has handed out every representable sequence number.
    #[error("pdu sequence numbers exhausted on {stream}")]
    SequenceExhausted {
        /// Stream whose counter overflowed.
        stream: StreamKey,
    },
}

/// Failures reported by a [`ReassemblyTable`](super::ReassemblyTable).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    /// The assembled PDU would exceed the configured cap.
    #[error("pdu {pdu} exceeds size limit: {attempted} bytes > {limit} bytes")]
    PduTooLarge {
        /// PDU being assembled.
        pdu: PduId,
        /// Total size that triggered the guard.
        attempted: usize,
        /// Configured size cap.
        limit: NonZeroUsize,
    },
}

/// Errors returned by [`StreamSession::add_fragment`](super::StreamSession::add_fragment).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The caller broke the ordering or single-submission contract.
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),
    /// The reassembly table refused the bytes; the PDU was abandoned.
    #[error("reassembly failed: {0}")]
    Reassembly(#[from] ReassemblyError),
}

impl StreamError {
    /// Whether the error reflects a caller bug rather than a table refusal.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool { matches!(self, Self::Contract(_)) }
}

/// Errors from the non-mutating lookup path.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The record refers to a PDU this session does not hold, usually because
    /// the session was reset after the record was obtained.
    #[error("unknown pdu {pdu}")]
    UnknownPdu {
        /// Identifier carried by the record.
        pdu: PduId,
    },
}
