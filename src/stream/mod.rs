//! Stream and PDU tracking for byte-stream protocols.
//!
//! Protocols without their own length or message-id framing may spread one
//! logical message (a PDU) over several captured frames in one direction of a
//! conversation. This module tracks such streams during a forward pass and
//! lets later passes ask which PDU a fragment belongs to without resubmitting
//! bytes.
//!
//! ## Ownership
//!
//! [`StreamSession`] owns every [`Stream`], [`Pdu`] and [`FragmentRecord`]
//! for one capture-analysis session. Streams and records refer to PDUs by
//! [`PduId`]; [`StreamSession::reset`] drops everything at once.
//!
//! ## Ordering
//!
//! Within a stream, fragments must be submitted in strictly increasing
//! `(frame, offset)` order and at most once. Breaking either rule is a
//! [`ContractViolation`]: a bug in the caller that fails the current packet
//! but leaves the session intact.

mod annotation;
pub mod error;
mod fragment;
mod key;
mod pdu;
mod registry;
mod session;
mod state;
mod table;

pub use annotation::{Annotation, AnnotationSink, NoopSink};
pub use error::{ContractViolation, LookupError, ReassemblyError, StreamError};
pub use fragment::{FragmentRecord, FragmentRegistry};
pub use key::{CircuitId, ConversationId, Direction, FragmentPosition, StreamKey, StreamOwner};
pub use pdu::{FragmentSpan, Pdu, PduId, PduTable};
pub use registry::{StreamHandle, StreamRegistry};
pub use session::{
    ProcessOutcome,
    ReassembledPdu,
    ReassemblyContext,
    SessionStats,
    StreamSession,
};
pub use state::{Stream, StreamState};
pub use table::{BufferedReassemblyTable, ReassemblyTable};

#[cfg(test)]
mod session_tests;
