//! Cross-reference annotations emitted while processing recorded fragments.
//!
//! Annotations are observational: sinks may display, collect or ignore them,
//! and nothing they do affects reassembly.

use std::fmt;

use super::PduId;

/// A note attached to the frame currently being dissected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Annotation {
    /// A non-final fragment whose PDU was completed in a later frame.
    ReassembledIn {
        /// Frame being dissected.
        frame: u32,
        /// PDU the fragment belongs to.
        pdu: PduId,
        /// Frame whose fragment completed the PDU.
        reassembled_in: u32,
    },
    /// The final fragment of a PDU; the assembled bytes were handed out.
    Reassembled {
        /// Frame being dissected.
        frame: u32,
        /// PDU that was assembled.
        pdu: PduId,
        /// Label supplied by the calling dissector.
        name: String,
        /// Length of the assembled PDU in bytes.
        length: usize,
        /// Number of fragments that made up the PDU.
        fragment_count: usize,
    },
}

impl Annotation {
    /// Frame the annotation belongs to.
    #[must_use]
    pub const fn frame(&self) -> u32 {
        match self {
            Self::ReassembledIn { frame, .. } | Self::Reassembled { frame, .. } => *frame,
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReassembledIn { reassembled_in, .. } => {
                write!(f, "[Reassembled in #{reassembled_in}]")
            }
            Self::Reassembled {
                name,
                length,
                fragment_count,
                ..
            } => write!(f, "[{fragment_count}-fragment PDU ({length} bytes): {name}]"),
        }
    }
}

/// Receiver for [`Annotation`]s.
pub trait AnnotationSink {
    /// Accept one annotation.
    fn annotate(&mut self, annotation: Annotation);
}

/// Sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl AnnotationSink for NoopSink {
    fn annotate(&mut self, _annotation: Annotation) {}
}

impl AnnotationSink for Vec<Annotation> {
    fn annotate(&mut self, annotation: Annotation) { self.push(annotation); }
}
