#![doc(html_root_url = "https://docs.rs/pdu_stream/latest")]
//! Public API for the `pdu_stream` library.
//!
//! This crate tracks PDUs that span several captured frames in one direction
//! of a conversation or circuit, for protocol analyzers decoding byte-stream
//! protocols without their own message framing. See [`stream`] for the
//! engine and [`replay`] for the trace-driven two-pass driver used by the
//! `pdu-stream` binary.

pub mod config;
pub mod metrics;
pub mod replay;
pub mod stream;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::SessionConfig;
pub use stream::{
    Annotation,
    AnnotationSink,
    ContractViolation,
    Direction,
    FragmentRecord,
    LookupError,
    ProcessOutcome,
    ReassemblyContext,
    ReassemblyTable,
    StreamError,
    StreamKey,
    StreamSession,
};
