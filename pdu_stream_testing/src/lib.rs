//! Utilities for driving a [`StreamSession`](pdu_stream::stream::StreamSession)
//! through scripted captures during tests.
//!
//! A [`Capture`] lists fragment submissions in capture order. Feeding it runs
//! the forward pass; [`redissect`] then walks the same capture through the
//! lookup path the way an analyzer's later passes would.
//!
//! ```rust
//! use pdu_stream::stream::{Direction, StreamSession};
//! use pdu_stream_testing::{Capture, redissect};
//!
//! let capture = Capture::new()
//!     .fragment(1, Direction::Inbound, 1, b"AB", true)
//!     .fragment(1, Direction::Inbound, 2, b"CD", false);
//! let mut session = StreamSession::default();
//! capture.feed(&mut session).expect("forward pass");
//! let pdus = redissect(&session, &capture, "demo");
//! assert_eq!(&pdus[0].data()[..], b"ABCD");
//! ```

pub mod capture;
pub mod logging;
pub mod macros;

pub use capture::{Capture, CapturedFragment, redissect};
pub use logging::{LoggerHandle, logger};
pub use pdu_stream::test_helpers::{RecordingTable, TableCall, TerminatorTable, conversation_key};
