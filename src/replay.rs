//! Two-pass replay of recorded fragment submissions.
//!
//! A trace is a JSON-lines file; each line describes one fragment handed to
//! the engine by a dissector:
//!
//! ```text
//! {"conversation": 1, "direction": "inbound", "frame": 1, "data": "AB", "more": true}
//! {"conversation": 1, "direction": "inbound", "frame": 2, "hex": "4344"}
//! ```
//!
//! Exactly one of `conversation` or `circuit` names the owner, and exactly
//! one of `data` (UTF-8 text) or `hex` carries the payload. `offset`
//! defaults to 0 and `more` to `false`. Blank lines and lines starting with
//! `#` are ignored.
//!
//! [`replay`] runs the forward pass through
//! [`StreamSession::add_fragment`], then a second pass that only uses the
//! lookup path, mirroring how an analyzer re-dissects a capture.

use std::{
    io::{self, BufRead},
    str::FromStr,
};

use serde::Deserialize;
use thiserror::Error;

use crate::stream::{
    Annotation,
    CircuitId,
    ConversationId,
    Direction,
    ProcessOutcome,
    ReassembledPdu,
    ReassemblyContext,
    ReassemblyTable,
    SessionStats,
    StreamError,
    StreamKey,
    StreamSession,
};

/// Errors raised while reading a trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The trace could not be read.
    #[error("failed to read trace: {0}")]
    Io(#[from] io::Error),
    /// A line is not a valid trace record.
    #[error("line {line}: invalid record: {source}")]
    Json {
        /// One-based line number.
        line: usize,
        /// Parser failure.
        source: serde_json::Error,
    },
    /// A record names neither or both of `conversation` and `circuit`.
    #[error("line {line}: exactly one of `conversation` or `circuit` is required")]
    Owner {
        /// One-based line number.
        line: usize,
    },
    /// A record carries neither or both of `data` and `hex`.
    #[error("line {line}: exactly one of `data` or `hex` is required")]
    Payload {
        /// One-based line number.
        line: usize,
    },
    /// The `hex` payload is malformed.
    #[error("line {line}: invalid hex payload: {source}")]
    Hex {
        /// One-based line number.
        line: usize,
        /// Decoder failure.
        source: hex::FromHexError,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRecord {
    conversation: Option<u64>,
    circuit: Option<u64>,
    direction: Direction,
    frame: u32,
    #[serde(default)]
    offset: u32,
    data: Option<String>,
    hex: Option<String>,
    #[serde(default)]
    more: bool,
}

/// One fragment submission read from a trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceEntry {
    /// One-based line number in the source trace.
    pub line: usize,
    /// Stream the fragment belongs to.
    pub stream: StreamKey,
    /// Frame number carrying the fragment.
    pub frame: u32,
    /// Byte offset of the fragment within the frame.
    pub offset: u32,
    /// Fragment payload.
    pub payload: Vec<u8>,
    /// Whether more fragments of the same PDU follow.
    pub more: bool,
}

impl TraceEntry {
    fn from_raw(line: usize, raw: RawRecord) -> Result<Self, TraceError> {
        let stream = match (raw.conversation, raw.circuit) {
            (Some(id), None) => StreamKey::conversation(ConversationId::new(id), raw.direction),
            (None, Some(id)) => StreamKey::circuit(CircuitId::new(id), raw.direction),
            _ => return Err(TraceError::Owner { line }),
        };
        let payload = match (raw.data, raw.hex) {
            (Some(text), None) => text.into_bytes(),
            (None, Some(encoded)) => {
                hex::decode(encoded).map_err(|source| TraceError::Hex { line, source })?
            }
            _ => return Err(TraceError::Payload { line }),
        };
        Ok(Self {
            line,
            stream,
            frame: raw.frame,
            offset: raw.offset,
            payload,
            more: raw.more,
        })
    }
}

/// A parsed trace, in submission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    /// Parse a JSON-lines trace from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError`] for the first unreadable or invalid line.
    pub fn parse(reader: impl BufRead) -> Result<Self, TraceError> {
        let mut entries = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let raw: RawRecord = serde_json::from_str(trimmed).map_err(|source| {
                TraceError::Json {
                    line: line_no,
                    source,
                }
            })?;
            entries.push(TraceEntry::from_raw(line_no, raw)?);
        }
        Ok(Self { entries })
    }

    /// Entries in submission order.
    #[must_use]
    pub fn entries(&self) -> &[TraceEntry] { &self.entries }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Whether the trace holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl FromStr for Trace {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s.as_bytes()) }
}

/// A forward-pass submission the engine refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedEntry {
    /// Line of the refused entry.
    pub line: usize,
    /// Why it was refused.
    pub error: StreamError,
}

/// What the second pass produced for one accepted entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameReport {
    /// Line of the entry.
    pub line: usize,
    /// Frame the entry belongs to.
    pub frame: u32,
    /// Stream the entry belongs to.
    pub stream: StreamKey,
    /// Annotations emitted while processing the fragment.
    pub annotations: Vec<Annotation>,
    /// The PDU completed by this fragment, if any.
    pub reassembled: Option<ReassembledPdu>,
}

/// Outcome of [`replay`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Entries refused during the forward pass.
    pub rejected: Vec<RejectedEntry>,
    /// Second-pass results for accepted entries, in trace order.
    pub frames: Vec<FrameReport>,
    /// Session bookkeeping after both passes.
    pub stats: SessionStats,
}

impl ReplayReport {
    /// Every PDU delivered during the second pass.
    pub fn reassembled(&self) -> impl Iterator<Item = &ReassembledPdu> {
        self.frames
            .iter()
            .filter_map(|report| report.reassembled.as_ref())
    }
}

/// Replay `trace` through `session`, labelling PDUs with `name`.
///
/// Forward-pass refusals are recorded and skipped, as an analyzer would fail
/// only the offending packet.
pub fn replay<T: ReassemblyTable>(
    session: &mut StreamSession<T>,
    trace: &Trace,
    name: &str,
) -> ReplayReport {
    let mut report = ReplayReport::default();
    let mut accepted = Vec::with_capacity(trace.len());

    for entry in trace.entries() {
        let stream = session.stream(entry.stream);
        match session.add_fragment(
            stream,
            entry.frame,
            entry.offset,
            &entry.payload,
            entry.more,
        ) {
            Ok(_) => accepted.push(entry),
            Err(error) => report.rejected.push(RejectedEntry {
                line: entry.line,
                error,
            }),
        }
    }

    let session: &StreamSession<T> = session;
    for entry in accepted {
        let Some(fragment) = session
            .find_stream(entry.stream)
            .and_then(|stream| session.find_fragment(stream, entry.frame, entry.offset))
        else {
            continue;
        };
        let mut annotations: Vec<Annotation> = Vec::new();
        let reassembled = session
            .process_reassembled(
                ReassemblyContext::new(entry.frame, name),
                &fragment,
                &mut annotations,
            )
            .ok()
            .and_then(ProcessOutcome::into_reassembled);
        report.frames.push(FrameReport {
            line: entry.line,
            frame: entry.frame,
            stream: entry.stream,
            annotations,
            reassembled,
        });
    }

    report.stats = session.stats();
    report
}
