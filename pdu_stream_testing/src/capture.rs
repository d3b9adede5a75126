//! Scripted captures fed through a stream session.

use pdu_stream::stream::{
    Direction,
    FragmentRecord,
    NoopSink,
    ReassembledPdu,
    ReassemblyContext,
    ReassemblyTable,
    StreamError,
    StreamKey,
    StreamSession,
};

use crate::conversation_key;

/// One fragment submission within a [`Capture`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedFragment {
    /// Stream the fragment is submitted to.
    pub stream: StreamKey,
    /// Frame carrying the fragment.
    pub frame: u32,
    /// Byte offset within the frame.
    pub offset: u32,
    /// Payload bytes.
    pub bytes: Vec<u8>,
    /// Whether more fragments of the PDU follow.
    pub more: bool,
}

/// Ordered list of fragment submissions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capture {
    fragments: Vec<CapturedFragment>,
}

impl Capture {
    /// Start an empty capture.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append a fragment at offset zero of `frame` on conversation `id`.
    #[must_use]
    pub fn fragment(
        self,
        id: u64,
        direction: Direction,
        frame: u32,
        bytes: &[u8],
        more: bool,
    ) -> Self {
        self.fragment_at(conversation_key(id, direction), frame, 0, bytes, more)
    }

    /// Append a fragment at an explicit position.
    #[must_use]
    pub fn fragment_at(
        mut self,
        stream: StreamKey,
        frame: u32,
        offset: u32,
        bytes: &[u8],
        more: bool,
    ) -> Self {
        self.fragments.push(CapturedFragment {
            stream,
            frame,
            offset,
            bytes: bytes.to_vec(),
            more,
        });
        self
    }

    /// Fragments in capture order.
    #[must_use]
    pub fn fragments(&self) -> &[CapturedFragment] { &self.fragments }

    /// Run the forward pass, stopping at the first refusal.
    ///
    /// # Errors
    ///
    /// Returns the first [`StreamError`] reported by the session.
    pub fn feed<T: ReassemblyTable>(
        &self,
        session: &mut StreamSession<T>,
    ) -> Result<Vec<FragmentRecord>, StreamError> {
        self.fragments
            .iter()
            .map(|fragment| {
                let handle = session.stream(fragment.stream);
                session.add_fragment(
                    handle,
                    fragment.frame,
                    fragment.offset,
                    &fragment.bytes,
                    fragment.more,
                )
            })
            .collect()
    }
}

/// Walk `capture` through the lookup path and collect every delivered PDU.
///
/// Fragments the forward pass did not record are skipped.
#[must_use]
pub fn redissect<T: ReassemblyTable>(
    session: &StreamSession<T>,
    capture: &Capture,
    name: &str,
) -> Vec<ReassembledPdu> {
    capture
        .fragments()
        .iter()
        .filter_map(|fragment| {
            let handle = session.find_stream(fragment.stream)?;
            let record = session.find_fragment(handle, fragment.frame, fragment.offset)?;
            session
                .process_reassembled(
                    ReassemblyContext::new(fragment.frame, name),
                    &record,
                    &mut NoopSink,
                )
                .ok()?
                .into_reassembled()
        })
        .collect()
}
