//! Identity types for streams and fragment positions.
//!
//! A stream is one direction of a conversation or circuit. The host engine
//! hands these identities to us as opaque integers; nothing here interprets
//! them beyond equality and hashing.

use std::fmt;

use derive_more::{Display, From, Into};
use serde::Deserialize;

/// Opaque identifier of a conversation (a correlated endpoint pair).
///
/// # Examples
///
/// ```
/// use pdu_stream::stream::ConversationId;
/// let id = ConversationId::new(7);
/// assert_eq!(id.get(), 7);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct ConversationId(u64);

impl ConversationId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

/// Opaque identifier of a virtual circuit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct CircuitId(u64);

impl CircuitId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

/// The host-side object a stream is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamOwner {
    /// Streams keyed by an address-pair conversation.
    Conversation(ConversationId),
    /// Streams keyed by a virtual circuit.
    Circuit(CircuitId),
}

impl fmt::Display for StreamOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conversation(id) => write!(f, "conversation {id}"),
            Self::Circuit(id) => write!(f, "circuit {id}"),
        }
    }
}

/// Direction of traffic within a conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Traffic received by the capturing endpoint.
    Inbound,
    /// Traffic sent by the capturing endpoint.
    Outbound,
}

impl Direction {
    /// Return the other direction of the same conversation.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Inbound => Self::Outbound,
            Self::Outbound => Self::Inbound,
        }
    }

    /// Lower-case label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Identity of a single stream: one direction of one owner.
///
/// # Examples
///
/// ```
/// use pdu_stream::stream::{ConversationId, Direction, StreamKey};
///
/// let key = StreamKey::conversation(ConversationId::new(1), Direction::Inbound);
/// assert_eq!(key.direction(), Direction::Inbound);
/// assert_ne!(key, key.reversed());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamKey {
    owner: StreamOwner,
    direction: Direction,
}

impl StreamKey {
    /// Build a key from its parts.
    #[must_use]
    pub const fn new(owner: StreamOwner, direction: Direction) -> Self { Self { owner, direction } }

    /// Key for one direction of a conversation.
    #[must_use]
    pub const fn conversation(id: ConversationId, direction: Direction) -> Self {
        Self::new(StreamOwner::Conversation(id), direction)
    }

    /// Key for one direction of a circuit.
    #[must_use]
    pub const fn circuit(id: CircuitId, direction: Direction) -> Self {
        Self::new(StreamOwner::Circuit(id), direction)
    }

    /// Owner of the stream.
    #[must_use]
    pub const fn owner(&self) -> StreamOwner { self.owner }

    /// Direction of the stream.
    #[must_use]
    pub const fn direction(&self) -> Direction { self.direction }

    /// The key of the opposite direction on the same owner.
    #[must_use]
    pub const fn reversed(&self) -> Self { Self::new(self.owner, self.direction.opposite()) }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.owner, self.direction)
    }
}

/// Location of a fragment within the capture: frame number, then byte offset.
///
/// Positions order lexicographically, which is the order in which a forward
/// pass presents fragments.
///
/// # Examples
///
/// ```
/// use pdu_stream::stream::FragmentPosition;
///
/// assert!(FragmentPosition::new(1, 40) < FragmentPosition::new(2, 0));
/// assert!(FragmentPosition::new(2, 0) < FragmentPosition::new(2, 8));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentPosition {
    frame: u32,
    offset: u32,
}

impl FragmentPosition {
    /// Create a position.
    #[must_use]
    pub const fn new(frame: u32, offset: u32) -> Self { Self { frame, offset } }

    /// Frame number carrying the fragment.
    #[must_use]
    pub const fn frame(&self) -> u32 { self.frame }

    /// Byte offset of the fragment within its frame.
    #[must_use]
    pub const fn offset(&self) -> u32 { self.offset }
}

impl fmt::Display for FragmentPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {} offset {}", self.frame, self.offset)
    }
}
