//! Registry of streams keyed by owner and direction.
//!
//! Streams are created lazily on first use and are never removed one by one;
//! the whole registry is dropped at session teardown.

use std::collections::{HashMap, hash_map::Entry};

use super::{Stream, StreamKey};

/// Non-owning handle to a stream held by a [`StreamRegistry`].
///
/// Handles are cheap to copy and stay meaningful for the lifetime of the
/// session that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamHandle(StreamKey);

impl StreamHandle {
    /// Identity of the stream behind this handle.
    #[must_use]
    pub const fn key(self) -> StreamKey { self.0 }
}

/// Map from [`StreamKey`] to [`Stream`].
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: HashMap<StreamKey, Stream>,
}

impl StreamRegistry {
    /// Return the stream for `key`, creating an idle one if needed.
    ///
    /// The second element reports whether the stream was created.
    pub fn get_or_create(&mut self, key: StreamKey) -> (StreamHandle, bool) {
        let (_, created) = self.get_or_insert_mut(key);
        (StreamHandle(key), created)
    }

    pub(crate) fn get_or_insert_mut(&mut self, key: StreamKey) -> (&mut Stream, bool) {
        match self.streams.entry(key) {
            Entry::Occupied(occupied) => (occupied.into_mut(), false),
            Entry::Vacant(vacant) => (vacant.insert(Stream::new(key)), true),
        }
    }

    /// Return the stream for `key` without creating it.
    #[must_use]
    pub fn find(&self, key: StreamKey) -> Option<StreamHandle> {
        self.streams.contains_key(&key).then_some(StreamHandle(key))
    }

    /// Borrow the stream behind `handle`.
    #[must_use]
    pub fn get(&self, handle: StreamHandle) -> Option<&Stream> { self.streams.get(&handle.0) }

    /// Keys of every registered stream, in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<StreamKey> {
        let mut keys: Vec<StreamKey> = self.streams.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Number of registered streams.
    #[must_use]
    pub fn len(&self) -> usize { self.streams.len() }

    /// Whether no stream has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.streams.is_empty() }

    pub(crate) fn clear(&mut self) { self.streams.clear(); }
}
