//! Session configuration.
//!
//! Bounds the resources a capture-analysis session may spend on PDUs that are
//! still being assembled.

use std::num::NonZeroUsize;

/// Default cap on an assembled PDU: 16 MiB.
const DEFAULT_MAX_PDU_SIZE: NonZeroUsize = match NonZeroUsize::new(16 * 1024 * 1024) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

/// Settings for a [`StreamSession`](crate::stream::StreamSession).
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use pdu_stream::config::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_max_pdu_size(NonZeroUsize::new(4096).expect("non-zero"));
/// assert_eq!(config.max_pdu_size.get(), 4096);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Hard cap on the size of a single assembled PDU. Fragments that would
    /// push a PDU past this size abandon it.
    pub max_pdu_size: NonZeroUsize,
}

impl SessionConfig {
    /// The library default.
    pub const DEFAULT: SessionConfig = SessionConfig {
        max_pdu_size: DEFAULT_MAX_PDU_SIZE,
    };

    /// Replace the PDU size cap.
    #[must_use]
    pub const fn with_max_pdu_size(mut self, max_pdu_size: NonZeroUsize) -> Self {
        self.max_pdu_size = max_pdu_size;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self { SessionConfig::DEFAULT }
}
