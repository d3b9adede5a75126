//! Assertion macros shared by test helpers and integration tests.

/// Submit a fragment and panic with contextual diagnostics on refusal.
#[macro_export]
macro_rules! feed_expect {
    ($session:expr, $handle:expr, $frame:expr, $bytes:expr, $more:expr) => {{
        $session
            .add_fragment($handle, $frame, 0, $bytes, $more)
            .expect(concat!("fragment refused at ", file!(), ":", line!()))
    }};
    ($session:expr, $handle:expr, $frame:expr, $offset:expr, $bytes:expr, $more:expr) => {{
        $session
            .add_fragment($handle, $frame, $offset, $bytes, $more)
            .expect(concat!("fragment refused at ", file!(), ":", line!()))
    }};
}

pub use crate::feed_expect;
