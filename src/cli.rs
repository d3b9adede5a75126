//! Command line interface for the `pdu-stream` trace replayer.
//!
//! Also consumed by `build.rs` to render the manual page.

use std::{num::NonZeroUsize, path::PathBuf};

use clap::Parser;

/// Command line arguments for the `pdu-stream` binary.
#[derive(Debug, Parser)]
#[command(
    name = "pdu-stream",
    version,
    about = "Replay a fragment trace through the stream reassembly engine"
)]
pub struct Cli {
    /// JSON-lines trace of fragment submissions.
    pub trace: PathBuf,

    /// Largest PDU, in bytes, the reassembly table will assemble.
    #[arg(long, value_name = "BYTES")]
    pub max_pdu_size: Option<NonZeroUsize>,

    /// Label attached to reassembled PDUs in annotations.
    #[arg(short, long, default_value = "PDU")]
    pub name: String,
}
