//! Replays a fragment trace through the stream reassembly engine.
//!
//! The forward pass submits every fragment; the second pass looks each one up
//! again and prints the annotations and PDUs an analyzer would display.

mod cli;

use std::{error::Error, fs::File, io::BufReader};

use clap::Parser;
use pdu_stream::{
    config::SessionConfig,
    replay::{ReplayReport, Trace, replay},
    stream::StreamSession,
};

fn main() -> Result<(), Box<dyn Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let mut config = SessionConfig::default();
    if let Some(size) = cli.max_pdu_size {
        config = config.with_max_pdu_size(size);
    }

    let trace = Trace::parse(BufReader::new(File::open(&cli.trace)?))?;
    let mut session = StreamSession::new(config);
    let report = replay(&mut session, &trace, &cli.name);
    print_report(&report);
    Ok(())
}

fn print_report(report: &ReplayReport) {
    for rejected in &report.rejected {
        println!("line {}: rejected: {}", rejected.line, rejected.error);
    }
    for frame in &report.frames {
        for annotation in &frame.annotations {
            println!("frame {} [{}]: {annotation}", frame.frame, frame.stream);
        }
        if let Some(pdu) = &frame.reassembled {
            println!(
                "  pdu {} #{}: {}",
                pdu.pdu(),
                pdu.sequence_number(),
                hex::encode(pdu.data())
            );
        }
    }
    let stats = report.stats;
    println!(
        "streams={} pdus={} completed={} fragments={} buffered_bytes={}",
        stats.streams, stats.pdus, stats.completed_pdus, stats.fragments, stats.buffered_bytes
    );
}
