// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;

use args::Args;
use clap::Parser as _;
use edgefirst_hdlreader::{HdlReader, PcapSource, Point};
use std::io::{BufWriter, Write as _};
use tracing::{info, warn};
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer as _, Registry,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(args.rust_log);
    Registry::default().with(stderr_log).try_init()?;

    let source = PcapSource::from_file(&args.capture, args.port_filter())?;
    info!(
        "{}: {} data port packets",
        args.capture.display(),
        source.len()
    );

    let mut reader = HdlReader::with_config(source, args.indexer_config());
    if let Some(path) = &args.calibration {
        reader.load_calibration_file(path)?;
        info!("calibration loaded from {}", path.display());
    }

    let index = reader.build_index()?;
    let lost: u64 = index.packet_gaps().iter().map(|g| g.estimated_lost).sum();
    if lost > 0 {
        warn!(
            "{} gaps in the capture, about {} packets lost",
            index.packet_gaps().len(),
            lost
        );
    }
    info!("{} frames indexed", reader.number_of_frames());

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match args.frame {
        Some(n) => {
            let frame = reader.frame(n)?;
            writeln!(out, "{}", Point::CSV_HEADER)?;
            for point in frame {
                writeln!(out, "{}", point.to_csv_row())?;
            }
        }
        None => {
            writeln!(out, "frame,points,first_azimuth,last_azimuth")?;
            for n in 0..reader.number_of_frames() {
                let frame = reader.frame(n)?;
                let first = frame.points().first().map_or(0, |p| p.azimuth);
                let last = frame.points().last().map_or(0, |p| p.azimuth);
                writeln!(out, "{},{},{},{}", n, frame.len(), first, last)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}
