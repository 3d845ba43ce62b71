// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use edgefirst_hdlreader::IndexerConfig;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// PCAP or PCAPNG capture recorded from an HDL-32E/HDL-64E sensor.
    #[arg(env)]
    pub capture: PathBuf,

    /// UDP port carrying the sensor data packets, 0 accepts every port.
    #[arg(long, env, default_value = "2368")]
    pub port: u16,

    /// JSON calibration profile applied over the built-in HDL-32E profile.
    #[arg(long, env)]
    pub calibration: Option<PathBuf>,

    /// Dump this frame as CSV to stdout instead of the frame summary.
    #[arg(long, env)]
    pub frame: Option<usize>,

    /// Timestamp gap, in microseconds, above which packets are reported lost.
    #[arg(long, env, default_value = "600")]
    pub drop_threshold: u32,

    /// Nominal microseconds between two data packets.
    #[arg(long, env, default_value = "553.0")]
    pub packet_period: f64,

    /// Application log level
    #[arg(long, env, default_value = "info")]
    pub rust_log: LevelFilter,
}

impl Args {
    pub fn port_filter(&self) -> Option<u16> {
        (self.port != 0).then_some(self.port)
    }

    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            drop_threshold: self.drop_threshold,
            packet_period: self.packet_period,
        }
    }
}
