// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! PCAP file packet source for offline decoding.
//!
//! This module provides [`PcapSource`], a [`PacketSource`] implementation that
//! reads UDP packets from PCAP/PCAPNG files recorded from an HDL sensor.
//!
//! # Example
//!
//! ```no_run
//! use edgefirst_hdlreader::PcapSource;
//! use edgefirst_hdlreader::packet_source::PacketSource;
//!
//! // Load PCAP file, keeping only the sensor data port
//! let mut source = PcapSource::from_file("sensor_data.pcap", Some(2368))?;
//!
//! while let Some(packet) = source.next_packet()? {
//!     // Decode packet.data
//!     println!("{:.6} {}", packet.time_offset, packet.data.len());
//! }
//! # Ok::<(), edgefirst_hdlreader::Error>(())
//! ```

use crate::{
    lidar::Error,
    packet_source::{Packet, PacketSource, PositionToken},
};
use pcap_parser::traits::PcapReaderIterator;
use std::path::Path;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// PCAPNG interfaces without an `if_tsresol` option count microseconds.
const DEFAULT_TS_RESOLUTION: u64 = 1_000_000;

/// Convert a timestamp in `resolution` units per second to nanoseconds.
fn ticks_to_nanos(ticks: u64, resolution: u64) -> u64 {
    (ticks as u128 * NANOS_PER_SEC as u128 / resolution.max(1) as u128) as u64
}

/// Extracted UDP packet with metadata.
#[derive(Clone)]
struct ExtractedPacket {
    /// Capture time in nanoseconds, when the record carries one
    timestamp_ns: Option<u64>,
    /// UDP payload data
    payload: Vec<u8>,
}

/// PCAP file packet source.
///
/// Loads the entire PCAP file into memory and provides packets via the
/// [`PacketSource`] trait. Supports both legacy PCAP and PCAPNG formats.
/// Positions are packet indices, so seeking is exact and cheap.
pub struct PcapSource {
    /// Pre-extracted UDP payloads
    packets: Vec<ExtractedPacket>,
    /// Capture time of the first timestamped packet
    first_timestamp_ns: u64,
    /// Current packet index
    index: usize,
}

impl PcapSource {
    /// Load PCAP file from disk, optionally filtering by port.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to PCAP or PCAPNG file
    /// * `port` - Optional port filter (matches source OR destination)
    pub fn from_file<P: AsRef<Path>>(path: P, port: Option<u16>) -> Result<Self, Error> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::SourceRead {
            position: 0,
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_bytes(&data, port)
    }

    /// Load PCAP from bytes, optionally filtering by port.
    ///
    /// # Arguments
    ///
    /// * `data` - Raw PCAP/PCAPNG file contents
    /// * `port` - Optional port filter (matches source OR destination)
    pub fn from_bytes(data: &[u8], port: Option<u16>) -> Result<Self, Error> {
        let packets = Self::extract_packets(data, port)?;
        let first_timestamp_ns = packets
            .iter()
            .find_map(|p| p.timestamp_ns)
            .unwrap_or_default();

        log::debug!("loaded {} UDP packets from capture", packets.len());
        Ok(Self {
            packets,
            first_timestamp_ns,
            index: 0,
        })
    }

    /// Extract UDP packets from PCAP data.
    fn extract_packets(data: &[u8], port: Option<u16>) -> Result<Vec<ExtractedPacket>, Error> {
        let mut packets = Vec::new();

        if data.len() >= 4 && data[0..4] == [0x0a, 0x0d, 0x0d, 0x0a] {
            // PCAPNG format (Section Header Block magic)
            Self::extract_pcapng(data, port, &mut packets)?;
        } else {
            Self::extract_legacy_pcap(data, port, &mut packets)?;
        }

        Ok(packets)
    }

    /// Extract packets from legacy PCAP format.
    fn extract_legacy_pcap(
        data: &[u8],
        port: Option<u16>,
        packets: &mut Vec<ExtractedPacket>,
    ) -> Result<(), Error> {
        use pcap_parser::*;

        // Buffer size must be at least as large as the data to avoid Incomplete errors
        let mut reader = LegacyPcapReader::new(data.len().max(65536), data)
            .map_err(|e| Error::InvalidPacket(format!("Failed to create PCAP reader: {:?}", e)))?;

        // ts_usec holds nanoseconds under the 0xa1b23c4d magic
        let mut nanosecond = false;

        loop {
            match reader.next() {
                Ok((offset, block)) => {
                    match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            nanosecond = header.is_nanosecond_precision();
                        }
                        PcapBlockOwned::Legacy(packet) => {
                            let fraction_ns = if nanosecond {
                                packet.ts_usec as u64
                            } else {
                                packet.ts_usec as u64 * 1_000
                            };
                            let timestamp_ns = packet.ts_sec as u64 * NANOS_PER_SEC + fraction_ns;
                            if let Some(payload) = Self::extract_udp_payload(packet.data, port) {
                                packets.push(ExtractedPacket {
                                    timestamp_ns: Some(timestamp_ns),
                                    payload,
                                });
                            }
                        }
                        _ => {}
                    }
                    reader.consume(offset);
                }
                Err(PcapError::Eof) => break,
                Err(PcapError::Incomplete(_)) => {
                    log::warn!("capture truncated after {} packets", packets.len());
                    break;
                }
                Err(e) => {
                    return Err(Error::InvalidPacket(format!("PCAP parse error: {:?}", e)));
                }
            }
        }

        Ok(())
    }

    /// Extract packets from PCAPNG format.
    fn extract_pcapng(
        data: &[u8],
        port: Option<u16>,
        packets: &mut Vec<ExtractedPacket>,
    ) -> Result<(), Error> {
        use pcap_parser::*;

        let mut reader = PcapNGReader::new(data.len().max(65536), data).map_err(|e| {
            Error::InvalidPacket(format!("Failed to create PCAPNG reader: {:?}", e))
        })?;

        // Timestamp units per second of each interface in the current section
        let mut resolutions: Vec<u64> = Vec::new();

        loop {
            match reader.next() {
                Ok((offset, block)) => {
                    match block {
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                            resolutions.clear();
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                            let resolution = idb.ts_resolution().unwrap_or_else(|| {
                                log::warn!(
                                    "interface {} has unusable if_tsresol {}, assuming microseconds",
                                    resolutions.len(),
                                    idb.if_tsresol
                                );
                                DEFAULT_TS_RESOLUTION
                            });
                            resolutions.push(resolution);
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                            let resolution = resolutions
                                .get(epb.if_id as usize)
                                .copied()
                                .unwrap_or(DEFAULT_TS_RESOLUTION);
                            let ticks = ((epb.ts_high as u64) << 32) | epb.ts_low as u64;
                            if let Some(payload) = Self::extract_udp_payload(epb.data, port) {
                                packets.push(ExtractedPacket {
                                    timestamp_ns: Some(ticks_to_nanos(ticks, resolution)),
                                    payload,
                                });
                            }
                        }
                        PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                            if let Some(payload) = Self::extract_udp_payload(spb.data, port) {
                                packets.push(ExtractedPacket {
                                    timestamp_ns: None,
                                    payload,
                                });
                            }
                        }
                        _ => {
                            // Skip statistics, name resolution and other blocks
                        }
                    }
                    reader.consume(offset);
                }
                Err(PcapError::Eof) => break,
                Err(PcapError::Incomplete(_)) => {
                    log::warn!("capture truncated after {} packets", packets.len());
                    break;
                }
                Err(e) => {
                    return Err(Error::InvalidPacket(format!("PCAPNG parse error: {:?}", e)));
                }
            }
        }

        Ok(())
    }

    /// Extract UDP payload from raw Ethernet frame data.
    fn extract_udp_payload(data: &[u8], port: Option<u16>) -> Option<Vec<u8>> {
        use etherparse::SlicedPacket;

        let packet = SlicedPacket::from_ethernet(data).ok()?;

        let udp = match packet.transport {
            Some(etherparse::TransportSlice::Udp(udp)) => udp,
            _ => return None,
        };

        if let Some(filter_port) = port {
            if udp.source_port() != filter_port && udp.destination_port() != filter_port {
                return None;
            }
        }

        let payload = udp.payload();
        if payload.is_empty() {
            return None;
        }

        Some(payload.to_vec())
    }

    /// Reset source to beginning for replay.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Get the total number of packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Check if the source contains no packets.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Get the current packet index.
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Get remaining packet count.
    pub fn remaining(&self) -> usize {
        self.packets.len().saturating_sub(self.index)
    }
}

impl PacketSource for PcapSource {
    fn next_packet(&mut self) -> Result<Option<Packet<'_>>, Error> {
        let Some(packet) = self.packets.get(self.index) else {
            return Ok(None);
        };
        self.index += 1;

        let time_offset = packet
            .timestamp_ns
            .map(|ts| ts.saturating_sub(self.first_timestamp_ns) as f64 / 1e9)
            .unwrap_or_default();
        Ok(Some(Packet {
            time_offset,
            data: &packet.payload,
        }))
    }

    fn position(&self) -> PositionToken {
        PositionToken::new(self.index as u64)
    }

    fn seek(&mut self, position: PositionToken) -> Result<(), Error> {
        let index = position.get() as usize;
        if index > self.packets.len() {
            return Err(Error::SourceRead {
                position: position.get(),
                reason: format!("capture holds only {} packets", self.packets.len()),
            });
        }
        self.index = index;
        Ok(())
    }
}
