// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! One-pass frame index for random access into a capture.
//!
//! Indexing replays the segmenter's boundary detection over the whole
//! source without correcting any points. For every frame it records where
//! the packet holding the frame's first firing block starts and how many
//! blocks of that packet belong to the previous frame. Reading frame `N`
//! later is a seek plus a short decode:
//!
//! ```text
//!  packet k-1           packet k (position P)
//! ┌──────────────┐     ┌─────────┬──────────────────┐
//! │ ...frame N-1 │ ──► │ frame N-1 │ frame N ...    │
//! └──────────────┘     └─────────┴──────────────────┘
//!                        skip = i ▲
//! ```
//!
//! While scanning, gaps between consecutive packet timestamps larger than
//! [`IndexerConfig::drop_threshold`] are reported as estimated packet loss.

use crate::{
    calibration::CalibrationTable,
    lidar::{Error, Frame},
    packet::DataPacket,
    packet_source::{PacketSource, PositionToken},
    segmenter::{FrameSegmenter, WrapDetector},
};

/// Packet-loss diagnostic parameters.
///
/// Both values depend on the sensor rotation rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexerConfig {
    /// Timestamp gap, in timestamp ticks, above which packets are
    /// considered lost
    pub drop_threshold: u32,
    /// Nominal timestamp ticks between consecutive packets
    pub packet_period: f64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            drop_threshold: 600,
            packet_period: 553.0,
        }
    }
}

/// Where a frame starts in the packet source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameIndexEntry {
    /// Position of the packet holding the frame's first firing block
    pub position: PositionToken,
    /// Firing blocks of that packet belonging to the previous frame
    pub skip: usize,
}

/// Estimated packet loss found while indexing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PacketGap {
    /// Position of the first packet after the gap
    pub position: PositionToken,
    /// Timestamp difference to the previous data packet
    pub timestamp_gap: u32,
    /// Estimated number of packets missing
    pub estimated_lost: u64,
}

/// Seek table with one entry per frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameIndex {
    entries: Vec<FrameIndexEntry>,
    gaps: Vec<PacketGap>,
}

impl FrameIndex {
    /// Scan `source` from its current position to the end.
    ///
    /// The first entry always points at the starting position with skip 0.
    /// On a read failure the pass is abandoned and the error returned.
    pub fn build<S: PacketSource + ?Sized>(
        source: &mut S,
        config: &IndexerConfig,
    ) -> Result<Self, Error> {
        let mut position = source.position();
        let mut entries = vec![FrameIndexEntry { position, skip: 0 }];
        let mut gaps = Vec::new();
        let mut detector = WrapDetector::new();
        let mut last_timestamp = 0u32;

        while let Some(packet) = source.next_packet()? {
            let packet = match DataPacket::from_slice(packet.data) {
                Ok(packet) => packet,
                Err(Error::NotADataPacket(_)) => {
                    position = source.position();
                    continue;
                }
                Err(e) => return Err(e),
            };

            let timestamp = packet.timestamp();
            if let Some(gap) = check_gap(config, position, last_timestamp, timestamp) {
                log::warn!(
                    "missed {} packets before position {}",
                    gap.estimated_lost,
                    position.get()
                );
                gaps.push(gap);
            }

            for (i, block) in packet.blocks().enumerate() {
                if detector.advance(block.rotational_position()) {
                    entries.push(FrameIndexEntry { position, skip: i });
                }
            }

            last_timestamp = timestamp;
            position = source.position();
        }

        log::debug!(
            "indexed {} frames, {} packet gaps",
            entries.len(),
            gaps.len()
        );
        Ok(Self { entries, gaps })
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// An index always holds at least the stream-start entry once built.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FrameIndexEntry] {
        &self.entries
    }

    /// Packet-loss diagnostics collected during the scan.
    pub fn packet_gaps(&self) -> &[PacketGap] {
        &self.gaps
    }

    pub fn get(&self, frame: usize) -> Result<&FrameIndexEntry, Error> {
        self.entries
            .get(frame)
            .ok_or(Error::FrameNumberOutOfRange {
                requested: frame,
                available: self.entries.len(),
            })
    }

    /// Decode exactly one frame by seeking to its index entry.
    ///
    /// Produces the same points a sequential decode would have put into
    /// that frame.
    pub fn read_frame<S: PacketSource + ?Sized>(
        &self,
        source: &mut S,
        calibration: &CalibrationTable,
        frame: usize,
    ) -> Result<Frame, Error> {
        let entry = self.get(frame)?;
        source.seek(entry.position)?;

        let mut segmenter = FrameSegmenter::new();
        segmenter.set_pending_skip(entry.skip);

        while let Some(packet) = source.next_packet()? {
            let mut closed = segmenter.process_packet(calibration, packet.data)?;
            if !closed.is_empty() {
                return Ok(closed.swap_remove(0));
            }
        }

        Ok(segmenter.flush())
    }
}

fn check_gap(
    config: &IndexerConfig,
    position: PositionToken,
    last_timestamp: u32,
    timestamp: u32,
) -> Option<PacketGap> {
    let timestamp_gap = timestamp.wrapping_sub(last_timestamp);
    if last_timestamp == 0 || timestamp_gap <= config.drop_threshold {
        return None;
    }

    Some(PacketGap {
        position,
        timestamp_gap,
        estimated_lost: (timestamp_gap as f64 / config.packet_period + 0.5).floor() as u64,
    })
}
