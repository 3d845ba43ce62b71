// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Splits the decoded point stream into one [`Frame`] per revolution.
//!
//! A frame boundary is any firing block whose rotational position is
//! strictly less than the previous block's. The comparison is plain, so a
//! reading of exactly 0 after a nonzero position also starts a new frame.
//! The position tracker starts at 0, which means the first block of a
//! session (or of a random-access read) never splits.
//!
//! Both the segmenter and the [`crate::index`] pre-scan drive the same
//! [`WrapDetector`], so frame boundaries found while indexing always match
//! the ones found while decoding.

use crate::{
    calibration::CalibrationTable,
    corrector::PointCorrector,
    lidar::{Error, Frame, Point},
    packet::{DataPacket, FIRINGS_PER_PACKET},
};

/// Tracks the last rotational position to detect revolution wraparound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WrapDetector {
    last_azimuth: u16,
}

impl WrapDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the next rotational position, returning `true` when it closes
    /// the current revolution.
    #[inline]
    pub fn advance(&mut self, azimuth: u16) -> bool {
        let wrapped = azimuth < self.last_azimuth;
        self.last_azimuth = azimuth;
        wrapped
    }

    pub fn last_azimuth(&self) -> u16 {
        self.last_azimuth
    }

    pub fn reset(&mut self) {
        self.last_azimuth = 0;
    }
}

/// Stateful accumulator turning packets into frames.
///
/// One segmenter belongs to one decode session; the calibration is passed
/// into every call and must not change mid-session.
#[derive(Debug, Default)]
pub struct FrameSegmenter {
    detector: WrapDetector,
    pending_skip: usize,
    points: Vec<Point>,
    frames_closed: u64,
}

impl FrameSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the first `skip` firing blocks of the next data packet.
    pub fn set_pending_skip(&mut self, skip: usize) {
        self.pending_skip = skip.min(FIRINGS_PER_PACKET);
    }

    pub fn pending_skip(&self) -> usize {
        self.pending_skip
    }

    /// Rotational position of the last processed firing block.
    pub fn last_azimuth(&self) -> u16 {
        self.detector.last_azimuth()
    }

    /// Points accumulated in the currently open frame.
    pub fn open_points(&self) -> usize {
        self.points.len()
    }

    /// Number of frames closed so far in this session.
    pub fn frames_closed(&self) -> u64 {
        self.frames_closed
    }

    /// Drop all state and start a fresh session.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.pending_skip = 0;
        self.points.clear();
        self.frames_closed = 0;
    }

    /// Decode one packet into the open frame.
    ///
    /// Buffers that are not data packets are ignored. Returns every frame
    /// closed by a wraparound inside this packet, in order; usually none or
    /// one.
    pub fn process_packet(
        &mut self,
        calibration: &CalibrationTable,
        data: &[u8],
    ) -> Result<Vec<Frame>, Error> {
        let packet = match DataPacket::from_slice(data) {
            Ok(packet) => packet,
            Err(Error::NotADataPacket(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let corrector = PointCorrector::new(calibration);
        let timestamp = packet.timestamp();
        let skip = std::mem::take(&mut self.pending_skip);
        let mut closed = Vec::new();

        for block in packet.blocks().skip(skip) {
            let azimuth = block.rotational_position();
            if self.detector.advance(azimuth) {
                closed.push(self.split());
            }

            let offset = block.block_id().laser_offset();
            for (position, laser_return) in block.returns().enumerate() {
                let laser_id = position as u8 + offset;
                if let Some(point) = corrector.correct(laser_id, azimuth, laser_return, timestamp)? {
                    self.points.push(point);
                }
            }
        }

        Ok(closed)
    }

    /// Close the open frame, even if partial or empty. Used at end of stream.
    pub fn flush(&mut self) -> Frame {
        self.split()
    }

    fn split(&mut self) -> Frame {
        let capacity = self.points.len();
        let points = std::mem::replace(&mut self.points, Vec::with_capacity(capacity));
        self.frames_closed += 1;
        log::trace!(
            "frame {} closed with {} points",
            self.frames_closed,
            points.len()
        );
        Frame::from_points(points)
    }
}
