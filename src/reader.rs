// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Host-facing reader tying a packet source to calibration and frame index.
//!
//! ```text
//! ┌──────────────┐   build_index()   ┌────────────┐
//! │ PacketSource │ ────────────────► │ FrameIndex │
//! └──────────────┘                   └────────────┘
//!        ▲                                  │
//!        │ seek + decode     frame(n)       │
//!        └──────────────────────────────────┘
//! ```

use crate::{
    calibration::CalibrationTable,
    index::{FrameIndex, IndexerConfig},
    lidar::{Error, Frame},
    packet_source::{PacketSource, PositionToken},
    segmenter::FrameSegmenter,
};
use std::{io::Read, path::Path};

/// Reader over one HDL capture.
///
/// Owns the calibration used for every decode so a reload can never
/// interleave with a decode in progress.
pub struct HdlReader<S: PacketSource> {
    source: S,
    start: PositionToken,
    calibration: CalibrationTable,
    config: IndexerConfig,
    index: Option<FrameIndex>,
    cached: Option<(usize, Frame)>,
}

impl<S: PacketSource> HdlReader<S> {
    /// Wrap `source`, using the built-in calibration profile.
    ///
    /// The source's current position is treated as the start of the
    /// capture.
    pub fn new(source: S) -> Self {
        Self::with_config(source, IndexerConfig::default())
    }

    pub fn with_config(source: S, config: IndexerConfig) -> Self {
        let start = source.position();
        Self {
            source,
            start,
            calibration: CalibrationTable::new(),
            config,
            index: None,
            cached: None,
        }
    }

    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Replace the calibration wholesale.
    pub fn set_calibration(&mut self, calibration: CalibrationTable) {
        self.calibration = calibration;
        self.cached = None;
    }

    pub fn load_default_calibration(&mut self) {
        self.set_calibration(CalibrationTable::new());
    }

    /// Apply a JSON calibration profile on top of the current calibration.
    ///
    /// On error the current calibration is kept unchanged.
    pub fn load_calibration_json<R: Read>(&mut self, reader: R) -> Result<(), Error> {
        let mut table = self.calibration.clone();
        table.load_profile_json(reader)?;
        self.set_calibration(table);
        Ok(())
    }

    /// Apply a JSON calibration profile file on top of the current
    /// calibration.
    pub fn load_calibration_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let mut table = self.calibration.clone();
        table.load_profile_file(path)?;
        self.set_calibration(table);
        Ok(())
    }

    /// Scan the whole capture and build the frame index.
    pub fn build_index(&mut self) -> Result<&FrameIndex, Error> {
        self.source.seek(self.start)?;
        let index = FrameIndex::build(&mut self.source, &self.config)?;
        self.cached = None;
        Ok(self.index.insert(index))
    }

    pub fn index(&self) -> Option<&FrameIndex> {
        self.index.as_ref()
    }

    /// Number of frames, or 0 before indexing.
    pub fn number_of_frames(&self) -> usize {
        self.index.as_ref().map_or(0, FrameIndex::len)
    }

    /// Decode frame `n` by random access.
    ///
    /// The most recently decoded frame is cached until the calibration or
    /// the index changes.
    pub fn frame(&mut self, n: usize) -> Result<&Frame, Error> {
        let index = self.index.as_ref().ok_or(Error::FrameIndexUnavailable)?;

        let hit = matches!(&self.cached, Some((cached, _)) if *cached == n);
        if !hit {
            let frame = index.read_frame(&mut self.source, &self.calibration, n)?;
            self.cached = Some((n, frame));
        }

        match &self.cached {
            Some((_, frame)) => Ok(frame),
            None => Err(Error::FrameIndexUnavailable),
        }
    }

    /// Decode the whole capture sequentially, including the trailing
    /// partial frame.
    pub fn read_all_frames(&mut self) -> Result<Vec<Frame>, Error> {
        self.source.seek(self.start)?;

        let mut segmenter = FrameSegmenter::new();
        let mut frames = Vec::new();
        while let Some(packet) = self.source.next_packet()? {
            frames.extend(segmenter.process_packet(&self.calibration, packet.data)?);
        }
        frames.push(segmenter.flush());

        log::debug!("decoded {} frames", frames.len());
        Ok(frames)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        packet::{DataPacketBuilder, FIRINGS_PER_PACKET},
        packet_source::TestSource,
    };

    fn packet(timestamp: u32, start: u16) -> Vec<u8> {
        let mut rotations = [0u16; FIRINGS_PER_PACKET];
        for (i, r) in rotations.iter_mut().enumerate() {
            *r = (start + 200 * i as u16) % 36000;
        }
        DataPacketBuilder::new()
            .timestamp(timestamp)
            .rotations(rotations)
            .fill_returns(2000, 10)
            .build()
    }

    fn source() -> TestSource {
        // wraps at block 6 of packet 2 and block 3 of packet 6
        TestSource::new(vec![
            packet(553, 30000),
            packet(1106, 32400),
            packet(1659, 34800),
            packet(2212, 1200),
            packet(2765, 3600),
            packet(3318, 33000),
            packet(3871, 35400),
        ])
    }

    #[test]
    fn test_frame_requires_index() {
        let mut reader = HdlReader::new(source());
        assert_eq!(reader.number_of_frames(), 0);
        assert!(matches!(reader.frame(0), Err(Error::FrameIndexUnavailable)));
    }

    #[test]
    fn test_random_access_matches_sequential() {
        let mut reader = HdlReader::new(source());
        let sequential = reader.read_all_frames().unwrap();

        let frames = reader.build_index().unwrap().len();
        assert_eq!(frames, sequential.len());
        assert_eq!(reader.number_of_frames(), 3);

        for (n, expected) in sequential.iter().enumerate() {
            assert_eq!(reader.frame(n).unwrap(), expected);
        }
        assert!(matches!(
            reader.frame(3),
            Err(Error::FrameNumberOutOfRange {
                requested: 3,
                available: 3
            })
        ));
    }

    #[test]
    fn test_calibration_change_drops_cache() {
        let mut reader = HdlReader::new(source());
        reader.build_index().unwrap();
        let before = reader.frame(1).unwrap().clone();

        reader
            .load_calibration_json(r#"[{"id": 0, "distCorrection": 50.0}]"#.as_bytes())
            .unwrap();
        let after = reader.frame(1).unwrap();
        assert_eq!(before.len(), after.len());
        assert_ne!(&before, after);

        reader.load_default_calibration();
        assert_eq!(reader.frame(1).unwrap(), &before);
    }

    #[test]
    fn test_calibration_file_drops_cache() {
        let path = std::env::temp_dir().join(format!(
            "hdlreader-reader-profile-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"[{"id": 3, "distCorrection": 25.0}]"#).unwrap();

        let mut reader = HdlReader::new(source());
        reader.build_index().unwrap();
        let before = reader.frame(1).unwrap().clone();

        let result = reader.load_calibration_file(&path);
        std::fs::remove_file(&path).unwrap();
        result.unwrap();

        assert_eq!(reader.calibration().get(3).unwrap().distance_correction(), 0.25);
        assert_eq!(
            reader.calibration().get(2).unwrap(),
            CalibrationTable::new().get(2).unwrap()
        );

        let after = reader.frame(1).unwrap();
        assert_eq!(before.len(), after.len());
        assert_ne!(&before, after);
        for (old, new) in before.iter().zip(after.iter()) {
            assert_eq!(old.laser_id == 3, old != new);
        }
    }

    #[test]
    fn test_failed_calibration_keeps_table() {
        let mut reader = HdlReader::new(source());
        let before = reader.calibration().clone();
        assert!(matches!(
            reader.load_calibration_json(r#"[{"id": 64}]"#.as_bytes()),
            Err(Error::CalibrationParse(_))
        ));
        assert!(matches!(
            reader.load_calibration_json("not json".as_bytes()),
            Err(Error::CalibrationParse(_))
        ));
        assert_eq!(reader.calibration(), &before);
    }

    #[test]
    fn test_reader_starts_at_source_position() {
        let mut inner = source();
        inner.seek(PositionToken::new(3)).unwrap();
        let mut reader = HdlReader::new(inner);

        let frames = reader.read_all_frames().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(reader.build_index().unwrap().entries()[0].position.get(), 3);
        assert_eq!(reader.into_inner().current_index(), 7);
    }
}
