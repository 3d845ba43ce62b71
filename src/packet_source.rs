// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Packet source abstraction for the HDL decoder.
//!
//! This module provides a [`PacketSource`] trait that abstracts where raw
//! packets come from, enabling:
//!
//! - **Capture replay**: Reading from pcap files (with feature flag)
//! - **Testing**: Replaying in-memory packets
//!
//! Sources are read sequentially and support exact save/restore of the read
//! cursor through [`PositionToken`], which is what frame indexing relies on.
//!
//! # Example
//!
//! ```
//! use edgefirst_hdlreader::packet_source::{PacketSource, TestSource};
//!
//! let mut source = TestSource::new(vec![vec![1, 2, 3], vec![4, 5]]);
//! let start = source.position();
//!
//! while let Some(packet) = source.next_packet()? {
//!     // Process packet.data
//!     assert!(!packet.data.is_empty());
//! }
//!
//! source.seek(start)?;
//! assert_eq!(source.next_packet()?.unwrap().data, &[1, 2, 3]);
//! # Ok::<(), edgefirst_hdlreader::Error>(())
//! ```

use crate::lidar::Error;

/// Opaque saved read position of a [`PacketSource`].
///
/// Tokens are only meaningful to the source that produced them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionToken(u64);

impl PositionToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// One record read from a source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Packet<'a> {
    /// Seconds since the first packet of the capture
    pub time_offset: f64,
    /// Raw payload
    pub data: &'a [u8],
}

/// Trait for packet sources.
///
/// Implementations provide packets from various sources (pcap, test data).
pub trait PacketSource {
    /// Read the next packet.
    ///
    /// # Returns
    /// - `Ok(Some(packet))` - Next record
    /// - `Ok(None)` - End of stream
    /// - `Err` - Read failure, reported as [`Error::SourceRead`]
    fn next_packet(&mut self) -> Result<Option<Packet<'_>>, Error>;

    /// Current read position; passing it to [`PacketSource::seek`] makes
    /// the next read return the same packet again.
    fn position(&self) -> PositionToken;

    /// Restore a position previously returned by [`PacketSource::position`].
    fn seek(&mut self, position: PositionToken) -> Result<(), Error>;
}

/// In-memory packet source for testing.
///
/// Provides a sequence of pre-defined packets for exercising decoder logic
/// without capture files.
pub struct TestSource {
    packets: Vec<(f64, Vec<u8>)>,
    index: usize,
    fail_at: Option<usize>,
}

impl TestSource {
    /// Create a new test source with the given packets, all at time 0.
    pub fn new(packets: Vec<Vec<u8>>) -> Self {
        Self::with_time_offsets(packets.into_iter().map(|p| (0.0, p)).collect())
    }

    /// Create a test source from `(time_offset, payload)` records.
    pub fn with_time_offsets(packets: Vec<(f64, Vec<u8>)>) -> Self {
        Self {
            packets,
            index: 0,
            fail_at: None,
        }
    }

    /// Create an empty test source.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Make every read of packet `index` fail with [`Error::SourceRead`].
    pub fn fail_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Reset the source to the beginning.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Get the number of packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Get the current index.
    pub fn current_index(&self) -> usize {
        self.index
    }
}

impl PacketSource for TestSource {
    fn next_packet(&mut self) -> Result<Option<Packet<'_>>, Error> {
        if self.fail_at == Some(self.index) {
            return Err(Error::SourceRead {
                position: self.index as u64,
                reason: "injected read failure".to_string(),
            });
        }

        let Some((time_offset, data)) = self.packets.get(self.index) else {
            return Ok(None);
        };
        self.index += 1;
        Ok(Some(Packet {
            time_offset: *time_offset,
            data,
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
                reason: format!("seek past end of {} packets", self.packets.len()),
            });
        }
        self.index = index;
        Ok(())
    }
}
