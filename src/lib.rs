// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! EdgeFirst HDL LiDAR Reader Library
//!
//! This library decodes Velodyne HDL-32E/HDL-64E data packets into calibrated
//! point clouds, one [`Frame`] per sensor revolution, and supports random
//! access into recorded captures.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌───────────────┐     ┌─────────────────┐
//! │  PacketSource   │ ──► │ FrameSegmenter│ ──► │  Frame          │
//! │  (pcap/test)    │     │ (per session) │     │  (owned points) │
//! └─────────────────┘     └───────────────┘     └─────────────────┘
//!          │                      │
//!          │                      ▼
//!          │              ┌─────────────────────────────────────┐
//!          │              │ PointCorrector                      │
//!          │              │ (CalibrationTable + AngleTable)     │
//!          │              └─────────────────────────────────────┘
//!          ▼
//! ┌─────────────────┐
//! │  FrameIndex     │  seek position + block skip per frame
//! └─────────────────┘
//! ```
//!
//! The calibration is an explicit value passed by reference into every decode
//! call; the only process-wide state is the immutable [`AngleTable`].
//!
//! # Modules
//!
//! - [`angles`]: Sine/cosine lookup tables for raw rotational positions
//! - [`calibration`]: Per-laser correction profiles
//! - [`packet`]: Zero-copy view of the 1206-byte data packet
//! - [`corrector`]: Raw return to Cartesian point conversion
//! - [`segmenter`]: Splitting the point stream into frames
//! - [`index`]: Frame seek table and random access
//! - [`lidar`]: Common types and error handling
//! - [`packet_source`]: Packet source abstraction
//! - [`reader`]: [`HdlReader`] facade over all of the above
//!
//! # Example
//!
//! ```
//! use edgefirst_hdlreader::{packet::DataPacketBuilder, packet_source::TestSource, HdlReader};
//!
//! let packets = (0..4u16)
//!     .map(|i| {
//!         DataPacketBuilder::new()
//!             .rotations([(i % 3) * 12000; 12])
//!             .fill_returns(1000, 10)
//!             .build()
//!     })
//!     .collect();
//!
//! let mut reader = HdlReader::new(TestSource::new(packets));
//! reader.build_index()?;
//!
//! // 0, 12000, 24000 then 0 again: one wraparound
//! assert_eq!(reader.number_of_frames(), 2);
//! assert_eq!(reader.frame(1)?.len(), 12 * 32);
//! # Ok::<(), edgefirst_hdlreader::Error>(())
//! ```

pub mod angles;
pub mod calibration;
pub mod corrector;
pub mod index;
pub mod lidar;
pub mod packet;
pub mod packet_source;
#[cfg(feature = "pcap")]
pub mod pcap_source;
pub mod reader;
pub mod segmenter;

// Re-exports for convenience
pub use angles::AngleTable;
pub use calibration::{CalibrationRecord, CalibrationTable, LaserCorrection};
pub use corrector::PointCorrector;
pub use index::{FrameIndex, FrameIndexEntry, IndexerConfig, PacketGap};
pub use lidar::{Error, Frame, Point};
pub use packet::DataPacket;
pub use packet_source::{PacketSource, PositionToken};
#[cfg(feature = "pcap")]
pub use pcap_source::PcapSource;
pub use reader::HdlReader;
pub use segmenter::FrameSegmenter;
