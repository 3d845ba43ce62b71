// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! HDL data packet decoding.
//!
//! # Packet Structure
//!
//! Data packets are exactly 1206 bytes, all fields little-endian:
//!
//! ```text
//! ┌──────────────────────────────┬───────────────┬──────────┐
//! │ 12 × firing block (100 B)    │ timestamp u32 │ 2 × u8   │
//! │ 1200 B                       │ 4 B           │ reserved │
//! └──────────────────────────────┴───────────────┴──────────┘
//!
//! firing block:
//! ┌──────────────┬───────────────────┬─────────────────────────────────┐
//! │ block id u16 │ rotation u16      │ 32 × (distance u16, intensity u8)│
//! │ 0xeeff/ddff  │ 0..35999 (0.01°)  │ 96 B                            │
//! └──────────────┴───────────────────┴─────────────────────────────────┘
//! ```
//!
//! Any other buffer length is not a data packet and is reported as
//! [`Error::NotADataPacket`], which decoders skip without surfacing.

use crate::{calibration::LASERS_PER_FIRING, lidar::Error};

/// Data packet size in bytes
pub const PACKET_SIZE: usize = 1206;

/// Number of firing blocks per packet
pub const FIRINGS_PER_PACKET: usize = 12;

/// Size of one firing block in bytes
pub const BLOCK_SIZE: usize = 4 + LASERS_PER_FIRING * RETURN_SIZE;

/// Size of one laser return in bytes
const RETURN_SIZE: usize = 3;

/// Offset of the capture timestamp
const TIMESTAMP_OFFSET: usize = FIRINGS_PER_PACKET * BLOCK_SIZE;

/// Which bank of lasers a firing block reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockId {
    /// Lasers 0..31
    Lower = 0xeeff,
    /// Lasers 32..63
    Upper = 0xddff,
}

impl BlockId {
    /// Offset added to the in-block laser position.
    #[inline]
    pub fn laser_offset(self) -> u8 {
        match self {
            BlockId::Lower => 0,
            BlockId::Upper => LASERS_PER_FIRING as u8,
        }
    }
}

impl From<u16> for BlockId {
    /// Only the lower-bank sentinel is checked; anything else selects the
    /// upper bank.
    fn from(value: u16) -> Self {
        if value == BlockId::Lower as u16 {
            BlockId::Lower
        } else {
            BlockId::Upper
        }
    }
}

/// One laser's raw reading within a firing block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LaserReturn {
    /// Distance in 2 mm units, 0 when there was no echo
    pub distance: u16,
    pub intensity: u8,
}

/// Borrowed view of a validated 1206-byte data packet.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DataPacket<'a> {
    slice: &'a [u8],
}

impl<'a> DataPacket<'a> {
    pub fn from_slice(slice: &'a [u8]) -> Result<DataPacket<'a>, Error> {
        if slice.len() != PACKET_SIZE {
            return Err(Error::NotADataPacket(slice.len()));
        }

        Ok(DataPacket { slice })
    }

    /// Capture timestamp carried in the packet trailer.
    pub fn timestamp(&self) -> u32 {
        let s = &self.slice[TIMESTAMP_OFFSET..];
        u32::from_le_bytes([s[0], s[1], s[2], s[3]])
    }

    /// The two reserved trailer bytes.
    pub fn reserved(&self) -> [u8; 2] {
        [self.slice[PACKET_SIZE - 2], self.slice[PACKET_SIZE - 1]]
    }

    /// Firing block `index`, or `None` past the 12th block.
    pub fn block(&self, index: usize) -> Option<FiringBlock<'a>> {
        if index >= FIRINGS_PER_PACKET {
            return None;
        }
        let slice: &'a [u8] = self.slice;
        let start = index * BLOCK_SIZE;
        Some(FiringBlock {
            slice: &slice[start..start + BLOCK_SIZE],
        })
    }

    /// All firing blocks in wire order.
    pub fn blocks(&self) -> impl Iterator<Item = FiringBlock<'a>> + 'a {
        let slice: &'a [u8] = self.slice;
        slice[..TIMESTAMP_OFFSET]
            .chunks_exact(BLOCK_SIZE)
            .map(|slice| FiringBlock { slice })
    }
}

/// Borrowed view of one 100-byte firing block.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FiringBlock<'a> {
    slice: &'a [u8],
}

impl<'a> FiringBlock<'a> {
    pub fn raw_block_id(&self) -> u16 {
        u16::from_le_bytes([self.slice[0], self.slice[1]])
    }

    pub fn block_id(&self) -> BlockId {
        BlockId::from(self.raw_block_id())
    }

    /// Rotational position in hundredths of a degree.
    pub fn rotational_position(&self) -> u16 {
        u16::from_le_bytes([self.slice[2], self.slice[3]])
    }

    /// Return of the laser at `position` (0..31) within this block.
    pub fn laser_return(&self, position: usize) -> Option<LaserReturn> {
        if position >= LASERS_PER_FIRING {
            return None;
        }
        let start = 4 + position * RETURN_SIZE;
        let s = &self.slice[start..start + RETURN_SIZE];
        Some(LaserReturn {
            distance: u16::from_le_bytes([s[0], s[1]]),
            intensity: s[2],
        })
    }

    /// All 32 returns in laser order.
    pub fn returns(&self) -> impl Iterator<Item = LaserReturn> + 'a {
        let slice: &'a [u8] = self.slice;
        slice[4..]
            .chunks_exact(RETURN_SIZE)
            .map(|s| LaserReturn {
                distance: u16::from_le_bytes([s[0], s[1]]),
                intensity: s[2],
            })
    }
}

/// Assembles raw data packets for tests, benchmarks and replay tooling.
///
/// Blocks default to the lower laser bank at rotational position 0 with no
/// echoes.
#[derive(Clone, Debug)]
pub struct DataPacketBuilder {
    buf: Vec<u8>,
}

impl DataPacketBuilder {
    pub fn new() -> Self {
        let mut buf = vec![0u8; PACKET_SIZE];
        for chunk in buf[..TIMESTAMP_OFFSET].chunks_exact_mut(BLOCK_SIZE) {
            chunk[0..2].copy_from_slice(&(BlockId::Lower as u16).to_le_bytes());
        }
        Self { buf }
    }

    pub fn timestamp(mut self, timestamp: u32) -> Self {
        self.buf[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4].copy_from_slice(&timestamp.to_le_bytes());
        self
    }

    /// Set the identifier and rotational position of one block.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`FIRINGS_PER_PACKET`].
    pub fn block(mut self, index: usize, block_id: BlockId, rotation: u16) -> Self {
        assert!(index < FIRINGS_PER_PACKET, "block index {} out of range", index);
        let start = index * BLOCK_SIZE;
        self.buf[start..start + 2].copy_from_slice(&(block_id as u16).to_le_bytes());
        self.buf[start + 2..start + 4].copy_from_slice(&rotation.to_le_bytes());
        self
    }

    /// Set the rotational position of every block, keeping identifiers.
    pub fn rotations(mut self, rotations: [u16; FIRINGS_PER_PACKET]) -> Self {
        for (chunk, rotation) in self.buf[..TIMESTAMP_OFFSET]
            .chunks_exact_mut(BLOCK_SIZE)
            .zip(rotations)
        {
            chunk[2..4].copy_from_slice(&rotation.to_le_bytes());
        }
        self
    }

    /// Set one laser return.
    ///
    /// # Panics
    ///
    /// Panics if `block` or `laser` is out of range.
    pub fn laser_return(mut self, block: usize, laser: usize, distance: u16, intensity: u8) -> Self {
        assert!(block < FIRINGS_PER_PACKET, "block index {} out of range", block);
        assert!(laser < LASERS_PER_FIRING, "laser index {} out of range", laser);
        let start = block * BLOCK_SIZE + 4 + laser * RETURN_SIZE;
        self.buf[start..start + 2].copy_from_slice(&distance.to_le_bytes());
        self.buf[start + 2] = intensity;
        self
    }

    /// Set every laser return of every block to the same reading.
    pub fn fill_returns(mut self, distance: u16, intensity: u8) -> Self {
        for chunk in self.buf[..TIMESTAMP_OFFSET].chunks_exact_mut(BLOCK_SIZE) {
            for ret in chunk[4..].chunks_exact_mut(RETURN_SIZE) {
                ret[0..2].copy_from_slice(&distance.to_le_bytes());
                ret[2] = intensity;
            }
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for DataPacketBuilder {
    fn default() -> Self {
        Self::new()
    }
}
