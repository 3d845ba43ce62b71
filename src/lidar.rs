// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Common HDL types: corrected points, frames and error handling.
//!
//! A [`Frame`] holds every [`Point`] collected during one sensor revolution.
//! Frames are only assembled by the [`crate::segmenter::FrameSegmenter`];
//! once closed they are handed to the caller and never mutated again.

use std::fmt;

/// A single calibrated laser return.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// X coordinate in meters
    pub x: f32,
    /// Y coordinate in meters
    pub y: f32,
    /// Z coordinate in meters
    pub z: f32,
    /// Raw return intensity
    pub intensity: u8,
    /// Laser index (0..63)
    pub laser_id: u8,
    /// Uncorrected rotational position in hundredths of a degree
    pub azimuth: u16,
    /// Corrected distance in meters
    pub distance: f64,
    /// Capture timestamp carried by the packet
    pub timestamp: u32,
}

impl Point {
    /// Column names matching [`Point::to_csv_row`].
    pub const CSV_HEADER: &'static str = "x,y,z,intensity,laser_id,azimuth,distance_m,timestamp";

    /// Format the point as one CSV row.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            self.x,
            self.y,
            self.z,
            self.intensity,
            self.laser_id,
            self.azimuth,
            self.distance,
            self.timestamp
        )
    }
}

/// All points collected during one sensor revolution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    points: Vec<Point>,
}

impl Frame {
    pub(crate) fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Points in capture order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points in the frame.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Frames may be empty when every return of a revolution had no echo.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    /// Consume the frame, returning the owned points.
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }
}

impl<'a> IntoIterator for &'a Frame {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Common error type for HDL decoding operations.
#[derive(Debug)]
pub enum Error {
    /// I/O error (file operations)
    Io(std::io::Error),
    /// Malformed capture container (pcap framing, not HDL payload)
    InvalidPacket(String),
    /// Buffer is not a 1206-byte data packet; decoders skip these silently
    NotADataPacket(usize),
    /// Laser index outside the calibration table
    UnknownLaserId(usize),
    /// External calibration profile could not be read or parsed
    CalibrationParse(String),
    /// Packet source failed at the given position
    SourceRead { position: u64, reason: String },
    /// Random access requested before the frame index was built
    FrameIndexUnavailable,
    /// Requested frame is past the end of the index
    FrameNumberOutOfRange { requested: usize, available: usize },
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::InvalidPacket(msg) => write!(f, "invalid packet: {}", msg),
            Error::NotADataPacket(len) => {
                write!(f, "not a data packet: {} bytes", len)
            }
            Error::UnknownLaserId(id) => write!(f, "unknown laser id: {}", id),
            Error::CalibrationParse(msg) => write!(f, "calibration parse error: {}", msg),
            Error::SourceRead { position, reason } => {
                write!(f, "source read error at position {}: {}", position, reason)
            }
            Error::FrameIndexUnavailable => write!(f, "frame index has not been built"),
            Error::FrameNumberOutOfRange {
                requested,
                available,
            } => write!(
                f,
                "frame {} out of range, {} frames available",
                requested, available
            ),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
