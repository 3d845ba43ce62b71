// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Conversion of raw laser returns into calibrated Cartesian points.
//!
//! The arithmetic below keeps a fixed operation order so that output stays
//! numerically identical to other HDL decoders used for cross-validation.

use crate::{
    angles::{to_radians, AngleTable},
    calibration::CalibrationTable,
    lidar::{Error, Point},
    packet::LaserReturn,
};

/// Raw distance unit in meters (2 mm).
pub const DISTANCE_RESOLUTION: f64 = 0.002;

/// Applies per-laser calibration to raw returns.
#[derive(Clone, Copy, Debug)]
pub struct PointCorrector<'a> {
    angles: &'a AngleTable,
    calibration: &'a CalibrationTable,
}

impl<'a> PointCorrector<'a> {
    /// Corrector using the process-wide angle table.
    pub fn new(calibration: &'a CalibrationTable) -> Self {
        Self::with_angles(AngleTable::shared(), calibration)
    }

    pub fn with_angles(angles: &'a AngleTable, calibration: &'a CalibrationTable) -> Self {
        Self {
            angles,
            calibration,
        }
    }

    /// Correct one return.
    ///
    /// # Returns
    /// - `Ok(None)` when the laser saw no echo (raw distance 0)
    /// - `Ok(Some(point))` otherwise
    /// - `Err(Error::UnknownLaserId)` if `laser_id` has no calibration slot
    #[inline]
    pub fn correct(
        &self,
        laser_id: u8,
        azimuth: u16,
        laser_return: LaserReturn,
        timestamp: u32,
    ) -> Result<Option<Point>, Error> {
        if laser_return.distance == 0 {
            return Ok(None);
        }

        let correction = self.calibration.get(laser_id as usize)?;

        // Corrected angles rarely land on a table tick, so calibrated lasers
        // take the exact path.
        let table = if correction.azimuth_correction() == 0.0 {
            self.angles.sin_cos(azimuth)
        } else {
            None
        };
        let (sin_azimuth, cos_azimuth) = table.unwrap_or_else(|| {
            let rad = to_radians(azimuth as f64 / 100.0 - correction.azimuth_correction());
            (rad.sin(), rad.cos())
        });

        let distance = laser_return.distance as f64 * DISTANCE_RESOLUTION
            + correction.distance_correction();
        let xy_distance = distance * correction.cos_vert_correction()
            - correction.sin_vert_offset_correction();

        let x = xy_distance * sin_azimuth - correction.horizontal_offset_correction() * cos_azimuth;
        let y = xy_distance * cos_azimuth + correction.horizontal_offset_correction() * sin_azimuth;
        let z = distance * correction.sin_vert_correction() + correction.cos_vert_offset_correction();

        Ok(Some(Point {
            x: x as f32,
            y: y as f32,
            z: z as f32,
            intensity: laser_return.intensity,
            laser_id,
            azimuth,
            distance,
            timestamp,
        }))
    }
}
