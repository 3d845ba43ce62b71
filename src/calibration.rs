// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-laser factory calibration.
//!
//! A [`CalibrationTable`] holds one [`LaserCorrection`] for each of the 64
//! possible laser slots. It starts out with the built-in HDL-32 profile and
//! can be overwritten by an external profile, supplied either as
//! [`CalibrationRecord`] values or as a JSON array of records:
//!
//! ```json
//! [
//!   { "id": 0, "rotCorrection": -1.5, "vertCorrection": -30.67,
//!     "distCorrection": 111.0, "vertOffsetCorrection": 21.5,
//!     "horizOffsetCorrection": 2.6 }
//! ]
//! ```
//!
//! Distance and offset corrections in a profile are in centimeters and are
//! stored in meters.

use crate::{angles::to_radians, lidar::Error};
use serde::Deserialize;
use std::{fs::File, io::BufReader, io::Read, path::Path};

/// Number of laser slots in the table.
pub const MAX_NUM_LASERS: usize = 64;

/// Number of lasers reported by one firing block.
pub const LASERS_PER_FIRING: usize = 32;

/// Vertical angles of the HDL-32E in firing order, degrees.
const HDL32_VERTICAL_CORRECTIONS: [f64; LASERS_PER_FIRING] = [
    -30.67, -9.3299999, -29.33, -8.0, -28.0, -6.6700001, -26.67, -5.3299999, -25.33, -4.0, -24.0,
    -2.6700001, -22.67, -1.33, -21.33, 0.0, -20.0, 1.33, -18.67, 2.6700001, -17.33, 4.0, -16.0,
    5.3299999, -14.67, 6.6700001, -13.33, 8.0, -12.0, 9.3299999, -10.67, 10.67,
];

/// Geometric correction for a single laser.
///
/// The trigonometric terms are derived from the base values at construction,
/// so a correction can never hold stale derived state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaserCorrection {
    azimuth_correction: f64,
    vertical_correction: f64,
    distance_correction: f64,
    vertical_offset_correction: f64,
    horizontal_offset_correction: f64,
    sin_vert_correction: f64,
    cos_vert_correction: f64,
    sin_vert_offset_correction: f64,
    cos_vert_offset_correction: f64,
}

impl LaserCorrection {
    /// Identity correction: no angular or distance adjustment.
    pub const NEUTRAL: LaserCorrection = LaserCorrection {
        azimuth_correction: 0.0,
        vertical_correction: 0.0,
        distance_correction: 0.0,
        vertical_offset_correction: 0.0,
        horizontal_offset_correction: 0.0,
        sin_vert_correction: 0.0,
        cos_vert_correction: 1.0,
        sin_vert_offset_correction: 0.0,
        cos_vert_offset_correction: 0.0,
    };

    /// Build a correction from base values. Angles are in degrees, distances
    /// and offsets in meters.
    pub fn new(
        azimuth_correction: f64,
        vertical_correction: f64,
        distance_correction: f64,
        vertical_offset_correction: f64,
        horizontal_offset_correction: f64,
    ) -> Self {
        let rad = to_radians(vertical_correction);
        let sin_vert_correction = rad.sin();
        let cos_vert_correction = rad.cos();

        Self {
            azimuth_correction,
            vertical_correction,
            distance_correction,
            vertical_offset_correction,
            horizontal_offset_correction,
            sin_vert_correction,
            cos_vert_correction,
            sin_vert_offset_correction: vertical_offset_correction * sin_vert_correction,
            cos_vert_offset_correction: vertical_offset_correction * cos_vert_correction,
        }
    }

    #[inline]
    pub fn azimuth_correction(&self) -> f64 {
        self.azimuth_correction
    }

    #[inline]
    pub fn vertical_correction(&self) -> f64 {
        self.vertical_correction
    }

    #[inline]
    pub fn distance_correction(&self) -> f64 {
        self.distance_correction
    }

    #[inline]
    pub fn vertical_offset_correction(&self) -> f64 {
        self.vertical_offset_correction
    }

    #[inline]
    pub fn horizontal_offset_correction(&self) -> f64 {
        self.horizontal_offset_correction
    }

    #[inline]
    pub fn sin_vert_correction(&self) -> f64 {
        self.sin_vert_correction
    }

    #[inline]
    pub fn cos_vert_correction(&self) -> f64 {
        self.cos_vert_correction
    }

    #[inline]
    pub fn sin_vert_offset_correction(&self) -> f64 {
        self.sin_vert_offset_correction
    }

    #[inline]
    pub fn cos_vert_offset_correction(&self) -> f64 {
        self.cos_vert_offset_correction
    }
}

impl Default for LaserCorrection {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// One laser entry of an external calibration profile.
///
/// Distance and offset corrections are in centimeters.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRecord {
    /// Laser index; records without an id (or with a negative one) are skipped
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub rot_correction: f64,
    #[serde(default)]
    pub vert_correction: f64,
    #[serde(default)]
    pub dist_correction: f64,
    #[serde(default)]
    pub vert_offset_correction: f64,
    #[serde(default)]
    pub horiz_offset_correction: f64,
}

impl CalibrationRecord {
    fn to_correction(&self) -> LaserCorrection {
        LaserCorrection::new(
            self.rot_correction,
            self.vert_correction,
            self.dist_correction / 100.0,
            self.vert_offset_correction / 100.0,
            self.horiz_offset_correction / 100.0,
        )
    }
}

/// Calibration for all 64 laser slots.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationTable {
    lasers: [LaserCorrection; MAX_NUM_LASERS],
}

impl CalibrationTable {
    /// Table holding the built-in HDL-32 profile.
    pub fn new() -> Self {
        let mut table = Self {
            lasers: [LaserCorrection::NEUTRAL; MAX_NUM_LASERS],
        };
        table.load_default_profile();
        table
    }

    /// Load a JSON profile on top of the built-in profile.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut table = Self::new();
        table.load_profile_file(path)?;
        Ok(table)
    }

    /// Reset every slot to the built-in HDL-32 profile. Lasers 32..63 get the
    /// neutral correction.
    pub fn load_default_profile(&mut self) {
        for (slot, vertical) in self.lasers.iter_mut().zip(HDL32_VERTICAL_CORRECTIONS) {
            *slot = LaserCorrection::new(0.0, vertical, 0.0, 0.0, 0.0);
        }
        for slot in &mut self.lasers[LASERS_PER_FIRING..] {
            *slot = LaserCorrection::NEUTRAL;
        }
    }

    /// Overwrite the slots named by `records`, leaving the others untouched.
    ///
    /// The profile is applied all-or-nothing: if any record names a laser
    /// outside the table, nothing is changed.
    pub fn load_profile(&mut self, records: &[CalibrationRecord]) -> Result<(), Error> {
        let mut lasers = self.lasers;
        let mut applied = 0;

        for record in records {
            let id = match record.id {
                Some(id) if id >= 0 => id as usize,
                _ => continue,
            };
            let slot = lasers.get_mut(id).ok_or_else(|| {
                Error::CalibrationParse(format!(
                    "laser id {} exceeds the {} supported lasers",
                    id, MAX_NUM_LASERS
                ))
            })?;
            *slot = record.to_correction();
            applied += 1;
        }

        self.lasers = lasers;
        log::debug!("loaded calibration for {} lasers", applied);
        Ok(())
    }

    /// Parse a JSON array of [`CalibrationRecord`] and apply it.
    pub fn load_profile_json<R: Read>(&mut self, reader: R) -> Result<(), Error> {
        let records: Vec<CalibrationRecord> = serde_json::from_reader(reader)
            .map_err(|e| Error::CalibrationParse(e.to_string()))?;
        self.load_profile(&records)
    }

    /// Read and apply a JSON profile from disk.
    pub fn load_profile_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::CalibrationParse(format!("failed to open {}: {}", path.display(), e))
        })?;
        self.load_profile_json(BufReader::new(file))
    }

    /// Correction for a laser slot.
    #[inline]
    pub fn get(&self, laser_id: usize) -> Result<&LaserCorrection, Error> {
        self.lasers
            .get(laser_id)
            .ok_or(Error::UnknownLaserId(laser_id))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LaserCorrection> {
        self.lasers.iter()
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, vert: f64) -> CalibrationRecord {
        CalibrationRecord {
            id: Some(id),
            rot_correction: -1.5,
            vert_correction: vert,
            dist_correction: 120.0,
            vert_offset_correction: 20.0,
            horiz_offset_correction: -2.5,
        }
    }

    #[test]
    fn test_default_profile() {
        let table = CalibrationTable::new();

        assert_eq!(table.get(0).unwrap().vertical_correction(), -30.67);
        assert_eq!(table.get(31).unwrap().vertical_correction(), 10.67);
        assert_eq!(table.get(15).unwrap().cos_vert_correction(), 1.0);

        for id in LASERS_PER_FIRING..MAX_NUM_LASERS {
            let c = table.get(id).unwrap();
            assert_eq!(c.cos_vert_correction(), 1.0);
            assert_eq!(c.sin_vert_correction(), 0.0);
            assert_eq!(c.distance_correction(), 0.0);
            assert_eq!(c.vertical_offset_correction(), 0.0);
        }
    }

    #[test]
    fn test_unknown_laser_id() {
        let table = CalibrationTable::new();
        assert!(table.get(63).is_ok());
        assert!(matches!(table.get(64), Err(Error::UnknownLaserId(64))));
    }

    #[test]
    fn test_derived_values() {
        let c = LaserCorrection::new(0.0, 30.0, 0.0, 0.2, 0.0);
        assert!((c.sin_vert_correction() - 0.5).abs() < 1e-12);
        assert!((c.cos_vert_correction() - 3f64.sqrt() / 2.0).abs() < 1e-12);
        assert_eq!(
            c.sin_vert_offset_correction(),
            0.2 * c.sin_vert_correction()
        );
        assert_eq!(
            c.cos_vert_offset_correction(),
            0.2 * c.cos_vert_correction()
        );
    }

    #[test]
    fn test_load_profile_units_and_subset() {
        let mut table = CalibrationTable::new();
        let before = table.clone();
        table.load_profile(&[record(3, -5.0)]).unwrap();

        let c = table.get(3).unwrap();
        assert_eq!(c.azimuth_correction(), -1.5);
        assert_eq!(c.vertical_correction(), -5.0);
        assert_eq!(c.distance_correction(), 1.2);
        assert_eq!(c.vertical_offset_correction(), 0.2);
        assert_eq!(c.horizontal_offset_correction(), -0.025);

        for id in (0..MAX_NUM_LASERS).filter(|&id| id != 3) {
            assert_eq!(table.get(id).unwrap(), before.get(id).unwrap());
        }
    }

    #[test]
    fn test_records_without_id_are_skipped() {
        let mut table = CalibrationTable::new();
        let before = table.clone();
        let anonymous = CalibrationRecord {
            id: None,
            ..record(0, 1.0)
        };
        table.load_profile(&[anonymous, record(-1, 1.0)]).unwrap();
        assert_eq!(table, before);
    }

    #[test]
    fn test_failed_load_leaves_table_unchanged() {
        let mut table = CalibrationTable::new();
        table.load_profile(&[record(40, 2.0)]).unwrap();
        let before = table.clone();

        let result = table.load_profile(&[record(1, 7.0), record(64, 1.0)]);
        assert!(matches!(result, Err(Error::CalibrationParse(_))));
        assert_eq!(table, before);

        let result = table.load_profile_json(&b"[{\"id\": 2, \"vertCorrection\": "[..]);
        assert!(matches!(result, Err(Error::CalibrationParse(_))));
        assert_eq!(table, before);
    }

    #[test]
    fn test_load_profile_json() {
        let json = r#"[
            {"id": 0, "rotCorrection": -2.0, "vertCorrection": -7.25,
             "distCorrection": 110.0, "vertOffsetCorrection": 21.0,
             "horizOffsetCorrection": 2.5},
            {"id": 33, "vertCorrection": 1.5}
        ]"#;

        let mut table = CalibrationTable::new();
        table.load_profile_json(json.as_bytes()).unwrap();

        let c = table.get(0).unwrap();
        assert_eq!(c.azimuth_correction(), -2.0);
        assert_eq!(c.vertical_correction(), -7.25);
        assert_eq!(c.distance_correction(), 1.1);
        assert_eq!(c.vertical_offset_correction(), 0.21);
        assert_eq!(c.horizontal_offset_correction(), 0.025);

        let c = table.get(33).unwrap();
        assert_eq!(c.vertical_correction(), 1.5);
        assert_eq!(c.distance_correction(), 0.0);
    }

    #[test]
    fn test_missing_profile_file() {
        let mut table = CalibrationTable::new();
        let result = table.load_profile_file("/nonexistent/calibration.json");
        assert!(matches!(result, Err(Error::CalibrationParse(_))));
    }

    #[test]
    fn test_profile_from_file() {
        let path = std::env::temp_dir().join(format!(
            "hdlreader-calibration-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"[{"id": 5, "rotCorrection": 1.25, "vertCorrection": -3.0, "distCorrection": 90.0}]"#,
        )
        .unwrap();

        let result = CalibrationTable::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        let table = result.unwrap();

        let c = table.get(5).unwrap();
        assert_eq!(c.azimuth_correction(), 1.25);
        assert_eq!(c.vertical_correction(), -3.0);
        assert_eq!(c.distance_correction(), 0.9);

        // slots the profile does not name keep the built-in values
        let default = CalibrationTable::new();
        assert_eq!(table.get(4).unwrap(), default.get(4).unwrap());
        assert_ne!(table.get(5).unwrap(), default.get(5).unwrap());
    }

    #[test]
    fn test_reload_default_profile() {
        let mut table = CalibrationTable::new();
        table.load_profile(&[record(0, 3.0), record(50, 3.0)]).unwrap();
        table.load_default_profile();
        assert_eq!(table, CalibrationTable::new());
    }
}
