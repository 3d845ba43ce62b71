// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Precomputed sine/cosine for every raw azimuth tick.
//!
//! HDL rotational positions are reported in hundredths of a degree, so a
//! full revolution is 36000 ticks. The table carries one extra guard entry
//! for tick 36000.

use once_cell::sync::Lazy;
use std::f64::consts::PI;

/// Number of table entries: ticks 0..=36000.
pub const NUM_ROT_ANGLES: usize = 36001;

static SHARED: Lazy<AngleTable> = Lazy::new(AngleTable::build);

/// Degrees to radians with the multiply-then-divide order used for every
/// angle in the decoder, so table and direct evaluation agree bit for bit.
#[inline]
pub fn to_radians(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

/// Sine and cosine lookup for raw azimuth ticks.
#[derive(Debug, Clone)]
pub struct AngleTable {
    sin: Box<[f64]>,
    cos: Box<[f64]>,
}

impl AngleTable {
    /// Build a new table. Prefer [`AngleTable::shared`] outside of tests.
    pub fn build() -> Self {
        let (sin, cos): (Vec<f64>, Vec<f64>) = (0..NUM_ROT_ANGLES)
            .map(|tick| {
                let rad = to_radians(tick as f64 / 100.0);
                (rad.sin(), rad.cos())
            })
            .unzip();

        Self {
            sin: sin.into_boxed_slice(),
            cos: cos.into_boxed_slice(),
        }
    }

    /// Process-wide table, built on first use.
    pub fn shared() -> &'static AngleTable {
        &SHARED
    }

    /// Returns `(sin, cos)` for a raw tick, or `None` outside 0..=36000.
    #[inline]
    pub fn sin_cos(&self, tick: u16) -> Option<(f64, f64)> {
        let i = tick as usize;
        Some((*self.sin.get(i)?, *self.cos.get(i)?))
    }

    pub fn len(&self) -> usize {
        self.sin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sin.is_empty()
    }
}
