//! Lookup tables mapping filter responses to angle bins and angle bins to directions.
//!
//! Building an angle table means 65536 `atan2` calls, so tables are computed once per
//! parameter set and shared through a [`LookupCache`]. A cache is an ordinary value:
//! detectors sharing one `Arc<LookupCache>` share their tables, independent detectors
//! may use independent caches.

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::{Arc, Mutex, PoisonError};

use crate::bins::AngleRing;
use crate::response::FilterResponse;

/// Entries of an angle table, one per possible response pair.
pub const ANGLE_LOOKUP_SIZE: usize = 256 * 256;

/// Angle bin and vote weight of one response pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AngleLookupData {
    pub angle_bin: u32,
    pub weight: u32,
}

/// Normal direction of one angle bin, scaled by the number of distance bins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirectionLookupData {
    pub direction_x: i32,
    pub direction_y: i32,
}

/// Index of a response pair in an angle table.
#[inline]
pub fn response_index(first: i8, second: i8) -> usize {
    u16::from_le_bytes([first as u8, second as u8]) as usize
}

/// Maps a normal angle in `[-pi, pi]` to its angle bin.
///
/// With `half_orientation` the angle is folded into `(-pi/2, pi/2]` first.
pub fn angle_to_bin(angle: f64, angle_bins: u32, half_orientation: bool) -> u32 {
    debug_assert!(angle_bins >= 2);
    let scale = (angle_bins - 1) as f64;

    let bin = if half_orientation {
        ((fold_half_turn(angle) + FRAC_PI_2) * scale / PI) as u32
    } else {
        let angle = if angle <= -PI { PI } else { angle };
        ((angle + PI) * scale / (2.0 * PI)) as u32
    };

    bin.min(angle_bins - 1)
}

/// Nearest angle bin of a line angle, wrapped onto the ring.
pub fn nearest_angle_bin(angle: f64, angle_bins: u32, half_orientation: bool) -> u32 {
    let scale = (angle_bins - 1) as f64;
    let position = if half_orientation {
        (fold_half_turn(angle) + FRAC_PI_2) * scale / PI
    } else {
        (angle + PI) * scale / (2.0 * PI)
    };
    AngleRing::new(angle_bins).wrap((position + 0.5).floor() as i64)
}

fn fold_half_turn(angle: f64) -> f64 {
    let mut angle = angle;
    if angle < -FRAC_PI_2 {
        angle += PI;
    } else if angle > FRAC_PI_2 {
        angle -= PI;
    }
    if angle <= -FRAC_PI_2 {
        angle = FRAC_PI_2;
    }
    angle
}

/// Normal angle at the start of an angle bin, used by the voting direction table.
pub fn bin_to_direction_angle(bin: u32, angle_bins: u32, half_orientation: bool) -> f64 {
    let inverse = (angle_bins - bin - 1) as f64;
    if half_orientation {
        FRAC_PI_2 - PI * inverse / angle_bins as f64
    } else {
        PI - 2.0 * PI * inverse / angle_bins as f64
    }
}

fn build_angle_table(angle_bins: u32, half_orientation: bool, diagonal: bool) -> Arc<[AngleLookupData]> {
    let mut table = vec![AngleLookupData::default(); ANGLE_LOOKUP_SIZE];

    for first in i8::MIN..=i8::MAX {
        for second in i8::MIN..=i8::MAX {
            let (x, y) = if diagonal {
                // 45 and 135 degree responses rotated back onto the axes
                (first as f64 - second as f64, first as f64 + second as f64)
            } else {
                (first as f64, second as f64)
            };

            let angle = if x == 0.0 && y == 0.0 { 0.0 } else { y.atan2(x) };

            table[response_index(first, second)] = AngleLookupData {
                angle_bin: angle_to_bin(angle, angle_bins, half_orientation),
                weight: (x * x + y * y).sqrt().round() as u32,
            };
        }
    }

    table.into()
}

fn build_direction_table(angle_bins: u32, distance_bins: u32, half_orientation: bool) -> Arc<[DirectionLookupData]> {
    (0..angle_bins)
        .map(|bin| {
            let angle = bin_to_direction_angle(bin, angle_bins, half_orientation);
            DirectionLookupData {
                direction_x: (angle.cos() * distance_bins as f64).round() as i32,
                direction_y: (angle.sin() * distance_bins as f64).round() as i32,
            }
        })
        .collect()
}

/// The two angle tables of one accumulator layout.
#[derive(Clone, Debug)]
pub struct AngleTables {
    pub axis_aligned: Arc<[AngleLookupData]>,
    pub diagonal: Arc<[AngleLookupData]>,
    pub angle_bins: u32,
    pub half_orientation: bool,
}

impl AngleTables {
    pub fn new(cache: &LookupCache, angle_bins: u32, half_orientation: bool) -> Self {
        Self {
            axis_aligned: cache.angle_lookup(angle_bins, half_orientation),
            diagonal: cache.diagonal_angle_lookup(angle_bins, half_orientation),
            angle_bins,
            half_orientation,
        }
    }

    /// Angle bins of the `[h, v]` and `[r45, r135]` pairs of one pixel, `None` for
    /// pairs the layout does not carry.
    pub fn pixel_bins(&self, layout: FilterResponse, pixel: &[i8]) -> [Option<u32>; 2] {
        let lookup = |table: &[AngleLookupData], offset: Option<usize>| {
            offset.map(|offset| table[response_index(pixel[offset], pixel[offset + 1])].angle_bin)
        };
        [
            lookup(&self.axis_aligned, layout.axis_aligned_offset()),
            lookup(&self.diagonal, layout.diagonal_offset()),
        ]
    }

    /// Nearest bin of a line angle.
    pub fn line_bin(&self, angle: f64) -> u32 {
        nearest_angle_bin(angle, self.angle_bins, self.half_orientation)
    }

    pub fn ring(&self) -> AngleRing {
        AngleRing::new(self.angle_bins)
    }
}

type AngleKey = (u32, bool);
type DirectionKey = (u32, u32, bool);

/// Thread-safe cache of lookup tables.
///
/// Tables are never evicted; every table handed out is an immutable snapshot.
#[derive(Debug, Default)]
pub struct LookupCache {
    angle: Mutex<HashMap<AngleKey, Arc<[AngleLookupData]>>>,
    diagonal: Mutex<HashMap<AngleKey, Arc<[AngleLookupData]>>>,
    direction: Mutex<HashMap<DirectionKey, Arc<[DirectionLookupData]>>>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Angle table for `[h, v]` response pairs.
    pub fn angle_lookup(&self, angle_bins: u32, half_orientation: bool) -> Arc<[AngleLookupData]> {
        let mut map = self.angle.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry((angle_bins, half_orientation))
            .or_insert_with(|| {
                debug!("building angle lookup for {} bins", angle_bins);
                build_angle_table(angle_bins, half_orientation, false)
            })
            .clone()
    }

    /// Angle table for `[r45, r135]` response pairs.
    pub fn diagonal_angle_lookup(&self, angle_bins: u32, half_orientation: bool) -> Arc<[AngleLookupData]> {
        let mut map = self.diagonal.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry((angle_bins, half_orientation))
            .or_insert_with(|| {
                debug!("building diagonal angle lookup for {} bins", angle_bins);
                build_angle_table(angle_bins, half_orientation, true)
            })
            .clone()
    }

    /// Direction table with one scaled normal per angle bin.
    pub fn direction_lookup(&self, angle_bins: u32, distance_bins: u32, half_orientation: bool) -> Arc<[DirectionLookupData]> {
        let mut map = self.direction.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry((angle_bins, distance_bins, half_orientation))
            .or_insert_with(|| build_direction_table(angle_bins, distance_bins, half_orientation))
            .clone()
    }

    /// Number of cached tables of all kinds.
    pub fn len(&self) -> usize {
        let angle = self.angle.lock().unwrap_or_else(PoisonError::into_inner).len();
        let diagonal = self.diagonal.lock().unwrap_or_else(PoisonError::into_inner).len();
        let direction = self.direction.lock().unwrap_or_else(PoisonError::into_inner).len();
        angle + diagonal + direction
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
