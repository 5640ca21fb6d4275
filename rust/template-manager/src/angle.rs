//! Circular angle arithmetic.
//!
//! Float angles are radians in `[0, 2π)`. Byte angles quantize the full circle
//! into 256 buckets, so all byte arithmetic is plain wrapping `u8` arithmetic.

use crate::fingerprint_base::{Point, PointF, PI, TWO_PI};

use libm::{atan2, cos, sin};

/// Half circle as a byte angle.
pub const PI_B: u8 = 128;

#[inline(always)]
pub fn from_fraction(fraction: f64) -> f64 {
    fraction * TWO_PI
}

#[inline(always)]
pub fn to_fraction(radians: f64) -> f64 {
    radians / TWO_PI
}

/// Unit vector pointing at `radians`
#[inline(always)]
pub fn to_vector(radians: f64) -> PointF {
    PointF::new(cos(radians), sin(radians))
}

/// Unit vector pointing at the center of the byte angle's bucket
#[inline(always)]
pub fn to_vector_b(angle: u8) -> PointF {
    to_vector(to_float(angle))
}

#[inline(always)]
pub fn to_float(angle: u8) -> f64 {
    by_bucket_center(angle as i32, 256)
}

#[inline(always)]
pub fn by_bucket_center(bucket: i32, resolution: i32) -> f64 {
    from_fraction((2 * bucket + 1) as f64 / (2 * resolution) as f64)
}

/// Direction of a vector in `[0, 2π)`
pub fn atan(vector: PointF) -> f64 {
    let angle = atan2(vector.y, vector.x);
    if angle < 0.0 { angle + TWO_PI } else { angle }
}

pub fn atan_b(vector: Point) -> u8 {
    to_byte(atan(vector.to_float()))
}

/// Direction of the vector pointing from `from` to `to`
pub fn atan_between(from: Point, to: Point) -> u8 {
    atan_b(to - from)
}

/// Quantizes a float angle into `resolution` buckets, clamped to the valid range.
pub fn quantize(radians: f64, resolution: i32) -> i32 {
    let bucket = (to_fraction(radians) * resolution as f64) as i32;
    bucket.clamp(0, resolution - 1)
}

#[inline(always)]
pub fn to_byte(radians: f64) -> u8 {
    quantize(radians, 256) as u8
}

/// Quantizes a byte angle into `resolution` buckets
#[inline(always)]
pub fn quantize_b(angle: u8, resolution: usize) -> usize {
    angle as usize * resolution / 256
}

/// Doubles the angle so that opposite directions map onto the same orientation.
pub fn to_orientation(radians: f64) -> f64 {
    if radians < PI { 2.0 * radians } else { 2.0 * (radians - PI) }
}

pub fn add(left: f64, right: f64) -> f64 {
    let sum = left + right;
    if sum >= TWO_PI { sum - TWO_PI } else { sum }
}

#[inline(always)]
pub fn add_b(left: u8, right: u8) -> u8 {
    left.wrapping_add(right)
}

#[inline(always)]
pub fn difference_b(left: u8, right: u8) -> u8 {
    left.wrapping_sub(right)
}

/// Shorter way round the circle between two byte angles
#[inline(always)]
pub fn distance_b(left: u8, right: u8) -> u8 {
    difference_b(left, right).min(difference_b(right, left))
}

#[inline(always)]
pub fn opposite_b(angle: u8) -> u8 {
    angle.wrapping_add(PI_B)
}

#[inline(always)]
pub fn complementary_b(angle: u8) -> u8 {
    0u8.wrapping_sub(angle)
}

pub const fn from_degrees_b(degrees: i32) -> u8 {
    ((degrees * 256 + 180) / 360) as u8
}
