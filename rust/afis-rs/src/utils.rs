use template_manager::fingerprint_base::{round_to_int, Point, PointF};

use libm::pow;
use ndarray::Array2;

/// Linear interpolation between two values
#[inline(always)]
pub(crate) fn interpolate(start: f64, end: f64, fraction: f64) -> f64 {
    start + fraction * (end - start)
}

/// Bilinear interpolation between four corner values
/// `fraction` is relative to the bottom-left corner
#[inline(always)]
pub(crate) fn interpolate_2d(top_left: f64, top_right: f64, bottom_left: f64, bottom_right: f64, fraction: PointF) -> f64 {
    let left = interpolate(bottom_left, top_left, fraction.y);
    let right = interpolate(bottom_right, top_right, fraction.y);
    interpolate(left, right, fraction.x)
}

/// Log-uniform interpolation between two positive values
#[inline(always)]
pub(crate) fn interpolate_exponential(start: f64, end: f64, fraction: f64) -> f64 {
    pow(end / start, fraction) * start
}

#[inline(always)]
pub(crate) fn div_round_up(input: i32, divider: i32) -> i32 {
    (input + divider - 1) / divider
}

/// Number of significant bits, 0 for 0
#[inline(always)]
pub(crate) fn highest_bit(value: u32) -> u32 {
    u32::BITS - value.leading_zeros()
}

/// Rasterized straight line between two points, both ends included
pub(crate) fn construct_line(from: Point, to: Point) -> Vec<Point> {
    let relative = to - from;
    if relative.x.abs() >= relative.y.abs() {
        if relative.x == 0 {
            return vec![from];
        }
        let slope = relative.y as f64 / relative.x as f64;
        let sign = relative.x.signum();
        (0..=relative.x.abs())
            .map(|i| Point::new(from.x + sign * i, from.y + sign * round_to_int(i as f64 * slope)))
            .collect()
    }
    else {
        let slope = relative.x as f64 / relative.y as f64;
        let sign = relative.y.signum();
        (0..=relative.y.abs())
            .map(|i| Point::new(from.x + sign * round_to_int(i as f64 * slope), from.y + sign * i))
            .collect()
    }
}

/// Value at `at`, or `default` outside of the grid. Grids are indexed `[[y, x]]`.
#[inline(always)]
pub(crate) fn get_or<T: Copy>(grid: &Array2<T>, at: Point, default: T) -> T {
    if contains(grid, at) {
        grid[[at.y as usize, at.x as usize]]
    }
    else {
        default
    }
}

#[inline(always)]
pub(crate) fn contains<T>(grid: &Array2<T>, at: Point) -> bool {
    let (height, width) = grid.dim();
    at.x >= 0 && at.y >= 0 && (at.x as usize) < width && (at.y as usize) < height
}

/// Grid size as a point (width, height)
#[inline(always)]
pub(crate) fn size_of<T>(grid: &Array2<T>) -> Point {
    let (height, width) = grid.dim();
    Point::new(width as i32, height as i32)
}
