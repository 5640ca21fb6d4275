use serde::{Serialize, Deserialize};

use std::fmt;
use std::ops;
use std::str::FromStr;

use crate::template::TemplateError;

pub const PI: f64 = std::f64::consts::PI;
pub const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Largest coordinate magnitude a minutia may carry. Differences of two
/// coordinates and the lengths derived from them stay well within `i32`.
pub const MAX_COORDINATE: i32 = 1 << 20;

/// Integer pixel position (or offset). `y` grows upwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32
}

/// The 8-neighbourhood, diagonals included, in scan order.
pub const CORNER_NEIGHBORS: [Point; 8] = [
    Point { x: -1, y: -1 },
    Point { x: 0, y: -1 },
    Point { x: 1, y: -1 },
    Point { x: -1, y: 0 },
    Point { x: 1, y: 0 },
    Point { x: -1, y: 1 },
    Point { x: 0, y: 1 },
    Point { x: 1, y: 1 },
];

impl Point {
    pub const fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }

    /// Squared length, widened so that any pair of `i32` coordinates fits
    pub fn sq_length(&self) -> i64 {
        let (x, y) = (self.x as i64, self.y as i64);
        x * x + y * y
    }

    pub fn to_float(self) -> PointF {
        PointF { x: self.x as f64, y: self.y as f64 }
    }
}

impl ops::Add<Point> for Point {
    type Output = Point;

    fn add(self, _p: Point) -> Point {
        Point {
            x: self.x + _p.x,
            y: self.y + _p.y,
        }
    }
}

impl ops::Sub<Point> for Point {
    type Output = Point;

    fn sub(self, _p: Point) -> Point {
        Point {
            x: self.x - _p.x,
            y: self.y - _p.y,
        }
    }
}

impl ops::Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point { x: -self.x, y: -self.y }
    }
}

/// Orders points row by row (y first, then x)
pub fn compare_yx(left: &Point, right: &Point) -> std::cmp::Ordering {
    left.y.cmp(&right.y).then(left.x.cmp(&right.x))
}

/// Rounds half to even, the rounding every quantization step of the pipeline uses.
#[inline(always)]
pub fn round_to_int(value: f64) -> i32 {
    value.round_ties_even() as i32
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointF {
    pub x: f64,
    pub y: f64
}

impl PointF {
    pub const fn new(x: f64, y: f64) -> PointF {
        PointF { x, y }
    }

    pub fn round(&self) -> Point {
        Point { x: round_to_int(self.x), y: round_to_int(self.y) }
    }
}

impl ops::Add<PointF> for PointF {
    type Output = PointF;

    fn add(self, _p: PointF) -> PointF {
        PointF {
            x: self.x + _p.x,
            y: self.y + _p.y,
        }
    }
}

impl ops::AddAssign<PointF> for PointF {
    fn add_assign(&mut self, _p: PointF) {
        self.x += _p.x;
        self.y += _p.y;
    }
}

impl ops::Mul<PointF> for f64 {
    type Output = PointF;

    fn mul(self, _p: PointF) -> PointF {
        PointF {
            x: self * _p.x,
            y: self * _p.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MinutiaType {
    Ending = 0,
    Bifurcation = 1,
}

impl MinutiaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MinutiaType::Ending => "Ending",
            MinutiaType::Bifurcation => "Bifurcation",
        }
    }
}

impl fmt::Display for MinutiaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MinutiaType {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ending" => Ok(MinutiaType::Ending),
            "Bifurcation" => Ok(MinutiaType::Bifurcation),
            other => Err(TemplateError::InvalidType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minutia {
    pub position: Point,
    pub direction: u8,
    pub kind: MinutiaType,
}

impl Minutia {
    pub fn new(x: i32, y: i32, direction: u8, kind: MinutiaType) -> Minutia {
        Minutia { position: Point::new(x, y), direction, kind }
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtract_points() {
        let p1 = Point{x:3, y:5};
        let p2 = Point{x:1, y:3};
        let p3 = p1 - p2;

        assert_eq!(p3.x, 2);
        assert_eq!(p3.y, 2);
    }

    #[test]
    fn negate_and_add_points() {
        let p = Point::new(4, -7);
        assert_eq!(-p, Point::new(-4, 7));
        assert_eq!(p + -p, Point::default());
    }

    #[test]
    fn squared_length() {
        assert_eq!(Point::new(3, 4).sq_length(), 25);
        assert_eq!(Point::new(-9, 56).sq_length(), 3217);
        assert_eq!(Point::new(50000, -50000).sq_length(), 5_000_000_000);
    }

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(PointF::new(0.5, 1.5).round(), Point::new(0, 2));
        assert_eq!(PointF::new(-2.5, 2.51).round(), Point::new(-2, 3));
    }

    #[test]
    fn yx_order() {
        let mut points = vec![Point::new(2, 1), Point::new(-1, 1), Point::new(5, -3)];
        points.sort_by(compare_yx);
        assert_eq!(points, vec![Point::new(5, -3), Point::new(-1, 1), Point::new(2, 1)]);
    }

    #[test]
    fn compare_minutia() {
        let m1 = Minutia::new(2, 2, 100, MinutiaType::Ending);
        let m2 = Minutia::new(2, 2, 100, MinutiaType::Ending);

        assert_eq!(m1 == m2, true);
        assert_ne!(m1, Minutia::new(2, 2, 100, MinutiaType::Bifurcation));
    }

    #[test]
    fn type_tags() {
        assert_eq!("Bifurcation".parse::<MinutiaType>().unwrap(), MinutiaType::Bifurcation);
        assert_eq!(MinutiaType::Ending.to_string(), "Ending");
        assert!("ending".parse::<MinutiaType>().is_err());
    }
}
