use crate::utils::highest_bit;

use template_manager::angle;
use template_manager::fingerprint_base::{round_to_int, Minutia, Point};

use lazy_static::lazy_static;

const POLAR_CACHE_BITS: u32 = 8;
const POLAR_CACHE_RADIUS: usize = 1 << POLAR_CACHE_BITS;

struct PolarTables {
    distance: Vec<i32>,
    angle: Vec<u8>,
}

lazy_static! {
    /// Rounded length and byte angle of every vector in the first quadrant
    /// with both coordinates below 256, indexed `y * 256 + x`
    static ref POLAR: PolarTables = {
        let mut distance = vec![0; POLAR_CACHE_RADIUS * POLAR_CACHE_RADIUS];
        let mut angle = vec![0; POLAR_CACHE_RADIUS * POLAR_CACHE_RADIUS];
        for y in 0..POLAR_CACHE_RADIUS {
            for x in 0..POLAR_CACHE_RADIUS {
                let index = y * POLAR_CACHE_RADIUS + x;
                distance[index] = round_to_int(((x * x + y * y) as f64).sqrt());
                if x > 0 || y > 0 {
                    angle[index] = angle::atan_b(Point::new(x as i32, y as i32));
                }
            }
        }
        PolarTables { distance, angle }
    };
}

/// Translation and rotation invariant description of the vector between two
/// minutiae: its length plus the angle of each minutia's direction relative
/// to the vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeShape {
    pub length: i32,
    pub reference_angle: u8,
    pub neighbor_angle: u8,
}

impl EdgeShape {
    pub fn new(reference: &Minutia, neighbor: &Minutia) -> EdgeShape {
        let vector = neighbor.position - reference.position;
        let (mut x, mut y) = (vector.x, vector.y);
        let mut quadrant: u8 = 0;

        if y < 0 {
            x = -x;
            y = -y;
            quadrant = 128;
        }
        if x < 0 {
            (x, y) = (y, -x);
            quadrant += 64;
        }

        let shift = highest_bit((x | y) as u32 >> POLAR_CACHE_BITS);
        let index = (y >> shift) as usize * POLAR_CACHE_RADIUS + (x >> shift) as usize;
        let length = POLAR.distance[index] << shift;
        let direction = POLAR.angle[index].wrapping_add(quadrant);

        EdgeShape {
            length,
            reference_angle: angle::difference_b(reference.direction, direction),
            neighbor_angle: angle::difference_b(neighbor.direction, angle::opposite_b(direction)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use template_manager::fingerprint_base::MinutiaType;

    fn at(x: i32, y: i32, direction: u8) -> Minutia {
        Minutia::new(x, y, direction, MinutiaType::Ending)
    }

    #[test]
    fn t_axis_vectors() {
        let east = EdgeShape::new(&at(0, 0, 0), &at(10, 0, 0));
        assert_eq!(east, EdgeShape { length: 10, reference_angle: 0, neighbor_angle: 128 });

        let north = EdgeShape::new(&at(0, 0, 0), &at(0, 10, 0));
        assert_eq!(north.length, 10);
        assert_eq!(north.reference_angle, 192);

        let west = EdgeShape::new(&at(0, 0, 0), &at(-10, 0, 0));
        assert_eq!(west.reference_angle, 128);

        let south = EdgeShape::new(&at(0, 0, 0), &at(0, -10, 0));
        assert_eq!(south.reference_angle, 64);
    }

    #[test]
    fn t_rotation_invariance() {
        // the same pair of minutiae turned by a quarter circle
        let original = EdgeShape::new(&at(0, 0, 10), &at(30, 40, 200));
        let rotated = EdgeShape::new(&at(0, 0, 74), &at(-40, 30, 8));
        assert_eq!(original.length, 50);
        assert_eq!(rotated.length, 50);
        assert!(angle::distance_b(original.reference_angle, rotated.reference_angle) <= 1);
        assert!(angle::distance_b(original.neighbor_angle, rotated.neighbor_angle) <= 1);
    }

    #[test]
    fn t_translation_invariance() {
        let a = EdgeShape::new(&at(100, 100, 0), &at(150, 100, 64));
        let b = EdgeShape::new(&at(150, 130, 0), &at(200, 130, 64));
        assert_eq!(a, b);
    }

    #[test]
    fn t_long_vectors_are_scaled() {
        let long = EdgeShape::new(&at(0, 0, 0), &at(600, 0, 0));
        assert_eq!(long.length, 600);
        let diagonal = EdgeShape::new(&at(0, 0, 0), &at(300, 400, 0));
        assert!((diagonal.length - 500).abs() <= 4);
    }

    #[test]
    fn t_coincident_minutiae() {
        let shape = EdgeShape::new(&at(5, 5, 30), &at(5, 5, 40));
        assert_eq!(shape.length, 0);
        assert_eq!(shape.reference_angle, 30);
        assert_eq!(shape.neighbor_angle, 40u8.wrapping_sub(128));
    }
}
