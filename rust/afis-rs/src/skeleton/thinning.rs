use crate::constants::MAX_THINNING_ITERATIONS;
use crate::utils::get_or;

use template_manager::fingerprint_base::{Point, CORNER_NEIGHBORS};

use ndarray::Array2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NeighborhoodType {
    Skeleton,
    Ending,
    Removable,
}

// neighbour bits, `B*` is row y + 1 and `T*` is row y - 1
const TL: u32 = 1;
const TC: u32 = 2;
const TR: u32 = 4;
const CL: u32 = 8;
const CR: u32 = 16;
const BL: u32 = 32;
const BC: u32 = 64;
const BR: u32 = 128;

fn neighborhood_types() -> [NeighborhoodType; 256] {
    let mut types = [NeighborhoodType::Skeleton; 256];
    for mask in 0..256u32 {
        let bit = |b: u32| mask & b != 0;
        let (tl, tc, tr) = (bit(TL), bit(TC), bit(TR));
        let (cl, cr) = (bit(CL), bit(CR));
        let (bl, bc, br) = (bit(BL), bit(BC), bit(BR));

        let diagonal = !tc && !cl && tl || !cl && !bc && bl || !bc && !cr && br || !cr && !tc && tr;
        let horizontal = !tc && !bc && (tr || cr || br) && (tl || cl || bl);
        let vertical = !cl && !cr && (tl || tc || tr) && (bl || bc || br);

        if mask.count_ones() == 1 {
            types[mask as usize] = NeighborhoodType::Ending;
        }
        else if !diagonal && !horizontal && !vertical {
            types[mask as usize] = NeighborhoodType::Removable;
        }
    }
    types
}

/// An ending whose only neighbour is itself a junction is a spur, not a ridge end.
fn is_false_ending(binary: &Array2<bool>, ending: Point) -> bool {
    for relative in CORNER_NEIGHBORS {
        let neighbor = ending + relative;
        if get_or(binary, neighbor, false) {
            let count = CORNER_NEIGHBORS.iter().filter(|&&r| get_or(binary, neighbor + r, false)).count();
            return count > 2;
        }
    }
    false
}

/// Reduces ridges to one pixel width, visiting the four parity sub-lattices in
/// turn so that no two adjacent pixels are decided in the same sweep. The
/// outermost pixel frame is always cleared.
pub(crate) fn thin(input: &Array2<bool>) -> Array2<bool> {
    let types = neighborhood_types();
    let (height, width) = input.dim();

    let mut partial = Array2::<bool>::from_elem(input.dim(), false);
    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            partial[[y, x]] = input[[y, x]];
        }
    }

    let mut thinned = Array2::<bool>::from_elem(input.dim(), false);
    let mut removed_anything = true;
    let mut iteration = 0;
    while iteration < MAX_THINNING_ITERATIONS && removed_anything {
        removed_anything = false;
        for even_y in 0..2 {
            for even_x in 0..2 {
                for y in (1 + even_y..height.saturating_sub(1)).step_by(2) {
                    for x in (1 + even_x..width.saturating_sub(1)).step_by(2) {
                        if !partial[[y, x]] || thinned[[y, x]] {
                            continue;
                        }
                        if partial[[y - 1, x]] && partial[[y + 1, x]] && partial[[y, x - 1]] && partial[[y, x + 1]] {
                            continue;
                        }

                        let neighbors = [
                            (partial[[y + 1, x + 1]], BR),
                            (partial[[y + 1, x]], BC),
                            (partial[[y + 1, x - 1]], BL),
                            (partial[[y, x + 1]], CR),
                            (partial[[y, x - 1]], CL),
                            (partial[[y - 1, x + 1]], TR),
                            (partial[[y - 1, x]], TC),
                            (partial[[y - 1, x - 1]], TL),
                        ]
                        .iter()
                        .filter(|(set, _)| *set)
                        .fold(0u32, |acc, (_, bit)| acc | bit);

                        let kind = types[neighbors as usize];
                        let at = Point::new(x as i32, y as i32);
                        if kind == NeighborhoodType::Removable
                            || kind == NeighborhoodType::Ending && is_false_ending(&partial, at)
                        {
                            removed_anything = true;
                            partial[[y, x]] = false;
                        }
                        else {
                            thinned[[y, x]] = true;
                        }
                    }
                }
            }
        }
        iteration += 1;
    }

    thinned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_neighborhood_classification() {
        let types = neighborhood_types();
        assert_eq!(types[0], NeighborhoodType::Removable);
        assert_eq!(types[CL as usize], NeighborhoodType::Ending);
        assert_eq!(types[TR as usize], NeighborhoodType::Ending);
        // part of a horizontal line
        assert_eq!(types[(CL | CR) as usize], NeighborhoodType::Skeleton);
        // part of a vertical line
        assert_eq!(types[(TC | BC) as usize], NeighborhoodType::Skeleton);
        // corner of a solid block
        assert_eq!(types[(CR | BC | BR) as usize], NeighborhoodType::Removable);
        // lone diagonal connection must be kept
        assert_eq!(types[(TL | BR) as usize], NeighborhoodType::Skeleton);
    }

    #[test]
    fn t_thin_line_is_preserved() {
        let mut input = Array2::<bool>::from_elem((20, 30), false);
        for x in 3..25 {
            input[[10, x]] = true;
        }
        let thinned = thin(&input);
        assert_eq!(thinned, input);
    }

    #[test]
    fn t_isolated_pixel_disappears() {
        let mut input = Array2::<bool>::from_elem((10, 10), false);
        input[[5, 5]] = true;
        let thinned = thin(&input);
        assert!(thinned.iter().all(|&v| !v));
    }

    #[test]
    fn t_thick_bar_becomes_thin() {
        let mut input = Array2::<bool>::from_elem((30, 60), false);
        for y in 10..15 {
            for x in 5..55 {
                input[[y, x]] = true;
            }
        }
        let thinned = thin(&input);

        let count = thinned.iter().filter(|&&v| v).count();
        assert!(count > 0);
        assert!(count < 5 * 50 / 2);
        ndarray::Zip::from(&thinned).and(&input).for_each(|&t, &i| assert!(!t || i));

        // no thinned pixel has all four axis neighbours
        for y in 1..29 {
            for x in 1..59 {
                if thinned[[y, x]] {
                    assert!(!(thinned[[y - 1, x]] && thinned[[y + 1, x]] && thinned[[y, x - 1]] && thinned[[y, x + 1]]));
                }
            }
        }
    }

    #[test]
    fn t_border_is_cleared() {
        let input = Array2::<bool>::from_elem((5, 5), true);
        let thinned = thin(&input);
        for i in 0..5 {
            assert!(!thinned[[0, i]] && !thinned[[4, i]] && !thinned[[i, 0]] && !thinned[[i, 4]]);
        }
    }
}
