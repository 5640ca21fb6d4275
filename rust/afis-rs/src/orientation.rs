//! Block-wise ridge orientation field.
//!
//! Orientations are kept as double-angle vectors so that opposite directions
//! reinforce rather than cancel; the final byte per block therefore stores the
//! doubled angle.

use crate::block_map::{BlockMap, Rectangle};
use crate::constants::*;
use crate::utils::{interpolate_exponential, size_of};

use template_manager::angle;
use template_manager::fingerprint_base::{compare_yx, Point, PointF, PI};

use lazy_static::lazy_static;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Pair of opposite pixel offsets tested around each pixel, and the
/// double-angle vector credited when the center pixel dominates both.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConsideredOrientation {
    pub check_location: Point,
    pub orientation_vector: PointF,
}

lazy_static! {
    /// Sampling groups shared by every template built by this process
    static ref TESTED_ORIENTATIONS: Vec<Vec<ConsideredOrientation>> = tested_orientations();
}

fn tested_orientations() -> Vec<Vec<ConsideredOrientation>> {
    let mut rng = ChaCha8Rng::seed_from_u64(ORIENTATION_SEED);

    let mut splits = Vec::with_capacity(ORIENTATION_SPLIT);
    for _ in 0..ORIENTATION_SPLIT {
        let mut orientations: Vec<ConsideredOrientation> = Vec::with_capacity(ORIENTATIONS_CHECKED);
        for _ in 0..ORIENTATIONS_CHECKED {
            let check_location = loop {
                let direction = angle::from_fraction(rng.random::<f64>() * 0.5);
                let distance = interpolate_exponential(MIN_HALF_DISTANCE, MAX_HALF_DISTANCE, rng.random::<f64>());
                let candidate = (distance * angle::to_vector(direction)).round();
                if candidate != Point::default() && candidate.y >= 0 {
                    break candidate;
                }
            };

            let orientation_vector = angle::to_vector(angle::add(
                angle::to_orientation(angle::atan(check_location.to_float())),
                PI,
            ));

            if orientations.iter().all(|o| o.check_location != check_location) {
                orientations.push(ConsideredOrientation { check_location, orientation_vector });
            }
        }

        orientations.sort_by(|a, b| compare_yx(&a.check_location, &b.check_location));
        splits.push(orientations);
    }

    splits
}

/// Orientation byte (doubled angle) of every foreground block
pub(crate) fn compute_orientation_map(image: &Array2<f64>, mask: &Array2<bool>, blocks: &BlockMap) -> Array2<u8> {
    let accumulated = compute_pixelwise_orientation(image, mask, blocks);
    let by_block = average_block_orientations(&accumulated, blocks, mask);
    let smooth = smooth_orientation_map(&by_block, mask);
    convert_vectors_to_angles(&smooth, mask)
}

/// Columns spanned by foreground blocks on one block row, as `[first, last + 1)`
fn mask_line_range(mask: &Array2<bool>, y: usize) -> Option<(usize, usize)> {
    let row = mask.row(y);
    let first = row.iter().position(|&m| m)?;
    let last = row.iter().rposition(|&m| m)?;
    Some((first, last + 1))
}

fn compute_pixelwise_orientation(input: &Array2<f64>, mask: &Array2<bool>, blocks: &BlockMap) -> Array2<PointF> {
    let neighbors = &*TESTED_ORIENTATIONS;
    let size = size_of(input);

    let mut orientation = Array2::<PointF>::from_elem(input.dim(), PointF::default());
    for block_y in 0..blocks.blocks.y {
        let Some((first, end)) = mask_line_range(mask, block_y as usize) else {
            continue;
        };
        let valid_left = blocks.block_area(Point::new(first as i32, block_y)).left();
        let valid_right = blocks.block_area(Point::new(end as i32 - 1, block_y)).right();

        let row = blocks.block_area(Point::new(0, block_y));
        for y in row.bottom()..row.top() {
            for neighbor in &neighbors[y as usize % neighbors.len()] {
                let check = neighbor.check_location;
                let radius = check.x.abs().max(check.y.abs());
                if y - radius < 0 || y + radius >= size.y {
                    continue;
                }

                let x_begin = radius.max(valid_left);
                let x_end = (size.x - radius).min(valid_right);
                for x in x_begin..x_end {
                    let before = input[[(y - check.y) as usize, (x - check.x) as usize]];
                    let at = input[[y as usize, x as usize]];
                    let after = input[[(y + check.y) as usize, (x + check.x) as usize]];
                    let strength = at - before.max(after);
                    if strength > 0.0 {
                        orientation[[y as usize, x as usize]] += strength * neighbor.orientation_vector;
                    }
                }
            }
        }
    }

    orientation
}

/// Sum of the pixel vectors of every foreground block. Only the angle of the
/// aggregate matters downstream, so it is left unnormalized.
fn average_block_orientations(orientation: &Array2<PointF>, blocks: &BlockMap, mask: &Array2<bool>) -> Array2<PointF> {
    let mut sums = Array2::<PointF>::from_elem(mask.dim(), PointF::default());
    for block in blocks.all_blocks().points() {
        if !mask[[block.y as usize, block.x as usize]] {
            continue;
        }
        let mut sum = PointF::default();
        for pixel in blocks.block_area(block).points() {
            sum += orientation[[pixel.y as usize, pixel.x as usize]];
        }
        sums[[block.y as usize, block.x as usize]] = sum;
    }
    sums
}

fn smooth_orientation_map(orientation: &Array2<PointF>, mask: &Array2<bool>) -> Array2<PointF> {
    let radius = ORIENTATION_SMOOTHING_RADIUS;
    let size = size_of(mask);

    let mut smoothed = Array2::<PointF>::from_elem(mask.dim(), PointF::default());
    for block in Rectangle::of_size(size).points() {
        if !mask[[block.y as usize, block.x as usize]] {
            continue;
        }
        let neighbors = Rectangle::between(
            Point::new((block.x - radius).max(0), (block.y - radius).max(0)),
            Point::new((block.x + radius + 1).min(size.x), (block.y + radius + 1).min(size.y)),
        );
        let mut sum = PointF::default();
        for n in neighbors.points() {
            if mask[[n.y as usize, n.x as usize]] {
                sum += orientation[[n.y as usize, n.x as usize]];
            }
        }
        smoothed[[block.y as usize, block.x as usize]] = sum;
    }
    smoothed
}

fn convert_vectors_to_angles(vectors: &Array2<PointF>, mask: &Array2<bool>) -> Array2<u8> {
    let mut angles = Array2::<u8>::zeros(mask.dim());
    ndarray::Zip::from(&mut angles).and(vectors).and(mask).for_each(|a, &v, &m| {
        if m {
            *a = angle::to_byte(angle::atan(v));
        }
    });
    angles
}
