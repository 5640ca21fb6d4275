//! Block statistics, foreground segmentation and contrast equalization.

use crate::block_map::{BlockMap, Rectangle};
use crate::constants::*;
use crate::utils::{get_or, interpolate_2d, size_of};

use template_manager::fingerprint_base::{round_to_int, Point};

use ndarray::{Array2, Array3};

/// 256-bin intensity histogram of every block, indexed `[[y, x, intensity]]`
pub(crate) fn compute_histogram(blocks: &BlockMap, image: &Array2<u8>) -> Array3<i32> {
    let mut histogram = Array3::<i32>::zeros((blocks.blocks.y as usize, blocks.blocks.x as usize, 256));
    for block in blocks.all_blocks().points() {
        for pixel in blocks.block_area(block).points() {
            let value = image[[pixel.y as usize, pixel.x as usize]];
            histogram[[block.y as usize, block.x as usize, value as usize]] += 1;
        }
    }
    histogram
}

/// Histogram of every corner, summed over the up to four blocks touching it
pub(crate) fn compute_corner_histogram(blocks: &BlockMap, input: &Array3<i32>) -> Array3<i32> {
    const BLOCKS_AROUND: [Point; 4] = [Point::new(0, 0), Point::new(-1, 0), Point::new(0, -1), Point::new(-1, -1)];

    let mut output = Array3::<i32>::zeros((blocks.corners.y as usize, blocks.corners.x as usize, 256));
    for corner in blocks.all_corners().points() {
        for relative in BLOCKS_AROUND {
            let block = corner + relative;
            if !blocks.all_blocks().contains(block) {
                continue;
            }
            for i in 0..256 {
                output[[corner.y as usize, corner.x as usize, i]] += input[[block.y as usize, block.x as usize, i]];
            }
        }
    }
    output
}

/// Foreground block mask (true = fingerprint area)
pub(crate) fn compute_mask(blocks: &BlockMap, histogram: &Array3<i32>) -> Array2<bool> {
    let contrast = compute_clipped_contrast(blocks, histogram);

    // background is marked true until the inversion below
    let mut mask = compute_absolute_contrast(&contrast);
    merge_mask(&mut mask, &compute_relative_contrast(&contrast, blocks));
    merge_vote(&mut mask, MASK_VOTE);
    merge_vote(&mut mask, BLOCK_ERRORS_VOTE);

    let mut mask = invert_mask(&mask);
    merge_vote(&mut mask, BLOCK_ERRORS_VOTE);
    merge_vote(&mut mask, BLOCK_ERRORS_VOTE);
    merge_vote(&mut mask, MASK_FINAL_VOTE);
    mask
}

/// Sets every cell the voting filter elects, keeping cells already set
fn merge_vote(mask: &mut Array2<bool>, params: VoteParams) {
    let votes = apply_voting_filter(mask, params);
    merge_mask(mask, &votes);
}

/// Spread between the intensities found `CLIP_FRACTION` from either end of each block histogram
pub(crate) fn compute_clipped_contrast(blocks: &BlockMap, histogram: &Array3<i32>) -> Array2<u8> {
    let mut result = Array2::<u8>::zeros((blocks.blocks.y as usize, blocks.blocks.x as usize));
    for block in blocks.all_blocks().points() {
        let bins = histogram.slice(ndarray::s![block.y as usize, block.x as usize, ..]);
        let area: i32 = bins.sum();
        let clip_limit = round_to_int(area as f64 * CLIP_FRACTION);

        let mut accumulator = 0;
        let mut lower_bound = 255;
        for i in 0..256 {
            accumulator += bins[i];
            if accumulator > clip_limit {
                lower_bound = i as i32;
                break;
            }
        }

        accumulator = 0;
        let mut upper_bound = 0;
        for i in (0..256).rev() {
            accumulator += bins[i];
            if accumulator > clip_limit {
                upper_bound = i as i32;
                break;
            }
        }

        result[[block.y as usize, block.x as usize]] = (upper_bound - lower_bound).clamp(0, 255) as u8;
    }
    result
}

pub(crate) fn compute_absolute_contrast(contrast: &Array2<u8>) -> Array2<bool> {
    contrast.mapv(|c| c < MIN_ABSOLUTE_CONTRAST)
}

/// Marks blocks whose contrast falls well below the average of the best blocks
pub(crate) fn compute_relative_contrast(contrast: &Array2<u8>, blocks: &BlockMap) -> Array2<bool> {
    let mut sorted: Vec<u8> = contrast.iter().copied().collect();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let pixels_per_block = (blocks.all_pixels().area() / blocks.all_blocks().area()).max(1);
    let sample_count = sorted.len().min((RELATIVE_CONTRAST_SAMPLE / pixels_per_block) as usize);
    let considered = (round_to_int(sample_count as f64 * RELATIVE_CONTRAST_PERCENTILE).max(1) as usize).min(sorted.len());

    let average = sorted[..considered].iter().map(|&c| c as i32).sum::<i32>() / considered as i32;
    let limit = round_to_int(average as f64 * MIN_RELATIVE_CONTRAST);

    contrast.mapv(|c| (c as i32) < limit)
}

/// Majority vote over the clipped `(2r+1)^2` neighbourhood of every cell at
/// least `border_distance` cells away from the edge. Other cells come out false.
pub(crate) fn apply_voting_filter(input: &Array2<bool>, params: VoteParams) -> Array2<bool> {
    let size = size_of(input);
    let radius = params.radius;
    let border = params.border_distance;

    let mut output = Array2::<bool>::from_elem(input.dim(), false);
    for y in border..size.y - border {
        for x in border..size.x - border {
            let neighborhood = Rectangle::between(
                Point::new((x - radius).max(0), (y - radius).max(0)),
                Point::new((x + radius + 1).min(size.x), (y + radius + 1).min(size.y)),
            );

            let ones = neighborhood.points().filter(|p| input[[p.y as usize, p.x as usize]]).count();
            let vote_weight = 1.0 / neighborhood.area() as f64;
            if ones as f64 * vote_weight >= params.majority {
                output[[y as usize, x as usize]] = true;
            }
        }
    }
    output
}

pub(crate) fn merge_mask(mask: &mut Array2<bool>, merged: &Array2<bool>) {
    ndarray::Zip::from(mask).and(merged).for_each(|m, &other| *m |= other);
}

pub(crate) fn invert_mask(mask: &Array2<bool>) -> Array2<bool> {
    mask.mapv(|v| !v)
}

/// Expands a block mask to pixel resolution
pub(crate) fn fill_blocks(mask: &Array2<bool>, blocks: &BlockMap) -> Array2<bool> {
    let mut pixelized = Array2::<bool>::from_elem((blocks.pixels.y as usize, blocks.pixels.x as usize), false);
    for block in blocks.all_blocks().points() {
        if mask[[block.y as usize, block.x as usize]] {
            for pixel in blocks.block_area(block).points() {
                pixelized[[pixel.y as usize, pixel.x as usize]] = true;
            }
        }
    }
    pixelized
}

/// Contrast-limited histogram equalization into `[-1, 1]`.
///
/// Every corner touching a foreground block gets a remapping curve from its
/// histogram; the curve's slope is held within the scaling limits so flat
/// blocks don't amplify noise. Pixels blend the curves of their block's four
/// corners. Background pixels stay 0.
pub(crate) fn equalize(blocks: &BlockMap, image: &Array2<u8>, histogram: &Array3<i32>, block_mask: &Array2<bool>) -> Array2<f64> {
    const RANGE_MIN: f64 = -1.0;
    const RANGE_MAX: f64 = 1.0;
    const RANGE_SIZE: f64 = RANGE_MAX - RANGE_MIN;
    let width_max = RANGE_SIZE / 256.0 * MAX_EQUALIZATION_SCALING;
    let width_min = RANGE_SIZE / 256.0 * MIN_EQUALIZATION_SCALING;

    let mut limited_min = [0.0; 256];
    let mut limited_max = [0.0; 256];
    let mut to_float = [0.0; 256];
    for i in 0..256 {
        limited_min[i] = (i as f64 * width_min + RANGE_MIN).max(RANGE_MAX - (255 - i) as f64 * width_max);
        limited_max[i] = (i as f64 * width_max + RANGE_MIN).min(RANGE_MAX - (255 - i) as f64 * width_min);
        // fractional on purpose: integer division would zero every bin but the last
        to_float[i] = i as f64 / 255.0;
    }

    let mut corner_mapping = Array3::<f64>::zeros((blocks.corners.y as usize, blocks.corners.x as usize, 256));
    for corner in blocks.all_corners().points() {
        let touches_foreground = [Point::new(0, 0), Point::new(-1, 0), Point::new(0, -1), Point::new(-1, -1)]
            .iter()
            .any(|&relative| get_or(block_mask, corner + relative, false));
        if !touches_foreground {
            continue;
        }

        let (cy, cx) = (corner.y as usize, corner.x as usize);
        let area: i32 = (0..256).map(|i| histogram[[cy, cx, i]]).sum();
        let width_weight = RANGE_SIZE / area as f64;

        let mut top = RANGE_MIN;
        for i in 0..256 {
            let width = histogram[[cy, cx, i]] as f64 * width_weight;
            let equalized = top + to_float[i] * width;
            top += width;

            corner_mapping[[cy, cx, i]] = equalized.clamp(limited_min[i], limited_max[i]);
        }
    }

    let mut result = Array2::<f64>::zeros((blocks.pixels.y as usize, blocks.pixels.x as usize));
    for block in blocks.all_blocks().points() {
        if !block_mask[[block.y as usize, block.x as usize]] {
            continue;
        }

        let area = blocks.block_area(block);
        let (by, bx) = (block.y as usize, block.x as usize);
        for pixel in area.points() {
            let (py, px) = (pixel.y as usize, pixel.x as usize);
            let value = image[[py, px]] as usize;

            let bottom_left = corner_mapping[[by, bx, value]];
            let bottom_right = corner_mapping[[by, bx + 1, value]];
            let top_left = corner_mapping[[by + 1, bx, value]];
            let top_right = corner_mapping[[by + 1, bx + 1, value]];

            result[[py, px]] = interpolate_2d(top_left, top_right, bottom_left, bottom_right, area.fraction(pixel));
        }
    }
    result
}
