//! Oriented smoothing, binarization and the masks derived from it.

use crate::block_map::{BlockMap, Rectangle};
use crate::constants::*;
use crate::preprocess::{apply_voting_filter, invert_mask};
use crate::utils::size_of;

use template_manager::angle;
use template_manager::fingerprint_base::{compare_yx, Point};

use ndarray::Array2;

/// One sampling line per orientation bucket: integer offsets along the bucket
/// center direction, symmetric around the origin, sorted by (y, x).
pub(crate) fn construct_oriented_lines(params: LineParams) -> Vec<Vec<Point>> {
    (0..params.resolution)
        .map(|orientation| {
            let mut line = vec![Point::default()];
            let direction = angle::to_vector(angle::by_bucket_center(orientation as i32, 2 * params.resolution as i32));

            let mut r = params.radius as f64;
            while r >= 0.5 {
                let point = (r * direction).round();
                if !line.contains(&point) {
                    line.push(point);
                    line.push(-point);
                }
                r /= params.step;
            }

            line.sort_by(compare_yx);
            line
        })
        .collect()
}

/// Averages every pixel of a foreground block along the line matching the
/// block orientation rotated by `rotation`. Offsets falling outside the image
/// are skipped but still count towards the divisor.
pub(crate) fn smooth_by_orientation(
    input: &Array2<f64>,
    orientation: &Array2<u8>,
    mask: &Array2<bool>,
    blocks: &BlockMap,
    rotation: u8,
    lines: &[Vec<Point>],
) -> Array2<f64> {
    let image = blocks.all_pixels();
    let mut output = Array2::<f64>::zeros(input.dim());

    for block in blocks.all_blocks().points() {
        let (by, bx) = (block.y as usize, block.x as usize);
        if !mask[[by, bx]] {
            continue;
        }

        let line = &lines[angle::quantize_b(angle::add_b(orientation[[by, bx]], rotation), lines.len())];
        let block_area = blocks.block_area(block);
        for &offset in line {
            let source = block_area.shifted(offset).clipped(&image);
            let target = source.shifted(-offset);
            for pixel in target.points() {
                let from = pixel + offset;
                output[[pixel.y as usize, pixel.x as usize]] += input[[from.y as usize, from.x as usize]];
            }
        }

        let scale = 1.0 / line.len() as f64;
        for pixel in block_area.points() {
            output[[pixel.y as usize, pixel.x as usize]] *= scale;
        }
    }

    output
}

/// Ridge pixels: foreground pixels where the ridge-aligned average exceeds the
/// orthogonal baseline.
pub(crate) fn binarize(input: &Array2<f64>, baseline: &Array2<f64>, mask: &Array2<bool>, blocks: &BlockMap) -> Array2<bool> {
    let mut binarized = Array2::<bool>::from_elem(input.dim(), false);
    for block in blocks.all_blocks().points() {
        if !mask[[block.y as usize, block.x as usize]] {
            continue;
        }
        for pixel in blocks.block_area(block).points() {
            let (y, x) = (pixel.y as usize, pixel.x as usize);
            if input[[y, x]] - baseline[[y, x]] > 0.0 {
                binarized[[y, x]] = true;
            }
        }
    }
    binarized
}

/// Clears isolated ridge islands, fills small holes, then removes crosses.
pub(crate) fn cleanup_binarized(binary: &mut Array2<bool>) {
    let islands = apply_voting_filter(&invert_mask(binary), BINARIZED_VOTE);
    let holes = apply_voting_filter(binary, BINARIZED_VOTE);
    ndarray::Zip::from(&mut *binary).and(&islands).and(&holes).for_each(|b, &island, &hole| {
        *b = *b && !island || hole;
    });
    remove_crosses(binary);
}

/// Clears every 2x2 square holding a diagonal XOR pattern, repeated until none is left.
pub(crate) fn remove_crosses(input: &mut Array2<bool>) {
    let (height, width) = input.dim();
    if height < 2 || width < 2 {
        return;
    }

    let mut any = true;
    while any {
        any = false;
        for y in 0..height - 1 {
            for x in 0..width - 1 {
                let bottom_left = input[[y, x]];
                let bottom_right = input[[y, x + 1]];
                let top_left = input[[y + 1, x]];
                let top_right = input[[y + 1, x + 1]];
                if bottom_left && top_right && !top_left && !bottom_right || top_left && bottom_right && !bottom_left && !top_right {
                    input[[y, x]] = false;
                    input[[y, x + 1]] = false;
                    input[[y + 1, x]] = false;
                    input[[y + 1, x + 1]] = false;
                    any = true;
                }
            }
        }
    }
}

/// Valley map: background of the binarized image, restricted to the foreground
pub(crate) fn invert_within(binary: &Array2<bool>, mask: &Array2<bool>) -> Array2<bool> {
    let mut inverted = Array2::<bool>::from_elem(binary.dim(), false);
    ndarray::Zip::from(&mut inverted).and(binary).and(mask).for_each(|i, &b, &m| *i = !b && m);
    inverted
}

/// Pixel mask eroded by `MIN_BORDER_DISTANCE`, using doubling erosion steps.
pub(crate) fn compute_inner_mask(outer: &Array2<bool>) -> Array2<bool> {
    let size = size_of(outer);
    let mut inner = Array2::<bool>::from_elem(outer.dim(), false);
    for p in Rectangle::new(1, 1, size.x - 2, size.y - 2).points() {
        inner[[p.y as usize, p.x as usize]] = outer[[p.y as usize, p.x as usize]];
    }

    inner = shrink_mask(&inner, 1);
    let mut total = 1;
    let mut step = 1;
    while total + step <= MIN_BORDER_DISTANCE {
        inner = shrink_mask(&inner, step);
        total += step;
        step *= 2;
    }
    if total < MIN_BORDER_DISTANCE {
        inner = shrink_mask(&inner, MIN_BORDER_DISTANCE - total);
    }
    inner
}

/// Keeps a pixel only if the four pixels `amount` away along both axes are set.
pub(crate) fn shrink_mask(mask: &Array2<bool>, amount: i32) -> Array2<bool> {
    let size = size_of(mask);
    let mut shrunk = Array2::<bool>::from_elem(mask.dim(), false);
    let a = amount as usize;
    for p in Rectangle::new(amount, amount, size.x - 2 * amount, size.y - 2 * amount).points() {
        let (y, x) = (p.y as usize, p.x as usize);
        shrunk[[y, x]] = mask[[y - a, x]] && mask[[y + a, x]] && mask[[y, x - a]] && mask[[y, x + a]];
    }
    shrunk
}
