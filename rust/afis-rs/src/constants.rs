// Empirically tuned parameters. Scores are only comparable with thresholds
// calibrated against exactly these values.

use template_manager::angle::from_degrees_b;

// resolution
pub(crate) const DEFAULT_DPI: i32 = 500;
pub(crate) const BLOCK_SIZE: i32 = 15;

// contrast & segmentation
pub(crate) const CLIP_FRACTION: f64 = 0.08;
pub(crate) const MIN_ABSOLUTE_CONTRAST: u8 = 17;
pub(crate) const RELATIVE_CONTRAST_SAMPLE: i32 = 168568;
pub(crate) const RELATIVE_CONTRAST_PERCENTILE: f64 = 0.49;
pub(crate) const MIN_RELATIVE_CONTRAST: f64 = 0.34;

/// Parameters of one majority-vote pass over a boolean grid.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VoteParams {
    pub radius: i32,
    pub majority: f64,
    pub border_distance: i32,
}

pub(crate) const MASK_VOTE: VoteParams = VoteParams { radius: 9, majority: 0.86, border_distance: 7 };
pub(crate) const BLOCK_ERRORS_VOTE: VoteParams = VoteParams { radius: 1, majority: 0.7, border_distance: 4 };
pub(crate) const MASK_FINAL_VOTE: VoteParams = VoteParams { radius: 7, majority: 0.51, border_distance: 4 };
pub(crate) const BINARIZED_VOTE: VoteParams = VoteParams { radius: 2, majority: 0.61, border_distance: 17 };

// equalization
pub(crate) const MAX_EQUALIZATION_SCALING: f64 = 3.99;
pub(crate) const MIN_EQUALIZATION_SCALING: f64 = 0.25;

// orientation
pub(crate) const ORIENTATION_SPLIT: usize = 50;
pub(crate) const ORIENTATIONS_CHECKED: usize = 20;
pub(crate) const MIN_HALF_DISTANCE: f64 = 2.0;
pub(crate) const MAX_HALF_DISTANCE: f64 = 6.0;
pub(crate) const ORIENTATION_SEED: u64 = 0;
pub(crate) const ORIENTATION_SMOOTHING_RADIUS: i32 = 1;

/// Shape of a family of oriented smoothing lines.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineParams {
    pub resolution: usize,
    pub radius: i32,
    pub step: f64,
}

pub(crate) const RIDGE_LINES: LineParams = LineParams { resolution: 32, radius: 7, step: 1.59 };
pub(crate) const ORTHOGONAL_LINES: LineParams = LineParams { resolution: 11, radius: 4, step: 1.11 };

pub(crate) const MIN_BORDER_DISTANCE: i32 = 14;

// thinning
pub(crate) const MAX_THINNING_ITERATIONS: usize = 26;

// skeleton cleanup
pub(crate) const MAX_PORE_ARM: usize = 41;
pub(crate) const MIN_GAP_ENDING_LENGTH: usize = 7;
pub(crate) const RUPTURE_SIZE: i32 = 5;
pub(crate) const GAP_SIZE: i32 = 20;
pub(crate) const GAP_ANGLE: u8 = 32;
pub(crate) const GAP_ANGLE_OFFSET: usize = 22;
pub(crate) const TOLERATED_GAP_OVERLAP: usize = 2;
pub(crate) const MIN_TAIL_LENGTH: usize = 21;
pub(crate) const MIN_FRAGMENT_LENGTH: usize = 22;

// minutia direction sampling
pub(crate) const RIDGE_DIRECTION_SKIP: usize = 1;
pub(crate) const RIDGE_DIRECTION_SAMPLE: usize = 21;

// minutia filters
pub(crate) const MASK_DISPLACEMENT: f64 = 10.06;
pub(crate) const MINUTIA_CLOUD_RADIUS: i32 = 20;
pub(crate) const MAX_CLOUD_SIZE: usize = 4;
pub(crate) const MAX_MINUTIAE: usize = 100;
pub(crate) const SORT_BY_NEIGHBOR: usize = 5;

// edge table
pub(crate) const EDGE_TABLE_RANGE: i32 = 490;
pub(crate) const EDGE_TABLE_NEIGHBORS: usize = 9;

// matching
pub(crate) const MAX_DISTANCE_ERROR: i32 = 13;
pub(crate) const MAX_ANGLE_ERROR: u8 = from_degrees_b(10);
pub(crate) const MIN_ROOT_EDGE_LENGTH: i32 = 58;
pub(crate) const MAX_ROOT_EDGE_LOOKUPS: usize = 1633;
pub(crate) const MAX_TRIED_ROOTS: usize = 70;
pub(crate) const MAX_TRIED_TRIANGLES: usize = 7538;

// scoring
pub(crate) const MIN_SUPPORTING_EDGES: u32 = 1;
pub(crate) const DISTANCE_ERROR_FLATNESS: f64 = 0.69;
pub(crate) const ANGLE_ERROR_FLATNESS: f64 = 0.27;
pub(crate) const PAIR_COUNT_FACTOR: f64 = 0.032;
pub(crate) const PAIR_FRACTION_FACTOR: f64 = 8.98;
pub(crate) const CORRECT_TYPE_FACTOR: f64 = 0.629;
pub(crate) const SUPPORTED_COUNT_FACTOR: f64 = 0.193;
pub(crate) const EDGE_COUNT_FACTOR: f64 = 0.265;
pub(crate) const DISTANCE_ACCURACY_FACTOR: f64 = 9.9;
pub(crate) const ANGLE_ACCURACY_FACTOR: f64 = 2.79;
