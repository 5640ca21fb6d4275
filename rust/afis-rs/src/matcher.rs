//! Graph-growth matching of a candidate template against an indexed probe.
//!
//! Matching starts from root pairs found through a hash of probe edges. From
//! each root, neighbouring minutia pairs with matching edges are added shortest
//! edge first until no more pairs can be reached. The best root's score wins.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::ops::ControlFlow;

use crate::constants::*;
use crate::edge_shape::EdgeShape;
use crate::template::{FingerprintTemplate, NeighborEdge};
use crate::utils::div_round_up;

use template_manager::angle;

use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
struct MinutiaPair {
    probe: usize,
    candidate: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct PairInfo {
    pair: MinutiaPair,
    reference: MinutiaPair,
    supporting_edges: u32,
}

#[derive(Debug, Clone, Copy)]
struct IndexedEdge {
    shape: EdgeShape,
    reference: usize,
}

/// Pair waiting to be added, ordered by the length of the candidate edge
/// that reached it and then by arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueuedPair {
    distance: i32,
    sequence: u64,
    reference: MinutiaPair,
    neighbor: MinutiaPair,
}

/// Result of the best root found while matching
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchOutcome {
    pub score: f64,
    pub pair_count: usize,
}

/// Working memory of one match. Reusing it across candidates avoids
/// reallocating; a scratch must not be shared by concurrent matches.
#[derive(Debug, Default)]
pub struct MatchScratch {
    pairs: Vec<PairInfo>,
    by_probe: Vec<Option<usize>>,
    by_candidate: Vec<Option<usize>>,
    queue: BinaryHeap<Reverse<QueuedPair>>,
    sequence: u64,
}

impl MatchScratch {
    pub fn new() -> MatchScratch {
        MatchScratch::default()
    }

    fn reset(&mut self, root: MinutiaPair, probe_count: usize, candidate_count: usize) {
        self.pairs.clear();
        self.by_probe.clear();
        self.by_probe.resize(probe_count, None);
        self.by_candidate.clear();
        self.by_candidate.resize(candidate_count, None);
        self.queue.clear();
        self.sequence = 0;

        self.by_probe[root.probe] = Some(0);
        self.by_candidate[root.candidate] = Some(0);
        self.pairs.push(PairInfo { pair: root, reference: root, supporting_edges: 0 });
    }

    fn is_paired(&self, pair: MinutiaPair) -> bool {
        self.by_probe[pair.probe].is_some() || self.by_candidate[pair.candidate].is_some()
    }

    /// Credits both pairs of an edge whose ends are already paired to each other
    fn support(&mut self, reference: MinutiaPair, neighbor: MinutiaPair) {
        let Some(existing) = self.by_probe[neighbor.probe] else { return };
        if self.pairs[existing].pair.candidate != neighbor.candidate {
            return;
        }
        if let Some(from) = self.by_probe[reference.probe] {
            self.pairs[from].supporting_edges += 1;
        }
        self.pairs[existing].supporting_edges += 1;
    }

    fn enqueue(&mut self, distance: i32, reference: MinutiaPair, neighbor: MinutiaPair) {
        self.queue.push(Reverse(QueuedPair { distance, sequence: self.sequence, reference, neighbor }));
        self.sequence += 1;
    }

    fn add_pair(&mut self, queued: QueuedPair) {
        let index = self.pairs.len();
        self.by_probe[queued.neighbor.probe] = Some(index);
        self.by_candidate[queued.neighbor.candidate] = Some(index);
        self.pairs.push(PairInfo { pair: queued.neighbor, reference: queued.reference, supporting_edges: 0 });
    }
}

/// Probe template indexed for matching against any number of candidates
#[derive(Debug, Clone)]
pub struct Matcher<'p> {
    probe: &'p FingerprintTemplate,
    edge_hash: HashMap<i32, Vec<IndexedEdge>>,
}

impl<'p> Matcher<'p> {
    /// Indexes every directed edge of the probe under all hash keys its
    /// tolerance window covers
    pub fn new(probe: &'p FingerprintTemplate) -> Matcher<'p> {
        let minutiae = probe.minutiae();
        let mut edge_hash: HashMap<i32, Vec<IndexedEdge>> = HashMap::new();
        for (reference, reference_minutia) in minutiae.iter().enumerate() {
            for (neighbor, neighbor_minutia) in minutiae.iter().enumerate() {
                if reference == neighbor {
                    continue;
                }
                let edge = IndexedEdge { shape: EdgeShape::new(reference_minutia, neighbor_minutia), reference };
                for key in shape_coverage(&edge.shape) {
                    edge_hash.entry(key).or_default().push(edge);
                }
            }
        }
        debug!("edge hash: {} keys over {} minutiae", edge_hash.len(), minutiae.len());
        Matcher { probe, edge_hash }
    }

    /// Similarity score of the candidate, 0 when nothing matches
    pub fn match_template(&self, candidate: &FingerprintTemplate) -> f64 {
        self.match_details(candidate).score
    }

    pub fn match_with_scratch(&self, candidate: &FingerprintTemplate, scratch: &mut MatchScratch) -> f64 {
        self.best_root(candidate, scratch).score
    }

    pub fn match_details(&self, candidate: &FingerprintTemplate) -> MatchOutcome {
        self.best_root(candidate, &mut MatchScratch::new())
    }

    fn best_root(&self, candidate: &FingerprintTemplate, scratch: &mut MatchScratch) -> MatchOutcome {
        let mut best = MatchOutcome::default();
        let mut tried_roots = 0;
        let mut tried_triangles = 0;

        self.enumerate_roots(candidate, |root| {
            let outcome = self.try_root(candidate, scratch, root);
            trace!("root {:?}: {} pairs, score {:.4}", root, outcome.pair_count, outcome.score);
            if outcome.score > best.score {
                best = outcome;
            }

            tried_roots += 1;
            if tried_roots >= MAX_TRIED_ROOTS {
                return ControlFlow::Break(());
            }
            if outcome.pair_count >= 3 {
                tried_triangles += 1;
                if tried_triangles >= MAX_TRIED_TRIANGLES {
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        });

        debug!("best score {:.4} with {} pairs after {} roots", best.score, best.pair_count, tried_roots);
        best
    }

    /// Feeds root pairs to `visit`: candidate edges of at least
    /// `MIN_ROOT_EDGE_LENGTH` first, short range pairs before long range ones
    fn enumerate_roots<F>(&self, candidate: &FingerprintTemplate, mut visit: F)
    where
        F: FnMut(MinutiaPair) -> ControlFlow<()>,
    {
        let _ = self.visit_roots(candidate, &mut visit);
    }

    fn visit_roots<F>(&self, candidate: &FingerprintTemplate, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(MinutiaPair) -> ControlFlow<()>,
    {
        let minutiae = candidate.minutiae();
        let count = minutiae.len();
        let mut lookups = 0;

        for long_edges in [true, false] {
            for step in 1..count {
                for pass in 0..=step {
                    for candidate_reference in (pass..count).step_by(step + 1) {
                        let candidate_neighbor = (candidate_reference + step) % count;
                        let edge = EdgeShape::new(&minutiae[candidate_reference], &minutiae[candidate_neighbor]);
                        if (edge.length >= MIN_ROOT_EDGE_LENGTH) != long_edges {
                            continue;
                        }
                        let Some(matches) = self.edge_hash.get(&hash_shape(&edge)) else { continue };

                        for indexed in matches.iter().filter(|indexed| matching_shapes(&indexed.shape, &edge)) {
                            visit(MinutiaPair { probe: indexed.reference, candidate: candidate_reference })?;
                            lookups += 1;
                            if lookups >= MAX_ROOT_EDGE_LOOKUPS {
                                return ControlFlow::Break(());
                            }
                        }
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn try_root(&self, candidate: &FingerprintTemplate, scratch: &mut MatchScratch, root: MinutiaPair) -> MatchOutcome {
        scratch.reset(root, self.probe.len(), candidate.len());
        self.build_pairing(candidate, scratch);
        MatchOutcome { score: self.compute_score(candidate, scratch), pair_count: scratch.pairs.len() }
    }

    fn build_pairing(&self, candidate: &FingerprintTemplate, scratch: &mut MatchScratch) {
        loop {
            self.collect_edges(candidate, scratch);
            skip_paired(scratch);
            match scratch.queue.pop() {
                Some(Reverse(queued)) => scratch.add_pair(queued),
                None => break,
            }
        }
    }

    /// Queues unpaired neighbours of the most recent pair and credits
    /// edges to neighbours that are already paired consistently
    fn collect_edges(&self, candidate: &FingerprintTemplate, scratch: &mut MatchScratch) {
        let Some(last) = scratch.pairs.last() else { return };
        let reference = last.pair;
        let probe_star = &self.probe.edge_table()[reference.probe];
        let candidate_star = &candidate.edge_table()[reference.candidate];

        for (neighbor, distance) in find_matching_pairs(probe_star, candidate_star) {
            if !scratch.is_paired(neighbor) {
                scratch.enqueue(distance, reference, neighbor);
            } else {
                scratch.support(reference, neighbor);
            }
        }
    }

    fn compute_score(&self, candidate: &FingerprintTemplate, scratch: &MatchScratch) -> f64 {
        let probe_minutiae = self.probe.minutiae();
        let candidate_minutiae = candidate.minutiae();
        let pair_count = scratch.pairs.len();

        let mut score = PAIR_COUNT_FACTOR * pair_count as f64;
        score += PAIR_FRACTION_FACTOR
            * (pair_count as f64 / probe_minutiae.len() as f64 + pair_count as f64 / candidate_minutiae.len() as f64)
            / 2.0;

        for info in &scratch.pairs {
            if info.supporting_edges >= MIN_SUPPORTING_EDGES {
                score += SUPPORTED_COUNT_FACTOR;
            }
            score += EDGE_COUNT_FACTOR * (info.supporting_edges + 1) as f64;
            if probe_minutiae[info.pair.probe].kind == candidate_minutiae[info.pair.candidate].kind {
                score += CORRECT_TYPE_FACTOR;
            }
        }

        if pair_count < 2 {
            return score;
        }

        let inner_distance_radius = (DISTANCE_ERROR_FLATNESS * MAX_DISTANCE_ERROR as f64).round() as i32;
        let inner_angle_radius = (ANGLE_ERROR_FLATNESS * MAX_ANGLE_ERROR as f64).round() as i32;

        let mut distance_error_sum = 0;
        let mut angle_error_sum = 0;
        for info in &scratch.pairs[1..] {
            let probe_edge = EdgeShape::new(&probe_minutiae[info.reference.probe], &probe_minutiae[info.pair.probe]);
            let candidate_edge =
                EdgeShape::new(&candidate_minutiae[info.reference.candidate], &candidate_minutiae[info.pair.candidate]);
            distance_error_sum += (probe_edge.length - candidate_edge.length).abs();
            // the reference angle is floored by the distance radius
            angle_error_sum += inner_distance_radius
                .max(angle::distance_b(probe_edge.reference_angle, candidate_edge.reference_angle) as i32);
            angle_error_sum +=
                inner_angle_radius.max(angle::distance_b(probe_edge.neighbor_angle, candidate_edge.neighbor_angle) as i32);
        }

        let max_distance_error = MAX_DISTANCE_ERROR * (pair_count as i32 - 1);
        score += DISTANCE_ACCURACY_FACTOR * (max_distance_error - distance_error_sum) as f64 / max_distance_error as f64;
        let max_angle_error = MAX_ANGLE_ERROR as i32 * (pair_count as i32 - 1) * 2;
        score += ANGLE_ACCURACY_FACTOR * (max_angle_error - angle_error_sum) as f64 / max_angle_error as f64;

        score
    }
}

/// Drops queued pairs whose minutiae were paired meanwhile, crediting the
/// ones that agree with the existing pairing
fn skip_paired(scratch: &mut MatchScratch) {
    while let Some(&Reverse(queued)) = scratch.queue.peek() {
        if !scratch.is_paired(queued.neighbor) {
            break;
        }
        scratch.queue.pop();
        scratch.support(queued.reference, queued.neighbor);
    }
}

/// Neighbour pairs whose edges from the reference pair match, with the
/// length of the candidate edge. Both stars are sorted by length.
fn find_matching_pairs(probe_star: &[NeighborEdge], candidate_star: &[NeighborEdge]) -> Vec<(MinutiaPair, i32)> {
    let mut results = Vec::new();
    let mut begin = 0;
    let mut end = 0;

    for candidate_edge in candidate_star {
        let length = candidate_edge.shape.length;
        while begin < probe_star.len() && probe_star[begin].shape.length < length - MAX_DISTANCE_ERROR {
            begin += 1;
        }
        end = end.max(begin);
        while end < probe_star.len() && probe_star[end].shape.length <= length + MAX_DISTANCE_ERROR {
            end += 1;
        }

        for probe_edge in &probe_star[begin..end] {
            if matching_angles(&probe_edge.shape, &candidate_edge.shape) {
                let pair = MinutiaPair { probe: probe_edge.neighbor, candidate: candidate_edge.neighbor };
                results.push((pair, length));
            }
        }
    }
    results
}

fn matching_angles(probe: &EdgeShape, candidate: &EdgeShape) -> bool {
    let complementary_error = angle::complementary_b(MAX_ANGLE_ERROR);
    let within = |delta: u8| delta <= MAX_ANGLE_ERROR || delta >= complementary_error;
    within(angle::difference_b(probe.reference_angle, candidate.reference_angle))
        && within(angle::difference_b(probe.neighbor_angle, candidate.neighbor_angle))
}

fn matching_shapes(probe: &EdgeShape, candidate: &EdgeShape) -> bool {
    (probe.length - candidate.length).abs() <= MAX_DISTANCE_ERROR && matching_angles(probe, candidate)
}

fn angle_bins() -> i32 {
    div_round_up(256, MAX_ANGLE_ERROR as i32)
}

fn hash_shape(shape: &EdgeShape) -> i32 {
    let angle_error = MAX_ANGLE_ERROR as i32;
    ((shape.reference_angle as i32 / angle_error) << 24)
        + ((shape.neighbor_angle as i32 / angle_error) << 16)
        + shape.length / MAX_DISTANCE_ERROR
}

/// Bins `[start, end)` of an angle window, wrapping around the circle
fn angle_window(angle: u8) -> impl Iterator<Item = i32> {
    let bins = angle_bins();
    let angle_error = MAX_ANGLE_ERROR as i32;
    let start = angle::difference_b(angle, MAX_ANGLE_ERROR) as i32 / angle_error;
    let end = (angle::add_b(angle, MAX_ANGLE_ERROR) as i32 / angle_error + 1) % bins;
    let mut bin = start;
    let mut done = false;
    std::iter::from_fn(move || {
        if done || bin == end {
            done = true;
            return None;
        }
        let current = bin;
        bin = (bin + 1) % bins;
        Some(current)
    })
}

/// Every hash key under which a candidate edge within tolerance of `shape`
/// may be looked up
fn shape_coverage(shape: &EdgeShape) -> Vec<i32> {
    let min_length_bin = (shape.length - MAX_DISTANCE_ERROR) / MAX_DISTANCE_ERROR;
    let max_length_bin = (shape.length + MAX_DISTANCE_ERROR) / MAX_DISTANCE_ERROR;

    let mut keys = Vec::new();
    for length_bin in min_length_bin..=max_length_bin {
        for reference_bin in angle_window(shape.reference_angle) {
            for neighbor_bin in angle_window(shape.neighbor_angle) {
                keys.push((reference_bin << 24) + (neighbor_bin << 16) + length_bin);
            }
        }
    }
    keys
}
