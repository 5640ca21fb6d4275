//! Topology cleanup of a traced skeleton. Passes run in a fixed order and
//! each one relies on the previous ones having run.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::graph::SkeletonGraph;
use crate::constants::*;
use crate::utils::construct_line;

use template_manager::angle;
use template_manager::fingerprint_base::Point;

use bitvec::prelude::*;
use tracing::trace;

pub(super) fn filter(graph: &mut SkeletonGraph, size: Point) {
    remove_dots(graph);
    remove_pores(graph);
    remove_gaps(graph, size);
    remove_tails(graph);
    remove_fragments(graph);
    disable_branch_minutiae(graph);
}

/// Collapses a pair of short arms running between the same two junctions
/// into one straight ridge.
fn remove_pores(graph: &mut SkeletonGraph) {
    for minutia in graph.minutia_ids() {
        if graph.degree(minutia) != 3 {
            continue;
        }
        for exit in 0..3 {
            let ridges = &graph.minutia(minutia).ridges;
            let exit_ridge = ridges[exit];
            let arm1 = ridges[(exit + 1) % 3];
            let arm2 = ridges[(exit + 2) % 3];

            let end = graph.end(arm1);
            if end != graph.end(arm2) || graph.end(exit_ridge) == end || end == Some(minutia) || graph.end(exit_ridge) == Some(minutia) {
                continue;
            }

            if let Some(end) = end {
                if graph.degree(end) == 3 && graph.len(arm1) <= MAX_PORE_ARM && graph.len(arm2) <= MAX_PORE_ARM {
                    trace!("pore between {:?} and {:?}", graph.minutia(minutia).position, graph.minutia(end).position);
                    graph.detach(arm1);
                    graph.detach(arm2);

                    let merged = graph.new_ridge();
                    graph.set_start(merged, Some(minutia));
                    graph.set_end(merged, Some(end));
                    for p in construct_line(graph.minutia(minutia).position, graph.minutia(end).position) {
                        graph.push_point(merged, p);
                    }
                }
            }
            break;
        }
    }
    remove_knots(graph);
    debug_assert!(graph.is_consistent());
}

/// Point used to estimate which way a ridge leaves an ending
fn gap_angle_sample(graph: &SkeletonGraph, minutia: usize) -> Point {
    let ridge = graph.first_ridge(minutia);
    if GAP_ANGLE_OFFSET < graph.len(ridge) {
        graph.point(ridge, GAP_ANGLE_OFFSET)
    }
    else {
        graph.end(ridge).map_or(graph.point(ridge, graph.len(ridge) - 1), |end| graph.minutia(end).position)
    }
}

fn is_within_gap_limits(graph: &SkeletonGraph, end1: usize, end2: usize) -> bool {
    let position1 = graph.minutia(end1).position;
    let position2 = graph.minutia(end2).position;
    let distance_sq = (position1 - position2).sq_length();
    if distance_sq <= (RUPTURE_SIZE * RUPTURE_SIZE) as i64 {
        return true;
    }
    if distance_sq > (GAP_SIZE * GAP_SIZE) as i64 {
        return false;
    }

    let gap_direction = angle::atan_between(position1, position2);
    let direction1 = angle::atan_between(position1, gap_angle_sample(graph, end1));
    if angle::distance_b(direction1, angle::opposite_b(gap_direction)) > GAP_ANGLE {
        return false;
    }
    let direction2 = angle::atan_between(position2, gap_angle_sample(graph, end2));
    angle::distance_b(direction2, gap_direction) <= GAP_ANGLE
}

/// Raster of everything already drawn: minutia positions plus every ridge,
/// each ridge drawn once through the view running upwards.
fn get_shadow(graph: &SkeletonGraph, size: Point) -> BitVec {
    let mut shadow = bitvec![0; (size.x.max(0) * size.y.max(0)) as usize];
    for minutia in graph.minutia_ids() {
        mark(&mut shadow, size, graph.minutia(minutia).position);
        for &view in &graph.minutia(minutia).ridges {
            let (Some(start), Some(end)) = (graph.start(view), graph.end(view)) else {
                continue;
            };
            if graph.minutia(start).position.y <= graph.minutia(end).position.y {
                for p in graph.points(view) {
                    mark(&mut shadow, size, p);
                }
            }
        }
    }
    shadow
}

fn shadow_index(size: Point, p: Point) -> Option<usize> {
    if p.x >= 0 && p.y >= 0 && p.x < size.x && p.y < size.y {
        Some((p.y * size.x + p.x) as usize)
    }
    else {
        None
    }
}

fn mark(shadow: &mut BitVec, size: Point, p: Point) {
    if let Some(index) = shadow_index(size, p) {
        shadow.set(index, true);
    }
}

fn is_ridge_overlapping(line: &[Point], shadow: &BitVec, size: Point) -> bool {
    let end = line.len().saturating_sub(TOLERATED_GAP_OVERLAP);
    (TOLERATED_GAP_OVERLAP..end).any(|i| shadow_index(size, line[i]).is_some_and(|index| shadow[index]))
}

/// Bridges pairs of facing ridge endings, closest pairs first, as long as the
/// bridge does not cross anything already drawn.
fn remove_gaps(graph: &mut SkeletonGraph, size: Point) {
    let ids = graph.minutia_ids();
    let is_long_ending = |graph: &SkeletonGraph, m: usize| {
        graph.degree(m) == 1 && graph.len(graph.first_ridge(m)) >= MIN_GAP_ENDING_LENGTH
    };

    let mut queue = BinaryHeap::new();
    let mut sequence = 0usize;
    for &end1 in &ids {
        if !is_long_ending(graph, end1) {
            continue;
        }
        for &end2 in &ids {
            if end2 == end1 || !is_long_ending(graph, end2) || graph.end(graph.first_ridge(end1)) == Some(end2) {
                continue;
            }
            if is_within_gap_limits(graph, end1, end2) {
                let distance_sq = (graph.minutia(end1).position - graph.minutia(end2).position).sq_length();
                queue.push(Reverse((distance_sq, sequence, end1, end2)));
                sequence += 1;
            }
        }
    }

    let mut shadow = get_shadow(graph, size);
    while let Some(Reverse((_, _, end1, end2))) = queue.pop() {
        if graph.degree(end1) != 1 || graph.degree(end2) != 1 {
            continue;
        }
        let line = construct_line(graph.minutia(end1).position, graph.minutia(end2).position);
        if is_ridge_overlapping(&line, &shadow, size) {
            continue;
        }

        let ridge = graph.new_ridge();
        for &p in &line {
            graph.push_point(ridge, p);
            mark(&mut shadow, size, p);
        }
        graph.set_start(ridge, Some(end1));
        graph.set_end(ridge, Some(end2));
    }

    remove_knots(graph);
    debug_assert!(graph.is_consistent());
}

/// Drops short spurs hanging off junctions
fn remove_tails(graph: &mut SkeletonGraph) {
    for minutia in graph.minutia_ids() {
        if graph.degree(minutia) != 1 {
            continue;
        }
        let ridge = graph.first_ridge(minutia);
        let Some(end) = graph.end(ridge) else { continue };
        if graph.degree(end) >= 3 && graph.len(ridge) < MIN_TAIL_LENGTH {
            graph.detach(ridge);
        }
    }
    remove_dots(graph);
    remove_knots(graph);
    debug_assert!(graph.is_consistent());
}

/// Drops short ridges that are not connected to anything
fn remove_fragments(graph: &mut SkeletonGraph) {
    for minutia in graph.minutia_ids() {
        if graph.degree(minutia) != 1 {
            continue;
        }
        let ridge = graph.first_ridge(minutia);
        let Some(end) = graph.end(ridge) else { continue };
        if graph.degree(end) == 1 && graph.len(ridge) < MIN_FRAGMENT_LENGTH {
            graph.detach(ridge);
        }
    }
    remove_dots(graph);
    debug_assert!(graph.is_consistent());
}

/// Joins the two ridges of every degree-2 minutia into one, extending the
/// longer ridge with the points of the shorter one.
fn remove_knots(graph: &mut SkeletonGraph) {
    for minutia in graph.minutia_ids() {
        if graph.degree(minutia) != 2 {
            continue;
        }
        let ridges = &graph.minutia(minutia).ridges;
        let (first, second) = (ridges[0], ridges[1]);
        if first.reverse() == second {
            continue;
        }

        let mut extended = first.reverse();
        let mut removed = second;
        if graph.len(extended) < graph.len(removed) {
            std::mem::swap(&mut extended, &mut removed);
            extended = extended.reverse();
            removed = removed.reverse();
        }

        graph.pop_point(extended);
        for p in graph.points(removed) {
            graph.push_point(extended, p);
        }

        let end = graph.end(removed);
        graph.set_end(extended, end);
        graph.detach(removed);
    }
    remove_dots(graph);
}

fn remove_dots(graph: &mut SkeletonGraph) {
    for minutia in graph.minutia_ids() {
        if graph.degree(minutia) == 0 {
            graph.remove_minutia(minutia);
        }
    }
}

/// Junctions stay in the graph but are never reported as minutiae
fn disable_branch_minutiae(graph: &mut SkeletonGraph) {
    for minutia in graph.minutia_ids() {
        if graph.degree(minutia) > 2 {
            graph.minutia_mut(minutia).considered = false;
        }
    }
}
