use std::collections::{HashMap, HashSet};

use super::graph::SkeletonGraph;
use crate::utils::{construct_line, get_or};

use template_manager::fingerprint_base::{Point, CORNER_NEIGHBORS};

use ndarray::Array2;

/// Thinned pixels with exactly one neighbour or more than two, row by row
pub(super) fn find_minutiae(thinned: &Array2<bool>) -> Vec<Point> {
    let (height, width) = thinned.dim();
    let mut result = Vec::new();
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let at = Point::new(x, y);
            if !get_or(thinned, at, false) {
                continue;
            }
            let count = CORNER_NEIGHBORS.iter().filter(|&&r| get_or(thinned, at + r, false)).count();
            if count == 1 || count > 2 {
                result.push(at);
            }
        }
    }
    result
}

/// Groups of mutually adjacent minutia points.
///
/// Groups are merged as points arrive; the surviving group's first point
/// identifies the cluster.
#[derive(Debug, Default)]
pub(super) struct Linking {
    order: Vec<Point>,
    group_of: HashMap<Point, usize>,
    groups: Vec<Vec<Point>>,
}

impl Linking {
    fn group(&self, point: Point) -> &[Point] {
        &self.groups[self.group_of[&point]]
    }
}

pub(super) fn link_neighboring_minutiae(minutiae: &[Point]) -> Linking {
    let mut linking = Linking::default();
    for &position in minutiae {
        let mut own: Option<usize> = None;
        for relative in CORNER_NEIGHBORS {
            let Some(&neighbor) = linking.group_of.get(&(position + relative)) else {
                continue;
            };
            if Some(neighbor) == own {
                continue;
            }
            if let Some(own) = own {
                let moved = std::mem::take(&mut linking.groups[own]);
                for p in &moved {
                    linking.group_of.insert(*p, neighbor);
                }
                linking.groups[neighbor].extend(moved);
            }
            own = Some(neighbor);
        }

        let own = own.unwrap_or_else(|| {
            linking.groups.push(Vec::new());
            linking.groups.len() - 1
        });
        linking.groups[own].push(position);
        linking.group_of.insert(position, own);
        linking.order.push(position);
    }
    linking
}

/// Minutia point to skeleton minutia, keeping the order in which points
/// were registered.
#[derive(Debug, Default)]
pub(super) struct MinutiaMap {
    order: Vec<Point>,
    ids: HashMap<Point, usize>,
}

impl MinutiaMap {
    pub fn get(&self, point: Point) -> Option<usize> {
        self.ids.get(&point).copied()
    }
}

/// Creates one skeleton minutia per cluster at the (truncated) centroid of its points
pub(super) fn compute_minutia_centers(graph: &mut SkeletonGraph, linking: &Linking) -> MinutiaMap {
    let mut centers = MinutiaMap::default();
    for &current in &linking.order {
        let linked = linking.group(current);
        let primary = linked[0];
        if !centers.ids.contains_key(&primary) {
            let sum = linked.iter().fold(Point::default(), |acc, &p| acc + p);
            let count = linked.len() as i32;
            let id = graph.add_minutia(Point::new(sum.x / count, sum.y / count));
            centers.ids.insert(primary, id);
            centers.order.push(primary);
        }

        let id = centers.ids[&primary];
        if centers.ids.insert(current, id).is_none() {
            centers.order.push(current);
        }
    }
    centers
}

/// Next thinned pixel around `current` other than `previous`
fn step(thinned: &Array2<bool>, current: Point, previous: Point) -> Option<Point> {
    CORNER_NEIGHBORS
        .iter()
        .map(|&r| current + r)
        .find(|&next| get_or(thinned, next, false) && next != previous)
}

/// Walks every thinned path leaving a minutia point until it reaches another
/// minutia point and records it as a ridge between the two skeleton minutiae.
pub(super) fn trace_ridges(graph: &mut SkeletonGraph, thinned: &Array2<bool>, minutiae: &MinutiaMap) {
    let mut leads: HashSet<Point> = HashSet::new();
    for &minutia_point in &minutiae.order {
        for relative in CORNER_NEIGHBORS {
            let start = minutia_point + relative;
            if !get_or(thinned, start, false) || minutiae.get(start).is_some() || leads.contains(&start) {
                continue;
            }

            let mut points = vec![minutia_point, start];
            let mut previous = minutia_point;
            let mut current = start;
            let end = loop {
                let Some(next) = step(thinned, current, previous) else {
                    break None;
                };
                previous = current;
                current = next;
                points.push(current);
                if let Some(end) = minutiae.get(current) {
                    break Some(end);
                }
            };

            let (Some(start_id), Some(end_id)) = (minutiae.get(minutia_point), end) else {
                debug_assert!(false, "ridge from {:?} does not reach a minutia", minutia_point);
                continue;
            };

            let view = graph.new_ridge();
            for &p in &points {
                graph.push_point(view, p);
            }
            graph.set_start(view, Some(start_id));
            graph.set_end(view, Some(end_id));
            leads.insert(graph.point(view, 1));
            leads.insert(graph.point(view.reverse(), 1));
        }
    }
}

/// Extends every ridge whose first point is not its minutia's centroid with a
/// straight line to the centroid.
pub(super) fn fix_linking_gaps(graph: &mut SkeletonGraph) {
    for id in graph.minutia_ids() {
        let position = graph.minutia(id).position;
        for view in graph.minutia(id).ridges.clone() {
            let first = graph.point(view, 0);
            if first != position {
                for &p in &construct_line(first, position)[1..] {
                    graph.push_point(view.reverse(), p);
                }
            }
        }
    }
}
