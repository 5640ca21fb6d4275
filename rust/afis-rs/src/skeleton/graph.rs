//! Arena of skeleton minutiae and the ridges between them.
//!
//! A ridge is stored once and addressed through a [`RidgeView`]; the reversed
//! view walks the same points backwards and swaps start and end. Every
//! minutia lists the views that start at it, so a ridge between `a` and `b`
//! appears as the forward view in `a`'s list and as the reversed view in `b`'s.

use std::collections::VecDeque;

use crate::constants::{RIDGE_DIRECTION_SAMPLE, RIDGE_DIRECTION_SKIP};

use template_manager::angle;
use template_manager::fingerprint_base::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RidgeView {
    pub ridge: usize,
    pub reversed: bool,
}

impl RidgeView {
    pub fn reverse(self) -> RidgeView {
        RidgeView { ridge: self.ridge, reversed: !self.reversed }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SkeletonMinutia {
    pub position: Point,
    pub ridges: Vec<RidgeView>,
    pub considered: bool,
    alive: bool,
}

#[derive(Debug, Clone, Default)]
struct Ridge {
    points: VecDeque<Point>,
    start: Option<usize>,
    end: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SkeletonGraph {
    minutiae: Vec<SkeletonMinutia>,
    ridges: Vec<Ridge>,
}

impl SkeletonGraph {
    pub fn add_minutia(&mut self, position: Point) -> usize {
        self.minutiae.push(SkeletonMinutia { position, ridges: Vec::new(), considered: true, alive: true });
        self.minutiae.len() - 1
    }

    pub fn minutia(&self, id: usize) -> &SkeletonMinutia {
        &self.minutiae[id]
    }

    pub fn minutia_mut(&mut self, id: usize) -> &mut SkeletonMinutia {
        &mut self.minutiae[id]
    }

    /// Ids of the minutiae still present, in insertion order
    pub fn minutia_ids(&self) -> Vec<usize> {
        (0..self.minutiae.len()).filter(|&id| self.minutiae[id].alive).collect()
    }

    pub fn minutia_count(&self) -> usize {
        self.minutiae.iter().filter(|m| m.alive).count()
    }

    pub fn degree(&self, id: usize) -> usize {
        self.minutiae[id].ridges.len()
    }

    /// First ridge of a minutia; callers check the degree first
    pub fn first_ridge(&self, id: usize) -> RidgeView {
        self.minutiae[id].ridges[0]
    }

    pub fn remove_minutia(&mut self, id: usize) {
        debug_assert!(self.minutiae[id].ridges.is_empty(), "removing minutia {} with attached ridges", id);
        self.minutiae[id].alive = false;
    }

    /// Empty ridge attached to nothing, as its forward view
    pub fn new_ridge(&mut self) -> RidgeView {
        self.ridges.push(Ridge::default());
        RidgeView { ridge: self.ridges.len() - 1, reversed: false }
    }

    pub fn len(&self, view: RidgeView) -> usize {
        self.ridges[view.ridge].points.len()
    }

    pub fn point(&self, view: RidgeView, index: usize) -> Point {
        let points = &self.ridges[view.ridge].points;
        if view.reversed {
            points[points.len() - 1 - index]
        }
        else {
            points[index]
        }
    }

    pub fn points(&self, view: RidgeView) -> Vec<Point> {
        let points = &self.ridges[view.ridge].points;
        if view.reversed {
            points.iter().rev().copied().collect()
        }
        else {
            points.iter().copied().collect()
        }
    }

    /// Appends a point at the far end of the view
    pub fn push_point(&mut self, view: RidgeView, point: Point) {
        let points = &mut self.ridges[view.ridge].points;
        if view.reversed {
            points.push_front(point);
        }
        else {
            points.push_back(point);
        }
    }

    pub fn pop_point(&mut self, view: RidgeView) -> Option<Point> {
        let points = &mut self.ridges[view.ridge].points;
        if view.reversed { points.pop_front() } else { points.pop_back() }
    }

    pub fn start(&self, view: RidgeView) -> Option<usize> {
        let ridge = &self.ridges[view.ridge];
        if view.reversed { ridge.end } else { ridge.start }
    }

    pub fn end(&self, view: RidgeView) -> Option<usize> {
        self.start(view.reverse())
    }

    /// Moves the start of a view, keeping the adjacency lists of the old and
    /// new start minutiae in sync.
    pub fn set_start(&mut self, view: RidgeView, minutia: Option<usize>) {
        let previous = self.start(view);
        if previous == minutia {
            return;
        }

        if let Some(old) = previous {
            self.minutiae[old].ridges.retain(|&v| v != view);
        }

        let ridge = &mut self.ridges[view.ridge];
        if view.reversed {
            ridge.end = minutia;
        }
        else {
            ridge.start = minutia;
        }

        if let Some(new) = minutia {
            let ridges = &mut self.minutiae[new].ridges;
            if !ridges.contains(&view) {
                ridges.push(view);
            }
        }
    }

    pub fn set_end(&mut self, view: RidgeView, minutia: Option<usize>) {
        self.set_start(view.reverse(), minutia);
    }

    /// Disconnects the ridge from both of its minutiae
    pub fn detach(&mut self, view: RidgeView) {
        self.set_start(view, None);
        self.set_end(view, None);
    }

    /// Direction from a point just past the minutia towards a point further
    /// along the ridge, clipped to the ridge length.
    pub fn compute_direction(&self, view: RidgeView) -> u8 {
        let count = self.len(view) as isize;
        let mut first = RIDGE_DIRECTION_SKIP as isize;
        let mut last = (RIDGE_DIRECTION_SKIP + RIDGE_DIRECTION_SAMPLE - 1) as isize;

        if last >= count {
            let shift = last - count + 1;
            last -= shift;
            first -= shift;
        }
        let first = first.max(0) as usize;
        let last = last.max(0) as usize;

        angle::atan_between(self.point(view, first), self.point(view, last))
    }

    /// Every attached view starts at the minutia listing it and its reverse is
    /// listed by the live minutia at its end.
    pub fn is_consistent(&self) -> bool {
        self.minutiae.iter().enumerate().filter(|(_, m)| m.alive).all(|(id, minutia)| {
            minutia.ridges.iter().all(|&view| {
                self.start(view) == Some(id)
                    && !self.ridges[view.ridge].points.is_empty()
                    && match self.end(view) {
                        Some(end) => self.minutiae[end].alive && self.minutiae[end].ridges.contains(&view.reverse()),
                        None => false,
                    }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ridge_between(graph: &mut SkeletonGraph, from: usize, to: usize, points: &[Point]) -> RidgeView {
        let view = graph.new_ridge();
        for &p in points {
            graph.push_point(view, p);
        }
        graph.set_start(view, Some(from));
        graph.set_end(view, Some(to));
        view
    }

    #[test]
    fn t_views_share_points() {
        let mut graph = SkeletonGraph::default();
        let a = graph.add_minutia(Point::new(0, 0));
        let b = graph.add_minutia(Point::new(3, 0));
        let view = ridge_between(&mut graph, a, b, &[Point::new(0, 0), Point::new(1, 0), Point::new(2, 0)]);

        let reversed = view.reverse();
        assert_eq!(graph.point(reversed, 0), Point::new(2, 0));
        assert_eq!(graph.start(reversed), Some(b));
        assert_eq!(graph.end(reversed), Some(a));

        // appending to the reversed view prepends to the forward one
        graph.push_point(reversed, Point::new(-1, 0));
        assert_eq!(graph.point(view, 0), Point::new(-1, 0));
        assert_eq!(graph.len(view), 4);
        assert_eq!(graph.pop_point(reversed), Some(Point::new(-1, 0)));
        assert_eq!(graph.points(reversed), vec![Point::new(2, 0), Point::new(1, 0), Point::new(0, 0)]);
    }

    #[test]
    fn t_attach_and_detach_keep_lists_in_sync() {
        let mut graph = SkeletonGraph::default();
        let a = graph.add_minutia(Point::new(0, 0));
        let b = graph.add_minutia(Point::new(5, 0));
        let c = graph.add_minutia(Point::new(9, 0));
        let view = ridge_between(&mut graph, a, b, &[Point::new(0, 0), Point::new(5, 0)]);

        assert_eq!(graph.minutia(a).ridges, vec![view]);
        assert_eq!(graph.minutia(b).ridges, vec![view.reverse()]);
        assert!(graph.is_consistent());

        graph.set_end(view, Some(c));
        assert!(graph.minutia(b).ridges.is_empty());
        assert_eq!(graph.minutia(c).ridges, vec![view.reverse()]);

        graph.detach(view);
        assert_eq!(graph.degree(a), 0);
        assert_eq!(graph.degree(c), 0);
        assert_eq!(graph.start(view), None);
        assert_eq!(graph.end(view), None);

        graph.remove_minutia(b);
        assert_eq!(graph.minutia_ids(), vec![a, c]);
        assert_eq!(graph.minutia_count(), 2);
    }

    #[test]
    fn t_loop_ridge_lists_both_views() {
        let mut graph = SkeletonGraph::default();
        let a = graph.add_minutia(Point::new(0, 0));
        let view = ridge_between(&mut graph, a, a, &[Point::new(0, 0), Point::new(1, 1), Point::new(0, 0)]);
        assert_eq!(graph.minutia(a).ridges, vec![view, view.reverse()]);
        assert!(graph.is_consistent());
    }

    #[test]
    fn t_direction_sampling() {
        let mut graph = SkeletonGraph::default();
        let a = graph.add_minutia(Point::new(0, 0));
        let b = graph.add_minutia(Point::new(0, 30));
        let points: Vec<Point> = (0..=30).map(|y| Point::new(0, y)).collect();
        let view = ridge_between(&mut graph, a, b, &points);
        assert_eq!(graph.compute_direction(view), 64);
        assert_eq!(graph.compute_direction(view.reverse()), 192);

        // short ridge falls back to its full length
        let c = graph.add_minutia(Point::new(10, 0));
        let d = graph.add_minutia(Point::new(13, 0));
        let short = ridge_between(&mut graph, c, d, &[Point::new(10, 0), Point::new(11, 0), Point::new(12, 0), Point::new(13, 0)]);
        assert_eq!(graph.compute_direction(short), 0);
    }
}
