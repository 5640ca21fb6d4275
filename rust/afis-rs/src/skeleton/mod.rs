//! Ridge skeleton of a binary image: thinning, minutia detection, ridge
//! tracing and topology cleanup.

mod filters;
mod graph;
mod thinning;
mod trace;

use self::graph::SkeletonGraph;
use crate::utils::size_of;

use template_manager::fingerprint_base::Point;

use ndarray::Array2;

#[derive(Debug, Clone)]
pub(crate) struct Skeleton {
    graph: SkeletonGraph,
}

impl Skeleton {
    pub(crate) fn new(binary: &Array2<bool>) -> Skeleton {
        let mut graph = traced(binary);
        let traced_count = graph.minutia_count();
        filters::filter(&mut graph, size_of(binary));
        tracing::debug!("skeleton: {} minutiae traced, {} after cleanup", traced_count, graph.minutia_count());
        Skeleton { graph }
    }

    /// Position and direction of every considered minutia with a single ridge
    pub(crate) fn endings(&self) -> Vec<(Point, u8)> {
        self.graph
            .minutia_ids()
            .into_iter()
            .filter(|&id| self.graph.minutia(id).considered && self.graph.degree(id) == 1)
            .map(|id| (self.graph.minutia(id).position, self.graph.compute_direction(self.graph.first_ridge(id))))
            .collect()
    }
}

/// Skeleton graph before any cleanup
fn traced(binary: &Array2<bool>) -> SkeletonGraph {
    let thinned = thinning::thin(binary);
    let minutia_points = trace::find_minutiae(&thinned);
    let linking = trace::link_neighboring_minutiae(&minutia_points);

    let mut graph = SkeletonGraph::default();
    let centers = trace::compute_minutia_centers(&mut graph, &linking);
    trace::trace_ridges(&mut graph, &thinned, &centers);
    trace::fix_linking_gaps(&mut graph);
    debug_assert!(graph.is_consistent());
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_horizontal(binary: &mut Array2<bool>, y: usize, xs: std::ops::RangeInclusive<usize>) {
        for x in xs {
            binary[[y, x]] = true;
        }
    }

    #[test]
    fn t_gap_closure_consumes_both_endings() {
        let mut binary = Array2::<bool>::from_elem((40, 64), false);
        draw_horizontal(&mut binary, 20, 10..=30);
        draw_horizontal(&mut binary, 20, 34..=54);

        let before = traced(&binary).minutia_count();
        assert_eq!(before, 4);

        let skeleton = Skeleton::new(&binary);
        assert_eq!(skeleton.graph.minutia_count(), before - 2);
        let endings = skeleton.endings();
        assert_eq!(endings.len(), 2);
        assert_eq!(endings[0].0, Point::new(10, 20));
        assert_eq!(endings[1].0, Point::new(54, 20));
        // directions point into the ridge
        assert_eq!(endings[0].1, 0);
        assert_eq!(endings[1].1, 128);
    }

    #[test]
    fn t_spur_is_trimmed() {
        let mut binary = Array2::<bool>::from_elem((40, 64), false);
        draw_horizontal(&mut binary, 20, 10..=50);
        for y in 21..=30 {
            binary[[y, 30]] = true;
        }

        let skeleton = Skeleton::new(&binary);
        let positions: Vec<Point> = skeleton.endings().into_iter().map(|(p, _)| p).collect();
        assert_eq!(positions, vec![Point::new(10, 20), Point::new(50, 20)]);
    }

    #[test]
    fn t_short_fragment_disappears() {
        let mut binary = Array2::<bool>::from_elem((30, 30), false);
        draw_horizontal(&mut binary, 15, 5..=14);
        let skeleton = Skeleton::new(&binary);
        assert!(skeleton.endings().is_empty());
        assert_eq!(skeleton.graph.minutia_count(), 0);
    }

    #[test]
    fn t_empty_image() {
        let binary = Array2::<bool>::from_elem((20, 20), false);
        assert!(Skeleton::new(&binary).endings().is_empty());
    }
}
