use std::io;

use crate::binarize::*;
use crate::block_map::BlockMap;
use crate::constants::*;
use crate::edge_shape::EdgeShape;
use crate::error::Result;
use crate::minutiae;
use crate::orientation::compute_orientation_map;
use crate::preprocess::*;
use crate::raster::Raster;
use crate::skeleton::Skeleton;
use crate::utils::size_of;

use template_manager::angle::PI_B;
use template_manager::fingerprint_base::{Minutia, MinutiaType, MAX_COORDINATE};
use template_manager::template::{self as records, MinutiaRecord};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Edge from a minutia to one of its nearest neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborEdge {
    pub shape: EdgeShape,
    pub neighbor: usize,
}

/// Minutiae of one fingerprint plus the table of edges to each minutia's
/// nearest neighbours. Only the minutiae are serialized; the edge table is
/// rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Minutia>", from = "Vec<Minutia>")]
pub struct FingerprintTemplate {
    minutiae: Vec<Minutia>,
    edge_table: Vec<Vec<NeighborEdge>>,
}

impl FingerprintTemplate {
    /// Extracts minutiae from a fingerprint image
    pub fn from_raster(raster: &Raster) -> Result<FingerprintTemplate> {
        let image = raster.normalized()?;
        let blocks = BlockMap::new(size_of(&image), BLOCK_SIZE);

        let histogram = compute_histogram(&blocks, &image);
        let corner_histogram = compute_corner_histogram(&blocks, &histogram);
        let mask = compute_mask(&blocks, &histogram);
        debug!("foreground: {} of {} blocks", mask.iter().filter(|&&m| m).count(), mask.len());
        let equalized = equalize(&blocks, &image, &corner_histogram, &mask);

        let orientation = compute_orientation_map(&equalized, &mask, &blocks);
        let smoothed = smooth_by_orientation(&equalized, &orientation, &mask, &blocks, 0, &construct_oriented_lines(RIDGE_LINES));
        let orthogonal = smooth_by_orientation(&smoothed, &orientation, &mask, &blocks, PI_B, &construct_oriented_lines(ORTHOGONAL_LINES));

        let mut binary = binarize(&smoothed, &orthogonal, &mask, &blocks);
        cleanup_binarized(&mut binary);

        let pixel_mask = fill_blocks(&mask, &blocks);
        let inner_mask = compute_inner_mask(&pixel_mask);
        let inverted = invert_within(&binary, &pixel_mask);

        let ridges = Skeleton::new(&binary);
        let valleys = Skeleton::new(&inverted);

        let mut found = Vec::new();
        minutiae::collect(&mut found, &ridges, MinutiaType::Ending);
        minutiae::collect(&mut found, &valleys, MinutiaType::Bifurcation);
        debug!("collected {} minutiae", found.len());

        minutiae::apply_mask(&mut found, &inner_mask);
        debug!("{} minutiae inside the inner mask", found.len());
        minutiae::remove_minutia_clouds(&mut found);
        debug!("{} minutiae outside of clouds", found.len());
        minutiae::limit_template_size(&mut found);
        minutiae::shuffle_minutiae(&mut found);

        Ok(FingerprintTemplate::from_minutiae(found))
    }

    /// Template over already known minutiae, kept in the given order.
    /// Coordinates are expected within `MAX_COORDINATE`, which record decoding enforces.
    pub fn from_minutiae(minutiae: Vec<Minutia>) -> FingerprintTemplate {
        debug_assert!(minutiae
            .iter()
            .all(|m| m.position.x.unsigned_abs() <= MAX_COORDINATE as u32 && m.position.y.unsigned_abs() <= MAX_COORDINATE as u32));
        let edge_table = build_edge_table(&minutiae);
        FingerprintTemplate { minutiae, edge_table }
    }

    pub fn from_records(records: &[MinutiaRecord]) -> Result<FingerprintTemplate> {
        Ok(FingerprintTemplate::from_minutiae(records::decode_records(records)?))
    }

    pub fn from_csv<R: io::Read>(reader: R) -> Result<FingerprintTemplate> {
        Ok(FingerprintTemplate::from_minutiae(records::read_csv(reader)?))
    }

    pub fn to_records(&self) -> Vec<MinutiaRecord> {
        records::encode_records(&self.minutiae)
    }

    pub fn to_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        Ok(records::write_csv(writer, &self.minutiae)?)
    }

    pub fn minutiae(&self) -> &[Minutia] {
        &self.minutiae
    }

    pub fn edge_table(&self) -> &[Vec<NeighborEdge>] {
        &self.edge_table
    }

    pub fn len(&self) -> usize {
        self.minutiae.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minutiae.is_empty()
    }
}

impl From<Vec<Minutia>> for FingerprintTemplate {
    fn from(minutiae: Vec<Minutia>) -> Self {
        FingerprintTemplate::from_minutiae(minutiae)
    }
}

impl From<FingerprintTemplate> for Vec<Minutia> {
    fn from(template: FingerprintTemplate) -> Self {
        template.minutiae
    }
}

/// Edges from every minutia to its `EDGE_TABLE_NEIGHBORS` nearest neighbours,
/// sorted by length and then by neighbour index.
fn build_edge_table(minutiae: &[Minutia]) -> Vec<Vec<NeighborEdge>> {
    let mut all_sq_distances = vec![0i64; minutiae.len()];

    minutiae
        .iter()
        .enumerate()
        .map(|(reference, reference_minutia)| {
            let position = reference_minutia.position;
            let mut sq_max_distance = (EDGE_TABLE_RANGE * EDGE_TABLE_RANGE) as i64;
            if minutiae.len() - 1 > EDGE_TABLE_NEIGHBORS {
                for (distance, neighbor) in all_sq_distances.iter_mut().zip(minutiae) {
                    *distance = (position - neighbor.position).sq_length();
                }
                all_sq_distances.sort_unstable();
                sq_max_distance = all_sq_distances[EDGE_TABLE_NEIGHBORS];
            }

            let mut edges: Vec<NeighborEdge> = minutiae
                .iter()
                .enumerate()
                .filter(|&(neighbor, m)| neighbor != reference && (position - m.position).sq_length() <= sq_max_distance)
                .map(|(neighbor, m)| NeighborEdge { shape: EdgeShape::new(reference_minutia, m), neighbor })
                .collect();

            edges.sort_by(|a, b| a.shape.length.cmp(&b.shape.length).then(a.neighbor.cmp(&b.neighbor)));
            edges.truncate(EDGE_TABLE_NEIGHBORS);
            edges
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ending(x: i32, y: i32, direction: u8) -> Minutia {
        Minutia::new(x, y, direction, MinutiaType::Ending)
    }

    #[test]
    fn t_small_template_uses_fixed_radius() {
        let template = FingerprintTemplate::from_minutiae(vec![
            ending(0, 0, 0),
            ending(100, 0, 0),
            ending(0, 480, 0),
            ending(0, 600, 0),
        ]);
        let neighbors: Vec<usize> = template.edge_table()[0].iter().map(|e| e.neighbor).collect();
        assert_eq!(neighbors, vec![1, 2]);
        assert_eq!(template.edge_table()[0][0].shape.length, 100);
        // only the third minutia lies within range of the last one
        let neighbors: Vec<usize> = template.edge_table()[3].iter().map(|e| e.neighbor).collect();
        assert_eq!(neighbors, vec![2]);
    }

    #[test]
    fn t_large_template_keeps_nearest_nine() {
        let minutiae: Vec<Minutia> = (0..15).map(|i| ending(i * 1000, 0, 0)).collect();
        let template = FingerprintTemplate::from_minutiae(minutiae);
        for (reference, edges) in template.edge_table().iter().enumerate() {
            assert_eq!(edges.len(), 9);
            assert!(edges.iter().all(|e| e.neighbor != reference));
            assert!(edges.windows(2).all(|w| w[0].shape.length <= w[1].shape.length));
        }
        let neighbors: Vec<usize> = template.edge_table()[0].iter().map(|e| e.neighbor).collect();
        assert_eq!(neighbors, (1..10).collect::<Vec<_>>());
    }

    #[test]
    fn t_distant_minutiae() {
        let pair = FingerprintTemplate::from_minutiae(vec![ending(0, 0, 0), ending(50000, 0, 0)]);
        assert!(pair.edge_table().iter().all(|edges| edges.is_empty()));

        // more than ten minutiae takes the nearest-neighbour radius
        let spread: Vec<Minutia> = (0..12).map(|i| ending(i * 50000, 0, 0)).collect();
        let template = FingerprintTemplate::from_minutiae(spread);
        let neighbors: Vec<usize> = template.edge_table()[0].iter().map(|e| e.neighbor).collect();
        assert_eq!(neighbors, (1..10).collect::<Vec<_>>());
        let last: Vec<usize> = template.edge_table()[11].iter().map(|e| e.neighbor).collect();
        assert_eq!(last, (2..11).rev().collect::<Vec<_>>());
    }

    #[test]
    fn t_out_of_range_record_is_rejected() {
        let record = MinutiaRecord { x: Some(0), y: Some(-5_000_000), direction: Some(3), kind: Some("Ending".to_string()) };
        assert!(matches!(
            FingerprintTemplate::from_records(&[record]),
            Err(crate::error::AfisError::Record(records::TemplateError::CoordinateOutOfRange { field: "Y", .. }))
        ));
    }

    #[test]
    fn t_equal_lengths_are_ordered_by_neighbor() {
        let template = FingerprintTemplate::from_minutiae(vec![
            ending(50, 50, 0),
            ending(60, 50, 0),
            ending(40, 50, 0),
            ending(50, 40, 0),
        ]);
        let neighbors: Vec<usize> = template.edge_table()[0].iter().map(|e| e.neighbor).collect();
        assert_eq!(neighbors, vec![1, 2, 3]);
    }

    #[test]
    fn t_empty_and_single_templates() {
        let empty = FingerprintTemplate::from_minutiae(Vec::new());
        assert!(empty.is_empty());
        assert!(empty.edge_table().is_empty());

        let single = FingerprintTemplate::from_minutiae(vec![ending(1, 2, 3)]);
        assert_eq!(single.len(), 1);
        assert!(single.edge_table()[0].is_empty());
    }

    #[test]
    fn t_records_round_trip() {
        let template = FingerprintTemplate::from_minutiae(vec![
            ending(10, 20, 30),
            Minutia::new(40, 50, 255, MinutiaType::Bifurcation),
        ]);
        let restored = FingerprintTemplate::from_records(&template.to_records()).unwrap();
        assert_eq!(restored, template);
    }

    #[test]
    fn t_invalid_record_is_rejected() {
        let record = MinutiaRecord { x: Some(1), y: None, direction: Some(3), kind: Some("Ending".to_string()) };
        let result = FingerprintTemplate::from_records(&[record]);
        assert!(matches!(
            result,
            Err(crate::error::AfisError::Record(records::TemplateError::MissingField("Y")))
        ));
    }
}
