mod constants;
mod utils;
mod block_map;
mod preprocess;
mod orientation;
mod binarize;
mod skeleton;
mod minutiae;
pub mod edge_shape;
pub mod error;
pub mod matcher;
pub mod raster;
pub mod template;

pub use edge_shape::EdgeShape;
pub use error::{AfisError, Result};
pub use matcher::{MatchOutcome, MatchScratch, Matcher};
pub use raster::Raster;
pub use template::{FingerprintTemplate, NeighborEdge};

/// Extracts the minutiae template of a fingerprint image
pub fn build_template(raster: &Raster) -> Result<FingerprintTemplate> {
    FingerprintTemplate::from_raster(raster)
}

/// One-off comparison; build a `Matcher` once to compare a probe against many candidates
pub fn match_templates(probe: &FingerprintTemplate, candidate: &FingerprintTemplate) -> f64 {
    Matcher::new(probe).match_template(candidate)
}

// --- Tests ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use template_manager::fingerprint_base::{Minutia, MinutiaType};

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Horizontal ridges with a half period shift along a vertical seam, so
    /// that ridges end and fork where the two halves meet
    fn seamed_ridges(width: usize, height: usize) -> Raster {
        let period = 9.0;
        let pixels = (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| {
                    let shift = if x < width / 2 { 0.0 } else { period / 2.0 };
                    let phase = 2.0 * std::f64::consts::PI * (y as f64 + shift) / period;
                    (128.0 + 100.0 * phase.sin()).round() as u8
                })
            })
            .collect();
        Raster::new(width, height, pixels, 500).unwrap()
    }

    fn quadrilateral(dx: i32, dy: i32) -> FingerprintTemplate {
        FingerprintTemplate::from_minutiae(
            [(100, 100, 0), (150, 100, 64), (120, 140, 192), (90, 160, 32)]
                .into_iter()
                .map(|(x, y, direction)| Minutia::new(x + dx, y + dy, direction, MinutiaType::Ending))
                .collect(),
        )
    }

    #[test]
    fn t_extraction_is_deterministic() {
        init_logging();
        let raster = seamed_ridges(288, 320);
        let first = build_template(&raster).unwrap();
        let second = build_template(&raster.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.edge_table(), second.edge_table());
    }

    #[test]
    fn t_extracted_template_matches_itself() {
        init_logging();
        let template = build_template(&seamed_ridges(288, 320)).unwrap();
        let empty = FingerprintTemplate::from_minutiae(Vec::new());

        // the seam leaves ridge endings on both sides
        assert!(template.len() >= 2, "{} minutiae", template.len());

        let matcher = Matcher::new(&template);
        let outcome = matcher.match_details(&template);
        assert_eq!(outcome.pair_count, template.len());
        assert!(outcome.score > matcher.match_template(&empty));
        assert_eq!(matcher.match_template(&empty), 0.0);
        for minutia in template.minutiae() {
            assert!(minutia.position.x >= 0 && (minutia.position.x as usize) < 288);
            assert!(minutia.position.y >= 0 && (minutia.position.y as usize) < 320);
        }
    }

    #[test]
    fn t_uniform_image_has_no_minutiae() {
        init_logging();
        let raster = Raster::new(200, 150, vec![128; 200 * 150], 500).unwrap();
        let template = build_template(&raster).unwrap();
        assert!(template.is_empty());
        assert_eq!(match_templates(&template, &quadrilateral(0, 0)), 0.0);
    }

    #[test]
    fn t_other_resolutions_are_rescaled() {
        let raster = Raster::new(400, 300, vec![128; 400 * 300], 1000).unwrap();
        assert!(build_template(&raster).unwrap().is_empty());

        let tiny = Raster::new(1, 1, vec![0], 2000).unwrap();
        assert!(matches!(build_template(&tiny), Err(AfisError::DegenerateScaling { .. })));
    }

    #[test]
    fn t_invalid_rasters_are_rejected() {
        assert!(matches!(Raster::new(0, 10, Vec::new(), 500), Err(AfisError::EmptyRaster { .. })));
        assert!(matches!(Raster::new(10, 10, vec![0; 99], 500), Err(AfisError::PixelCountMismatch { .. })));
        assert!(matches!(Raster::new(10, 10, vec![0; 100], 0), Err(AfisError::InvalidDpi(0))));
    }

    #[test]
    fn t_translated_template_after_csv_round_trip() {
        init_logging();
        let probe = quadrilateral(0, 0);
        let mut buffer = Vec::new();
        quadrilateral(50, 30).to_csv(&mut buffer).unwrap();
        let candidate = FingerprintTemplate::from_csv(buffer.as_slice()).unwrap();
        assert_eq!(candidate, quadrilateral(50, 30));

        let outcome = Matcher::new(&probe).match_details(&candidate);
        assert_eq!(outcome.pair_count, 4);
        assert!(outcome.score > 28.7);
        assert_eq!(match_templates(&probe, &candidate), outcome.score);
    }
}
