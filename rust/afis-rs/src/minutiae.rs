//! Template minutiae collected from the skeletons and the filters applied to them.

use crate::constants::*;
use crate::skeleton::Skeleton;
use crate::utils::get_or;

use template_manager::angle;
use template_manager::fingerprint_base::{Minutia, MinutiaType};

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Appends one minutia of `kind` per ridge ending of the skeleton
pub(crate) fn collect(minutiae: &mut Vec<Minutia>, skeleton: &Skeleton, kind: MinutiaType) {
    minutiae.extend(
        skeleton
            .endings()
            .into_iter()
            .map(|(position, direction)| Minutia { position, direction, kind }),
    );
}

/// Drops minutiae whose ridge does not reach into the inner mask
pub(crate) fn apply_mask(minutiae: &mut Vec<Minutia>, mask: &Array2<bool>) {
    minutiae.retain(|minutia| {
        let arrow = (-MASK_DISPLACEMENT * angle::to_vector_b(minutia.direction)).round();
        get_or(mask, minutia.position + arrow, false)
    });
}

/// Drops minutiae crowded by more than `MAX_CLOUD_SIZE` others
pub(crate) fn remove_minutia_clouds(minutiae: &mut Vec<Minutia>) {
    let radius_sq = (MINUTIA_CLOUD_RADIUS * MINUTIA_CLOUD_RADIUS) as i64;
    let crowded: Vec<bool> = minutiae
        .iter()
        .map(|minutia| {
            let neighbors = minutiae
                .iter()
                .filter(|n| (n.position - minutia.position).sq_length() <= radius_sq)
                .count();
            neighbors - 1 > MAX_CLOUD_SIZE
        })
        .collect();

    let mut flags = crowded.into_iter();
    minutiae.retain(|_| !flags.next().unwrap_or(false));
}

/// Keeps the `MAX_MINUTIAE` minutiae with the most room around them, measured
/// by the distance to the `SORT_BY_NEIGHBOR`-th nearest other minutia. Ties
/// keep their original order.
pub(crate) fn limit_template_size(minutiae: &mut Vec<Minutia>) {
    if minutiae.len() <= MAX_MINUTIAE {
        return;
    }

    let mut ranked: Vec<(i64, Minutia)> = minutiae
        .iter()
        .map(|minutia| {
            let mut distances: Vec<i64> = minutiae.iter().map(|n| (minutia.position - n.position).sq_length()).collect();
            distances.sort_unstable();
            (distances[SORT_BY_NEIGHBOR], *minutia)
        })
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    *minutiae = ranked.into_iter().take(MAX_MINUTIAE).map(|(_, minutia)| minutia).collect();
}

/// Content-seeded shuffle, so that the order depends only on the minutiae themselves
pub(crate) fn shuffle_minutiae(minutiae: &mut [Minutia]) {
    let seed = minutiae.iter().fold(0i32, |seed, m| {
        seed.wrapping_add(m.direction as i32 + m.position.x + m.position.y + m.kind as i32)
    });
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u32 as u64);
    minutiae.shuffle(&mut rng);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ending(x: i32, y: i32, direction: u8) -> Minutia {
        Minutia::new(x, y, direction, MinutiaType::Ending)
    }

    #[test]
    fn t_mask_checks_point_behind_minutia() {
        let mut mask = Array2::<bool>::from_elem((100, 100), false);
        for y in 0..100 {
            for x in 0..50 {
                mask[[y, x]] = true;
            }
        }

        // direction 0 looks at x - 10, direction 128 at x + 10
        let mut minutiae = vec![ending(55, 50, 0), ending(45, 50, 128), ending(45, 50, 0)];
        apply_mask(&mut minutiae, &mask);
        assert_eq!(minutiae, vec![ending(55, 50, 0), ending(45, 50, 0)]);
    }

    #[test]
    fn t_clouds_are_removed() {
        let mut minutiae: Vec<Minutia> = (0..6).map(|i| ending(100 + 2 * i, 100, 0)).collect();
        minutiae.push(ending(300, 300, 0));
        minutiae.push(ending(100, 160, 0));
        remove_minutia_clouds(&mut minutiae);
        assert_eq!(minutiae, vec![ending(300, 300, 0), ending(100, 160, 0)]);

        // exactly four neighbours is still fine
        let mut sparse: Vec<Minutia> = (0..5).map(|i| ending(100 + 2 * i, 100, 0)).collect();
        remove_minutia_clouds(&mut sparse);
        assert_eq!(sparse.len(), 5);
    }

    #[test]
    fn t_limit_prefers_isolated_minutiae() {
        let mut minutiae: Vec<Minutia> = (0..120).map(|i| ending((i % 12) * 10, (i / 12) * 10, 0)).collect();
        let far = ending(1000, 1000, 7);
        minutiae.insert(37, far);
        limit_template_size(&mut minutiae);
        assert_eq!(minutiae.len(), MAX_MINUTIAE);
        assert_eq!(minutiae[0], far);
    }

    #[test]
    fn t_limit_leaves_small_templates_alone() {
        let mut minutiae: Vec<Minutia> = (0..10).map(|i| ending(i, i, 0)).collect();
        let copy = minutiae.clone();
        limit_template_size(&mut minutiae);
        assert_eq!(minutiae, copy);
    }

    #[test]
    fn t_shuffle_is_content_seeded() {
        let original: Vec<Minutia> = (0..30).map(|i| ending(i * 7, i * 3, (i * 11) as u8)).collect();
        let mut first = original.clone();
        let mut second = original.clone();
        shuffle_minutiae(&mut first);
        shuffle_minutiae(&mut second);
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort_by_key(|m| m.position.x);
        assert_eq!(sorted, original);
    }
}
