//! Random sample points inside a disc around a center.
//!
//! Meters are converted to degrees with a flat 111,320 m/° factor on both
//! axes. That is a planar approximation: longitude spacing shrinks with
//! latitude, so discs stretch east-west away from the equator. Acceptable for
//! the few-kilometer radii a local grid uses.

use std::f64::consts::PI;

use localrank_core::geo::METERS_PER_DEGREE;
use localrank_core::GeoPoint;
use rand::Rng;

/// Draws `num_points` points uniformly over the disc of `radius_meters`
/// around `center`.
///
/// The radial draw is `sqrt(u)` so density is uniform per unit area rather
/// than per unit radius. Points are returned in draw order; pass a seeded
/// `StdRng` to make the sequence reproducible.
pub fn generate_points<R: Rng + ?Sized>(
    rng: &mut R,
    center: GeoPoint,
    radius_meters: f64,
    num_points: u32,
) -> Vec<GeoPoint> {
    let radius_deg = radius_meters / METERS_PER_DEGREE;
    (0..num_points)
        .map(|_| {
            let u: f64 = rng.random();
            let v: f64 = rng.random();
            let w = radius_deg * u.sqrt();
            let t = 2.0 * PI * v;
            center.shifted(w * t.sin(), w * t.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    const CENTER: GeoPoint = GeoPoint {
        lat: 52.23,
        lng: 21.01,
    };

    #[test]
    fn returns_exactly_n_points() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in [1, 2, 10, 50, 200] {
            assert_eq!(generate_points(&mut rng, CENTER, 2_000.0, n).len(), n as usize);
        }
    }

    #[test]
    fn points_stay_inside_disc() {
        let mut rng = StdRng::seed_from_u64(11);
        let radius_deg = 2_000.0 / METERS_PER_DEGREE;
        for p in generate_points(&mut rng, CENTER, 2_000.0, 1_000) {
            let d = ((p.lat - CENTER.lat).powi(2) + (p.lng - CENTER.lng).powi(2)).sqrt();
            assert!(d <= radius_deg + 1e-12, "point {p} outside disc");
        }
    }

    #[test]
    fn same_seed_same_points() {
        let a = generate_points(&mut StdRng::seed_from_u64(42), CENTER, 500.0, 20);
        let b = generate_points(&mut StdRng::seed_from_u64(42), CENTER, 500.0, 20);
        assert_eq!(a, b);
    }

    #[test]
    fn squared_distance_is_uniform() {
        // With sqrt(u), (d / r)^2 is uniform on [0, 1): each quartile holds ~25%.
        let mut rng = StdRng::seed_from_u64(2024);
        let radius_deg = 3_000.0 / METERS_PER_DEGREE;
        let n = 20_000;
        let mut quartiles = [0u32; 4];
        for p in generate_points(&mut rng, CENTER, 3_000.0, n) {
            let d2 = ((p.lat - CENTER.lat).powi(2) + (p.lng - CENTER.lng).powi(2))
                / radius_deg.powi(2);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bucket = ((d2 * 4.0) as usize).min(3);
            quartiles[bucket] += 1;
        }
        for (i, count) in quartiles.iter().enumerate() {
            let share = f64::from(*count) / f64::from(n);
            assert!(
                (share - 0.25).abs() < 0.02,
                "quartile {i} holds {share:.3} of points"
            );
        }
    }

    #[test]
    fn unsquared_distance_is_not_uniform() {
        // Half the radius encloses a quarter of the area, so ~25% of points.
        let mut rng = StdRng::seed_from_u64(99);
        let radius_deg = 1_000.0 / METERS_PER_DEGREE;
        let n = 10_000;
        let inner = generate_points(&mut rng, CENTER, 1_000.0, n)
            .into_iter()
            .filter(|p| {
                ((p.lat - CENTER.lat).powi(2) + (p.lng - CENTER.lng).powi(2)).sqrt()
                    < radius_deg / 2.0
            })
            .count();
        #[allow(clippy::cast_precision_loss)]
        let share = inner as f64 / f64::from(n);
        assert!((share - 0.25).abs() < 0.03, "inner half-radius share {share:.3}");
    }
}
