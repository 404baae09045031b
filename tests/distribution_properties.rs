use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tally::rating::{distribution, Rating, RatingDistribution};

fn top_share(dist: &RatingDistribution) -> f64 {
    dist.mass(Rating::Four) + dist.mass(Rating::Five)
}

proptest! {
    #[test]
    fn distribution_is_a_valid_pmf(level in 0u32..10, streak in 0u32..5_000) {
        let dist = distribution(level, streak);
        prop_assert!((dist.total() - 1.0).abs() < 1e-9, "sum was {}", dist.total());
        for (_, mass) in dist.iter() {
            prop_assert!((0.0..=1.0).contains(&mass));
        }
    }

    #[test]
    fn higher_level_raises_top_share(low in 1u32..6, bump in 1u32..6, streak in 0u32..100) {
        let high = (low + bump).min(6);
        prop_assume!(high > low);
        let before = top_share(&distribution(low, streak));
        let after = top_share(&distribution(high, streak));
        prop_assert!(after > before, "level {low} -> {high}: {before} vs {after}");
    }

    #[test]
    fn fortnight_band_zeroes_lowest_ratings(streak in 14u32..30) {
        let redistributed = RatingDistribution::base().redistribute(streak);
        prop_assert_eq!(redistributed.mass(Rating::Zero), 0.0);
        prop_assert_eq!(redistributed.mass(Rating::One), 0.0);
    }

    #[test]
    fn seeded_sampling_is_deterministic(level in 1u32..=6, streak in 0u32..60, seed in any::<u64>()) {
        let dist = distribution(level, streak);
        let a = dist.sample_with(&mut ChaCha8Rng::seed_from_u64(seed));
        let b = dist.sample_with(&mut ChaCha8Rng::seed_from_u64(seed));
        prop_assert_eq!(a, b);
    }
}

#[test]
fn top_level_long_streak_draws_only_high_ratings() {
    let dist = distribution(6, 30);
    let mut rng = ChaCha8Rng::seed_from_u64(2026);
    let summary = dist.sample_many(10_000, &mut rng);

    assert_eq!(summary.count(Rating::Zero), 0);
    assert_eq!(summary.count(Rating::One), 0);
    for rating in [Rating::Three, Rating::Four, Rating::Five] {
        assert!(summary.count(rating) > 0, "no draws of {rating}");
    }
}

#[test]
fn draw_frequencies_track_masses() {
    let dist = distribution(3, 9);
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let summary = dist.sample_many(50_000, &mut rng);

    for (rating, mass) in dist.iter() {
        let observed = summary.count(rating) as f64 / summary.draws as f64;
        assert!(
            (observed - mass).abs() < 0.02,
            "rating {rating}: observed {observed:.4}, expected {mass:.4}"
        );
    }
}
