use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Number of distinct review ratings (0 through 5).
pub const RATING_COUNT: usize = 6;

/// Starting masses for ratings 0..=5 before any streak or level skew.
pub const BASE_MASSES: [f64; RATING_COUNT] = [0.05, 0.10, 0.13, 0.29, 0.28, 0.15];

const LEVEL_FACTORS: [f64; 6] = [1.0, 1.2, 1.4, 1.6, 1.8, 2.0];

// Index 0 is day 1. Day 14 and beyond saturate at the last entry.
const STREAK_FACTORS: [f64; 14] = [
    1.0, 1.1, 1.2, 1.3, 1.4, 1.5, 2.0, 2.1, 2.2, 2.3, 2.4, 2.5, 2.5, 2.5,
];
const MAX_STREAK_FACTOR: f64 = 2.5;

// Fixed pools for the two longest bands. These are not the sum of the
// masses they replace (0.15 and 0.28) and must stay as they are.
const FORTNIGHT_POOL: f64 = 0.25;
const MONTH_POOL: f64 = 0.45;

const LOW_RATING_STEP: f64 = 0.03;
const FOUR_BOOST: f64 = 2.5;
const FIVE_STEP: f64 = 0.02;
const FIVE_BOOST: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    #[error("rating {0} is outside 0..=5")]
    OutOfRange(u8),
}

/// A review outcome on the closed scale 0..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Rating {
    Zero = 0,
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
}

impl Rating {
    pub const ALL: [Rating; RATING_COUNT] = [
        Rating::Zero,
        Rating::One,
        Rating::Two,
        Rating::Three,
        Rating::Four,
        Rating::Five,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::ALL
            .get(value as usize)
            .copied()
            .ok_or(RatingError::OutOfRange(value))
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Streak-length bands that decide how low ratings are redistributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum StreakBand {
    /// Fewer than 3 days: no redistribution.
    None,
    /// `[3, 7)`
    Short,
    /// `[7, 14)`
    Week,
    /// `[14, 30)`
    Fortnight,
    /// 30 days or more.
    Month,
}

impl StreakBand {
    pub fn for_days(streak_days: u32) -> Self {
        match streak_days {
            0..=2 => StreakBand::None,
            3..=6 => StreakBand::Short,
            7..=13 => StreakBand::Week,
            14..=29 => StreakBand::Fortnight,
            _ => StreakBand::Month,
        }
    }
}

/// Player level lookup. Anything outside 1..=6 behaves like level 1.
pub fn level_factor(level: u32) -> f64 {
    match level {
        1..=6 => LEVEL_FACTORS[(level - 1) as usize],
        _ => 1.0,
    }
}

/// Study streak lookup. A zero streak contributes nothing extra.
pub fn streak_factor(streak_days: u32) -> f64 {
    match streak_days {
        0 => 1.0,
        1..=14 => STREAK_FACTORS[(streak_days - 1) as usize],
        _ => MAX_STREAK_FACTOR,
    }
}

/// A student's progression signals, as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressionSignals {
    pub level: u32,
    pub streak_days: u32,
}

impl ProgressionSignals {
    pub fn new(level: u32, streak_days: u32) -> Self {
        Self { level, streak_days }
    }

    pub fn level_factor(&self) -> f64 {
        level_factor(self.level)
    }

    pub fn streak_factor(&self) -> f64 {
        streak_factor(self.streak_days)
    }

    pub fn total_factor(&self) -> f64 {
        self.level_factor() * self.streak_factor()
    }

    pub fn streak_band(&self) -> StreakBand {
        StreakBand::for_days(self.streak_days)
    }
}

/// Probability masses indexed by rating.
///
/// Every adjustment consumes the current state and returns a new one, so a
/// caller can stop at any stage (`base`, `redistribute`, `adjust`, `clamp`)
/// and inspect the intermediate masses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingDistribution {
    masses: [f64; RATING_COUNT],
}

impl Default for RatingDistribution {
    fn default() -> Self {
        Self::base()
    }
}

impl RatingDistribution {
    pub fn base() -> Self {
        Self {
            masses: BASE_MASSES,
        }
    }

    /// Full pipeline: streak redistribution, factor skew, clamp, normalize.
    pub fn for_signals(signals: ProgressionSignals) -> Self {
        let total_factor = signals.total_factor();
        let dist = Self::base()
            .redistribute(signals.streak_days)
            .adjust(total_factor)
            .clamp()
            .normalize();

        debug!(
            level = signals.level,
            streak_days = signals.streak_days,
            band = %signals.streak_band(),
            total_factor,
            masses = ?dist.masses,
            "computed rating distribution"
        );

        dist
    }

    /// Move mass away from the lowest ratings according to the streak band.
    pub fn redistribute(self, streak_days: u32) -> Self {
        let mut masses = self.masses;

        match StreakBand::for_days(streak_days) {
            StreakBand::None => {}
            StreakBand::Short => {
                let freed = masses[0];
                masses[0] = 0.0;
                spread(&mut masses[1..], freed);
            }
            StreakBand::Week => {
                let half = masses[1] / 2.0;
                let freed = masses[0] + half;
                masses[0] = 0.0;
                masses[1] = half;
                spread(&mut masses[2..], freed);
            }
            StreakBand::Fortnight => {
                masses[..2].fill(0.0);
                spread(&mut masses[2..], FORTNIGHT_POOL);
            }
            StreakBand::Month => {
                masses[..3].fill(0.0);
                spread(&mut masses[3..], MONTH_POOL);
            }
        }

        Self { masses }
    }

    /// Linear skew toward ratings 4 and 5 proportional to `total_factor - 1`.
    pub fn adjust(self, total_factor: f64) -> Self {
        let excess = total_factor - 1.0;
        let mut masses = self.masses;

        for mass in &mut masses[..4] {
            *mass -= excess * LOW_RATING_STEP;
        }
        masses[4] += excess * LOW_RATING_STEP * FOUR_BOOST;
        masses[5] += excess * FIVE_STEP * FIVE_BOOST;

        Self { masses }
    }

    pub fn clamp(self) -> Self {
        Self {
            masses: self.masses.map(|mass| mass.clamp(0.0, 1.0)),
        }
    }

    pub fn normalize(self) -> Self {
        let total = self.total();
        if total <= 0.0 {
            // only reachable through `adjust` with a factor below 1
            return self;
        }
        Self {
            masses: self.masses.map(|mass| mass / total),
        }
    }

    pub fn mass(&self, rating: Rating) -> f64 {
        self.masses[rating.index()]
    }

    pub fn masses(&self) -> [f64; RATING_COUNT] {
        self.masses
    }

    pub fn total(&self) -> f64 {
        self.masses.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rating, f64)> + '_ {
        Rating::ALL.iter().map(move |&rating| (rating, self.mass(rating)))
    }

    /// Rating-keyed view, mainly for serialization.
    pub fn as_map(&self) -> BTreeMap<u8, f64> {
        self.iter()
            .map(|(rating, mass)| (rating.value(), mass))
            .collect()
    }

    /// Draw one rating using the supplied random source.
    ///
    /// Walks from rating 5 down to 0 accumulating mass and returns the first
    /// rating whose cumulative mass reaches the roll. Floating error that
    /// leaves the roll unmatched yields rating 0.
    pub fn sample_with<R: Rng>(&self, rng: &mut R) -> Rating {
        let roll: f64 = rng.gen();
        let mut cumulative = 0.0;

        for rating in Rating::ALL.iter().rev() {
            cumulative += self.mass(*rating);
            if cumulative >= roll {
                return *rating;
            }
        }

        Rating::Zero
    }

    pub fn sample(&self) -> Rating {
        self.sample_with(&mut rand::thread_rng())
    }

    /// Take `draws` independent samples and tally them.
    pub fn sample_many<R: Rng>(&self, draws: usize, rng: &mut R) -> DrawSummary {
        let mut summary = DrawSummary::default();
        for _ in 0..draws {
            summary.record(self.sample_with(rng));
        }
        summary
    }
}

fn spread(slots: &mut [f64], pool: f64) {
    let share = pool / slots.len() as f64;
    for slot in slots {
        *slot += share;
    }
}

/// Counts from a batch of draws.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrawSummary {
    pub counts: [u64; RATING_COUNT],
    pub draws: u64,
}

impl DrawSummary {
    pub fn record(&mut self, rating: Rating) {
        self.counts[rating.index()] += 1;
        self.draws += 1;
    }

    pub fn count(&self, rating: Rating) -> u64 {
        self.counts[rating.index()]
    }

    pub fn mean(&self) -> Option<f64> {
        if self.draws == 0 {
            return None;
        }
        let sum: f64 = Rating::ALL
            .iter()
            .map(|&rating| rating.value() as f64 * self.count(rating) as f64)
            .sum();
        Some(sum / self.draws as f64)
    }

    /// Population standard deviation of the drawn ratings.
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = Rating::ALL
            .iter()
            .map(|&rating| {
                let diff = rating.value() as f64 - mean;
                diff * diff * self.count(rating) as f64
            })
            .sum::<f64>()
            / self.draws as f64;
        Some(variance.sqrt())
    }
}

pub fn distribution(level: u32, streak_days: u32) -> RatingDistribution {
    RatingDistribution::for_signals(ProgressionSignals::new(level, streak_days))
}

pub fn sample_rating(level: u32, streak_days: u32) -> Rating {
    distribution(level, streak_days).sample()
}
