// Library surface shared by the CLI and the integration tests.
// The numeric core (rating, aggregate, weakness) does no I/O.
pub mod aggregate;
pub mod config;
pub mod rating;
pub mod records;
pub mod report;
pub mod weakness;

pub use aggregate::{aggregate, rank_missed, rank_strongest, TopicBreakdown, TopicStats};
pub use rating::{distribution, sample_rating, ProgressionSignals, Rating, RatingDistribution};
pub use records::{GradedRecord, Outcome};
pub use weakness::{compute_weakness, Urgency, WeaknessEntry};
