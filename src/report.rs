use std::fmt::Write;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::aggregate::{aggregate, rank_missed, rank_strongest, TopicBreakdown, TopicStats};
use crate::records::GradedRecord;
use crate::weakness::{compute_weakness_top, WeaknessEntry};

/// Everything derived from one batch of graded records.
#[derive(Debug, Clone)]
pub struct Review {
    pub breakdown: TopicBreakdown,
    pub weakness: Vec<WeaknessEntry>,
}

impl Review {
    pub fn build(records: &[GradedRecord], weakness_limit: usize) -> Self {
        Self {
            breakdown: aggregate(records),
            weakness: compute_weakness_top(records, weakness_limit),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub ranking_limit: usize,
    pub generated_at: DateTime<Local>,
    pub source: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            ranking_limit: 10,
            generated_at: Local::now(),
            source: None,
        }
    }
}

#[derive(Serialize)]
struct RankedTopic<'a> {
    topic: &'a str,
    #[serde(flatten)]
    stats: &'a TopicStats,
}

#[derive(Serialize)]
struct ReviewDocument<'a> {
    generated_at: DateTime<Local>,
    source: Option<&'a str>,
    topics: &'a TopicBreakdown,
    strongest: Vec<RankedTopic<'a>>,
    missed: Vec<RankedTopic<'a>>,
    weakness: &'a [WeaknessEntry],
}

fn ranked<'a>(rows: Vec<(&'a str, &'a TopicStats)>, limit: usize) -> Vec<RankedTopic<'a>> {
    rows.into_iter()
        .take(limit)
        .map(|(topic, stats)| RankedTopic { topic, stats })
        .collect()
}

pub fn review_json(review: &Review, opts: &ReportOptions) -> serde_json::Result<String> {
    let doc = ReviewDocument {
        generated_at: opts.generated_at,
        source: opts.source.as_deref(),
        topics: &review.breakdown,
        strongest: ranked(rank_strongest(&review.breakdown), opts.ranking_limit),
        missed: ranked(rank_missed(&review.breakdown), opts.ranking_limit),
        weakness: &review.weakness,
    };
    serde_json::to_string_pretty(&doc)
}

pub fn render_review(review: &Review, opts: &ReportOptions) -> String {
    let mut output = String::new();
    let source = opts.source.as_deref().unwrap_or("graded records");

    let _ = writeln!(output, "# Performance Review");
    let _ = writeln!(
        output,
        "Generated {} from {} ({} topics)",
        opts.generated_at.format("%Y-%m-%d %H:%M"),
        source,
        review.breakdown.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Topic Breakdown");
    if review.breakdown.is_empty() {
        let _ = writeln!(output, "No graded records.");
    } else {
        for (topic, stats) in review.breakdown.iter() {
            let _ = writeln!(
                output,
                "- {}: {} total, {} correct, {} incorrect, {} flagged ({:.1}% accuracy)",
                topic,
                stats.total,
                stats.correct,
                stats.incorrect,
                stats.flagged,
                stats.accuracy()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Strongest Topics");
    let strongest = rank_strongest(&review.breakdown);
    if strongest.is_empty() {
        let _ = writeln!(output, "No correct answers yet.");
    } else {
        for (topic, stats) in strongest.iter().take(opts.ranking_limit) {
            let _ = writeln!(output, "- {}: {} correct", topic, stats.correct);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Missed Topics");
    let missed = rank_missed(&review.breakdown);
    if missed.is_empty() {
        let _ = writeln!(output, "No missed questions.");
    } else {
        for (topic, stats) in missed.iter().take(opts.ranking_limit) {
            let _ = writeln!(
                output,
                "- {}: {} incorrect ({:.1}% miss rate)",
                topic,
                stats.incorrect,
                stats.miss_rate()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weakest Areas");
    if review.weakness.is_empty() {
        let _ = writeln!(output, "Nothing to remediate.");
    } else {
        for (rank, entry) in review.weakness.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. [{}] {} / {} (score {:.2})",
                rank + 1,
                entry.urgency,
                entry.section,
                entry.topic,
                entry.weakness_score
            );
        }
    }

    output
}
