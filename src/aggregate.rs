use crate::records::{GradedRecord, Outcome};
use itertools::Itertools;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use tracing::debug;

/// Outcome counters for a single topic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TopicStats {
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub flagged: u32,
}

impl TopicStats {
    pub fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Correct => self.correct += 1,
            Outcome::Incorrect => self.incorrect += 1,
            Outcome::Flagged => self.flagged += 1,
        }
    }

    /// Percentage of responses marked correct (0-100)
    pub fn accuracy(&self) -> f64 {
        percent(self.correct, self.total)
    }

    /// Percentage of responses marked incorrect (0-100)
    pub fn miss_rate(&self) -> f64 {
        percent(self.incorrect, self.total)
    }

    pub fn is_consistent(&self) -> bool {
        self.correct + self.incorrect + self.flagged == self.total
    }
}

fn percent(part: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Per-topic counters, kept in the order topics were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicBreakdown {
    entries: Vec<(String, TopicStats)>,
    index: HashMap<String, usize>,
}

impl TopicBreakdown {
    pub fn get(&self, topic: &str) -> Option<&TopicStats> {
        self.index.get(topic).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TopicStats)> {
        self.entries.iter().map(|(topic, stats)| (topic.as_str(), stats))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn stats_mut(&mut self, topic: &str) -> &mut TopicStats {
        let i = match self.index.get(topic).copied() {
            Some(i) => i,
            None => {
                self.entries.push((topic.to_string(), TopicStats::default()));
                self.index.insert(topic.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[i].1
    }
}

impl Serialize for TopicBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Fold graded records into per-topic counters.
///
/// Records without a topic are skipped. Every retained record bumps `total`
/// and exactly one of `correct`, `incorrect` or `flagged`.
pub fn aggregate(records: &[GradedRecord]) -> TopicBreakdown {
    let mut breakdown = TopicBreakdown::default();
    let mut skipped = 0usize;

    for record in records {
        if !record.has_topic() {
            skipped += 1;
            continue;
        }
        breakdown
            .stats_mut(record.topic.trim())
            .record(record.outcome());
    }

    debug!(
        records = records.len(),
        topics = breakdown.len(),
        skipped,
        "aggregated graded records"
    );

    breakdown
}

/// Topics with at least one correct answer, most correct first.
/// Ties keep first-seen order.
pub fn rank_strongest(breakdown: &TopicBreakdown) -> Vec<(&str, &TopicStats)> {
    breakdown
        .iter()
        .filter(|(_, stats)| stats.correct > 0)
        .sorted_by(|a, b| b.1.correct.cmp(&a.1.correct))
        .collect()
}

/// Topics with at least one incorrect answer, most misses first.
/// Ties keep first-seen order.
pub fn rank_missed(breakdown: &TopicBreakdown) -> Vec<(&str, &TopicStats)> {
    breakdown
        .iter()
        .filter(|(_, stats)| stats.incorrect > 0)
        .sorted_by(|a, b| b.1.incorrect.cmp(&a.1.incorrect))
        .collect()
}
