//! Weakness report: which (section, topic) groups most need remediation.
//!
//! Records are grouped by section first and by topic within a section, so
//! the same topic name under two sections stays two separate groups. Each
//! group is scored as `(incorrect + 0.5 * flagged) / total` and bucketed into
//! an urgency tier.

use crate::records::{GradedRecord, Outcome};
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_WEAKNESS_LIMIT: usize = 5;

const FLAGGED_WEIGHT: f64 = 0.5;
const HIGH_THRESHOLD: f64 = 0.7;
const MEDIUM_THRESHOLD: f64 = 0.4;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    /// Thresholds are strict: exactly 0.7 is medium, exactly 0.4 is low.
    pub fn from_score(score: f64) -> Self {
        if score > HIGH_THRESHOLD {
            Urgency::High
        } else if score > MEDIUM_THRESHOLD {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

/// Raw counts for one (section, topic) group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupTally {
    pub section: String,
    pub topic: String,
    pub total: u32,
    pub negative: u32,
    pub flagged: u32,
}

impl GroupTally {
    pub fn new(section: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            topic: topic.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Correct => {}
            Outcome::Incorrect => self.negative += 1,
            Outcome::Flagged => self.flagged += 1,
        }
    }

    /// `None` for an empty group, which has nothing to score.
    pub fn weakness_score(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let weighted = self.negative as f64 + self.flagged as f64 * FLAGGED_WEIGHT;
        Some(weighted / self.total as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaknessEntry {
    pub topic: String,
    pub section: String,
    pub weakness_score: f64,
    pub urgency: Urgency,
}

/// Two-level grouping: sections in first-seen order, topics in first-seen
/// order within their section.
pub fn group_records(records: &[GradedRecord]) -> Vec<GroupTally> {
    let mut sections: Vec<(String, Vec<GroupTally>)> = Vec::new();
    let mut section_index: HashMap<String, usize> = HashMap::new();
    let mut topic_index: HashMap<(usize, String), usize> = HashMap::new();

    for record in records.iter().filter(|r| r.has_topic()) {
        let section = record.section.trim();
        let topic = record.topic.trim();

        let s = match section_index.get(section).copied() {
            Some(s) => s,
            None => {
                sections.push((section.to_string(), Vec::new()));
                section_index.insert(section.to_string(), sections.len() - 1);
                sections.len() - 1
            }
        };

        let groups = &mut sections[s].1;
        let t = match topic_index.get(&(s, topic.to_string())).copied() {
            Some(t) => t,
            None => {
                groups.push(GroupTally::new(section, topic));
                topic_index.insert((s, topic.to_string()), groups.len() - 1);
                groups.len() - 1
            }
        };

        groups[t].record(record.outcome());
    }

    sections
        .into_iter()
        .flat_map(|(_, groups)| groups)
        .collect()
}

/// Score tallies and keep the `limit` weakest, highest score first.
///
/// Groups with no records are dropped before scoring. Equal scores keep the
/// order the tallies were given in.
pub fn rank_weakness<I>(groups: I, limit: usize) -> Vec<WeaknessEntry>
where
    I: IntoIterator<Item = GroupTally>,
{
    groups
        .into_iter()
        .filter_map(|group| match group.weakness_score() {
            Some(score) => Some((group, score)),
            None => {
                debug!(section = %group.section, topic = %group.topic, "skipping empty group");
                None
            }
        })
        .sorted_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
        .take(limit)
        .map(|(group, score)| WeaknessEntry {
            topic: group.topic,
            section: group.section,
            weakness_score: score,
            urgency: Urgency::from_score(score),
        })
        .collect()
}

pub fn compute_weakness_top(records: &[GradedRecord], limit: usize) -> Vec<WeaknessEntry> {
    rank_weakness(group_records(records), limit)
}

/// The five weakest (section, topic) groups.
pub fn compute_weakness(records: &[GradedRecord]) -> Vec<WeaknessEntry> {
    compute_weakness_top(records, DEFAULT_WEAKNESS_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(section: &str, topic: &str, total: u32, negative: u32, flagged: u32) -> GroupTally {
        GroupTally {
            section: section.to_string(),
            topic: topic.to_string(),
            total,
            negative,
            flagged,
        }
    }

    #[test]
    fn urgency_thresholds_are_strict() {
        assert_eq!(Urgency::from_score(1.0), Urgency::High);
        assert_eq!(Urgency::from_score(0.71), Urgency::High);
        assert_eq!(Urgency::from_score(0.7), Urgency::Medium);
        assert_eq!(Urgency::from_score(0.41), Urgency::Medium);
        assert_eq!(Urgency::from_score(0.4), Urgency::Low);
        assert_eq!(Urgency::from_score(0.0), Urgency::Low);
    }

    #[test]
    fn amino_acids_example() {
        let records = vec![
            GradedRecord::incorrect("Amino Acids", "B/B"),
            GradedRecord::incorrect("Amino Acids", "B/B"),
            GradedRecord::correct("Amino Acids", "B/B"),
        ];
        let report = compute_weakness(&records);

        assert_eq!(report.len(), 1);
        let entry = &report[0];
        assert_eq!(entry.section, "B/B");
        assert_eq!(entry.topic, "Amino Acids");
        assert!((entry.weakness_score - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(entry.urgency, Urgency::Medium);
    }

    #[test]
    fn flagged_counts_half() {
        let records = vec![
            GradedRecord::flagged("Optics", "C/P"),
            GradedRecord::correct("Optics", "C/P"),
        ];
        let report = compute_weakness(&records);
        assert_eq!(report[0].weakness_score, 0.25);
        assert_eq!(report[0].urgency, Urgency::Low);
    }

    #[test]
    fn same_topic_in_two_sections_is_two_groups() {
        let records = vec![
            GradedRecord::incorrect("Thermodynamics", "C/P"),
            GradedRecord::correct("Thermodynamics", "B/B"),
            GradedRecord::incorrect("Thermodynamics", "C/P"),
        ];
        let groups = group_records(&records);

        assert_eq!(
            groups,
            vec![
                tally("C/P", "Thermodynamics", 2, 2, 0),
                tally("B/B", "Thermodynamics", 1, 0, 0),
            ]
        );
    }

    #[test]
    fn grouping_orders_topics_within_sections() {
        let records = vec![
            GradedRecord::correct("Optics", "C/P"),
            GradedRecord::correct("Enzymes", "B/B"),
            GradedRecord::correct("Kinematics", "C/P"),
        ];
        let order: Vec<(String, String)> = group_records(&records)
            .into_iter()
            .map(|g| (g.section, g.topic))
            .collect();

        assert_eq!(
            order,
            vec![
                ("C/P".to_string(), "Optics".to_string()),
                ("C/P".to_string(), "Kinematics".to_string()),
                ("B/B".to_string(), "Enzymes".to_string()),
            ]
        );
    }

    #[test]
    fn records_without_topic_are_not_grouped() {
        let records = vec![
            GradedRecord::incorrect("", "B/B"),
            GradedRecord::incorrect("Enzymes", ""),
        ];
        let groups = group_records(&records);
        assert_eq!(groups, vec![tally("", "Enzymes", 1, 1, 0)]);
    }

    #[test]
    fn keeps_top_five_sorted_descending() {
        let groups: Vec<GroupTally> = (1..=10)
            .map(|i| tally("S", &format!("topic-{i}"), 10, i, 0))
            .collect();
        let report = rank_weakness(groups, DEFAULT_WEAKNESS_LIMIT);

        assert_eq!(report.len(), 5);
        let topics: Vec<&str> = report.iter().map(|e| e.topic.as_str()).collect();
        assert_eq!(topics, vec!["topic-10", "topic-9", "topic-8", "topic-7", "topic-6"]);
        assert!(report
            .windows(2)
            .all(|w| w[0].weakness_score >= w[1].weakness_score));
        assert_eq!(report[0].urgency, Urgency::High);
        assert_eq!(report[4].urgency, Urgency::Medium);
    }

    #[test]
    fn empty_groups_are_never_scored() {
        let groups = vec![
            tally("B/B", "Empty", 0, 0, 0),
            tally("B/B", "Enzymes", 4, 1, 0),
        ];
        let report = rank_weakness(groups, DEFAULT_WEAKNESS_LIMIT);

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].topic, "Enzymes");
        assert_eq!(tally("B/B", "Empty", 0, 0, 0).weakness_score(), None);
    }

    #[test]
    fn ties_keep_grouping_order() {
        let records = vec![
            GradedRecord::incorrect("First", "A"),
            GradedRecord::incorrect("Second", "B"),
            GradedRecord::incorrect("Third", "A"),
        ];
        let topics: Vec<String> = compute_weakness(&records)
            .into_iter()
            .map(|e| e.topic)
            .collect();
        assert_eq!(topics, vec!["First", "Third", "Second"]);
    }

    #[test]
    fn empty_input_gives_empty_report() {
        assert!(compute_weakness(&[]).is_empty());
    }

    #[test]
    fn custom_limit() {
        let records: Vec<GradedRecord> = (0..8)
            .map(|i| GradedRecord::incorrect(format!("t{i}"), "S"))
            .collect();
        assert_eq!(compute_weakness_top(&records, 3).len(), 3);
        assert_eq!(compute_weakness_top(&records, 20).len(), 8);
        assert!(compute_weakness_top(&records, 0).is_empty());
    }

    #[test]
    fn entry_serializes_camel_case() {
        let entry = WeaknessEntry {
            topic: "Amino Acids".to_string(),
            section: "B/B".to_string(),
            weakness_score: 0.5,
            urgency: Urgency::Medium,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["weaknessScore"], 0.5);
        assert_eq!(json["urgency"], "medium");
    }
}
