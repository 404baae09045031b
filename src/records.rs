use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("failed to read records: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV records: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot infer record format from {path} (expected .csv or .json)")]
    UnknownFormat { path: String },
}

/// How a graded response was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    /// Under review: neither definitively correct nor incorrect.
    Flagged,
}

/// One graded question/response observation.
///
/// Field names follow the camelCase shape produced by the grading service,
/// so the same struct reads both JSON arrays and CSV files with a
/// `topic,section,isCorrect,isFlagged` header. A null or empty value reads
/// as the field's default: an unset topic is skipped later, and an unset
/// `isCorrect` leaves `isFlagged` to pick between flagged and incorrect.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub topic: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub section: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_correct: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_flagged: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl GradedRecord {
    pub fn new(topic: impl Into<String>, section: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            topic: topic.into(),
            section: section.into(),
            is_correct: outcome == Outcome::Correct,
            is_flagged: outcome == Outcome::Flagged,
        }
    }

    pub fn correct(topic: impl Into<String>, section: impl Into<String>) -> Self {
        Self::new(topic, section, Outcome::Correct)
    }

    pub fn incorrect(topic: impl Into<String>, section: impl Into<String>) -> Self {
        Self::new(topic, section, Outcome::Incorrect)
    }

    pub fn flagged(topic: impl Into<String>, section: impl Into<String>) -> Self {
        Self::new(topic, section, Outcome::Flagged)
    }

    /// A correct mark wins over a stray flag.
    pub fn outcome(&self) -> Outcome {
        if self.is_correct {
            Outcome::Correct
        } else if self.is_flagged {
            Outcome::Flagged
        } else {
            Outcome::Incorrect
        }
    }

    /// Records without a topic carry no signal and are skipped when folding.
    pub fn has_topic(&self) -> bool {
        !self.topic.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RecordFormat {
    Csv,
    Json,
}

impl RecordFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(RecordFormat::Csv),
            "json" => Some(RecordFormat::Json),
            _ => None,
        }
    }
}

pub fn parse_records<R: Read>(
    reader: R,
    format: RecordFormat,
) -> Result<Vec<GradedRecord>, RecordsError> {
    let records = match format {
        RecordFormat::Csv => {
            let mut rdr = csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_reader(reader);
            rdr.deserialize::<GradedRecord>()
                .collect::<Result<Vec<_>, _>>()?
        }
        RecordFormat::Json => serde_json::from_reader(reader)?,
    };
    Ok(records)
}

/// Load graded records from a file, inferring the format from its
/// extension when none is given.
pub fn load_records(
    path: &Path,
    format: Option<RecordFormat>,
) -> Result<Vec<GradedRecord>, RecordsError> {
    let format = format
        .or_else(|| RecordFormat::from_path(path))
        .ok_or_else(|| RecordsError::UnknownFormat {
            path: path.display().to_string(),
        })?;

    let file = File::open(path)?;
    let records = parse_records(BufReader::new(file), format)?;
    debug!(path = %path.display(), %format, count = records.len(), "loaded graded records");
    Ok(records)
}
