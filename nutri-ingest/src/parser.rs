//! Row parser
//!
//! Turns one already-split dataset line into a [`NutritionRecord`], or a
//! reason for skipping it. Columns are located by header name, so column
//! order in the source is free.
//!
//! The parser never fails the run: every problem with a row becomes a
//! [`SkipReason`], and a bad numeric cell only blanks that one field.

use csv::StringRecord;
use nutri_common::db::models::{Metric, NutritionRecord};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Identity column names in the source header
pub mod columns {
    pub const USER_ID: &str = "User_ID";
    pub const PHONE_NUMBER: &str = "PhoneNumber";
    pub const SEX: &str = "Sex";

    /// Columns whose absence from the header aborts a run
    pub const REQUIRED_HEADERS: [&str; 2] = [USER_ID, PHONE_NUMBER];
}

/// Rows shorter than this are skipped
pub const MIN_COLUMNS: usize = 63;

/// Which fields a phase extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Identity fields only
    Basic,
    /// Identity fields plus every metric
    Full,
}

/// Header name to column position
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    /// Build from the header line; names are trimmed, first occurrence wins
    pub fn from_header(header: &StringRecord) -> Self {
        let mut positions = HashMap::with_capacity(header.len());
        for (position, name) in header.iter().enumerate() {
            positions.entry(name.trim().to_string()).or_insert(position);
        }
        Self { positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// First required header that is absent, if any
    pub fn missing_required(&self) -> Option<&'static str> {
        columns::REQUIRED_HEADERS
            .into_iter()
            .find(|name| !self.contains(name))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Why a row was not turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("expected at least {min} columns, found {found}", min = MIN_COLUMNS)]
    TooFewColumns { found: usize },

    #[error("required field {0} is empty")]
    MissingField(&'static str),

    #[error("malformed line: {0}")]
    Malformed(String),
}

/// Result of parsing one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Parsed(NutritionRecord),
    Skipped(SkipReason),
}

fn field<'r>(record: &'r StringRecord, index: &HeaderIndex, name: &str) -> &'r str {
    index
        .position(name)
        .and_then(|position| record.get(position))
        .map(str::trim)
        .unwrap_or("")
}

fn required<'r>(
    record: &'r StringRecord,
    index: &HeaderIndex,
    name: &'static str,
) -> Result<&'r str, SkipReason> {
    match field(record, index, name) {
        "" => Err(SkipReason::MissingField(name)),
        value => Ok(value),
    }
}

fn identity<'r>(
    record: &'r StringRecord,
    index: &HeaderIndex,
) -> Result<(&'r str, &'r str, &'r str), SkipReason> {
    Ok((
        required(record, index, columns::USER_ID)?,
        required(record, index, columns::PHONE_NUMBER)?,
        required(record, index, columns::SEX)?,
    ))
}

/// Blank, non-numeric and non-finite cells all read as absent
fn parse_metric(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parse one row in the given mode
pub fn parse_row(record: &StringRecord, index: &HeaderIndex, mode: ParseMode) -> RowOutcome {
    if record.len() < MIN_COLUMNS {
        return RowOutcome::Skipped(SkipReason::TooFewColumns {
            found: record.len(),
        });
    }

    let (user_id, phone_number, sex) = match identity(record, index) {
        Ok(identity) => identity,
        Err(reason) => return RowOutcome::Skipped(reason),
    };

    let mut parsed = NutritionRecord::new(user_id, phone_number, sex);

    if mode == ParseMode::Full {
        for metric in Metric::ALL {
            parsed.set_metric(*metric, parse_metric(field(record, index, metric.header())));
        }
    }

    RowOutcome::Parsed(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> StringRecord {
        let mut names = vec![columns::PHONE_NUMBER, columns::USER_ID, columns::SEX];
        names.extend(Metric::ALL.iter().map(|m| m.header()));
        StringRecord::from(names)
    }

    /// Full-width row with every metric set to `value`
    fn row(user_id: &str, phone: &str, sex: &str, value: &str) -> StringRecord {
        let mut fields = vec![phone.to_string(), user_id.to_string(), sex.to_string()];
        fields.extend(std::iter::repeat(value.to_string()).take(Metric::COUNT));
        StringRecord::from(fields)
    }

    fn parsed(outcome: RowOutcome) -> NutritionRecord {
        match outcome {
            RowOutcome::Parsed(record) => record,
            RowOutcome::Skipped(reason) => panic!("unexpected skip: {}", reason),
        }
    }

    #[test]
    fn test_header_index() {
        let index = HeaderIndex::from_header(&StringRecord::from(vec![" User_ID ", "Sex", "Sex"]));
        assert_eq!(index.position("User_ID"), Some(0));
        assert_eq!(index.position("Sex"), Some(1));
        assert_eq!(index.len(), 2);
        assert_eq!(index.missing_required(), Some("PhoneNumber"));

        let index = HeaderIndex::from_header(&header());
        assert_eq!(index.missing_required(), None);
        assert_eq!(index.len(), MIN_COLUMNS);
    }

    #[test]
    fn test_basic_extracts_identity_only() {
        let index = HeaderIndex::from_header(&header());
        let record = parsed(parse_row(&row(" 17 ", "61400000017 ", "Female", "4.5"), &index, ParseMode::Basic));

        assert_eq!(record.user_id, "17");
        assert_eq!(record.phone_number, "61400000017");
        assert_eq!(record.sex, "Female");
        assert!(!record.has_metrics());
    }

    #[test]
    fn test_full_extracts_every_metric() {
        let index = HeaderIndex::from_header(&header());
        let record = parsed(parse_row(&row("1", "6141", "Male", "4.5"), &index, ParseMode::Full));

        for (metric, value) in record.metrics() {
            assert_eq!(value, Some(4.5), "{:?}", metric);
        }
    }

    #[test]
    fn test_bad_numeric_cell_blanks_only_that_field() {
        let index = HeaderIndex::from_header(&header());
        let mut fields: Vec<String> = row("1", "6141", "Male", "2").iter().map(String::from).collect();
        let water = index.position(Metric::WaterTotalMl.header()).unwrap();
        let sugar = index.position(Metric::Sugar.header()).unwrap();
        let fat = index.position(Metric::SaturatedFat.header()).unwrap();
        fields[water] = "n/a".to_string();
        fields[sugar] = "  ".to_string();
        fields[fat] = "inf".to_string();

        let record = parsed(parse_row(&StringRecord::from(fields), &index, ParseMode::Full));
        assert_eq!(record.metric(Metric::WaterTotalMl), None);
        assert_eq!(record.metric(Metric::Sugar), None);
        assert_eq!(record.metric(Metric::SaturatedFat), None);
        assert_eq!(record.metric(Metric::Water), Some(2.0));
    }

    #[test]
    fn test_short_row_is_skipped() {
        let index = HeaderIndex::from_header(&header());
        let outcome = parse_row(&StringRecord::from(vec!["6141", "1", "Male", "1", "2"]), &index, ParseMode::Basic);
        assert_eq!(outcome, RowOutcome::Skipped(SkipReason::TooFewColumns { found: 5 }));
    }

    #[test]
    fn test_empty_identity_fields_are_skipped() {
        let index = HeaderIndex::from_header(&header());

        let outcome = parse_row(&row("  ", "6141", "Male", "1"), &index, ParseMode::Basic);
        assert_eq!(outcome, RowOutcome::Skipped(SkipReason::MissingField("User_ID")));

        let outcome = parse_row(&row("1", "", "Male", "1"), &index, ParseMode::Full);
        assert_eq!(outcome, RowOutcome::Skipped(SkipReason::MissingField("PhoneNumber")));

        let outcome = parse_row(&row("1", "6141", "", "1"), &index, ParseMode::Basic);
        assert_eq!(outcome, RowOutcome::Skipped(SkipReason::MissingField("Sex")));
    }

    #[test]
    fn test_metric_absent_from_header_reads_as_none() {
        let full = header();
        let mut names: Vec<&str> = full.iter().collect();
        names.retain(|name| *name != Metric::Legumes.header());
        names.push("Unrelated");
        let index = HeaderIndex::from_header(&StringRecord::from(names));

        let record = parsed(parse_row(&row("1", "6141", "Male", "3"), &index, ParseMode::Full));
        assert_eq!(record.metric(Metric::Legumes), None);
        assert_eq!(record.metric(Metric::Water), Some(3.0));
    }
}
