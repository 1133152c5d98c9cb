//! Timestamp resolution for survey rows.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::prelude::ColumnConfig;
use crate::survey::table::SurveyTable;

const LAYOUTS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses one timestamp cell. Unrecognized text yields `None`.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
}

/// Per-row timestamps, with a flag telling whether they were synthesized.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub stamps: Vec<Option<NaiveDateTime>>,
    pub synthetic: bool,
}

impl Timeline {
    /// Uniform 1 Hz sequence starting at 2000-01-01 00:00:00.
    pub fn synthetic(rows: usize) -> Self {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        let stamps = (0..rows)
            .map(|i| Some(start + Duration::seconds(i as i64)))
            .collect();
        Self {
            stamps,
            synthetic: true,
        }
    }

    /// Reads the timestamp column, else the date + time pair, else
    /// synthesizes one line's worth of 1 Hz stamps.
    pub fn resolve(table: &SurveyTable, columns: &ColumnConfig) -> Self {
        let parsed = if let Some(cells) = table.text_column(&columns.timestamp) {
            Self::parsed(cells.iter().map(|cell| parse_timestamp(cell)).collect())
        } else if let (Some(dates), Some(times)) =
            (table.text_column(&columns.date), table.text_column(&columns.time))
        {
            Self::parsed(
                dates
                    .iter()
                    .zip(&times)
                    .map(|(date, time)| parse_timestamp(&format!("{} {}", date, time)))
                    .collect(),
            )
        } else {
            None
        };

        parsed.unwrap_or_else(|| {
            log::warn!("No recognisable timestamps; treating file as one flight line");
            Self::synthetic(table.len())
        })
    }

    /// Keeps parsed stamps only when at least one cell was recognised.
    fn parsed(stamps: Vec<Option<NaiveDateTime>>) -> Option<Self> {
        stamps.iter().any(Option::is_some).then_some(Self {
            stamps,
            synthetic: false,
        })
    }

    pub fn dates(&self) -> Vec<Option<NaiveDate>> {
        self.stamps.iter().map(|stamp| stamp.map(|dt| dt.date())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_layouts() {
        assert!(parse_timestamp("2024-05-01 10:00:00").is_some());
        assert!(parse_timestamp("2024-05-01 10:00:00.250").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00Z").is_some());
        assert!(parse_timestamp("01.05.2024 10:00:00").is_some());
        assert!(parse_timestamp("not a time").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn date_and_time_pair_is_combined() {
        let csv = "Date,Time,TMI\n2024-05-01,10:00:00,1\n2024-05-01,10:00:01,2\n";
        let table = SurveyTable::from_reader(csv.as_bytes()).unwrap();
        let timeline = Timeline::resolve(&table, &ColumnConfig::default());
        assert!(!timeline.synthetic);
        let first = timeline.stamps[0].unwrap();
        let second = timeline.stamps[1].unwrap();
        assert_eq!((second - first).num_seconds(), 1);
    }

    #[test]
    fn unparseable_timestamp_column_falls_back_to_synthetic_seconds() {
        let csv = "Timestamp,TMI\nbogus,1\nbogus,2\n";
        let table = SurveyTable::from_reader(csv.as_bytes()).unwrap();
        let timeline = Timeline::resolve(&table, &ColumnConfig::default());
        assert!(timeline.synthetic);
        assert!(timeline.stamps.iter().all(Option::is_some));
        assert_eq!(timeline.dates().len(), 2);
    }

    #[test]
    fn partly_parsed_timestamp_column_is_kept() {
        let csv = "Timestamp,TMI\n2024-05-01 10:00:00,1\nbogus,2\n";
        let table = SurveyTable::from_reader(csv.as_bytes()).unwrap();
        let timeline = Timeline::resolve(&table, &ColumnConfig::default());
        assert!(!timeline.synthetic);
        assert!(timeline.stamps[0].is_some());
        assert!(timeline.stamps[1].is_none());
    }

    #[test]
    fn missing_columns_fall_back_to_synthetic_seconds() {
        let csv = "TMI\n1\n2\n3\n";
        let table = SurveyTable::from_reader(csv.as_bytes()).unwrap();
        let timeline = Timeline::resolve(&table, &ColumnConfig::default());
        assert!(timeline.synthetic);
        assert_eq!(timeline.stamps.len(), 3);
        let gap = timeline.stamps[2].unwrap() - timeline.stamps[1].unwrap();
        assert_eq!(gap.num_seconds(), 1);
    }
}
