//! Flat CSV table that keeps the input columns verbatim and appends the
//! pipeline's annotation columns on output.

use std::io::{Read, Write};
use std::path::Path;

use crate::prelude::{PipelineError, PipelineResult};
use crate::survey::record::RowAnnotations;

/// Columns written by the pipeline. They are dropped on load so that a
/// re-run over an annotated file regenerates rather than duplicates them.
pub const OUTPUT_COLUMNS: [&str; 11] = [
    "TMI_anom",
    "IGRF_field",
    "Analytic_Signal",
    "Estimated_Distance_A",
    "Estimated_Depth_A",
    "Estimated_Distance_B",
    "Estimated_Depth_B",
    "Estimated_Distance",
    "Estimated_Depth",
    "Quality_Flag",
    "Quality_Notes",
];

/// Estimate columns carried into the targets file.
const TARGET_COLUMNS: [&str; 7] = [
    "Estimated_Distance_A",
    "Estimated_Depth_A",
    "Estimated_Distance_B",
    "Estimated_Depth_B",
    "Estimated_Distance",
    "Estimated_Depth",
    "Quality_Flag",
];

#[derive(Debug, Clone)]
pub struct SurveyTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SurveyTable {
    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> PipelineResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let raw_headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

        let kept: Vec<usize> = raw_headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !OUTPUT_COLUMNS.contains(&name.as_str()))
            .map(|(idx, _)| idx)
            .collect();
        if kept.len() != raw_headers.len() {
            log::info!(
                "Dropping {} previously generated column(s)",
                raw_headers.len() - kept.len()
            );
        }

        let headers = kept.iter().map(|&idx| raw_headers[idx].clone()).collect();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let row = kept
                .iter()
                .map(|&idx| record.get(idx).unwrap_or("").to_string())
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Raw text of a column, `None` if the column does not exist.
    pub fn text_column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].trim()).collect())
    }

    /// Numeric column that must exist. Unparseable cells become NaN, but a
    /// column with content and no parseable cell at all is rejected.
    pub fn required_numeric(&self, name: &str) -> PipelineResult<Vec<f64>> {
        let text = self
            .text_column(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))?;
        let has_content = text.iter().any(|cell| !cell.is_empty());
        let values: Vec<f64> = text.iter().map(|cell| parse_cell(cell)).collect();
        if has_content && values.iter().all(|v| v.is_nan()) {
            return Err(PipelineError::NonNumericColumn(name.to_string()));
        }
        Ok(values)
    }

    /// Numeric column that may be absent; every cell coerces, NaN on failure.
    pub fn optional_numeric(&self, name: &str) -> Option<Vec<f64>> {
        self.text_column(name)
            .map(|text| text.iter().map(|cell| parse_cell(cell)).collect())
    }

    /// Writes every original column followed by the annotation columns.
    pub fn write_annotated<W: Write>(
        &self,
        writer: W,
        annotations: &RowAnnotations,
    ) -> PipelineResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut header: Vec<&str> = self.headers.iter().map(String::as_str).collect();
        header.extend(OUTPUT_COLUMNS);
        csv_writer.write_record(&header)?;

        for (row_idx, row) in self.rows.iter().enumerate() {
            let mut record: Vec<String> = row.clone();
            record.extend(annotations.row_cells(row_idx, &OUTPUT_COLUMNS));
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the marked rows only, original columns plus the estimates.
    pub fn write_targets<W: Write>(
        &self,
        writer: W,
        marked: &[bool],
        annotations: &RowAnnotations,
    ) -> PipelineResult<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut header: Vec<&str> = self.headers.iter().map(String::as_str).collect();
        header.extend(TARGET_COLUMNS);
        csv_writer.write_record(&header)?;

        let mut written = 0;
        for (row_idx, row) in self.rows.iter().enumerate() {
            if !marked.get(row_idx).copied().unwrap_or(false) {
                continue;
            }
            let mut record: Vec<String> = row.clone();
            record.extend(annotations.row_cells(row_idx, &TARGET_COLUMNS));
            csv_writer.write_record(&record)?;
            written += 1;
        }
        csv_writer.flush()?;
        Ok(written)
    }
}

fn parse_cell(cell: &str) -> f64 {
    cell.trim().parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Latitude,Longitude,TMI,Mark,Note\n\
                          52.0,13.0,48000.5,1,a\n\
                          52.1,13.1,,0,b\n\
                          52.2,13.2,oops,,c\n";

    #[test]
    fn numeric_columns_coerce_bad_cells_to_nan() {
        let table = SurveyTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let tmi = table.required_numeric("TMI").unwrap();
        assert_eq!(tmi[0], 48000.5);
        assert!(tmi[1].is_nan());
        assert!(tmi[2].is_nan());
        let marks = table.optional_numeric("Mark").unwrap();
        assert!(marks[2].is_nan());
    }

    #[test]
    fn missing_and_textual_columns_are_rejected() {
        let table = SurveyTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert!(matches!(
            table.required_numeric("Altitude AGL"),
            Err(PipelineError::MissingColumn(name)) if name == "Altitude AGL"
        ));
        assert!(matches!(
            table.required_numeric("Note"),
            Err(PipelineError::NonNumericColumn(_))
        ));
    }

    #[test]
    fn generated_columns_are_dropped_on_load() {
        let input = "Latitude,TMI_anom,Quality_Flag,Mark\n1.0,5.0,OK,1\n";
        let table = SurveyTable::from_reader(input.as_bytes()).unwrap();
        assert_eq!(table.headers(), &["Latitude".to_string(), "Mark".to_string()]);
        assert_eq!(table.text_column("Mark").unwrap(), vec!["1"]);
    }

    #[test]
    fn targets_hold_marked_rows_with_estimates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, SAMPLE.as_bytes()).unwrap();
        let table = SurveyTable::load(file.path()).unwrap();

        let mut annotations = RowAnnotations::new(table.len());
        annotations.distance[0] = 2.345_678;
        let mut buffer = Vec::new();
        let written = table
            .write_targets(&mut buffer, &[true, false, false], &annotations)
            .unwrap();
        assert_eq!(written, 1);

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().ends_with("Estimated_Depth,Quality_Flag"));
        assert_eq!(lines.next().unwrap(), "52.0,13.0,48000.5,1,a,,,,,2.3457,,");
        assert!(lines.next().is_none());
    }
}
