use crate::prelude::{ColumnConfig, PipelineError, PipelineResult};
use crate::survey::table::SurveyTable;
use crate::survey::timestamp::Timeline;

/// Columnar view of the survey rows the pipeline consumes.
#[derive(Debug, Clone)]
pub struct SurveyData {
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    /// Raw total-field reading (nT).
    pub field: Vec<f64>,
    /// `true` where the mark column equals 1; absent or unparseable cells count as 0.
    pub marks: Vec<bool>,
    pub has_mark_column: bool,
    /// Above-ground altitude, NaN where missing.
    pub altitude_agl: Vec<f64>,
    pub has_agl: bool,
    /// Altitude handed to the reference-field model, 0 where unknown.
    pub reference_altitude_m: Vec<f64>,
    pub timeline: Timeline,
}

impl SurveyData {
    pub fn from_table(table: &SurveyTable, columns: &ColumnConfig) -> PipelineResult<Self> {
        let missing: Vec<&str> = [&columns.field, &columns.latitude, &columns.longitude]
            .into_iter()
            .filter(|name| !table.has_column(name))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::MissingColumn(missing.join(", ")));
        }

        let field = table.required_numeric(&columns.field)?;
        let latitude = table.required_numeric(&columns.latitude)?;
        let longitude = table.required_numeric(&columns.longitude)?;

        let mark_values = table.optional_numeric(&columns.mark);
        let has_mark_column = mark_values.is_some();
        let marks = mark_values
            .map(|values| values.iter().map(|&v| v == 1.0).collect())
            .unwrap_or_else(|| vec![false; table.len()]);

        let agl_values = columns
            .altitude_agl
            .as_deref()
            .filter(|name| !name.is_empty())
            .and_then(|name| table.optional_numeric(name));
        let has_agl = agl_values.is_some();
        let altitude_agl = agl_values.unwrap_or_else(|| vec![f64::NAN; table.len()]);

        let reference_altitude_m = resolve_reference_altitude(table, columns, &altitude_agl);
        let timeline = Timeline::resolve(table, columns);

        Ok(Self {
            latitude,
            longitude,
            field,
            marks,
            has_mark_column,
            altitude_agl,
            has_agl,
            reference_altitude_m,
            timeline,
        })
    }

    pub fn len(&self) -> usize {
        self.field.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field.is_empty()
    }

    pub fn marked_count(&self) -> usize {
        self.marks.iter().filter(|&&m| m).count()
    }
}

fn resolve_reference_altitude(
    table: &SurveyTable,
    columns: &ColumnConfig,
    agl: &[f64],
) -> Vec<f64> {
    let amsl = columns
        .altitude_amsl
        .as_deref()
        .filter(|name| !name.is_empty())
        .and_then(|name| table.optional_numeric(name))
        .filter(|values| values.iter().any(|v| v.is_finite()));

    let chosen = match amsl {
        Some(values) => Some(values),
        None if agl.iter().any(|v| v.is_finite()) => {
            log::info!("Using AGL altitude as reference-field altitude proxy");
            Some(agl.to_vec())
        }
        None => None,
    };

    match chosen {
        Some(values) => values.into_iter().map(|v| if v.is_finite() { v } else { 0.0 }).collect(),
        None => {
            log::info!("No altitude column for reference field; using 0 m");
            vec![0.0; table.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_missing_required_column() {
        let table = SurveyTable::from_reader("Mark\n1\n".as_bytes()).unwrap();
        let err = SurveyData::from_table(&table, &ColumnConfig::default()).unwrap_err();
        match err {
            PipelineError::MissingColumn(names) => assert_eq!(names, "TMI, Latitude, Longitude"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn marks_and_altitude_are_coerced() {
        let csv = "Latitude,Longitude,TMI,Mark,Altitude AGL\n\
                   1.0,2.0,3.0,1,5.0\n\
                   1.0,2.0,3.0,,\n\
                   1.0,2.0,3.0,2,7.0\n";
        let table = SurveyTable::from_reader(csv.as_bytes()).unwrap();
        let data = SurveyData::from_table(&table, &ColumnConfig::default()).unwrap();
        assert_eq!(data.marks, vec![true, false, false]);
        assert_eq!(data.marked_count(), 1);
        assert!(data.has_agl);
        assert!(data.altitude_agl[1].is_nan());
        assert_eq!(data.reference_altitude_m, vec![5.0, 0.0, 7.0]);
    }
}
