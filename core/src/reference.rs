//! Geomagnetic reference-field collaborator.
//!
//! The pipeline subtracts a scalar background intensity from the raw field.
//! Any model can be plugged in through [`ReferenceField`]; without one the
//! raw field is used as the anomaly field.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::math::stats::StatsHelper;

#[derive(thiserror::Error, Debug)]
pub enum ReferenceError {
    #[error("reference model unavailable: {0}")]
    Unavailable(String),
    #[error("reference model failed for {date}: {reason}")]
    Evaluation { date: NaiveDate, reason: String },
}

/// Scalar background field intensity (nT) at a position and date.
pub trait ReferenceField: Send + Sync {
    fn intensity(
        &self,
        longitude: f64,
        latitude: f64,
        altitude_km: f64,
        date: NaiveDate,
    ) -> Result<f64, ReferenceError>;
}

/// Fixed background intensity, e.g. a regional value read off a survey report.
#[derive(Debug, Clone, Copy)]
pub struct ConstantField(pub f64);

impl ReferenceField for ConstantField {
    fn intensity(
        &self,
        _longitude: f64,
        _latitude: f64,
        _altitude_km: f64,
        _date: NaiveDate,
    ) -> Result<f64, ReferenceError> {
        if self.0.is_finite() {
            Ok(self.0)
        } else {
            Err(ReferenceError::Unavailable("non-finite constant".into()))
        }
    }
}

/// Evaluates the model once per calendar date at the mean position and
/// altitude of that date's rows. Rows without a date, dates whose
/// evaluation fails, and a missing model all contribute 0.
pub fn background_field(
    model: Option<&dyn ReferenceField>,
    longitudes: &[f64],
    latitudes: &[f64],
    altitudes_m: &[f64],
    dates: &[Option<NaiveDate>],
) -> Vec<f64> {
    let mut background = vec![0.0; dates.len()];
    let Some(model) = model else {
        log::warn!("Reference field unavailable; raw field used as anomaly field");
        return background;
    };

    let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (row, date) in dates.iter().enumerate() {
        if let Some(date) = date {
            by_date.entry(*date).or_default().push(row);
        }
    }

    for (date, rows) in by_date {
        let gather = |column: &[f64]| -> Vec<f64> { rows.iter().map(|&r| column[r]).collect() };
        let lon = StatsHelper::finite_mean(&gather(longitudes)).unwrap_or(f64::NAN);
        let lat = StatsHelper::finite_mean(&gather(latitudes)).unwrap_or(f64::NAN);
        let alt_km = StatsHelper::finite_mean(&gather(altitudes_m)).unwrap_or(0.0) / 1000.0;
        match model.intensity(lon, lat, alt_km, date) {
            Ok(value) => {
                for &row in &rows {
                    background[row] = value;
                }
            }
            Err(err) => log::warn!("Skipping reference field for {}: {}", date, err),
        }
    }
    background
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingOn(NaiveDate);

    impl ReferenceField for FailingOn {
        fn intensity(
            &self,
            _lon: f64,
            lat: f64,
            _alt: f64,
            date: NaiveDate,
        ) -> Result<f64, ReferenceError> {
            if date == self.0 {
                Err(ReferenceError::Evaluation {
                    date,
                    reason: "out of model range".into(),
                })
            } else {
                Ok(lat * 1000.0)
            }
        }
    }

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 5, d)
    }

    #[test]
    fn missing_model_yields_zero_background() {
        let field = background_field(None, &[1.0], &[2.0], &[0.0], &[day(1)]);
        assert_eq!(field, vec![0.0]);
    }

    #[test]
    fn evaluated_once_per_date_at_mean_position() {
        let dates = [day(1), day(1), day(2), None];
        let lats = [10.0, 20.0, 30.0, 40.0];
        let model = FailingOn(NaiveDate::from_ymd_opt(1999, 1, 1).unwrap());
        let field = background_field(Some(&model), &[0.0; 4], &lats, &[0.0; 4], &dates);
        assert_eq!(field, vec![15_000.0, 15_000.0, 30_000.0, 0.0]);
    }

    #[test]
    fn failing_dates_contribute_zero() {
        let dates = [day(1), day(2)];
        let model = FailingOn(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        let field = background_field(Some(&model), &[0.0; 2], &[1.0, 1.0], &[0.0; 2], &dates);
        assert_eq!(field, vec![1000.0, 0.0]);
    }

    #[test]
    fn constant_field_ignores_position() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(ConstantField(48_000.0).intensity(1.0, 2.0, 0.1, date).unwrap(), 48_000.0);
    }
}
