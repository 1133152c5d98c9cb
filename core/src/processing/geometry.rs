//! Along-track distance and local planar projection of survey positions.

use crate::math::stats::StatsHelper;

/// Mean Earth radius (metres) used by both the haversine and the projection.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Cumulative great-circle distance between consecutive points; the first
/// entry is 0. A NaN position poisons every later distance.
pub fn along_track(latitudes: &[f64], longitudes: &[f64]) -> Vec<f64> {
    let count = latitudes.len().min(longitudes.len());
    let mut distances = Vec::with_capacity(count);
    let mut total = 0.0;
    for idx in 0..count {
        if idx > 0 {
            total += haversine(
                latitudes[idx - 1],
                longitudes[idx - 1],
                latitudes[idx],
                longitudes[idx],
            );
        }
        distances.push(total);
    }
    distances
}

pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = phi2 - phi1;
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.clamp(0.0, 1.0).sqrt().asin()
}

/// Equirectangular projection centred on the mean position.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    pub lat0: f64,
    pub lon0: f64,
}

impl LocalProjection {
    pub fn centred_on(latitudes: &[f64], longitudes: &[f64]) -> Self {
        Self {
            lat0: StatsHelper::finite_mean(latitudes).unwrap_or(0.0),
            lon0: StatsHelper::finite_mean(longitudes).unwrap_or(0.0),
        }
    }

    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let x = EARTH_RADIUS_M * (lon - self.lon0).to_radians() * self.lat0.to_radians().cos();
        let y = EARTH_RADIUS_M * (lat - self.lat0).to_radians();
        (x, y)
    }

    pub fn project_all(&self, latitudes: &[f64], longitudes: &[f64]) -> (Vec<f64>, Vec<f64>) {
        latitudes
            .iter()
            .zip(longitudes)
            .map(|(&lat, &lon)| self.project(lat, lon))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = along_track(&[0.0, 1.0], &[0.0, 0.0]);
        assert_eq!(d[0], 0.0);
        assert_relative_eq!(
            d[1],
            EARTH_RADIUS_M * std::f64::consts::PI / 180.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn along_track_is_cumulative() {
        let lats = [52.0, 52.0001, 52.0002, 52.0003];
        let lons = [13.0; 4];
        let d = along_track(&lats, &lons);
        assert!(d.windows(2).all(|w| w[1] >= w[0]));
        assert_relative_eq!(d[3], 3.0 * d[1], max_relative = 1e-6);
    }

    #[test]
    fn nan_positions_propagate() {
        let d = along_track(&[0.0, f64::NAN, 0.001], &[0.0, 0.0, 0.0]);
        assert!(d[1].is_nan());
        assert!(d[2].is_nan());
    }

    #[test]
    fn projection_is_centred_on_mean_position() {
        let lats = [10.0, 10.002];
        let lons = [20.0, 20.002];
        let projection = LocalProjection::centred_on(&lats, &lons);
        let (xs, ys) = projection.project_all(&lats, &lons);
        assert_relative_eq!(xs[0] + xs[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(ys[0] + ys[1], 0.0, epsilon = 1e-6);
        let expected_dy = EARTH_RADIUS_M * 0.002f64.to_radians();
        assert_relative_eq!(ys[1] - ys[0], expected_dy, max_relative = 1e-9);
        assert!(xs[1] - xs[0] < expected_dy);
    }
}
