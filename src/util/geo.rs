use geo_types::Coord;

/// Coordinates are `Coord { x: longitude, y: latitude }` in decimal degrees.
pub type Coordinate = Coord<f64>;

pub struct GeoUtils;

impl GeoUtils {
    pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

    // Great-circle distance in meters
    pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        let phi1 = GeoUtils::deg2rad(lat1);
        let phi2 = GeoUtils::deg2rad(lat2);
        let delta_phi = GeoUtils::deg2rad(lat2 - lat1);
        let delta_lambda = GeoUtils::deg2rad(lon2 - lon1);

        let a = (delta_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        GeoUtils::EARTH_RADIUS_METERS * c
    }

    pub fn distance(p1: Coordinate, p2: Coordinate) -> f64 {
        GeoUtils::haversine_distance(p1.y, p1.x, p2.y, p2.x)
    }

    pub fn path_length(path: &[Coordinate]) -> f64 {
        path.windows(2)
            .map(|pair| GeoUtils::distance(pair[0], pair[1]))
            .sum()
    }

    // Linear lat/lon interpolation, fraction 0 => start, 1 => end
    pub fn lerp(start: Coordinate, end: Coordinate, fraction: f64) -> Coordinate {
        Coord {
            x: start.x + fraction * (end.x - start.x),
            y: start.y + fraction * (end.y - start.y),
        }
    }

    /// Intermediate points between `start` and `end`, endpoints excluded, evenly
    /// spread so that consecutive points are at most `interval_meters` apart.
    pub fn interpolate_between(
        start: Coordinate,
        end: Coordinate,
        interval_meters: f64,
    ) -> Vec<Coordinate> {
        let total_distance = GeoUtils::distance(start, end);

        // Also rejects NaN
        if !(total_distance > 0.0 && interval_meters > 0.0) {
            return vec![];
        }

        let num_intervals = (total_distance / interval_meters).floor() as usize;

        (1..=num_intervals)
            .map(|i| GeoUtils::lerp(start, end, i as f64 / (num_intervals + 1) as f64))
            .collect()
    }

    /// Shifts every coordinate by a fixed calibration offset.
    pub fn apply_offset(path: &mut [Coordinate], longitude_offset: f64, latitude_offset: f64) {
        if longitude_offset == 0.0 && latitude_offset == 0.0 {
            return;
        }

        path.iter_mut().for_each(|coord| {
            coord.x += longitude_offset;
            coord.y += latitude_offset;
        });
    }

    pub fn deg2rad(deg: f64) -> f64 {
        deg.to_radians()
    }

    // Fixed precision used on the wire
    pub fn round_to_places(value: f64, places: i32) -> f64 {
        let multiplier = 10_f64.powi(places);
        (value * multiplier).round() / multiplier
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PEOPLE_SQUARE: (f64, f64) = (121.4737, 31.2304);
    const XUJIAHUI: (f64, f64) = (121.4365, 31.1880);

    fn coord((lon, lat): (f64, f64)) -> Coordinate {
        Coord { x: lon, y: lat }
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = coord(PEOPLE_SQUARE);
        let b = coord(XUJIAHUI);

        let ab = GeoUtils::distance(a, b);
        let ba = GeoUtils::distance(b, a);

        assert_eq!(ab, ba);
        assert!((5_000.0..6_500.0).contains(&ab), "unexpected distance {ab}");
    }

    #[test]
    fn haversine_of_same_point_is_zero() {
        let a = coord(PEOPLE_SQUARE);
        assert_eq!(GeoUtils::distance(a, a), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = GeoUtils::haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.93).abs() < 0.01, "got {d}");
    }

    #[test]
    fn nan_propagates() {
        assert!(GeoUtils::haversine_distance(f64::NAN, 0.0, 1.0, 0.0).is_nan());
        assert!(GeoUtils::interpolate_between(coord((f64::NAN, 0.0)), coord((1.0, 1.0)), 3.0).is_empty());
    }

    #[test]
    fn interpolation_excludes_endpoints() {
        // ~111 m due north
        let start = coord((121.0, 31.0));
        let end = coord((121.0, 31.001));

        let points = GeoUtils::interpolate_between(start, end, 10.0);

        assert_eq!(points.len(), 11);
        assert!(!points.contains(&start));
        assert!(!points.contains(&end));

        let mut full = vec![start];
        full.extend(points);
        full.push(end);
        full.windows(2).for_each(|pair| {
            assert!(GeoUtils::distance(pair[0], pair[1]) < 10.0);
        });
    }

    #[test]
    fn interpolation_degenerate_inputs() {
        let start = coord((121.0, 31.0));
        let end = coord((121.0, 31.001));

        assert!(GeoUtils::interpolate_between(start, start, 10.0).is_empty());
        assert!(GeoUtils::interpolate_between(start, end, 0.0).is_empty());
        assert!(GeoUtils::interpolate_between(start, end, -5.0).is_empty());
        assert!(GeoUtils::interpolate_between(start, end, 500.0).is_empty());
    }

    #[test]
    fn offset_shifts_every_point() {
        let mut path = vec![coord((121.0, 31.0)), coord((121.5, 31.5))];
        GeoUtils::apply_offset(&mut path, -0.5, 0.25);

        assert_eq!(path, vec![coord((120.5, 31.25)), coord((121.0, 31.75))]);
    }

    #[test]
    fn rounding_to_seven_places() {
        assert_eq!(GeoUtils::round_to_places(121.123456789, 7), 121.1234568);
    }
}
