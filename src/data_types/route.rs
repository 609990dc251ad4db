use serde_derive::Serialize;

use crate::util::geo::{Coordinate, GeoUtils};

use super::common::TRACK_POINT_DECIMAL_PLACES;

/// A coordinate stamped with the time it was (nominally) reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "WireRoutePoint")]
pub struct RoutePoint {
    pub coord: Coordinate,
    // Epoch milliseconds
    pub locatetime: i64,
}

impl RoutePoint {
    pub fn new(coord: Coordinate, locatetime: i64) -> Self {
        Self { coord, locatetime }
    }

    pub fn longitude(&self) -> f64 {
        self.coord.x
    }

    pub fn latitude(&self) -> f64 {
        self.coord.y
    }

    pub fn distance_to(&self, other: &RoutePoint) -> f64 {
        GeoUtils::distance(self.coord, other.coord)
    }
}

#[derive(Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRoutePoint {
    lat_lng: LatLng,
    location: String,
    step: u32,
    locatetime: i64,
}

impl From<RoutePoint> for WireRoutePoint {
    fn from(point: RoutePoint) -> Self {
        let places = TRACK_POINT_DECIMAL_PLACES;

        Self {
            lat_lng: LatLng {
                latitude: GeoUtils::round_to_places(point.latitude(), places as i32),
                longitude: GeoUtils::round_to_places(point.longitude(), places as i32),
            },
            location: format!(
                "{:.places$},{:.places$}",
                point.longitude(),
                point.latitude()
            ),
            step: 0,
            locatetime: point.locatetime,
        }
    }
}

#[cfg(test)]
mod test {
    use geo_types::Coord;
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_shape() {
        let point = RoutePoint::new(Coord { x: 121.434080707, y: 31.0232436577 }, 1_700_000_000_123);

        assert_eq!(
            serde_json::to_value(point).unwrap(),
            json!({
                "latLng": {"latitude": 31.0232437, "longitude": 121.4340807},
                "location": "121.4340807,31.0232437",
                "step": 0,
                "locatetime": 1_700_000_000_123_i64
            })
        );
    }
}
