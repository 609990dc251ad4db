use crate::{
    data_types::route::RoutePoint,
    util::geo::{Coordinate, GeoUtils},
};

pub struct TimestampAssigner;

impl TimestampAssigner {
    /// Places points in time by distance covered at a constant speed.
    /// The first point is stamped with `base_epoch_ms`.
    pub fn assign(points: &[Coordinate], base_epoch_ms: i64, speed_mps: f64) -> Vec<RoutePoint> {
        let mut cumulative = 0.0;
        let mut previous: Option<Coordinate> = None;

        points
            .iter()
            .map(|&coord| {
                if let Some(previous) = previous {
                    cumulative += GeoUtils::distance(previous, coord);
                }
                previous = Some(coord);

                let offset_ms = if speed_mps > 0.0 {
                    (cumulative / speed_mps * 1000.0).floor() as i64
                } else {
                    0
                };

                RoutePoint::new(coord, base_epoch_ms + offset_ms)
            })
            .collect()
    }
}
