use crate::{
    logvbln,
    util::geo::{Coordinate, GeoUtils},
};

pub struct Densifier;

impl Densifier {
    const CC: &'static str = "Densifier";

    /// Inserts points along every segment so consecutive points are no further
    /// apart than `speed_mps * sample_interval_secs`.
    pub fn densify(path: &[Coordinate], speed_mps: f64, sample_interval_secs: f64) -> Vec<Coordinate> {
        if path.len() < 2 {
            return path.to_vec();
        }

        let interval_meters = speed_mps * sample_interval_secs;
        let mut detailed = vec![path[0]];

        path.windows(2).for_each(|pair| {
            detailed.extend(GeoUtils::interpolate_between(pair[0], pair[1], interval_meters));
            detailed.push(pair[1]);
        });

        logvbln!(
            "Densified {} points into {} at {:.2}m spacing",
            path.len(),
            detailed.len(),
            interval_meters
        );

        detailed
    }
}
