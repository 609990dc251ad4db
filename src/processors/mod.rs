use rand::Rng;

use crate::{
    config::Config,
    data_types::{
        rules::{PaceCheck, PaceRules},
        run::RunPayload,
    },
    error::Result,
    logln,
    util::{
        cancel::StopCheck,
        facilities::Facilities,
        geo::Coordinate,
        logging::MessageLevel,
        time::Benchmark,
    },
};

use self::{
    densifier::Densifier,
    reconciler::{Reconciled, Reconciler, Strategy},
    segmenter::Segmenter,
    timestamps::TimestampAssigner,
};

pub mod decision;
pub mod densifier;
pub mod reconciler;
pub mod route_loader;
pub mod segmenter;
pub mod timestamps;

/// Turns a sparse route into one uploadable run:
/// densify, reconcile the distance, stamp times, cut into tracks.
pub struct GenerationPipeline<'a> {
    config: &'a Config,
    rules: &'a PaceRules,
    dependencies: &'a Facilities,
    stop: &'a dyn StopCheck,
}

impl<'a> GenerationPipeline<'a> {
    const CC: &'static str = "Pipeline";

    pub fn new(config: &'a Config, rules: &'a PaceRules, dependencies: &'a Facilities, stop: &'a dyn StopCheck) -> Self {
        Self {
            config,
            rules,
            dependencies,
            stop,
        }
    }

    pub fn generate<R: Rng>(&self, route: &[Coordinate], start_epoch_ms: i64, rng: &mut R) -> Result<RunPayload> {
        self.stop.check()?;
        let _bench = Benchmark::start("Generate run");

        let speed = self.config.target_speed_mps();
        let detailed = Densifier::densify(route, speed, self.config.interval_seconds as f64);

        let reconciled = Reconciler::new(
            self.config.reconcile_policy(),
            self.dependencies.decisions(),
            self.stop,
        )
        .reconcile(route, &detailed, self.config.target_distance_m())?;
        self.report(route, &reconciled);

        let points = TimestampAssigner::assign(&reconciled.points, start_epoch_ms, speed);
        let tracks = Segmenter::new(self.config.min_segment_points).split(&points, rng, self.stop)?;

        let duration_s = match (points.first(), points.last()) {
            (Some(first), Some(last)) => ((last.locatetime - first.locatetime) / 1000).max(1),
            _ => 1,
        };
        let pace = self.average_pace(duration_s, reconciled.final_distance_m);

        logln!(
            "{} tracks, {} points, {:.2}m in {}s, {} min/km",
            tracks.len(),
            points.len(),
            reconciled.final_distance_m,
            duration_s,
            pace
        );

        Ok(RunPayload::new(
            &self.config.user_id,
            self.rules.activity_type_id,
            pace,
            tracks,
        ))
    }

    // Whole minutes per km, kept inside the portal's window
    fn average_pace(&self, duration_s: i64, distance_m: f64) -> i64 {
        let raw = if distance_m > 0.0 {
            (duration_s as f64 / (distance_m / 1000.0) / 60.0).round() as i64
        } else {
            (self.config.pace_sec_per_km / 60.0).round() as i64
        };

        let log = self.dependencies.log();
        match self.rules.clamp_pace(raw) {
            PaceCheck::Within(pace) => pace,
            PaceCheck::TooFast(pace) => {
                log.on_log(
                    &format!("Pace {raw} min/km is faster than allowed, using {pace}"),
                    MessageLevel::Warning,
                );
                pace
            }
            PaceCheck::TooSlow(pace) => {
                log.on_log(
                    &format!("Pace {raw} min/km is slower than allowed, using {pace}"),
                    MessageLevel::Warning,
                );
                pace
            }
        }
    }

    fn report(&self, route: &[Coordinate], reconciled: &Reconciled) {
        let strategy = match reconciled.strategy {
            Strategy::PassThrough => "route used as drawn".to_string(),
            Strategy::Truncated => "route truncated to target".to_string(),
            Strategy::KeptFull => "full route kept".to_string(),
            Strategy::ThereAndBack { legs } => format!("there-and-back over {legs} legs"),
            Strategy::Loop { laps } => format!("loop of {laps} full laps"),
            Strategy::Original => "fell back to the original route".to_string(),
        };

        self.dependencies.log().on_log(
            &format!(
                "{strategy}: {} input points, detailed {:.2}m, final {:.2}m",
                route.len(),
                reconciled.detailed_distance_m,
                reconciled.final_distance_m
            ),
            MessageLevel::Info,
        );
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use geo_types::Coord;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::util::{cancel::CancelFlag, facilities::DependenciesBuilder, logging::LogSink};

    #[derive(Default)]
    struct Collect(std::sync::Mutex<Vec<(String, MessageLevel)>>);

    impl LogSink for Collect {
        fn on_log(&self, message: &str, level: MessageLevel) {
            self.0.lock().unwrap().push((message.to_string(), level));
        }
    }

    fn straight(meters: f64) -> Vec<Coordinate> {
        vec![
            Coord { x: 121.0, y: 31.0 },
            Coord {
                x: 121.0,
                y: 31.0 + meters / 111_194.926_644_558_7,
            },
        ]
    }

    #[test]
    fn payload_for_a_short_open_route() {
        let config = Config {
            user_id: "519027910001".to_string(),
            run_distance_km: 2.0,
            pace_sec_per_km: 300.0,
            ..Config::default()
        };
        let rules = PaceRules::default();
        let sink = Arc::new(Collect::default());
        let facilities = DependenciesBuilder::new().with_log_sink(sink.clone()).build();
        let stop = CancelFlag::new();
        let mut rng = StdRng::seed_from_u64(5);

        let payload = GenerationPipeline::new(&config, &rules, &facilities, &stop)
            .generate(&straight(800.0), 1_700_000_000_000, &mut rng)
            .unwrap();

        assert_eq!(payload.user_id, "519027910001");
        assert_eq!(payload.id, 9);
        assert_eq!(payload.spavg, 5);

        let points: Vec<_> = payload
            .tracks
            .iter()
            .flat_map(|track| track.points().iter().copied())
            .collect();
        let distance: f64 = points.windows(2).map(|pair| pair[0].distance_to(&pair[1])).sum();
        assert!((distance - 2100.0).abs() < 0.01, "run is {distance}m");
        assert_eq!(payload.tracks[0].start_time(), 1_700_000_000);

        let logs = sink.0.lock().unwrap();
        assert!(logs[0].0.starts_with("there-and-back"));
    }

    #[test]
    fn pace_is_clamped_with_a_warning() {
        let config = Config {
            pace_sec_per_km: 90.0,
            run_distance_km: 1.0,
            ..Config::default()
        };
        let rules = PaceRules::default();
        let sink = Arc::new(Collect::default());
        let facilities = DependenciesBuilder::new().with_log_sink(sink.clone()).build();
        let stop = CancelFlag::new();
        let mut rng = StdRng::seed_from_u64(5);

        let payload = GenerationPipeline::new(&config, &rules, &facilities, &stop)
            .generate(&straight(1100.0), 0, &mut rng)
            .unwrap();

        assert_eq!(payload.spavg, 3);
        let logs = sink.0.lock().unwrap();
        assert!(logs
            .iter()
            .any(|(message, level)| *level == MessageLevel::Warning && message.contains("faster")));
    }
}
