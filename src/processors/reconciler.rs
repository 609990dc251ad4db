use crate::{
    error::{Error, Result},
    logln, logvbln,
    processors::decision::{RouteDecision, RouteDecisionSource, RouteTooLong},
    util::{
        cancel::StopCheck,
        geo::{Coordinate, GeoUtils},
    },
};

/// Tuning values the external validator has been observed to accept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilePolicy {
    // added to the target so the result is never short of it
    pub distance_buffer_m: f64,
    // start/end gap above which a route is treated as open
    pub open_route_threshold_m: f64,
    // Lap cap is max(min_loop_repeats, target / meters_per_loop_repeat).
    // Exceeding it is logged; it never shortens the output.
    pub min_loop_repeats: usize,
    pub meters_per_loop_repeat: f64,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            distance_buffer_m: 100.0,
            open_route_threshold_m: 15.0,
            min_loop_repeats: 2,
            meters_per_loop_repeat: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    PassThrough,
    Truncated,
    KeptFull,
    // legs walked, the first forward pass included
    ThereAndBack { legs: usize },
    // complete laps, the closing partial lap excluded
    Loop { laps: usize },
    Original,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub points: Vec<Coordinate>,
    pub strategy: Strategy,
    pub detailed_distance_m: f64,
    pub endpoint_gap_m: f64,
    pub final_distance_m: f64,
}

#[derive(Debug, Default)]
struct Walk {
    points: Vec<Coordinate>,
    distance: f64,
    reached: bool,
}

/// Follows `path` from its first point until `budget` meters are covered,
/// cutting the last segment at the exact fractional point.
fn walk(path: impl IntoIterator<Item = Coordinate>, budget: f64) -> Walk {
    let mut path = path.into_iter();
    let Some(mut previous) = path.next() else {
        return Walk::default();
    };

    let mut points = vec![previous];
    let mut covered = 0.0;

    for next in path {
        let segment = GeoUtils::distance(previous, next);

        if covered + segment <= budget {
            points.push(next);
            covered += segment;
            previous = next;
            continue;
        }

        let remaining = (budget - covered).max(0.0);
        if segment > 0.0 {
            points.push(GeoUtils::lerp(previous, next, remaining / segment));
        }

        return Walk {
            points,
            distance: covered + remaining,
            reached: true,
        };
    }

    Walk {
        points,
        distance: covered,
        reached: covered >= budget,
    }
}

fn append(out: &mut Vec<Coordinate>, points: Vec<Coordinate>) {
    for point in points {
        if out.last() != Some(&point) {
            out.push(point);
        }
    }
}

pub struct Reconciler<'a> {
    policy: ReconcilePolicy,
    decisions: &'a dyn RouteDecisionSource,
    stop: &'a dyn StopCheck,
}

impl<'a> Reconciler<'a> {
    const CC: &'static str = "Reconciler";

    const LENGTH_EPSILON_M: f64 = 1e-6;

    pub fn new(
        policy: ReconcilePolicy,
        decisions: &'a dyn RouteDecisionSource,
        stop: &'a dyn StopCheck,
    ) -> Self {
        Self {
            policy,
            decisions,
            stop,
        }
    }

    /// Produces a path whose length matches `target_distance_m` plus the buffer.
    /// `original` is returned only when nothing else yields points.
    pub fn reconcile(
        &self,
        original: &[Coordinate],
        detailed: &[Coordinate],
        target_distance_m: f64,
    ) -> Result<Reconciled> {
        let detailed_distance = GeoUtils::path_length(detailed);
        let endpoint_gap = match (detailed.first(), detailed.last()) {
            (Some(first), Some(last)) => GeoUtils::distance(*first, *last),
            _ => 0.0,
        };
        let target = target_distance_m + self.policy.distance_buffer_m;

        let degenerate = detailed.len() < 2 || !(detailed_distance > 0.0);

        let (mut points, strategy) = if degenerate || (detailed_distance - target).abs() <= Self::LENGTH_EPSILON_M {
            (detailed.to_vec(), Strategy::PassThrough)
        } else if detailed_distance > target {
            self.shorten(detailed, detailed_distance, target_distance_m, target)?
        } else if endpoint_gap > self.policy.open_route_threshold_m {
            logln!("There-and-back: start/end {:.2}m apart", endpoint_gap);
            self.there_and_back(detailed, detailed_distance, target)?
        } else {
            logln!("Loop: start/end {:.2}m apart", endpoint_gap);
            self.repeat_loop(detailed, detailed_distance, target)?
        };

        points.dedup();

        let (points, strategy) = if points.is_empty() {
            (original.to_vec(), Strategy::Original)
        } else {
            (points, strategy)
        };

        let final_distance = GeoUtils::path_length(&points);
        logvbln!(
            "{:?}: detailed {:.2}m -> final {:.2}m over {} points",
            strategy,
            detailed_distance,
            final_distance,
            points.len()
        );

        Ok(Reconciled {
            points,
            strategy,
            detailed_distance_m: detailed_distance,
            endpoint_gap_m: endpoint_gap,
            final_distance_m: final_distance,
        })
    }

    fn shorten(
        &self,
        detailed: &[Coordinate],
        detailed_distance: f64,
        nominal_target: f64,
        target: f64,
    ) -> Result<(Vec<Coordinate>, Strategy)> {
        let request = RouteTooLong {
            detailed_distance_m: detailed_distance,
            nominal_target_m: nominal_target,
        };

        match self.decisions.decide(request, self.stop)? {
            RouteDecision::Truncate => {
                let walked = walk(detailed.iter().copied(), target);
                Ok((walked.points, Strategy::Truncated))
            }
            RouteDecision::KeepFull => Ok((detailed.to_vec(), Strategy::KeptFull)),
            RouteDecision::Abort => Err(Error::RouteRejected(format!(
                "route of {detailed_distance:.2}m is longer than the {nominal_target}m target"
            ))),
        }
    }

    fn there_and_back(
        &self,
        detailed: &[Coordinate],
        detailed_distance: f64,
        target: f64,
    ) -> Result<(Vec<Coordinate>, Strategy)> {
        let reversed: Vec<Coordinate> = detailed.iter().rev().copied().collect();

        let mut out = detailed.to_vec();
        let mut covered = detailed_distance;
        let mut legs = 1;

        while covered < target {
            self.stop.check()?;

            let leg = if legs % 2 == 1 { &reversed[..] } else { detailed };
            let walked = walk(leg.iter().copied(), target - covered);

            covered += walked.distance;
            legs += 1;
            append(&mut out, walked.points);

            if walked.reached {
                break;
            }
        }

        Ok((out, Strategy::ThereAndBack { legs }))
    }

    fn repeat_loop(
        &self,
        detailed: &[Coordinate],
        detailed_distance: f64,
        target: f64,
    ) -> Result<(Vec<Coordinate>, Strategy)> {
        let whole_laps = (target / detailed_distance).floor() as usize;
        let lap_cap = self
            .policy
            .min_loop_repeats
            .max((target / self.policy.meters_per_loop_repeat).floor() as usize);
        if whole_laps > lap_cap {
            logln!(
                "Loop of {:.2}m needs {} laps, over the {} lap cap; closing with extra laps",
                detailed_distance,
                whole_laps,
                lap_cap
            );
        }

        let mut out: Vec<Coordinate> = Vec::new();
        let mut covered = 0.0;
        let mut laps = 0;

        // The cap only triggers the notice above; lapping always reaches the target
        while covered < target {
            self.stop.check()?;

            // Include the hop from the previous lap's end back to the start
            let lap = out.last().copied().into_iter().chain(detailed.iter().copied());
            let walked = walk(lap, target - covered);

            covered += walked.distance;
            append(&mut out, walked.points);

            if walked.reached {
                break;
            }
            laps += 1;
        }

        Ok((out, Strategy::Loop { laps }))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use geo_types::Coord;

    use super::*;
    use crate::{
        processors::{decision::FixedDecision, densifier::Densifier},
        util::cancel::CancelFlag,
    };

    const METERS_PER_DEGREE_LAT: f64 = 111_194.926_644_558_7;
    const LAT0: f64 = 31.0;

    fn meters_per_degree_lon() -> f64 {
        METERS_PER_DEGREE_LAT * LAT0.to_radians().cos()
    }

    // (east, north) meters relative to a fixed origin
    fn at(east: f64, north: f64) -> Coordinate {
        Coord {
            x: 121.0 + east / meters_per_degree_lon(),
            y: LAT0 + north / METERS_PER_DEGREE_LAT,
        }
    }

    fn densify(path: &[Coordinate]) -> Vec<Coordinate> {
        Densifier::densify(path, 1000.0 / 210.0, 3.0)
    }

    struct Recorder {
        answer: RouteDecision,
        calls: Mutex<Vec<RouteTooLong>>,
    }

    impl Recorder {
        fn new(answer: RouteDecision) -> Self {
            Self {
                answer,
                calls: Mutex::new(vec![]),
            }
        }
    }

    impl RouteDecisionSource for Recorder {
        fn decide(&self, request: RouteTooLong, _stop: &dyn StopCheck) -> Result<RouteDecision> {
            self.calls.lock().unwrap().push(request);
            Ok(self.answer)
        }
    }

    fn reconcile_with(
        decisions: &dyn RouteDecisionSource,
        original: &[Coordinate],
        target: f64,
    ) -> Result<Reconciled> {
        let stop = CancelFlag::new();
        let detailed = densify(original);
        Reconciler::new(ReconcilePolicy::default(), decisions, &stop).reconcile(original, &detailed, target)
    }

    fn assert_no_consecutive_duplicates(points: &[Coordinate]) {
        points
            .windows(2)
            .for_each(|pair| assert_ne!(pair[0], pair[1], "duplicate point emitted"));
    }

    #[test]
    fn walk_cuts_inside_a_segment() {
        let walked = walk(vec![at(0.0, 0.0), at(0.0, 10.0), at(0.0, 20.0)], 15.0);

        assert!(walked.reached);
        assert_eq!(walked.points.len(), 3);
        assert!((GeoUtils::path_length(&walked.points) - 15.0).abs() < 1e-6);
    }

    #[test]
    fn walk_short_of_budget() {
        let walked = walk(vec![at(0.0, 0.0), at(0.0, 10.0)], 50.0);

        assert!(!walked.reached);
        assert_eq!(walked.points.len(), 2);
        assert!((walked.distance - 10.0).abs() < 1e-6);
        assert!(walk(vec![], 50.0).points.is_empty());
    }

    #[test]
    fn too_long_route_is_truncated_after_one_notification() {
        let straight = vec![at(0.0, 0.0), at(0.0, 4000.0)];
        let recorder = Recorder::new(RouteDecision::Truncate);

        let reconciled = reconcile_with(&recorder, &straight, 3000.0).unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!((calls[0].detailed_distance_m - 4000.0).abs() < 0.01);
        assert_eq!(calls[0].nominal_target_m, 3000.0);

        assert_eq!(reconciled.strategy, Strategy::Truncated);
        assert!((reconciled.final_distance_m - 3100.0).abs() < 0.01);
        assert!(reconciled.final_distance_m < reconciled.detailed_distance_m);
        assert_no_consecutive_duplicates(&reconciled.points);
    }

    #[test]
    fn too_long_route_kept_in_full() {
        let straight = vec![at(0.0, 0.0), at(0.0, 4000.0)];

        let reconciled = reconcile_with(&FixedDecision(RouteDecision::KeepFull), &straight, 3000.0).unwrap();

        assert_eq!(reconciled.strategy, Strategy::KeptFull);
        assert!((reconciled.final_distance_m - 4000.0).abs() < 0.01);
    }

    #[test]
    fn too_long_route_aborted() {
        let straight = vec![at(0.0, 0.0), at(0.0, 4000.0)];

        let err = reconcile_with(&FixedDecision(RouteDecision::Abort), &straight, 3000.0).unwrap_err();
        assert_eq!(err.code(), "route_rejected");
    }

    #[test]
    fn loop_route_is_repeated() {
        // ~1.2 km square that stops 3 m short of where it started
        let square = vec![
            at(0.0, 0.0),
            at(300.0, 0.0),
            at(300.0, 300.0),
            at(0.0, 300.0),
            at(0.0, 3.0),
        ];
        let recorder = Recorder::new(RouteDecision::Truncate);

        let reconciled = reconcile_with(&recorder, &square, 5000.0).unwrap();

        assert!(recorder.calls.lock().unwrap().is_empty());
        assert!(reconciled.endpoint_gap_m <= 15.0);
        match reconciled.strategy {
            Strategy::Loop { laps } => assert!(laps >= 4, "only {laps} laps"),
            other => panic!("expected loop strategy, got {other:?}"),
        }
        assert!(reconciled.final_distance_m >= 5000.0);
        assert!(reconciled.final_distance_m <= 5100.0 + reconciled.detailed_distance_m);
        assert!((reconciled.final_distance_m - 5100.0).abs() < 0.01);
        assert_no_consecutive_duplicates(&reconciled.points);
    }

    #[test]
    fn short_loop_still_reaches_target_past_the_cap() {
        // 200 m lap, 5.1 km target needs far more laps than the cap of 5
        let square = vec![at(0.0, 0.0), at(50.0, 0.0), at(50.0, 50.0), at(0.0, 50.0), at(0.0, 0.0)];

        let reconciled = reconcile_with(&FixedDecision(RouteDecision::Truncate), &square, 5000.0).unwrap();

        assert!(matches!(reconciled.strategy, Strategy::Loop { laps } if laps >= 24));
        assert!(reconciled.final_distance_m >= 5100.0 - 0.01);
        assert!(reconciled.final_distance_m < 5100.0 + reconciled.detailed_distance_m);
        assert_no_consecutive_duplicates(&reconciled.points);
    }

    #[test]
    fn lap_cap_does_not_change_the_output() {
        let square = densify(&[at(0.0, 0.0), at(50.0, 0.0), at(50.0, 50.0), at(0.0, 50.0), at(0.0, 0.0)]);
        let stop = CancelFlag::new();
        let decisions = FixedDecision(RouteDecision::Truncate);

        let loose = ReconcilePolicy {
            min_loop_repeats: 1000,
            ..ReconcilePolicy::default()
        };
        let tight = ReconcilePolicy {
            min_loop_repeats: 1,
            meters_per_loop_repeat: 1e9,
            ..ReconcilePolicy::default()
        };

        let a = Reconciler::new(loose, &decisions, &stop).reconcile(&square, &square, 5000.0).unwrap();
        let b = Reconciler::new(tight, &decisions, &stop).reconcile(&square, &square, 5000.0).unwrap();

        assert_eq!(a, b);
        assert!(b.final_distance_m >= 5100.0 - 0.01);
    }

    #[test]
    fn open_route_goes_there_and_back() {
        let line = vec![at(0.0, 0.0), at(400.0, 0.0), at(800.0, 50.0)];

        let reconciled = reconcile_with(&FixedDecision(RouteDecision::Truncate), &line, 3000.0).unwrap();

        assert!(reconciled.endpoint_gap_m > 15.0);
        assert!(matches!(reconciled.strategy, Strategy::ThereAndBack { legs } if legs >= 4));
        assert!((reconciled.final_distance_m - 3100.0).abs() < 0.01);
        assert_no_consecutive_duplicates(&reconciled.points);

        // Second leg heads back towards the start
        let detailed = densify(&line);
        assert_eq!(reconciled.points[..detailed.len()], detailed[..]);
        assert_eq!(reconciled.points[detailed.len()], detailed[detailed.len() - 2]);
    }

    #[test]
    fn exact_length_passes_through() {
        let straight = vec![at(0.0, 0.0), at(0.0, 3100.0)];
        let detailed = densify(&straight);
        let target = GeoUtils::path_length(&detailed) - 100.0;

        let stop = CancelFlag::new();
        let decisions = FixedDecision(RouteDecision::Abort);
        let reconciled = Reconciler::new(ReconcilePolicy::default(), &decisions, &stop)
            .reconcile(&straight, &detailed, target)
            .unwrap();

        assert_eq!(reconciled.strategy, Strategy::PassThrough);
        assert_eq!(reconciled.points, detailed);
    }

    #[test]
    fn empty_result_falls_back_to_original() {
        let stop = CancelFlag::new();
        let decisions = FixedDecision(RouteDecision::Truncate);
        let original = vec![at(0.0, 0.0), at(0.0, 100.0)];

        let reconciled = Reconciler::new(ReconcilePolicy::default(), &decisions, &stop)
            .reconcile(&original, &[], 5000.0)
            .unwrap();

        assert_eq!(reconciled.strategy, Strategy::Original);
        assert_eq!(reconciled.points, original);
    }

    #[test]
    fn single_point_routes_pass_through() {
        let point = vec![at(0.0, 0.0)];

        let reconciled = reconcile_with(&FixedDecision(RouteDecision::Truncate), &point, 5000.0).unwrap();

        assert_eq!(reconciled.strategy, Strategy::PassThrough);
        assert_eq!(reconciled.points, point);
    }

    #[test]
    fn cancellation_interrupts_lapping() {
        let stop = CancelFlag::new();
        stop.cancel();
        let decisions = FixedDecision(RouteDecision::Truncate);
        let square = densify(&[at(0.0, 0.0), at(50.0, 0.0), at(50.0, 50.0), at(0.0, 0.0)]);

        let err = Reconciler::new(ReconcilePolicy::default(), &decisions, &stop)
            .reconcile(&square, &square, 5000.0)
            .unwrap_err();

        assert_eq!(err, Error::Cancelled);
    }
}
