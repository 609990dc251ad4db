use serde_derive::Serialize;

use super::common::{new_document_id, DocumentId};
use super::route::RoutePoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    Normal,
    Stop,
    Invalid,
}

impl SegmentStatus {
    // The validator expects "0" for stop segments as well
    pub fn tstate(&self) -> &'static str {
        match self {
            SegmentStatus::Normal | SegmentStatus::Stop => "0",
            SegmentStatus::Invalid => "2",
        }
    }
}

/// A contiguous slice of a run's points with its derived totals.
#[derive(Debug, Clone, Serialize)]
pub struct TrackSegment {
    counts: usize,
    distance: f64,
    duration: i64,
    points: Vec<RoutePoint>,
    status: SegmentStatus,
    trid: DocumentId,
    tstate: &'static str,
    stime: i64,
    etime: i64,
}

impl TrackSegment {
    /// Returns `None` for an empty point list; segments always carry points.
    pub fn from_points(points: Vec<RoutePoint>, status: SegmentStatus) -> Option<Self> {
        let first = points.first()?.locatetime;
        let last = points.last()?.locatetime;

        let distance = points
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum();

        Some(Self {
            counts: points.len(),
            distance,
            duration: ((last - first) as f64 / 1000.0).ceil() as i64,
            points,
            status,
            trid: new_document_id(),
            tstate: status.tstate(),
            stime: first.div_euclid(1000),
            etime: last.div_euclid(1000),
        })
    }

    pub fn counts(&self) -> usize {
        self.counts
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn status(&self) -> SegmentStatus {
        self.status
    }

    pub fn tstate(&self) -> &'static str {
        self.tstate
    }

    pub fn trid(&self) -> &str {
        &self.trid
    }

    pub fn start_time(&self) -> i64 {
        self.stime
    }

    pub fn end_time(&self) -> i64 {
        self.etime
    }
}
