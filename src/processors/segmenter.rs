use rand::Rng;

use crate::{
    data_types::{
        route::RoutePoint,
        track::{SegmentStatus, TrackSegment},
    },
    error::Result,
    logvbln,
    util::cancel::StopCheck,
};

/// Cuts a run into randomly sized tracks with a weighted random status.
pub struct Segmenter {
    min_segment_points: usize,
}

impl Segmenter {
    const CC: &'static str = "Segmenter";

    pub const DEFAULT_MIN_SEGMENT_POINTS: usize = 5;

    pub fn new(min_segment_points: usize) -> Self {
        Self {
            min_segment_points: min_segment_points.max(1),
        }
    }

    /// Chunks are taken from the front until no point is left. Each chunk holds
    /// between the minimum and a third of what remains; a remainder no larger
    /// than the minimum becomes the last chunk.
    pub fn split<R: Rng>(&self, points: &[RoutePoint], rng: &mut R, stop: &dyn StopCheck) -> Result<Vec<TrackSegment>> {
        let mut segments = Vec::new();
        let mut remaining = points;

        while !remaining.is_empty() {
            stop.check()?;

            let size = if remaining.len() <= self.min_segment_points {
                remaining.len()
            } else {
                let upper = self.min_segment_points.max(remaining.len() / 3);
                rng.random_range(self.min_segment_points..=upper)
            };

            let (chunk, rest) = remaining.split_at(size);
            remaining = rest;

            if let Some(segment) = TrackSegment::from_points(chunk.to_vec(), Segmenter::draw_status(rng)) {
                segments.push(segment);
            }
        }

        logvbln!("Split {} points into {} tracks", points.len(), segments.len());

        Ok(segments)
    }

    // 80% normal, 10% invalid, 10% stop
    fn draw_status<R: Rng>(rng: &mut R) -> SegmentStatus {
        let roll: f64 = rng.random();

        if roll < 0.8 {
            SegmentStatus::Normal
        } else if roll < 0.9 {
            SegmentStatus::Invalid
        } else {
            SegmentStatus::Stop
        }
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Segmenter::new(Segmenter::DEFAULT_MIN_SEGMENT_POINTS)
    }
}
