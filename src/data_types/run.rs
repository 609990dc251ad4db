use serde_derive::Serialize;

use super::common::{new_document_id, DocumentId};
use super::track::TrackSegment;

/// One run submission as the portal expects it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPayload {
    pub fravg: i64,
    // activity type assigned by the portal rules
    pub id: i64,
    pub sid: DocumentId,
    pub signpoints: Vec<serde_json::Value>,
    // average pace, whole minutes per km
    pub spavg: i64,
    pub state: String,
    pub tracks: Vec<TrackSegment>,
    pub user_id: String,
}

impl RunPayload {
    pub fn new(user_id: &str, activity_type_id: i64, spavg: i64, tracks: Vec<TrackSegment>) -> Self {
        Self {
            fravg: 0,
            id: activity_type_id,
            sid: new_document_id(),
            signpoints: vec![],
            spavg,
            state: "0".to_string(),
            tracks,
            user_id: user_id.to_string(),
        }
    }

    pub fn point_count(&self) -> usize {
        self.tracks.iter().map(TrackSegment::counts).sum()
    }
}
