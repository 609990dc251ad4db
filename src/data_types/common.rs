use uuid::Uuid;

pub type DocumentId = String;

pub fn new_document_id() -> DocumentId {
    Uuid::new_v4().to_string()
}

// Coordinates leave the crate with this many decimal places
pub const TRACK_POINT_DECIMAL_PLACES: usize = 7;
