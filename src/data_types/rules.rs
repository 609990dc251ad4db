use serde_derive::{Deserialize, Serialize};

/// Pace window and activity type handed out by the portal.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PaceRules {
    // seconds per km, fastest allowed
    #[serde(rename = "spmin", default = "PaceRules::default_min_pace")]
    pub min_pace_sec_per_km: f64,

    // seconds per km, slowest allowed
    #[serde(rename = "spmax", default = "PaceRules::default_max_pace")]
    pub max_pace_sec_per_km: f64,

    #[serde(rename = "id", default = "PaceRules::default_activity_type")]
    pub activity_type_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceCheck {
    Within(i64),
    // Faster than allowed; carries the adjusted pace
    TooFast(i64),
    // Slower than allowed; carries the adjusted pace
    TooSlow(i64),
}

impl PaceCheck {
    pub fn pace(&self) -> i64 {
        match self {
            PaceCheck::Within(pace) | PaceCheck::TooFast(pace) | PaceCheck::TooSlow(pace) => *pace,
        }
    }
}

impl Default for PaceRules {
    fn default() -> Self {
        Self {
            min_pace_sec_per_km: PaceRules::default_min_pace(),
            max_pace_sec_per_km: PaceRules::default_max_pace(),
            activity_type_id: PaceRules::default_activity_type(),
        }
    }
}

impl PaceRules {
    pub const DEFAULT_ACTIVITY_TYPE_ID: i64 = 9;

    fn default_min_pace() -> f64 {
        180.0
    }

    fn default_max_pace() -> f64 {
        540.0
    }

    fn default_activity_type() -> i64 {
        PaceRules::DEFAULT_ACTIVITY_TYPE_ID
    }

    pub fn with_activity_type(mut self, activity_type_id: i64) -> Self {
        self.activity_type_id = activity_type_id;
        self
    }

    /// Clamps a whole-minutes-per-km pace into the window.
    pub fn clamp_pace(&self, pace_min_per_km: i64) -> PaceCheck {
        let pace_sec_per_km = (pace_min_per_km * 60) as f64;

        if pace_sec_per_km < self.min_pace_sec_per_km {
            return PaceCheck::TooFast((self.min_pace_sec_per_km / 60.0).ceil() as i64);
        }

        if pace_sec_per_km > self.max_pace_sec_per_km {
            return PaceCheck::TooSlow((self.max_pace_sec_per_km / 60.0).floor() as i64);
        }

        PaceCheck::Within(pace_min_per_km)
    }
}

/// Raw portal answer to an upload.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UploadResult {
    pub code: i64,

    #[serde(default)]
    pub data: Option<serde_json::Value>,

    #[serde(default, alias = "msg")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadVerdict {
    Accepted,
    // code 0 but nothing recorded
    SoftFailure,
    Rejected(i64),
}

impl UploadResult {
    pub fn verdict(&self) -> UploadVerdict {
        match (self.code, &self.data) {
            (0, Some(data)) if !data.is_null() => UploadVerdict::Accepted,
            (0, _) => UploadVerdict::SoftFailure,
            (code, _) => UploadVerdict::Rejected(code),
        }
    }
}
