use std::path::{Path, PathBuf};

use serde_derive::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    processors::reconciler::ReconcilePolicy,
};

/// What to do when the drawn route is already longer than the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteTooLongPolicy {
    #[default]
    Ask,
    Truncate,
    Keep,
    Abort,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct PortalConfig {
    pub login_url: String,
    pub rules_url: String,
    pub upload_url: String,
    // seconds
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Config {
    pub user_id: String,
    pub run_distance_km: f64,
    pub interval_seconds: i64,
    pub run_hour: u32,
    pub run_times: u32,
    pub start_time_epoch_ms: Option<i64>,
    pub pace_sec_per_km: f64,

    pub route_file: Option<PathBuf>,
    pub default_route_file: Option<PathBuf>,
    pub longitude_offset: f64,
    pub latitude_offset: f64,

    pub distance_buffer_m: f64,
    pub open_route_threshold_m: f64,
    // Loop lap cap inputs; only decide when the "over the lap cap" notice is
    // logged, the looped route still always reaches the target
    pub min_loop_repeats: usize,
    pub meters_per_loop_repeat: f64,
    pub min_segment_points: usize,
    pub route_too_long: RouteTooLongPolicy,
    pub default_activity_id: i64,

    pub portal: PortalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            run_distance_km: 5.0,
            interval_seconds: 3,
            run_hour: 8,
            run_times: 1,
            start_time_epoch_ms: None,
            pace_sec_per_km: 210.0,
            route_file: None,
            default_route_file: None,
            longitude_offset: 0.0,
            latitude_offset: 0.0,
            distance_buffer_m: 100.0,
            open_route_threshold_m: 15.0,
            min_loop_repeats: 2,
            meters_per_loop_repeat: 1000.0,
            min_segment_points: 5,
            route_too_long: RouteTooLongPolicy::Ask,
            default_activity_id: 9,
            portal: PortalConfig::default(),
        }
    }
}

impl Config {
    const CC: &'static str = "Config";

    /// Reads the TOML file; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            crate::logln!("{} not found, using default configuration", path.display());
            return Ok(Config::default().normalized());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("unable to read {}: {e}", path.display())))?;

        Config::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config.normalized())
    }

    /// Coerces out-of-range values instead of rejecting them.
    pub fn normalized(mut self) -> Self {
        let defaults = Config::default();

        self.interval_seconds = self.interval_seconds.max(1);
        self.run_hour = self.run_hour.min(23);
        self.run_times = self.run_times.max(1);
        self.min_segment_points = self.min_segment_points.max(1);

        if !(self.run_distance_km > 0.0) {
            self.run_distance_km = defaults.run_distance_km;
        }
        if !(self.pace_sec_per_km > 0.0) {
            self.pace_sec_per_km = defaults.pace_sec_per_km;
        }
        if !(self.distance_buffer_m >= 0.0) {
            self.distance_buffer_m = defaults.distance_buffer_m;
        }
        if !(self.meters_per_loop_repeat > 0.0) {
            self.meters_per_loop_repeat = defaults.meters_per_loop_repeat;
        }

        self
    }

    pub fn target_distance_m(&self) -> f64 {
        self.run_distance_km * 1000.0
    }

    // Constant running speed implied by the configured pace
    pub fn target_speed_mps(&self) -> f64 {
        1000.0 / self.pace_sec_per_km
    }

    pub fn is_multi_day(&self) -> bool {
        self.run_times > 1
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            distance_buffer_m: self.distance_buffer_m,
            open_route_threshold_m: self.open_route_threshold_m,
            min_loop_repeats: self.min_loop_repeats,
            meters_per_loop_repeat: self.meters_per_loop_repeat,
        }
    }
}
