//! # Upload Orchestrator
//!
//! Drives one upload run: authenticate, fetch the pace rules, then generate
//! and upload one run per simulated day. Every failure ends in a
//! [`RunOutcome`]; nothing escapes as an error.

use chrono::{DateTime, Local, TimeZone};
use rand::Rng;

use crate::{
    config::Config,
    data_types::rules::{PaceRules, UploadVerdict},
    error::{Error, Result},
    logln, logvbln,
    portal::{auth::Credentials, Session},
    processors::{
        route_loader::{RouteLoader, RouteSource},
        GenerationPipeline,
    },
    util::{
        cancel::StopCheck,
        facilities::{Facilities, Required},
        geo::{Coordinate, GeoUtils},
        logging::MessageLevel,
        time::DateTimeUtils,
    },
};

pub mod console;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Authenticating,
    GeneratingData,
    Uploading,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed | RunState::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub state: RunState,
    pub success: bool,
    pub message: String,
    pub total: u32,
    pub succeeded: u32,
    pub failed: u32,
}

impl RunOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: RunState::Failed,
            success: false,
            message: message.into(),
            total: 0,
            succeeded: 0,
            failed: 0,
        }
    }

    pub fn attempted(&self) -> u32 {
        self.succeeded + self.failed
    }
}

enum DayResult {
    Uploaded,
    Failed(String),
}

pub struct UploadOrchestrator<'a> {
    config: Config,
    credentials: &'a Credentials,
    dependencies: &'a Facilities,
    stop: &'a dyn StopCheck,
    state: RunState,
}

impl<'a> UploadOrchestrator<'a> {
    const CC: &'static str = "Orchestrator";

    const PROGRESS_TOTAL: u32 = 100;

    pub fn new(
        config: Config,
        credentials: &'a Credentials,
        dependencies: &'a Facilities,
        stop: &'a dyn StopCheck,
    ) -> Self {
        Self {
            config,
            credentials,
            dependencies,
            stop,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn run<R: Rng>(&mut self, rng: &mut R) -> RunOutcome {
        if let Err(e) = self.dependencies.check(&[Required::Portal]) {
            return self.fail(&e);
        }

        let total = self.config.run_times;

        if self.stop.should_stop() {
            return self.cancelled(total, 0, 0);
        }

        self.transition(RunState::Authenticating);
        self.milestone(10, "Authenticating");
        let session = match self.authenticate() {
            Ok(session) => session,
            Err(e) if e.is_cancelled() => return self.cancelled(total, 0, 0),
            Err(e) => return self.fail(&e),
        };

        let rules = self.fetch_rules(&session);
        if self.stop.should_stop() {
            return self.cancelled(total, 0, 0);
        }

        self.transition(RunState::GeneratingData);
        let route = match self.load_route() {
            Ok(route) => route,
            Err(e) => return self.fail(&e),
        };

        let mut succeeded = 0;
        let mut failed = 0;
        // Fixed once so a run crossing midnight keeps consecutive dates
        let today = Local::now();

        for day in 0..total {
            if self.stop.should_stop() {
                return self.cancelled(total, succeeded, failed);
            }

            match self.run_day(day, &today, &session, &rules, &route, rng) {
                Ok(DayResult::Uploaded) => {
                    succeeded += 1;
                    self.log(&format!("Run {}/{} uploaded", day + 1, total), MessageLevel::Success);
                }
                Ok(DayResult::Failed(reason)) => {
                    failed += 1;
                    self.log(&format!("Run {}/{} failed: {reason}", day + 1, total), MessageLevel::Error);
                }
                Err(e) if e.is_cancelled() => return self.cancelled(total, succeeded, failed),
                Err(e) => {
                    failed += 1;
                    self.log(
                        &format!("Run {}/{} failed [{}]: {}", day + 1, total, e.code(), e.description()),
                        MessageLevel::Error,
                    );
                }
            }

            if self.config.is_multi_day() {
                self.dependencies
                    .progress()
                    .on_progress(day + 1, total, &format!("Day {}/{} done", day + 1, total));
            }
        }

        self.finish(total, succeeded, failed)
    }

    fn authenticate(&self) -> Result<Session> {
        let portal = self.dependencies.portal()?;
        let session = portal.login(&self.credentials.username, &self.credentials.password)?;
        self.log(
            &format!("Signed in as {}", self.credentials.username),
            MessageLevel::Info,
        );

        self.stop.check()?;
        Ok(session)
    }

    fn fetch_rules(&self, session: &Session) -> PaceRules {
        let fetched = self
            .dependencies
            .portal()
            .and_then(|portal| portal.fetch_rules(session));

        match fetched {
            Ok(rules) => {
                logln!("Rules: {:?}", rules);
                rules
            }
            Err(e) => {
                self.log(
                    &format!("Using default pace rules, fetching failed: {}", e.description()),
                    MessageLevel::Warning,
                );
                PaceRules::default().with_activity_type(self.config.default_activity_id)
            }
        }
    }

    fn load_route(&self) -> Result<Vec<Coordinate>> {
        let source = RouteLoader::select(
            self.config.route_file.as_deref(),
            self.config.default_route_file.as_deref(),
        );
        if let RouteSource::File(path) = &source {
            self.log(&format!("Loading route from {}", path.display()), MessageLevel::Info);
        }

        let parsed = RouteLoader::load(&source)?;
        for (line, raw) in &parsed.skipped {
            self.log(
                &format!("Skipped malformed line {line} in {}: {raw:?}", parsed.origin),
                MessageLevel::Warning,
            );
        }

        let mut route = parsed.coordinates;
        GeoUtils::apply_offset(
            &mut route,
            self.config.longitude_offset,
            self.config.latitude_offset,
        );

        Ok(route)
    }

    /// Start time of `day`: `RUN_HOUR` on yesterday, the day before, ... in
    /// multi-day mode, otherwise the configured start or now.
    fn start_time_for<Tz: TimeZone>(&self, today: &DateTime<Tz>, day: u32) -> i64 {
        if self.config.is_multi_day() {
            DateTimeUtils::day_start_epoch_ms(today, i64::from(day) + 1, self.config.run_hour)
        } else {
            self.config
                .start_time_epoch_ms
                .unwrap_or_else(DateTimeUtils::now_epoch_ms)
        }
    }

    fn run_day<R: Rng, Tz: TimeZone>(
        &mut self,
        day: u32,
        today: &DateTime<Tz>,
        session: &Session,
        rules: &PaceRules,
        route: &[Coordinate],
        rng: &mut R,
    ) -> Result<DayResult> {
        self.transition(RunState::GeneratingData);

        let start = self.start_time_for(today, day);
        self.config.start_time_epoch_ms = Some(start);
        self.log(
            &format!(
                "Generating run {}/{} starting {}",
                day + 1,
                self.config.run_times,
                DateTimeUtils::epoch_ms_to_str(start)
            ),
            MessageLevel::Info,
        );

        let payload =
            GenerationPipeline::new(&self.config, rules, self.dependencies, self.stop).generate(route, start, rng)?;
        self.milestone(40, "Run generated");

        self.stop.check()?;
        self.transition(RunState::Uploading);
        self.milestone(70, "Uploading");
        logvbln!("Uploading run {} with {} points", payload.sid, payload.point_count());

        let result = self.dependencies.portal()?.upload(session, &payload)?;
        self.milestone(90, "Upload answered");

        let day_result = match result.verdict() {
            UploadVerdict::Accepted => DayResult::Uploaded,
            UploadVerdict::SoftFailure => DayResult::Failed(format!(
                "portal accepted the request but recorded nothing ({})",
                result.message.unwrap_or_default()
            )),
            UploadVerdict::Rejected(code) => DayResult::Failed(format!(
                "portal answered code {code}: {}",
                result.message.unwrap_or_default()
            )),
        };

        Ok(day_result)
    }

    fn finish(&mut self, total: u32, succeeded: u32, failed: u32) -> RunOutcome {
        // Multi-day runs succeed once every day was attempted
        let success = if self.config.is_multi_day() {
            succeeded + failed == total
        } else {
            succeeded == total
        };

        let message = format!("{succeeded}/{total} succeeded, {failed}/{total} failed");
        self.milestone(100, &message);
        self.log(
            &message,
            if success {
                MessageLevel::Success
            } else {
                MessageLevel::Error
            },
        );

        self.transition(if success {
            RunState::Succeeded
        } else {
            RunState::Failed
        });

        RunOutcome {
            state: self.state,
            success,
            message,
            total,
            succeeded,
            failed,
        }
    }

    fn cancelled(&mut self, total: u32, succeeded: u32, failed: u32) -> RunOutcome {
        let message = format!("Cancelled after {}/{} runs", succeeded + failed, total);
        self.log(&message, MessageLevel::Warning);
        self.transition(RunState::Cancelled);

        RunOutcome {
            state: self.state,
            success: false,
            message,
            total,
            succeeded,
            failed,
        }
    }

    fn fail(&mut self, error: &Error) -> RunOutcome {
        self.log(
            &format!("[{}] {}", error.code(), error.description()),
            MessageLevel::Error,
        );
        self.transition(RunState::Failed);

        RunOutcome {
            total: self.config.run_times,
            ..RunOutcome::failed(error.description())
        }
    }

    fn transition(&mut self, next: RunState) {
        if self.state != next {
            logln!("{:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    // Percent milestones are only reported for single runs
    fn milestone(&self, percent: u32, message: &str) {
        if !self.config.is_multi_day() {
            self.dependencies
                .progress()
                .on_progress(percent, UploadOrchestrator::PROGRESS_TOTAL, message);
        }
    }

    fn log(&self, message: &str, level: MessageLevel) {
        self.dependencies.log().on_log(message, level);
    }
}
