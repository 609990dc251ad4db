use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    path::Path,
    sync::Arc,
};

use tokio::sync::mpsc;

use portal::auth::Credentials;
use processors::decision::{DecisionChannel, DecisionRequest, FixedDecision, RouteDecision, RouteDecisionSource};
use upload::UploadOrchestrator;
use util::{cancel::CancelFlag, facilities::Facilities};

pub use config::{Config, RouteTooLongPolicy};
pub use error::{Error, Result};
pub use upload::{RunOutcome, RunState};

pub mod config;
pub mod data_types;
pub mod error;
pub mod portal;
pub mod processors;
pub mod upload;
pub mod util;

pub struct App {
    config: Config,
    credentials: Credentials,
    cancel: CancelFlag,
}

impl App {
    const CC: &'static str = "App";

    pub fn new(config: Config, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            cancel: CancelFlag::new(),
        }
    }

    pub fn from_files(config_path: &Path, secrets_path: &Path) -> Result<Self> {
        let config = Config::from_file(config_path)?;
        let credentials = Credentials::read_secrets_from_file(secrets_path)?;

        logln!("Loaded configuration for user {}", config.user_id);

        Ok(App::new(config, credentials))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Clones share the run's flag; cancelling any of them stops the run.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Decision source matching `ROUTE_TOO_LONG`. When the policy is `ask`,
    /// the caller must answer the requests coming out of the receiver.
    pub fn decision_source(&self) -> (Arc<dyn RouteDecisionSource>, Option<mpsc::Receiver<DecisionRequest>>) {
        let fixed = |decision| -> Arc<dyn RouteDecisionSource> { Arc::new(FixedDecision(decision)) };

        match self.config.route_too_long {
            RouteTooLongPolicy::Ask => {
                let (channel, requests) = DecisionChannel::new();
                let channel: Arc<dyn RouteDecisionSource> = Arc::new(channel);
                (channel, Some(requests))
            }
            RouteTooLongPolicy::Truncate => (fixed(RouteDecision::Truncate), None),
            RouteTooLongPolicy::Keep => (fixed(RouteDecision::KeepFull), None),
            RouteTooLongPolicy::Abort => (fixed(RouteDecision::Abort), None),
        }
    }

    /// Runs the whole upload on the calling thread. A panic inside the run
    /// (a collaborator included) comes back as a failed outcome.
    pub fn run(&self, facilities: &Facilities) -> RunOutcome {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut rng = rand::rng();
            UploadOrchestrator::new(self.config.clone(), &self.credentials, facilities, &self.cancel).run(&mut rng)
        }));

        attempt.unwrap_or_else(|payload| {
            let reason = panic_message(payload.as_ref());
            logln!("Upload run panicked: {}", reason);
            RunOutcome::failed(format!("upload worker stopped unexpectedly: {reason}"))
        })
    }

    /// Runs the upload on a blocking worker so the caller's runtime stays responsive.
    pub async fn run_in_background(self, facilities: Facilities) -> RunOutcome {
        match tokio::task::spawn_blocking(move || self.run(&facilities)).await {
            Ok(outcome) => outcome,
            Err(e) => RunOutcome::failed(format!("upload worker stopped unexpectedly: {e}")),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
