use std::sync::Arc;

use crate::{
    error::{Error, Result},
    portal::Portal,
    processors::decision::{FixedDecision, RouteDecision, RouteDecisionSource},
    util::logging::{LogSink, NullSink, ProgressSink},
};

static NULL_SINK: NullSink = NullSink;
static TRUNCATE: FixedDecision = FixedDecision(RouteDecision::Truncate);

#[derive(PartialEq, Copy, Clone, Debug)]
pub enum Required {
    Portal,
    LogSink,
    ProgressSink,
    Decisions,
}

/// Collaborators handed to an upload run. Sinks and the decision source
/// fall back to silent defaults when left out.
#[derive(Clone, Default)]
pub struct Facilities {
    portal: Option<Arc<dyn Portal>>,
    log: Option<Arc<dyn LogSink>>,
    progress: Option<Arc<dyn ProgressSink>>,
    decisions: Option<Arc<dyn RouteDecisionSource>>,
}

impl Facilities {
    pub fn portal(&self) -> Result<&dyn Portal> {
        self.portal
            .as_deref()
            .ok_or_else(|| Error::Config("no portal configured".to_string()))
    }

    pub fn log(&self) -> &dyn LogSink {
        self.log.as_deref().unwrap_or(&NULL_SINK)
    }

    pub fn progress(&self) -> &dyn ProgressSink {
        self.progress.as_deref().unwrap_or(&NULL_SINK)
    }

    pub fn decisions(&self) -> &dyn RouteDecisionSource {
        self.decisions.as_deref().unwrap_or(&TRUNCATE)
    }

    pub fn check(&self, required: &[Required]) -> Result<()> {
        for depend in required {
            let present = match depend {
                Required::Portal => self.portal.is_some(),
                Required::LogSink => self.log.is_some(),
                Required::ProgressSink => self.progress.is_some(),
                Required::Decisions => self.decisions.is_some(),
            };

            if !present {
                return Err(Error::Config(format!("missing facility: {depend:?}")));
            }
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct DependenciesBuilder {
    dependencies: Facilities,
}

impl DependenciesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_portal(mut self, portal: Arc<dyn Portal>) -> Self {
        self.dependencies.portal = Some(portal);
        self
    }

    pub fn with_log_sink(mut self, log: Arc<dyn LogSink>) -> Self {
        self.dependencies.log = Some(log);
        self
    }

    pub fn with_progress_sink(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.dependencies.progress = Some(progress);
        self
    }

    pub fn with_decisions(mut self, decisions: Arc<dyn RouteDecisionSource>) -> Self {
        self.dependencies.decisions = Some(decisions);
        self
    }

    pub fn build(self) -> Facilities {
        self.dependencies
    }
}
