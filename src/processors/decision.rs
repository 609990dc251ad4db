//! Out-of-band exchange used when the drawn route is longer than the target.
//!
//! The worker sends one [`DecisionRequest`] and suspends until the owner
//! answers or the run is stopped.

use std::{thread, time::Duration};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot::{self, error::TryRecvError},
};

use crate::{
    error::{Error, Result},
    util::cancel::StopCheck,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteTooLong {
    pub detailed_distance_m: f64,
    // target as requested, before the safety buffer
    pub nominal_target_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Truncate,
    KeepFull,
    Abort,
}

pub trait RouteDecisionSource: Send + Sync {
    fn decide(&self, request: RouteTooLong, stop: &dyn StopCheck) -> Result<RouteDecision>;
}

/// Answers every request the same way, without blocking.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub RouteDecision);

impl RouteDecisionSource for FixedDecision {
    fn decide(&self, _request: RouteTooLong, stop: &dyn StopCheck) -> Result<RouteDecision> {
        stop.check()?;
        Ok(self.0)
    }
}

#[derive(Debug)]
pub struct DecisionRequest {
    pub route: RouteTooLong,
    reply: oneshot::Sender<RouteDecision>,
}

impl DecisionRequest {
    /// Returns false when the worker stopped waiting.
    pub fn respond(self, decision: RouteDecision) -> bool {
        self.reply.send(decision).is_ok()
    }
}

/// Worker side of the exchange; the owner keeps the matching receiver.
#[derive(Debug, Clone)]
pub struct DecisionChannel {
    requests: mpsc::Sender<DecisionRequest>,
    poll_interval: Duration,
}

impl DecisionChannel {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

    pub fn new() -> (Self, mpsc::Receiver<DecisionRequest>) {
        let (requests, receiver) = mpsc::channel(4);

        (
            Self {
                requests,
                poll_interval: DecisionChannel::DEFAULT_POLL_INTERVAL,
            },
            receiver,
        )
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn send(&self, mut request: DecisionRequest, stop: &dyn StopCheck) -> Result<()> {
        loop {
            match self.requests.try_send(request) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(pending)) => request = pending,
                Err(TrySendError::Closed(_)) => {
                    return Err(Error::RouteRejected(
                        "nobody is listening for route decisions".to_string(),
                    ))
                }
            }

            stop.check()?;
            thread::sleep(self.poll_interval);
        }
    }
}

impl RouteDecisionSource for DecisionChannel {
    fn decide(&self, route: RouteTooLong, stop: &dyn StopCheck) -> Result<RouteDecision> {
        stop.check()?;

        let (reply, mut response) = oneshot::channel();
        self.send(DecisionRequest { route, reply }, stop)?;

        loop {
            match response.try_recv() {
                Ok(decision) => return Ok(decision),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => {
                    return Err(Error::RouteRejected(
                        "route decision request was dropped unanswered".to_string(),
                    ))
                }
            }

            stop.check()?;
            thread::sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::cancel::CancelFlag;

    const REQUEST: RouteTooLong = RouteTooLong {
        detailed_distance_m: 4000.0,
        nominal_target_m: 3000.0,
    };

    fn fast_channel() -> (DecisionChannel, mpsc::Receiver<DecisionRequest>) {
        let (channel, receiver) = DecisionChannel::new();
        (channel.with_poll_interval(Duration::from_millis(5)), receiver)
    }

    #[test]
    fn fixed_decision() {
        let decision = FixedDecision(RouteDecision::KeepFull)
            .decide(REQUEST, &CancelFlag::new())
            .unwrap();

        assert_eq!(decision, RouteDecision::KeepFull);
    }

    #[test]
    fn owner_answers_from_another_thread() {
        let (channel, mut receiver) = fast_channel();

        let owner = thread::spawn(move || {
            let request = receiver.blocking_recv().unwrap();
            assert_eq!(request.route, REQUEST);
            request.respond(RouteDecision::Truncate)
        });

        let decision = channel.decide(REQUEST, &CancelFlag::new()).unwrap();

        assert_eq!(decision, RouteDecision::Truncate);
        assert!(owner.join().unwrap());
    }

    #[test]
    fn cancellation_ends_the_wait() {
        let (channel, _receiver) = fast_channel();
        let flag = CancelFlag::new();
        let canceller = flag.clone();

        let worker = thread::spawn(move || channel.decide(REQUEST, &flag));
        thread::sleep(Duration::from_millis(30));
        canceller.cancel();

        assert_eq!(worker.join().unwrap(), Err(Error::Cancelled));
    }

    #[test]
    fn dropped_request_is_a_rejection() {
        let (channel, mut receiver) = fast_channel();

        let owner = thread::spawn(move || drop(receiver.blocking_recv()));

        let err = channel.decide(REQUEST, &CancelFlag::new()).unwrap_err();
        owner.join().unwrap();

        assert_eq!(err.code(), "route_rejected");
    }

    #[test]
    fn closed_channel_is_a_rejection() {
        let (channel, receiver) = fast_channel();
        drop(receiver);

        let err = channel.decide(REQUEST, &CancelFlag::new()).unwrap_err();
        assert_eq!(err.code(), "route_rejected");
    }
}
