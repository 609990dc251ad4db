use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::error::{Error, Result};

/// Anything that can be asked whether the current run should stop.
pub trait StopCheck: Send + Sync {
    fn should_stop(&self) -> bool;

    fn check(&self) -> Result<()> {
        if self.should_stop() {
            return Err(Error::Cancelled);
        }

        Ok(())
    }
}

impl<F> StopCheck for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn should_stop(&self) -> bool {
        self()
    }
}

/// Shared cooperative stop flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    requested: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

impl StopCheck for CancelFlag {
    fn should_stop(&self) -> bool {
        self.is_cancelled()
    }
}
