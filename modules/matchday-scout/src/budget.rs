use std::any::Any;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Time allowed for one step: its own timeout, cut short by an optional
/// request-wide deadline.
#[derive(Debug, Clone, Copy)]
pub struct StepBudget {
    pub step: Duration,
    pub deadline: Option<Instant>,
}

/// Why a bounded step did not finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTimeout {
    Step(Duration),
    Deadline,
}

impl fmt::Display for StepTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepTimeout::Step(step) if step.as_secs() == 0 => {
                write!(f, "timed out after {}ms", step.as_millis())
            }
            StepTimeout::Step(step) => write!(f, "timed out after {}s", step.as_secs()),
            StepTimeout::Deadline => f.write_str("deadline exceeded"),
        }
    }
}

impl StepBudget {
    pub fn new(step: Duration, deadline: Option<Instant>) -> Self {
        Self { step, deadline }
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Run `fut` until whichever limit comes first. A step too long to
    /// represent as an instant leaves only the deadline, if any.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, StepTimeout> {
        let own = Instant::now().checked_add(self.step);
        let limit = match (own, self.deadline) {
            (Some(own), Some(deadline)) if deadline <= own => {
                Some((deadline, StepTimeout::Deadline))
            }
            (Some(own), _) => Some((own, StepTimeout::Step(self.step))),
            (None, Some(deadline)) => Some((deadline, StepTimeout::Deadline)),
            (None, None) => None,
        };

        match limit {
            Some((until, reason)) => tokio::time::timeout_at(until, fut).await.map_err(|_| reason),
            None => Ok(fut.await),
        }
    }
}

/// The instant `within` from now, or no deadline at all when that lies
/// beyond what the clock can represent.
pub fn deadline_after(within: Duration) -> Option<Instant> {
    Instant::now().checked_add(within)
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
