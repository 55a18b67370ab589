use std::time::{Duration, Instant};

/// Raised when the per-request budget is exhausted. This is not a
/// field error: it must unwind to the request boundary without being
/// folded into a partial response, so every layer between a checkpoint
/// and the boundary carries it as its own error variant and propagates
/// it with `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("The request timed out (>{budget_ms}ms).")]
pub struct DeadlineExceeded {
    pub budget_ms: u64,
}

/// Monotonic start time plus a fixed budget, checked at every planning
/// recursion and before every field resolution. The check is advisory:
/// a single long datastore call can overshoot until the next
/// checkpoint.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(budget: Duration) -> Deadline {
        Deadline {
            started: Instant::now(),
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn budget_ms(&self) -> u64 {
        u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn check(&self) -> Result<(), DeadlineExceeded> {
        if self.elapsed() > self.budget {
            Err(DeadlineExceeded {
                budget_ms: self.budget_ms(),
            })
        } else {
            Ok(())
        }
    }

    pub fn restart(&mut self) {
        self.started = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_budget_fires_immediately() {
        let deadline = Deadline::start(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(1));
        assert_eq!(deadline.check(), Err(DeadlineExceeded { budget_ms: 0 }));
    }

    #[test]
    fn generous_budget_passes() {
        let deadline = Deadline::start(Duration::from_secs(60));
        assert!(deadline.check().is_ok());
    }
}
