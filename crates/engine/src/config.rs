use std::time::Duration;

/// Externally supplied engine configuration. The budget bounds every
/// request end to end; planning and materialization poll it at their
/// checkpoints.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub request_budget: Duration,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            request_budget: Duration::from_secs(10),
        }
    }
}
