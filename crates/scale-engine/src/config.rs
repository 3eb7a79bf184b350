//! # Engine Configuration

use std::time::Duration;

/// Tunables for the kiosk engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long an episode may stay Active without an admissible reading
    /// before it times out. The timeout is a recoverable outcome ("no item
    /// detected"), surfaced as a notice, and the clerk can start again.
    pub detection_timeout: Duration,
}

impl EngineConfig {
    /// Replaces the detection timeout.
    pub fn with_detection_timeout(mut self, timeout: Duration) -> Self {
        self.detection_timeout = timeout;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            // Long enough to place and settle an item, short enough that a
            // forgotten kiosk resets itself between customers.
            detection_timeout: Duration::from_secs(30),
        }
    }
}
