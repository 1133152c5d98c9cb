use log::{info, warn};

/// Prefixes log lines with the pipeline stage that emitted them.
#[derive(Debug, Clone, Copy)]
pub struct StageLogger {
    stage: &'static str,
}

impl StageLogger {
    pub fn new(stage: &'static str) -> Self {
        Self { stage }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.stage, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.stage, message);
    }
}

impl Default for StageLogger {
    fn default() -> Self {
        Self::new("pipeline")
    }
}
