//! Observer seam for the presentation layer.
//!
//! RULE: Observers are called synchronously, in registration order,
//! after an operation has fully committed. They never see partial state.

use crate::event::EngineEvent;

pub trait RewardObserver: Send {
    /// Unique stable name for this observer.
    fn name(&self) -> &'static str;

    fn on_event(&mut self, event: &EngineEvent);
}

/// Collects every event it sees. Handy for tooling and tests.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub seen: std::sync::Arc<std::sync::Mutex<Vec<EngineEvent>>>,
}

impl RewardObserver for RecordingObserver {
    fn name(&self) -> &'static str { "recording" }

    fn on_event(&mut self, event: &EngineEvent) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(event.clone());
        }
    }
}
