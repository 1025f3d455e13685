use eps_core::SimTime;
use eps_core::events::{EpsEvent, EventLevel, EventSink};

/// Forwards board events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&mut self, time_ms: SimTime, event: EpsEvent) {
        match event.level() {
            EventLevel::Info => tracing::info!(target: "eps", time_ms, "{event}"),
            EventLevel::Warning => tracing::warn!(target: "eps", time_ms, "{event}"),
            EventLevel::Error => tracing::error!(target: "eps", time_ms, "{event}"),
        }
    }
}
