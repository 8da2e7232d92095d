use std::sync::Arc;

use scopewatch_core::{ManualClock, RecordingEmitter, ScopeCoordinator, ScopewatchConfig};

/// Coordinator wired to a manual clock and an in-memory emitter
pub struct Harness {
    pub scopes: ScopeCoordinator,
    pub clock: Arc<ManualClock>,
    pub emitter: RecordingEmitter,
}

/// Create a harness with default configuration
#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with(ScopewatchConfig::default())
}

/// Create a harness with the given configuration
///
/// The clock starts at 2017-03-01T00:00:00Z.
#[allow(dead_code)]
pub fn harness_with(config: ScopewatchConfig) -> Harness {
    let clock = Arc::new(ManualClock::at_epoch_millis(1_488_326_400_000));
    let emitter = RecordingEmitter::new();
    let scopes = ScopeCoordinator::new(clock.clone(), Arc::new(emitter.clone()), config);
    Harness {
        scopes,
        clock,
        emitter,
    }
}
