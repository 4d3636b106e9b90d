//! Router counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of what the router has done since it was built.
///
/// Returned by [`DspRouter::stats()`](crate::DspRouter::stats).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Provider buffers received.
    pub provider_chunks: u64,
    /// Buffers successfully written to effect sockets.
    pub effect_writes: u64,
    /// Effect socket assignments or writes that failed.
    pub effect_write_failures: u64,
    /// Buffers accepted by the sink.
    pub sink_writes: u64,
    /// Buffers the sink rejected.
    pub sink_write_failures: u64,
    /// Effect output discarded because no sink was installed.
    pub dropped_without_sink: u64,
    /// Provider buffers discarded because no effect was registered.
    pub dropped_without_effects: u64,
}

/// Live counters shared by the router's entry points.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub provider_chunks: AtomicU64,
    pub effect_writes: AtomicU64,
    pub effect_write_failures: AtomicU64,
    pub sink_writes: AtomicU64,
    pub sink_write_failures: AtomicU64,
    pub dropped_without_sink: AtomicU64,
    pub dropped_without_effects: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RouterStats {
        RouterStats {
            provider_chunks: self.provider_chunks.load(Ordering::Relaxed),
            effect_writes: self.effect_writes.load(Ordering::Relaxed),
            effect_write_failures: self.effect_write_failures.load(Ordering::Relaxed),
            sink_writes: self.sink_writes.load(Ordering::Relaxed),
            sink_write_failures: self.sink_write_failures.load(Ordering::Relaxed),
            dropped_without_sink: self.dropped_without_sink.load(Ordering::Relaxed),
            dropped_without_effects: self.dropped_without_effects.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let counters = StatsCounters::default();
        StatsCounters::bump(&counters.provider_chunks);
        StatsCounters::bump(&counters.provider_chunks);
        StatsCounters::bump(&counters.sink_write_failures);

        let stats = counters.snapshot();
        assert_eq!(stats.provider_chunks, 2);
        assert_eq!(stats.sink_write_failures, 1);
        assert_eq!(stats.effect_writes, 0);
    }
}
