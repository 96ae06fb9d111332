//! Statistics Module - Collector Counters
//!
//! A [`GcStats`] value is a point-in-time snapshot of the collector's
//! cumulative counters, taken via [`Collector::stats`].
//!
//! [`Collector::stats`]: crate::gc::Collector::stats

/// Snapshot of collector statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Completed collection cycles
    pub cycles: u64,
    /// Objects freed over the runtime's lifetime
    pub objects_freed: usize,
    /// Bytes freed over the runtime's lifetime
    pub bytes_freed: usize,
    /// Finalizers executed
    pub finalizers_run: usize,
    /// Objects currently live
    pub live_objects: usize,
    /// Bytes currently live
    pub live_bytes: usize,
    /// Live-byte level that triggers the next collection
    pub threshold: usize,
}

impl GcStats {
    /// Average bytes per live object, 0 when the heap is empty
    pub fn average_object_size(&self) -> usize {
        if self.live_objects == 0 {
            0
        } else {
            self.live_bytes / self.live_objects
        }
    }
}
