//! Trace Module - Collection Event Stream
//!
//! The collector reports its progress as a stream of [`GcEvent`]
//! values through a [`TraceSink`]. The default sink forwards to the
//! `log` facade; embedders that want structured telemetry install
//! their own sink via [`Collector::with_sink`].
//!
//! [`Collector::with_sink`]: crate::gc::Collector::with_sink

use crate::gc::GcReason;

/// One observable step of the collector
#[derive(Debug, Clone)]
pub enum GcEvent {
    /// A collection cycle began
    CycleStart { cycle: u64, reason: GcReason },
    /// Rooting finished; `roots` counts addresses reported by the host
    RootsDone { cycle: u64, roots: usize },
    /// Tracing finished; `marked` counts objects reached
    TraceDone { cycle: u64, marked: usize },
    /// A finalizer ran for the object at `address`
    FinalizerRun { address: usize },
    /// Sweep finished and the cycle is complete
    CycleEnd {
        cycle: u64,
        freed_objects: usize,
        freed_bytes: usize,
        live_objects: usize,
        live_bytes: usize,
        next_threshold: usize,
    },
    /// The runtime shut down after a final sweep
    Shutdown {
        finalized: usize,
        freed_objects: usize,
    },
}

/// Receiver for collector events
pub trait TraceSink {
    fn event(&self, event: &GcEvent);
}

/// Sink that forwards events to the `log` facade
///
/// Cycle boundaries log at debug level, per-object events at trace.
#[derive(Debug, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn event(&self, event: &GcEvent) {
        match event {
            GcEvent::CycleStart { cycle, reason } => {
                log::debug!("gc cycle {cycle} start: {reason:?}");
            }
            GcEvent::RootsDone { cycle, roots } => {
                log::trace!("gc cycle {cycle}: {roots} root addresses");
            }
            GcEvent::TraceDone { cycle, marked } => {
                log::trace!("gc cycle {cycle}: {marked} objects marked");
            }
            GcEvent::FinalizerRun { address } => {
                log::trace!("finalizer ran for {address:#x}");
            }
            GcEvent::CycleEnd {
                cycle,
                freed_objects,
                freed_bytes,
                live_objects,
                live_bytes,
                next_threshold,
            } => {
                log::debug!(
                    "gc cycle {cycle} end: freed {freed_objects} objects ({freed_bytes} bytes), \
                     live {live_objects} objects ({live_bytes} bytes), next threshold {next_threshold}"
                );
            }
            GcEvent::Shutdown {
                finalized,
                freed_objects,
            } => {
                log::debug!("gc shutdown: finalized {finalized}, freed {freed_objects} objects");
            }
        }
    }
}

/// Sink that discards every event
#[derive(Debug, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn event(&self, _event: &GcEvent) {}
}
