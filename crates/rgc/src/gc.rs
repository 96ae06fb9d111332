//! GC Module - Collector State Machine
//!
//! The [`Collector`] ties the runtime together: it owns the raw heap,
//! the type registry, and the live list, and drives the mark-sweep
//! cycle.
//!
//! # Cycle
//!
//! ```text
//!          Idle ──► Rooting ──► Tracing ──► Sweeping ──► Idle
//! ```
//!
//! A cycle starts when an allocation would push live bytes past the
//! current threshold, when the host calls [`collect`](Collector::collect)
//! explicitly, or once at shutdown. The collector is single-threaded
//! and non-moving: object addresses never change, and the host is
//! simply not running while a cycle executes.
//!
//! Calling `collect` while a cycle is already in progress is absorbed
//! as a no-op. This makes the state machine re-entrancy safe even if
//! a host callback tries to trigger collection from inside rooting.
//!
//! # Growth policy
//!
//! After each cycle the threshold becomes
//! `max(collect_threshold, live_bytes * growth_factor)`, so the heap
//! breathes with the live set instead of thrashing at a fixed limit.
//!
//! # Finalization
//!
//! Objects whose type carries a finalizer are tracked in an
//! insertion-ordered finalization set. Sweep is two-phase: the live
//! list is first relinked to contain only survivors, then each doomed
//! object has its finalizer run (at most once), is poisoned if
//! configured, and is freed. Finalizers see intact object memory.

use crate::config::GcConfig;
use crate::error::{RgcError, Result};
use crate::frame::{NoRoots, RootProvider};
use crate::marker::Marker;
use crate::memory::{copy_memory, write_value, RawHeap};
use crate::object::{
    array_size, full_object_size, header, header_mut, md_array_size, plain_object_size,
    string_size, ObjectHeader, HEADER_SIZE, SLOT_SIZE,
};
use crate::stats::GcStats;
use crate::trace::{GcEvent, LogSink, TraceSink};
use crate::types::{TypeHandle, TypeKind, TypeRegistry};
use indexmap::IndexSet;

/// Phase of the collector state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcState {
    /// No cycle in progress
    Idle,
    /// Gathering roots from the host
    Rooting,
    /// Marking the reachable graph
    Tracing,
    /// Relinking the live list and freeing garbage
    Sweeping,
}

/// Why a collection cycle started
#[derive(Debug, Clone, Copy)]
pub enum GcReason {
    /// An allocation would cross the threshold
    Threshold { used: usize, threshold: usize },
    /// The host requested a collection
    Explicit,
    /// Final sweep at shutdown
    Shutdown,
}

/// The memory runtime: heap, type registry, and mark-sweep collector
///
/// One `Collector` is one independent managed heap. Nothing is global;
/// embedders can run several side by side.
///
/// # Examples
///
/// ```rust
/// use rgc::{Collector, GcConfig, NoRoots};
///
/// let mut gc = Collector::new(GcConfig::default()).unwrap();
/// let s = gc.allocate_string_from("hello", &NoRoots).unwrap();
/// assert_ne!(s, 0);
/// gc.collect(&NoRoots);
/// assert_eq!(gc.live_objects(), 0);
/// gc.shutdown();
/// ```
pub struct Collector {
    config: GcConfig,
    types: TypeRegistry,
    heap: RawHeap,
    /// Head of the intrusive live list, 0 when the heap is empty
    live_head: usize,
    live_count: usize,
    live_bytes: usize,
    /// Live-byte level that triggers the next cycle
    threshold: usize,
    state: GcState,
    /// Live objects whose finalizer is still pending
    finalizable: IndexSet<usize>,
    sink: Box<dyn TraceSink>,
    cycles: u64,
    objects_freed: usize,
    bytes_freed: usize,
    finalizers_run: usize,
}

impl Collector {
    /// Create a collector with the given configuration
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: GcConfig) -> Result<Self> {
        Self::with_sink(config, Box::new(LogSink))
    }

    /// Create a collector with a custom trace sink
    pub fn with_sink(config: GcConfig, sink: Box<dyn TraceSink>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| RgcError::Configuration(e.to_string()))?;

        let threshold = config.collect_threshold;
        Ok(Collector {
            config,
            types: TypeRegistry::new(),
            heap: RawHeap::new(),
            live_head: 0,
            live_count: 0,
            live_bytes: 0,
            threshold,
            state: GcState::Idle,
            finalizable: IndexSet::new(),
            sink,
            cycles: 0,
            objects_freed: 0,
            bytes_freed: 0,
            finalizers_run: 0,
        })
    }

    /// The type registry backing this heap
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Mutable access for type registration
    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    // === Allocation ===

    /// Allocate a plain object of class `ty`
    ///
    /// The payload is zeroed: every field starts as null or zero.
    /// `roots` is consulted if the allocation triggers a collection.
    pub fn allocate_object(&mut self, ty: TypeHandle, roots: &dyn RootProvider) -> Result<usize> {
        if self.types.kind(ty) != TypeKind::Object {
            return Err(RgcError::InvalidArgument(format!(
                "allocate_object with non-class type {}",
                self.types.name(ty)
            )));
        }
        let size = Self::checked_size(plain_object_size(self.types.get(ty).size))?;
        Ok(self.allocate_raw(ty, size, roots))
    }

    /// Allocate a string of `len` zeroed content bytes
    pub fn allocate_string(&mut self, len: usize, roots: &dyn RootProvider) -> Result<usize> {
        let size = Self::checked_size(string_size(len))?;
        let addr = self.allocate_raw(TypeHandle::STRING, size, roots);
        // SAFETY: addr is a fresh block of at least header + len slot.
        unsafe { write_value(addr + HEADER_SIZE, len) };
        Ok(addr)
    }

    /// Allocate a string holding a copy of `content`
    pub fn allocate_string_from(
        &mut self,
        content: &str,
        roots: &dyn RootProvider,
    ) -> Result<usize> {
        let addr = self.allocate_string(content.len(), roots)?;
        // SAFETY: the string block has room for len content bytes.
        unsafe {
            copy_memory(
                content.as_ptr() as usize,
                addr + HEADER_SIZE + SLOT_SIZE,
                content.len(),
            );
        }
        Ok(addr)
    }

    /// Allocate a rank-1 array of `len` elements
    ///
    /// Elements are zeroed; for reference elements that means null.
    pub fn allocate_array(
        &mut self,
        array_ty: TypeHandle,
        len: usize,
        roots: &dyn RootProvider,
    ) -> Result<usize> {
        let element = self.require_array(array_ty)?;
        let size = Self::checked_size(array_size(self.types.value_size(element), len))?;
        let addr = self.allocate_raw(array_ty, size, roots);
        // SAFETY: fresh block with room for the len and rank slots.
        unsafe {
            write_value(addr + HEADER_SIZE, len);
            write_value(addr + HEADER_SIZE + SLOT_SIZE, 1usize);
        }
        Ok(addr)
    }

    /// Allocate a multi-dimensional array with the given dimensions
    ///
    /// Total element count is the product of `dims`. A single
    /// dimension degenerates to a plain array.
    pub fn allocate_md_array(
        &mut self,
        array_ty: TypeHandle,
        dims: &[usize],
        roots: &dyn RootProvider,
    ) -> Result<usize> {
        let rank = dims.len();
        if rank == 0 {
            return Err(RgcError::InvalidArgument(
                "array must have at least one dimension".to_string(),
            ));
        }
        if rank == 1 {
            return self.allocate_array(array_ty, dims[0], roots);
        }

        let element = self.require_array(array_ty)?;
        let total = dims
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| {
                RgcError::InvalidArgument("array element count overflows usize".to_string())
            })?;
        let size = Self::checked_size(md_array_size(self.types.value_size(element), rank, total))?;
        let addr = self.allocate_raw(array_ty, size, roots);
        // SAFETY: fresh block with room for len, rank, and dims table.
        unsafe {
            write_value(addr + HEADER_SIZE, total);
            write_value(addr + HEADER_SIZE + SLOT_SIZE, rank);
            for (i, &dim) in dims.iter().enumerate() {
                write_value(addr + HEADER_SIZE + 2 * SLOT_SIZE + i * SLOT_SIZE, dim);
            }
        }
        Ok(addr)
    }

    /// Allocate a shallow copy of the object at `addr`
    ///
    /// The source must be live and must be reachable from `roots`:
    /// the allocation may trigger a collection, and an unrooted
    /// source would be swept out from under the copy.
    pub fn clone_object(&mut self, addr: usize, roots: &dyn RootProvider) -> Result<usize> {
        if addr == 0 || !self.heap.contains(addr) {
            return Err(RgcError::InvalidPointer { address: addr });
        }
        // SAFETY: addr is a live object per the block table check.
        let (ty, size) = unsafe { (header(addr).ty, full_object_size(&self.types, addr)) };

        let copy = self.allocate_raw(ty, size, roots);
        // SAFETY: both blocks are `size` bytes; headers are distinct.
        unsafe {
            copy_memory(
                addr + HEADER_SIZE,
                copy + HEADER_SIZE,
                size - HEADER_SIZE,
            );
        }
        Ok(copy)
    }

    /// Surface an overflowed size computation as an allocation error
    ///
    /// Lengths arrive from interpreted program data; a length too
    /// large to lay out must fail cleanly instead of wrapping into an
    /// under-sized block.
    fn checked_size(size: Option<usize>) -> Result<usize> {
        size.ok_or_else(|| {
            RgcError::InvalidArgument("object size overflows the address space".to_string())
        })
    }

    fn require_array(&self, ty: TypeHandle) -> Result<TypeHandle> {
        if self.types.kind(ty) != TypeKind::Array {
            return Err(RgcError::InvalidArgument(format!(
                "expected an array type, got {}",
                self.types.name(ty)
            )));
        }
        self.types.element_of(ty).ok_or_else(|| {
            RgcError::Internal(format!(
                "array type {} has no element type",
                self.types.name(ty)
            ))
        })
    }

    /// Allocate a heap block, install its header, and thread it onto
    /// the live list
    fn allocate_raw(&mut self, ty: TypeHandle, size: usize, roots: &dyn RootProvider) -> usize {
        self.maybe_collect(size, roots);

        let addr = self.heap.allocate(size);
        // SAFETY: fresh block, at least HEADER_SIZE bytes.
        unsafe { write_value(addr, ObjectHeader::new(ty, self.live_head)) };
        self.live_head = addr;
        self.live_count += 1;
        self.live_bytes += size;

        // The universal base never enters the finalization set even
        // if the host hangs a finalizer on it.
        if ty != TypeHandle::OBJECT && self.types.has_finalizer(ty) {
            self.finalizable.insert(addr);
        }
        addr
    }

    fn maybe_collect(&mut self, pending: usize, roots: &dyn RootProvider) {
        if self.state == GcState::Idle && self.live_bytes + pending > self.threshold {
            let reason = GcReason::Threshold {
                used: self.live_bytes,
                threshold: self.threshold,
            };
            self.run_cycle(roots, reason);
        }
    }

    // === Collection ===

    /// Run a collection cycle now
    ///
    /// Everything not reachable from `roots` is swept. Re-entrant
    /// calls while a cycle is in progress are absorbed.
    pub fn collect(&mut self, roots: &dyn RootProvider) {
        self.run_cycle(roots, GcReason::Explicit);
    }

    fn run_cycle(&mut self, roots: &dyn RootProvider, reason: GcReason) {
        if self.state != GcState::Idle {
            return;
        }

        self.cycles += 1;
        let cycle = self.cycles;
        self.sink.event(&GcEvent::CycleStart { cycle, reason });

        self.state = GcState::Rooting;
        let mut marker = Marker::new(&self.types, self.live_head);
        let root_count = marker.collect_roots(roots);
        self.sink.event(&GcEvent::RootsDone {
            cycle,
            roots: root_count,
        });

        self.state = GcState::Tracing;
        let marked = marker.trace();
        drop(marker);
        self.sink.event(&GcEvent::TraceDone { cycle, marked });

        self.state = GcState::Sweeping;
        let (freed_objects, freed_bytes) = self.sweep();

        self.threshold = ((self.live_bytes as f64 * self.config.growth_factor) as usize)
            .max(self.config.collect_threshold);
        self.state = GcState::Idle;

        self.sink.event(&GcEvent::CycleEnd {
            cycle,
            freed_objects,
            freed_bytes,
            live_objects: self.live_count,
            live_bytes: self.live_bytes,
            next_threshold: self.threshold,
        });

        if self.config.verbose {
            log::info!(
                "gc cycle {cycle}: freed {freed_objects} objects ({freed_bytes} bytes), \
                 {} live objects remain",
                self.live_count
            );
        }
        if self.live_bytes > self.config.heap_budget {
            log::warn!(
                "live heap {} bytes exceeds budget {} bytes",
                self.live_bytes,
                self.config.heap_budget
            );
        }
    }

    /// Sweep the live list
    ///
    /// Phase 1 relinks the list to survivors only and clears their
    /// marks. Phase 2 finalizes and frees the doomed objects. The
    /// split keeps the list consistent before any host code
    /// (finalizers) observes the heap.
    fn sweep(&mut self) -> (usize, usize) {
        let mut doomed: Vec<(usize, usize, TypeHandle)> = Vec::new();

        let mut current = self.live_head;
        self.live_head = 0;
        let mut tail = 0usize;
        while current != 0 {
            // SAFETY: the live list holds only live objects; next is
            // read before any relinking touches this header.
            let (next, marked) = unsafe {
                let h = header(current);
                (h.next, h.is_marked())
            };
            if marked {
                // SAFETY: survivor header, exclusively ours.
                unsafe {
                    let hdr = header_mut(current);
                    hdr.clear_mark();
                    hdr.next = 0;
                    if tail == 0 {
                        self.live_head = current;
                    } else {
                        header_mut(tail).next = current;
                    }
                }
                tail = current;
            } else {
                // SAFETY: doomed objects are intact until phase 2.
                let (size, ty) = unsafe {
                    (full_object_size(&self.types, current), header(current).ty)
                };
                doomed.push((current, size, ty));
            }
            current = next;
        }

        let mut freed_bytes = 0usize;
        for &(addr, size, ty) in &doomed {
            if self.finalizable.swap_remove(&addr) {
                if let Some(finalizer) = self.types.finalizer(ty) {
                    finalizer(addr);
                    self.finalizers_run += 1;
                    self.sink.event(&GcEvent::FinalizerRun { address: addr });
                }
            }
            if self.config.poison_freed {
                self.heap.poison(addr);
            }
            self.heap.free(addr);
            self.live_count -= 1;
            self.live_bytes -= size;
            freed_bytes += size;
        }

        self.objects_freed += doomed.len();
        self.bytes_freed += freed_bytes;
        (doomed.len(), freed_bytes)
    }

    // === Finalization control ===

    /// Remove `addr` from the finalization set
    ///
    /// The object's finalizer will not run when it is swept. Removing
    /// an object that was never registered, or was already
    /// suppressed, is a no-op.
    pub fn suppress_finalize(&mut self, addr: usize) {
        self.finalizable.swap_remove(&addr);
    }

    /// Put a previously suppressed object back in the finalization set
    ///
    /// No-op if the object's type has no finalizer.
    pub fn reregister_finalize(&mut self, addr: usize) {
        assert!(
            self.heap.contains(addr),
            "reregister_finalize of non-object address {addr:#x}"
        );
        // SAFETY: addr is a live object per the block table check.
        let ty = unsafe { header(addr).ty };
        if ty != TypeHandle::OBJECT && self.types.has_finalizer(ty) {
            self.finalizable.insert(addr);
        }
    }

    // === Shutdown ===

    /// Tear the runtime down
    ///
    /// Runs one final cycle with no roots, which finalizes and frees
    /// every remaining object, then asserts the heap really emptied.
    /// A failed assertion here means the runtime leaked an object
    /// from its own live list, which is a bug.
    pub fn shutdown(mut self) {
        let finalized_before = self.finalizers_run;
        let freed_before = self.objects_freed;
        self.run_cycle(&NoRoots, GcReason::Shutdown);

        self.sink.event(&GcEvent::Shutdown {
            finalized: self.finalizers_run - finalized_before,
            freed_objects: self.objects_freed - freed_before,
        });

        assert_eq!(
            self.live_count, 0,
            "objects still live after final sweep"
        );
        assert_eq!(self.heap.block_count(), 0, "heap blocks leaked at shutdown");
        assert!(
            self.finalizable.is_empty(),
            "finalization set not empty at shutdown"
        );
    }

    // === Accessors ===

    pub fn live_objects(&self) -> usize {
        self.live_count
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn state(&self) -> GcState {
        self.state
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycles
    }

    /// Snapshot the collector's counters
    pub fn stats(&self) -> GcStats {
        GcStats {
            cycles: self.cycles,
            objects_freed: self.objects_freed,
            bytes_freed: self.bytes_freed,
            finalizers_run: self.finalizers_run,
            live_objects: self.live_count,
            live_bytes: self.live_bytes,
            threshold: self.threshold,
        }
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("state", &self.state)
            .field("live_objects", &self.live_count)
            .field("live_bytes", &self.live_bytes)
            .field("threshold", &self.threshold)
            .field("cycles", &self.cycles)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::NoRoots;

    fn collector() -> Collector {
        Collector::new(GcConfig::default()).unwrap()
    }

    #[test]
    fn test_new_starts_idle_and_empty() {
        let gc = collector();
        assert_eq!(gc.state(), GcState::Idle);
        assert_eq!(gc.live_objects(), 0);
        assert_eq!(gc.live_bytes(), 0);
        assert_eq!(gc.cycle_count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GcConfig {
            collect_threshold: 0,
            ..Default::default()
        };
        assert!(matches!(
            Collector::new(config),
            Err(RgcError::Configuration(_))
        ));
    }

    #[test]
    fn test_allocate_object_threads_live_list() {
        let mut gc = collector();
        let leaf = gc.types_mut().register_class("Leaf", 8, None, Vec::new());
        let a = gc.allocate_object(leaf, &NoRoots).unwrap();
        let b = gc.allocate_object(leaf, &NoRoots).unwrap();
        assert_ne!(a, b);
        assert_eq!(gc.live_objects(), 2);
        // Newest first.
        assert_eq!(unsafe { header(b).next }, a);
    }

    #[test]
    fn test_allocate_object_rejects_value_types() {
        let mut gc = collector();
        let pair = gc.types_mut().register_struct("Pair", 16, Vec::new());
        assert!(matches!(
            gc.allocate_object(pair, &NoRoots),
            Err(RgcError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_collect_with_no_roots_frees_everything() {
        let mut gc = collector();
        let leaf = gc.types_mut().register_class("Leaf", 8, None, Vec::new());
        for _ in 0..10 {
            gc.allocate_object(leaf, &NoRoots).unwrap();
        }
        gc.collect(&NoRoots);
        assert_eq!(gc.live_objects(), 0);
        assert_eq!(gc.live_bytes(), 0);
        assert_eq!(gc.stats().objects_freed, 10);
        gc.shutdown();
    }

    #[test]
    fn test_clone_rejects_foreign_address() {
        let mut gc = collector();
        assert!(matches!(
            gc.clone_object(0x1234, &NoRoots),
            Err(RgcError::InvalidPointer { .. })
        ));
    }

    #[test]
    fn test_md_array_requires_dimensions() {
        let mut gc = collector();
        let arr = {
            let types = gc.types_mut();
            let i64_ty = types.register_primitive("i64", crate::types::PrimitiveKind::I64);
            types.register_array("i64[]", i64_ty)
        };
        assert!(gc.allocate_md_array(arr, &[], &NoRoots).is_err());
    }

    #[test]
    fn test_shutdown_on_empty_heap() {
        let gc = collector();
        gc.shutdown();
    }
}
