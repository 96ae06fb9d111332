//! Allocator Module - Transient Allocation
//!
//! Hosts the scratch (bump/LIFO) allocator used for call buffers and
//! other short-lived, stack-shaped runtime data. Managed heap objects
//! never live here; they go through [`crate::memory::RawHeap`] via the
//! collector.

mod scratch;

pub use scratch::ScratchAllocator;
