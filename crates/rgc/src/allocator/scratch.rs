//! Allocator Submodule - Scratch Bump Allocation
//!
//! Bump pointer allocation over a single fixed buffer, with strict
//! LIFO release. Allocation is a pointer increment; release pops the
//! most recent allocation and rewinds the top. This matches the
//! stack discipline of method calls exactly, which is the only client.
//!
//! The buffer never grows. Exhaustion is the runtime's stack-overflow
//! condition and surfaces as [`RgcError::ScratchOverflow`] so the host
//! can unwind.

use crate::config::GcConfig;
use crate::error::{RgcError, Result};
use crate::memory::{align_up, zero_memory, BLOCK_ALIGNMENT};
use std::alloc::{self, Layout};

/// Scratch bump allocator with LIFO release
///
/// # Examples
///
/// ```rust
/// use rgc::ScratchAllocator;
///
/// let mut scratch = ScratchAllocator::new(4096);
/// let a = scratch.allocate(16).unwrap();
/// let b = scratch.allocate(32).unwrap();
/// // Releases must come in reverse order of acquisition.
/// scratch.free(b);
/// scratch.free(a);
/// assert_eq!(scratch.used(), 0);
/// ```
pub struct ScratchAllocator {
    /// Base address of the backing buffer
    base: usize,
    /// Buffer capacity in bytes
    capacity: usize,
    /// Current bump offset from base
    top: usize,
    /// Aligned size of each outstanding allocation, in acquisition order
    sizes: Vec<usize>,
    /// Layout the buffer was allocated with, kept for Drop
    layout: Layout,
}

impl ScratchAllocator {
    /// Create a scratch allocator with a fixed capacity in bytes
    ///
    /// Aborts the process if the backing buffer cannot be allocated.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "scratch capacity must be > 0");

        let padded = align_up(capacity, BLOCK_ALIGNMENT);
        let layout = Layout::from_size_align(padded, BLOCK_ALIGNMENT)
            .expect("scratch capacity overflows Layout");

        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            alloc::handle_alloc_error(layout);
        }

        ScratchAllocator {
            base: ptr as usize,
            capacity: padded,
            top: 0,
            sizes: Vec::new(),
            layout,
        }
    }

    /// Create a scratch allocator sized by the runtime configuration
    pub fn from_config(config: &GcConfig) -> Self {
        Self::new(config.scratch_capacity)
    }

    /// Allocate `size` bytes from the top of the buffer
    ///
    /// Returns the region address, zero-initialized. A zero-byte
    /// request returns address 0 without recording an allocation, so
    /// it must not be paired with a [`free`](Self::free).
    pub fn allocate(&mut self, size: usize) -> Result<usize> {
        if size == 0 {
            return Ok(0);
        }

        // Reject on the raw size first so the alignment round-up below
        // cannot wrap for absurd requests.
        let available = self.capacity - self.top;
        if size > available {
            return Err(RgcError::ScratchOverflow {
                requested: size,
                available,
            });
        }
        let aligned = align_up(size, BLOCK_ALIGNMENT);
        if aligned > available {
            return Err(RgcError::ScratchOverflow {
                requested: size,
                available,
            });
        }

        let addr = self.base + self.top;
        // Regions are reused after rewind; clear any stale content.
        unsafe { zero_memory(addr, aligned) };
        self.top += aligned;
        self.sizes.push(aligned);
        Ok(addr)
    }

    /// Release the most recent allocation
    ///
    /// `addr` must be the address returned by the latest outstanding
    /// [`allocate`](Self::allocate); out-of-order release is a bug in
    /// the caller and fails an assertion. Releasing address 0 (a
    /// zero-byte allocation) is a no-op.
    pub fn free(&mut self, addr: usize) {
        if addr == 0 {
            return;
        }

        let size = self
            .sizes
            .pop()
            .expect("scratch free with no outstanding allocations");
        self.top -= size;
        assert_eq!(
            addr,
            self.base + self.top,
            "scratch free out of LIFO order: expected {:#x}, got {addr:#x}",
            self.base + self.top
        );
    }

    /// Bytes currently allocated
    pub fn used(&self) -> usize {
        self.top
    }

    /// Bytes still available
    pub fn remaining(&self) -> usize {
        self.capacity - self.top
    }

    /// Total buffer capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for ScratchAllocator {
    fn drop(&mut self) {
        // SAFETY: base came from alloc_zeroed with self.layout.
        unsafe { alloc::dealloc(self.base as *mut u8, self.layout) };
    }
}
