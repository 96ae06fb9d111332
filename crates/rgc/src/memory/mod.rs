//! Memory Operations - Raw heap and low-level memory helpers
//!
//! This module owns the raw heap backing the managed object graph and
//! provides the low-level read/write primitives the rest of the runtime
//! is built on. Everything above this layer works in terms of plain
//! `usize` addresses.
//!
//! # Design
//!
//! The raw heap is a thin wrapper over the system allocator. Each
//! allocation is tracked in a block table keyed by address, which is
//! what allows `free` to take only an address: the table remembers the
//! `Layout` every block was created with. The table also turns double
//! frees and frees of foreign addresses into immediate assertion
//! failures instead of undefined behavior.
//!
//! All memory handed out is zero-initialized. Object construction
//! relies on this: a fresh object's fields are valid null references
//! and zero primitives without any explicit clearing pass.
//!
//! # Safety
//!
//! The free functions in this module are `unsafe` because they operate
//! on raw addresses. The caller must ensure that:
//! - Addresses are valid and properly aligned
//! - Memory regions do not overlap (for copy operations)
//! - Sizes do not overflow

use rustc_hash::FxHashMap;
use std::alloc::{self, Layout};
use std::ptr;

/// Alignment of every raw heap block, in bytes
///
/// A single uniform alignment keeps size arithmetic trivial; no type
/// in the object model requires more than 8-byte alignment.
pub const BLOCK_ALIGNMENT: usize = 8;

/// Byte pattern written over freed blocks when poisoning is enabled
pub const POISON_BYTE: u8 = 0xDD;

/// Align `value` up to the next multiple of `align`
///
/// `align` must be a power of two.
#[inline]
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Check whether `value` is a multiple of `align`
#[inline]
pub const fn is_aligned(value: usize, align: usize) -> bool {
    value & (align - 1) == 0
}

/// Copy non-overlapping memory from source to destination
///
/// # Safety
///
/// - `src` must be valid for reads of `size` bytes
/// - `dst` must be valid for writes of `size` bytes
/// - `src` and `dst` must not overlap
#[inline]
pub unsafe fn copy_memory(src: usize, dst: usize, size: usize) {
    if size == 0 {
        return;
    }
    ptr::copy_nonoverlapping(src as *const u8, dst as *mut u8, size);
}

/// Zero a memory region
///
/// # Safety
///
/// `addr` must be valid for writes of `size` bytes.
#[inline]
pub unsafe fn zero_memory(addr: usize, size: usize) {
    if size == 0 {
        return;
    }
    ptr::write_bytes(addr as *mut u8, 0, size);
}

/// Fill a memory region with a byte pattern
///
/// # Safety
///
/// `addr` must be valid for writes of `size` bytes.
#[inline]
pub unsafe fn fill_memory(addr: usize, size: usize, byte: u8) {
    if size == 0 {
        return;
    }
    ptr::write_bytes(addr as *mut u8, byte, size);
}

/// Read a plain value from a raw address
///
/// # Safety
///
/// `addr` must be valid for reads of `size_of::<T>()` bytes and hold a
/// properly initialized `T`. The read is unaligned-tolerant.
#[inline]
pub unsafe fn read_value<T: Copy>(addr: usize) -> T {
    ptr::read_unaligned(addr as *const T)
}

/// Write a plain value to a raw address
///
/// # Safety
///
/// `addr` must be valid for writes of `size_of::<T>()` bytes.
#[inline]
pub unsafe fn write_value<T: Copy>(addr: usize, value: T) {
    ptr::write_unaligned(addr as *mut T, value);
}

/// Raw heap allocator
///
/// Backs every managed object with a block from the system allocator.
/// Blocks are independent: there is no sliding compaction and no reuse
/// scheme beyond what the system allocator provides, so addresses are
/// stable for an object's entire lifetime.
///
/// # Examples
///
/// ```rust
/// use rgc::memory::RawHeap;
///
/// let mut heap = RawHeap::new();
/// let addr = heap.allocate(64);
/// assert_ne!(addr, 0);
/// heap.free(addr);
/// ```
#[derive(Debug, Default)]
pub struct RawHeap {
    /// Block table: address of every live block and its layout
    blocks: FxHashMap<usize, Layout>,
}

impl RawHeap {
    /// Create an empty raw heap
    pub fn new() -> Self {
        RawHeap {
            blocks: FxHashMap::default(),
        }
    }

    /// Allocate a zeroed block of at least `size` bytes
    ///
    /// Returns the block address, or 0 for a zero-byte request. The
    /// zero address is never a valid block, so 0 doubles as the null
    /// sentinel throughout the runtime.
    ///
    /// Aborts the process if the system allocator fails; the runtime
    /// has no meaningful way to continue without memory.
    pub fn allocate(&mut self, size: usize) -> usize {
        if size == 0 {
            return 0;
        }

        let padded = align_up(size, BLOCK_ALIGNMENT);
        let layout = Layout::from_size_align(padded, BLOCK_ALIGNMENT)
            .expect("block size overflows Layout");

        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            alloc::handle_alloc_error(layout);
        }

        let addr = ptr as usize;
        debug_assert!(is_aligned(addr, BLOCK_ALIGNMENT));
        self.blocks.insert(addr, layout);
        addr
    }

    /// Free a block previously returned by [`allocate`](Self::allocate)
    ///
    /// Freeing address 0 is a no-op. Freeing any other address that is
    /// not a live block is a bug in the caller and panics.
    pub fn free(&mut self, addr: usize) {
        if addr == 0 {
            return;
        }

        let layout = self
            .blocks
            .remove(&addr)
            .unwrap_or_else(|| panic!("free of unknown or already freed block {addr:#x}"));

        // SAFETY: addr came from alloc_zeroed with this exact layout
        // and is removed from the table before deallocation.
        unsafe { alloc::dealloc(addr as *mut u8, layout) };
    }

    /// Overwrite a live block with the poison pattern
    ///
    /// Used just before freeing when poisoning is enabled, so stale
    /// references into the block read garbage rather than plausible
    /// object data.
    pub fn poison(&mut self, addr: usize) {
        if addr == 0 {
            return;
        }

        let layout = self
            .blocks
            .get(&addr)
            .unwrap_or_else(|| panic!("poison of unknown block {addr:#x}"));

        // SAFETY: the block table guarantees addr..addr+size is live.
        unsafe { fill_memory(addr, layout.size(), POISON_BYTE) };
    }

    /// Number of live blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Check whether `addr` is the start of a live block
    pub fn contains(&self, addr: usize) -> bool {
        self.blocks.contains_key(&addr)
    }
}

impl Drop for RawHeap {
    fn drop(&mut self) {
        for (addr, layout) in self.blocks.drain() {
            // SAFETY: every table entry is a live block with its
            // original layout.
            unsafe { alloc::dealloc(addr as *mut u8, layout) };
        }
    }
}
