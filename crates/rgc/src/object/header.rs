//! Object Submodule - Object Header
//!
//! The header is the one structure every managed object shares. It
//! carries the type handle, the mark flag, and the intrusive link that
//! threads all live objects into a single list for sweeping.

use crate::types::TypeHandle;

/// Alignment of every managed object and every inline value
///
/// A single uniform alignment for the whole object model. Nothing the
/// runtime stores needs more than 8 bytes.
pub const OBJECT_ALIGNMENT: usize = 8;

/// Size of [`ObjectHeader`] in bytes
pub const HEADER_SIZE: usize = 16;

/// Width of one reference or evaluation-stack slot
pub const SLOT_SIZE: usize = 8;

/// Mark flag in [`ObjectHeader::flags`]
pub const MARK_BIT: u32 = 1;

/// Header prefixed to every managed object
///
/// `next` makes the live set an intrusive singly-linked list; the
/// collector walks it during sweep and the interior-pointer scan.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ObjectHeader {
    /// Registered type of this object
    pub ty: TypeHandle,
    /// Flag bits; currently only [`MARK_BIT`]
    pub flags: u32,
    /// Address of the next object in the live list, 0 at the tail
    pub next: usize,
}

impl ObjectHeader {
    pub fn new(ty: TypeHandle, next: usize) -> Self {
        ObjectHeader { ty, flags: 0, next }
    }

    #[inline]
    pub fn is_marked(&self) -> bool {
        self.flags & MARK_BIT != 0
    }

    /// Set the mark flag, returning whether it was already set
    #[inline]
    pub fn set_mark(&mut self) -> bool {
        let was_marked = self.is_marked();
        self.flags |= MARK_BIT;
        was_marked
    }

    #[inline]
    pub fn clear_mark(&mut self) {
        self.flags &= !MARK_BIT;
    }
}

/// Borrow the header at an object address
///
/// # Safety
///
/// `addr` must be the address of a live managed object, and the borrow
/// must not outlive the object.
#[inline]
pub unsafe fn header<'a>(addr: usize) -> &'a ObjectHeader {
    &*(addr as *const ObjectHeader)
}

/// Mutably borrow the header at an object address
///
/// # Safety
///
/// Same as [`header`], plus the usual exclusivity requirement.
#[inline]
pub unsafe fn header_mut<'a>(addr: usize) -> &'a mut ObjectHeader {
    &mut *(addr as *mut ObjectHeader)
}

/// Address of the payload that follows the header
#[inline]
pub fn payload_addr(addr: usize) -> usize {
    addr + HEADER_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        // The constant is part of the wire format of the heap; it must
        // match the real struct size.
        assert_eq!(std::mem::size_of::<ObjectHeader>(), HEADER_SIZE);
        assert!(std::mem::align_of::<ObjectHeader>() <= OBJECT_ALIGNMENT);
    }

    #[test]
    fn test_mark_operations() {
        let mut h = ObjectHeader::new(TypeHandle::OBJECT, 0);
        assert!(!h.is_marked());
        assert!(!h.set_mark());
        assert!(h.is_marked());
        // Second set reports the existing mark.
        assert!(h.set_mark());
        h.clear_mark();
        assert!(!h.is_marked());
    }

    #[test]
    fn test_header_preserves_link() {
        let h = ObjectHeader::new(TypeHandle::STRING, 0x4000);
        assert_eq!(h.ty, TypeHandle::STRING);
        assert_eq!(h.next, 0x4000);
        assert_eq!(h.flags, 0);
    }
}
