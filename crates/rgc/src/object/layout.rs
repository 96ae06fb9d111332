//! Object Submodule - Size Computation
//!
//! Computes the full allocated size of a managed object from its kind
//! and instance data. The collector needs this in two places: interior
//! pointer resolution (does `addr` fall inside this object?) and
//! byte accounting during sweep.
//!
//! Lengths reaching the size functions originate from interpreted
//! program data, so every computation is overflow-checked: `None`
//! means the requested object cannot exist in the address space. An
//! unchecked wrap here would hand the heap an under-sized block whose
//! header claims the huge length.

use crate::memory::read_value;
use crate::object::header::{header, HEADER_SIZE, OBJECT_ALIGNMENT, SLOT_SIZE};
use crate::types::{TypeKind, TypeRegistry};

/// Round a raw size up to the object alignment, `None` on overflow
#[inline]
fn align_object_size(size: usize) -> Option<usize> {
    Some(size.checked_add(OBJECT_ALIGNMENT - 1)? & !(OBJECT_ALIGNMENT - 1))
}

/// Size of a plain object with `payload` bytes of fields
#[inline]
pub fn plain_object_size(payload: usize) -> Option<usize> {
    align_object_size(HEADER_SIZE.checked_add(payload)?)
}

/// Size of a string holding `len` UTF-8 bytes
#[inline]
pub fn string_size(len: usize) -> Option<usize> {
    align_object_size((HEADER_SIZE + SLOT_SIZE).checked_add(len)?)
}

/// Size of a rank-1 array of `len` elements of `element_size` bytes
#[inline]
pub fn array_size(element_size: usize, len: usize) -> Option<usize> {
    let elements = element_size.checked_mul(len)?;
    align_object_size((HEADER_SIZE + 2 * SLOT_SIZE).checked_add(elements)?)
}

/// Size of a multi-dimensional array
///
/// `total_len` is the product of the dimensions; the dimensions table
/// itself occupies one slot per rank ahead of the elements.
#[inline]
pub fn md_array_size(element_size: usize, rank: usize, total_len: usize) -> Option<usize> {
    let elements = element_size.checked_mul(total_len)?;
    let dims_table = rank.checked_mul(SLOT_SIZE)?;
    align_object_size(
        (HEADER_SIZE + 2 * SLOT_SIZE)
            .checked_add(dims_table)?
            .checked_add(elements)?,
    )
}

/// Full allocated size of the live object at `addr`
///
/// Dispatches on the object's registered kind and reads whatever
/// instance data (length, rank) the kind needs.
///
/// # Safety
///
/// `addr` must be the address of a live managed object whose header
/// and instance data are initialized.
pub unsafe fn full_object_size(types: &TypeRegistry, addr: usize) -> usize {
    // Instance data on a live object was validated when the object was
    // allocated, so the recomputed size cannot overflow.
    let ty = header(addr).ty;
    let size = match types.kind(ty) {
        TypeKind::Object => plain_object_size(types.get(ty).size),
        TypeKind::String => {
            let len: usize = read_value(addr + HEADER_SIZE);
            string_size(len)
        }
        TypeKind::Array => {
            let element = types
                .element_of(ty)
                .expect("array type without element type");
            let element_size = types.value_size(element);
            let len: usize = read_value(addr + HEADER_SIZE);
            let rank: usize = read_value(addr + HEADER_SIZE + SLOT_SIZE);
            if rank > 1 {
                md_array_size(element_size, rank, len)
            } else {
                array_size(element_size, len)
            }
        }
        TypeKind::Void | TypeKind::Primitive(_) | TypeKind::Struct => {
            unreachable!("value type {:?} cannot head a heap object", types.kind(ty))
        }
    };
    size.expect("live object header describes an impossible size")
}
