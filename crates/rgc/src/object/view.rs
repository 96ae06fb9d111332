//! Object Submodule - Typed Object View
//!
//! [`ObjectView`] wraps a raw object address with accessors that know
//! the layout rules. All heap access in the runtime above the memory
//! layer goes through here, so the layout encoding lives in exactly
//! one place.

use crate::memory::{read_value, write_value};
use crate::object::header::{header, HEADER_SIZE, SLOT_SIZE};
use crate::types::{TypeHandle, TypeRegistry};

/// View over a managed object at a raw address
///
/// A view is just an address plus layout knowledge; it borrows
/// nothing and copying it is free. The accessors are `unsafe` for the
/// same reason raw reads are: the view cannot prove the address still
/// refers to a live object of the claimed shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectView {
    addr: usize,
}

impl ObjectView {
    pub fn new(addr: usize) -> Self {
        debug_assert_ne!(addr, 0, "view of the null address");
        ObjectView { addr }
    }

    pub fn addr(self) -> usize {
        self.addr
    }

    /// Registered type of the object
    ///
    /// # Safety
    ///
    /// The address must refer to a live managed object.
    pub unsafe fn type_handle(self) -> TypeHandle {
        header(self.addr).ty
    }

    /// Address of the first payload byte
    pub fn payload(self) -> usize {
        self.addr + HEADER_SIZE
    }

    // === Fields of plain objects ===

    /// Address of the field at `offset` within the payload
    pub fn field_addr(self, offset: usize) -> usize {
        self.addr + HEADER_SIZE + offset
    }

    /// Read a field value
    ///
    /// # Safety
    ///
    /// The object must be live and `offset` must be a valid field
    /// offset for a value of type `T`.
    pub unsafe fn read_field<T: Copy>(self, offset: usize) -> T {
        read_value(self.field_addr(offset))
    }

    /// Write a field value
    ///
    /// # Safety
    ///
    /// Same as [`read_field`](Self::read_field).
    pub unsafe fn write_field<T: Copy>(self, offset: usize, value: T) {
        write_value(self.field_addr(offset), value);
    }

    // === Strings ===

    /// Byte length of a string object
    ///
    /// # Safety
    ///
    /// The object must be a live string.
    pub unsafe fn string_len(self) -> usize {
        read_value(self.addr + HEADER_SIZE)
    }

    /// Borrow the UTF-8 content of a string object
    ///
    /// # Safety
    ///
    /// The object must be a live string whose content was written as
    /// valid UTF-8, and the borrow must not outlive the object.
    pub unsafe fn string_bytes<'a>(self) -> &'a [u8] {
        let len = self.string_len();
        std::slice::from_raw_parts((self.addr + HEADER_SIZE + SLOT_SIZE) as *const u8, len)
    }

    /// Borrow a string object's content as `&str`
    ///
    /// # Safety
    ///
    /// Same as [`string_bytes`](Self::string_bytes).
    pub unsafe fn as_str<'a>(self) -> &'a str {
        std::str::from_utf8_unchecked(self.string_bytes())
    }

    // === Arrays ===

    /// Total element count of an array object
    ///
    /// For multi-dimensional arrays this is the product of all
    /// dimensions.
    ///
    /// # Safety
    ///
    /// The object must be a live array.
    pub unsafe fn array_len(self) -> usize {
        read_value(self.addr + HEADER_SIZE)
    }

    /// Rank of an array object (1 for plain arrays)
    ///
    /// # Safety
    ///
    /// The object must be a live array.
    pub unsafe fn array_rank(self) -> usize {
        read_value(self.addr + HEADER_SIZE + SLOT_SIZE)
    }

    /// Length of one dimension of a multi-dimensional array
    ///
    /// Rank-1 arrays store no dimensions table; for them, dimension 0
    /// is the array length.
    ///
    /// # Safety
    ///
    /// The object must be a live array and `dim < rank`.
    pub unsafe fn array_dim(self, dim: usize) -> usize {
        let rank = self.array_rank();
        debug_assert!(dim < rank, "dimension {dim} out of rank {rank}");
        if rank <= 1 {
            self.array_len()
        } else {
            read_value(self.addr + HEADER_SIZE + 2 * SLOT_SIZE + dim * SLOT_SIZE)
        }
    }

    /// Address of the first element
    ///
    /// # Safety
    ///
    /// The object must be a live array.
    pub unsafe fn elements_addr(self) -> usize {
        let rank = self.array_rank();
        let dims_table = if rank > 1 { rank * SLOT_SIZE } else { 0 };
        self.addr + HEADER_SIZE + 2 * SLOT_SIZE + dims_table
    }

    /// Address of element `index` (flat, row-major)
    ///
    /// # Safety
    ///
    /// The object must be a live array and `index < len`.
    pub unsafe fn element_addr(self, types: &TypeRegistry, index: usize) -> usize {
        debug_assert!(
            index < self.array_len(),
            "element index {index} out of bounds"
        );
        let element = types
            .element_of(self.type_handle())
            .expect("array type without element type");
        self.elements_addr() + index * types.value_size(element)
    }

    /// Read element `index` of an array
    ///
    /// # Safety
    ///
    /// The object must be a live array of elements readable as `T`,
    /// and `index < len`.
    pub unsafe fn read_element<T: Copy>(self, types: &TypeRegistry, index: usize) -> T {
        read_value(self.element_addr(types, index))
    }

    /// Write element `index` of an array
    ///
    /// # Safety
    ///
    /// Same as [`read_element`](Self::read_element).
    pub unsafe fn write_element<T: Copy>(self, types: &TypeRegistry, index: usize, value: T) {
        write_value(self.element_addr(types, index), value);
    }
}
