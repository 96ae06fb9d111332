//! Object Model Module - Managed Object Layout
//!
//! Defines how managed objects look in raw memory and how the rest of
//! the runtime reads them. Every heap object starts with a fixed
//! [`ObjectHeader`]; what follows depends on the object's kind:
//!
//! ```text
//! plain object:  [header][fields ...................]
//! string:        [header][byte len: usize][utf-8 bytes]
//! array:         [header][len: usize][rank: usize][elements]
//! md array:      [header][len: usize][rank: usize][dims x rank][elements]
//! ```
//!
//! `len` of a multi-dimensional array is the total element count, the
//! product of its dimensions. Elements are stored in row-major order.
//!
//! Addresses are plain `usize` values; [`ObjectView`] wraps one with
//! checked, typed accessors.

mod header;
mod layout;
mod view;

pub use header::{
    header, header_mut, payload_addr, ObjectHeader, HEADER_SIZE, MARK_BIT, OBJECT_ALIGNMENT,
    SLOT_SIZE,
};
pub use layout::{array_size, full_object_size, md_array_size, plain_object_size, string_size};
pub use view::ObjectView;
