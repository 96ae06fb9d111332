//! Call Module - Method-Call Buffer
//!
//! A [`CallBuffer`] stages the arguments and return slot of one
//! method invocation in scratch memory. The interpreter builds one
//! per call, writes arguments into it, runs the callee, reads the
//! return value back out, and releases it.
//!
//! Two scratch regions back a buffer: the return slot and the
//! argument block. They are acquired return-slot first, so release
//! must free the argument block first to honor the scratch
//! allocator's LIFO discipline. [`release`](CallBuffer::release)
//! consumes the buffer and does this in the right order; dropping a
//! buffer without releasing it leaks its scratch regions until the
//! allocator is torn down.

use crate::allocator::ScratchAllocator;
use crate::error::Result;
use crate::memory::{read_value, write_value};
use crate::object::SLOT_SIZE;
use crate::types::{TypeHandle, TypeKind, TypeRegistry};

/// Placement of one argument within the argument block
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    /// Byte offset within the argument block
    pub offset: usize,
    pub ty: TypeHandle,
}

/// Staged arguments and return slot for one method call
pub struct CallBuffer {
    /// Scratch address of the return slot, 0 when the return is void
    ret_addr: usize,
    ret_size: usize,
    ret_ty: TypeHandle,
    /// Scratch address of the argument block, 0 when there are none
    args_addr: usize,
    args_size: usize,
    args: Vec<ArgSpec>,
}

impl CallBuffer {
    /// Build a call buffer for a call with the given signature
    ///
    /// `args` records where each argument lives within an argument
    /// block of `args_size` bytes; the block and the return slot are
    /// allocated from `scratch` and zero-initialized.
    ///
    /// The return slot is sized by the declared return type: nothing
    /// for void, the full struct size for structs wider than a slot,
    /// one slot otherwise.
    pub fn new(
        scratch: &mut ScratchAllocator,
        types: &TypeRegistry,
        ret_ty: TypeHandle,
        args: Vec<ArgSpec>,
        args_size: usize,
    ) -> Result<Self> {
        let ret_size = Self::return_slot_size(types, ret_ty);

        // Return slot first; args block second. Release order is the
        // reverse.
        let ret_addr = scratch.allocate(ret_size)?;
        let args_addr = match scratch.allocate(args_size) {
            Ok(addr) => addr,
            Err(err) => {
                scratch.free(ret_addr);
                return Err(err);
            }
        };

        Ok(CallBuffer {
            ret_addr,
            ret_size,
            ret_ty,
            args_addr,
            args_size,
            args,
        })
    }

    fn return_slot_size(types: &TypeRegistry, ret_ty: TypeHandle) -> usize {
        match types.kind(ret_ty) {
            TypeKind::Void => 0,
            TypeKind::Struct if types.is_large_value(ret_ty) => types.get(ret_ty).size,
            _ => SLOT_SIZE,
        }
    }

    /// Number of arguments
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Declared type of argument `index`
    pub fn arg_type(&self, index: usize) -> TypeHandle {
        self.args[index].ty
    }

    /// Address of argument `index` within the block
    pub fn arg_addr(&self, index: usize) -> usize {
        self.args_addr + self.args[index].offset
    }

    /// Read argument `index`
    ///
    /// # Safety
    ///
    /// The argument must have been written as a value of type `T`.
    pub unsafe fn get_arg<T: Copy>(&self, index: usize) -> T {
        debug_assert!(
            self.args[index].offset + std::mem::size_of::<T>() <= self.args_size,
            "argument read past block end"
        );
        read_value(self.arg_addr(index))
    }

    /// Write argument `index`
    ///
    /// # Safety
    ///
    /// `T` must match the declared width of the argument.
    pub unsafe fn set_arg<T: Copy>(&mut self, index: usize, value: T) {
        debug_assert!(
            self.args[index].offset + std::mem::size_of::<T>() <= self.args_size,
            "argument write past block end"
        );
        write_value(self.arg_addr(index), value);
    }

    /// Current return type
    pub fn return_type(&self) -> TypeHandle {
        self.ret_ty
    }

    /// Override the recorded return type
    ///
    /// Intrinsic dispatch sometimes narrows a generic signature after
    /// the buffer was built. The slot itself is not resized; the new
    /// type's value must fit the slot allocated for the old one.
    pub fn set_return_type(&mut self, types: &TypeRegistry, ret_ty: TypeHandle) {
        debug_assert!(
            Self::return_slot_size(types, ret_ty) <= self.ret_size,
            "return type override does not fit the allocated slot"
        );
        self.ret_ty = ret_ty;
    }

    /// Address of the return slot, 0 for void returns
    pub fn return_addr(&self) -> usize {
        self.ret_addr
    }

    /// Read the return value
    ///
    /// # Safety
    ///
    /// The callee must have written a value of type `T` to a non-void
    /// return slot.
    pub unsafe fn get_return<T: Copy>(&self) -> T {
        debug_assert!(
            std::mem::size_of::<T>() <= self.ret_size,
            "return read past slot end"
        );
        read_value(self.ret_addr)
    }

    /// Write the return value
    ///
    /// # Safety
    ///
    /// `T` must fit the allocated return slot.
    pub unsafe fn set_return<T: Copy>(&mut self, value: T) {
        debug_assert!(
            std::mem::size_of::<T>() <= self.ret_size,
            "return write past slot end"
        );
        write_value(self.ret_addr, value);
    }

    /// Release the buffer's scratch regions
    ///
    /// Frees in reverse acquisition order: argument block, then
    /// return slot. Must be called with the same allocator the buffer
    /// was built from, while this buffer's regions are the newest
    /// outstanding scratch allocations.
    pub fn release(self, scratch: &mut ScratchAllocator) {
        scratch.free(self.args_addr);
        scratch.free(self.ret_addr);
    }
}
