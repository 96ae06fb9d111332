//! Marker Module - Rooting and Tracing
//!
//! Implements the first two phases of a collection cycle. A [`Marker`]
//! is built fresh for each cycle over the current live list, gathers
//! root addresses from the host's [`RootProvider`], and then traces
//! the object graph breadth-first, setting the mark flag on every
//! reachable object.
//!
//! # Interior pointers
//!
//! Hosts report two kinds of root addresses. Direct references are
//! object addresses and are marked as-is. Byref addresses may point
//! anywhere inside an object (a field, an array element); the marker
//! resolves those by a linear scan of the live list, looking for the
//! object whose extent contains the address. Byrefs that land in no
//! object (references to stack locals, native memory) resolve to
//! nothing and are ignored. The scan is linear per byref, which is
//! acceptable because byref roots are rare compared to direct ones.
//!
//! # Tracing rules
//!
//! - Strings hold no references and are leaves.
//! - Arrays of primitive elements are skipped wholesale without
//!   touching the elements.
//! - Arrays of struct elements scan each element's fields in place.
//! - Arrays of reference elements mark each non-null element.
//! - Plain objects walk their class's field lists up the inheritance
//!   chain, stopping at the universal base, which has no fields.
//!
//! Struct fields recurse without a visited set; value types cannot
//! form cycles.

use crate::memory::read_value;
use crate::object::{full_object_size, header, header_mut, payload_addr, ObjectView, SLOT_SIZE};
use crate::frame::RootProvider;
use crate::types::{TypeHandle, TypeKind, TypeRegistry};
use std::collections::VecDeque;

/// Single-cycle mark state
pub struct Marker<'a> {
    types: &'a TypeRegistry,
    /// Head of the live list at cycle start
    live_head: usize,
    /// Objects marked but not yet scanned
    worklist: VecDeque<usize>,
    /// Objects marked this cycle
    marked: usize,
}

impl<'a> Marker<'a> {
    pub fn new(types: &'a TypeRegistry, live_head: usize) -> Self {
        Marker {
            types,
            live_head,
            worklist: VecDeque::new(),
            marked: 0,
        }
    }

    /// Gather all roots from the host and mark them
    ///
    /// Returns the number of addresses the host reported, nulls
    /// included.
    pub fn collect_roots(&mut self, roots: &dyn RootProvider) -> usize {
        // Buffer both callback streams before marking; the callbacks
        // cannot borrow the marker mutably twice at once.
        let mut direct: Vec<usize> = Vec::new();
        let mut interior: Vec<usize> = Vec::new();
        {
            let mut refs = |addr: usize| direct.push(addr);
            let mut byrefs = |addr: usize| interior.push(addr);

            roots.inspect_statics(&mut refs, &mut byrefs);
            roots.walk_frames(&mut |frame| {
                frame.inspect_evaluation_stack(&mut refs, &mut byrefs);
                frame.inspect_locals(&mut refs, &mut byrefs);
                frame.inspect_arguments(&mut refs, &mut byrefs);
            });
        }

        let reported = direct.len() + interior.len();
        for addr in direct {
            self.mark_address(addr);
        }
        for addr in interior {
            self.mark_interior(addr);
        }
        reported
    }

    /// Drain the worklist, scanning every reachable object
    ///
    /// Returns the total number of objects marked this cycle.
    pub fn trace(&mut self) -> usize {
        while let Some(addr) = self.worklist.pop_front() {
            // SAFETY: only live, marked object addresses enter the
            // worklist.
            unsafe { self.scan_object(addr) };
        }
        self.marked
    }

    /// Mark an object address, queueing it for scanning if new
    fn mark_address(&mut self, addr: usize) {
        if addr == 0 {
            return;
        }
        // SAFETY: non-null root and field values are live object
        // addresses by the host contract.
        let already = unsafe { header_mut(addr).set_mark() };
        if !already {
            self.marked += 1;
            self.worklist.push_back(addr);
        }
    }

    /// Resolve an interior address and mark the owning object
    fn mark_interior(&mut self, addr: usize) {
        if addr == 0 {
            return;
        }
        if let Some(owner) = self.find_owner(addr) {
            self.mark_address(owner);
        }
    }

    /// Find the live object whose extent contains `addr`
    ///
    /// Linear scan over the live list; returns the object address or
    /// `None` when the address lies outside every object.
    fn find_owner(&self, addr: usize) -> Option<usize> {
        let mut current = self.live_head;
        while current != 0 {
            // SAFETY: the live list holds only live objects.
            let (size, next) = unsafe {
                (
                    full_object_size(self.types, current),
                    header(current).next,
                )
            };
            if addr >= current && addr < current + size {
                return Some(current);
            }
            current = next;
        }
        None
    }

    /// Scan one object's outgoing references
    ///
    /// # Safety
    ///
    /// `addr` must be a live managed object.
    unsafe fn scan_object(&mut self, addr: usize) {
        let ty = header(addr).ty;
        match self.types.kind(ty) {
            // Strings reference nothing.
            TypeKind::String => {}

            TypeKind::Array => self.scan_array(addr, ty),

            TypeKind::Object => {
                let types = self.types;
                let payload = payload_addr(addr);
                let mut current = Some(ty);
                while let Some(t) = current {
                    if t == TypeHandle::OBJECT {
                        break;
                    }
                    for field in types.fields_of(t) {
                        self.scan_value(field.ty, payload + field.offset);
                    }
                    current = types.base_of(t);
                }
            }

            TypeKind::Void | TypeKind::Primitive(_) | TypeKind::Struct => {
                unreachable!("value type on the heap")
            }
        }
    }

    /// # Safety
    ///
    /// `addr` must be a live array object of type `ty`.
    unsafe fn scan_array(&mut self, addr: usize, ty: TypeHandle) {
        let element = self
            .types
            .element_of(ty)
            .expect("array type without element type");

        match self.types.kind(element) {
            // Nothing inside a primitive array can be a reference;
            // skip the whole object without touching its elements.
            TypeKind::Void | TypeKind::Primitive(_) => {}

            TypeKind::Struct => {
                let view = ObjectView::new(addr);
                let len = view.array_len();
                let element_size = self.types.value_size(element);
                let base = view.elements_addr();
                for i in 0..len {
                    self.scan_struct(element, base + i * element_size);
                }
            }

            TypeKind::Object | TypeKind::Array | TypeKind::String => {
                let view = ObjectView::new(addr);
                let len = view.array_len();
                let base = view.elements_addr();
                // Reference elements are laid out one slot apart; the
                // stride must match the allocation layout exactly.
                for i in 0..len {
                    let value: usize = read_value(base + i * SLOT_SIZE);
                    self.mark_address(value);
                }
            }
        }
    }

    /// Scan one inline value at `addr`
    ///
    /// # Safety
    ///
    /// `addr` must hold an initialized value of type `ty`.
    unsafe fn scan_value(&mut self, ty: TypeHandle, addr: usize) {
        match self.types.kind(ty) {
            TypeKind::Void | TypeKind::Primitive(_) => {}
            TypeKind::Struct => self.scan_struct(ty, addr),
            TypeKind::Object | TypeKind::Array | TypeKind::String => {
                let value: usize = read_value(addr);
                self.mark_address(value);
            }
        }
    }

    /// # Safety
    ///
    /// `addr` must hold an initialized struct of type `ty`.
    unsafe fn scan_struct(&mut self, ty: TypeHandle, addr: usize) {
        let types = self.types;
        for field in types.fields_of(ty) {
            self.scan_value(field.ty, addr + field.offset);
        }
    }
}
