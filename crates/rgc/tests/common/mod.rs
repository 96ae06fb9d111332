//! Test Utilities for the RGC Integration Suite
//!
//! Provides a runtime fixture with a pre-registered set of types and
//! a mock interpreter stack, so individual tests read as scenarios
//! instead of setup.

#![allow(dead_code)]

use rgc::types::FieldDesc;
use rgc::{Collector, GcConfig, RootProvider, StackFrame, TypeHandle};

/// Mock interpreter stack: one frame whose locals and byref slots are
/// plain vectors the test mutates directly.
#[derive(Debug, Default)]
pub struct MockRoots {
    /// Direct object references held by the frame
    pub refs: Vec<usize>,
    /// Interior addresses held by the frame
    pub byrefs: Vec<usize>,
}

impl MockRoots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding(refs: &[usize]) -> Self {
        MockRoots {
            refs: refs.to_vec(),
            byrefs: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.refs.clear();
        self.byrefs.clear();
    }
}

impl StackFrame for MockRoots {
    fn inspect_locals(&self, refs: &mut dyn FnMut(usize), byrefs: &mut dyn FnMut(usize)) {
        for &addr in &self.refs {
            refs(addr);
        }
        for &addr in &self.byrefs {
            byrefs(addr);
        }
    }
}

impl RootProvider for MockRoots {
    fn walk_frames(&self, visit: &mut dyn FnMut(&dyn StackFrame)) {
        visit(self);
    }
}

/// Runtime fixture with a small type vocabulary
///
/// - `node`: class with two reference fields (`left` at 0, `right` at 8)
/// - `counted`: class with one reference field, finalizer attachable
/// - `obj_array`: array of object references
/// - `byte_array`: array of u8 elements
pub struct RtFixture {
    pub gc: Collector,
    pub node: TypeHandle,
    pub counted: TypeHandle,
    pub obj_array: TypeHandle,
    pub byte_array: TypeHandle,
}

impl RtFixture {
    /// Fixture with deterministic settings: poisoning on, a threshold
    /// large enough that tests control collection explicitly.
    pub fn new() -> Self {
        Self::with_config(GcConfig {
            poison_freed: true,
            ..Default::default()
        })
    }

    /// Fixture with a tiny threshold so allocation pressure triggers
    /// collection quickly.
    pub fn with_small_threshold(threshold: usize) -> Self {
        Self::with_config(GcConfig {
            collect_threshold: threshold,
            heap_budget: 64 * 1024 * 1024,
            poison_freed: true,
            ..Default::default()
        })
    }

    pub fn with_config(config: GcConfig) -> Self {
        let mut gc = Collector::new(config).expect("fixture config must validate");

        let (node, counted, obj_array, byte_array) = {
            let types = gc.types_mut();
            let node = types.register_class(
                "Node",
                16,
                None,
                vec![
                    FieldDesc {
                        name: "left".into(),
                        offset: 0,
                        ty: TypeHandle::OBJECT,
                    },
                    FieldDesc {
                        name: "right".into(),
                        offset: 8,
                        ty: TypeHandle::OBJECT,
                    },
                ],
            );
            let counted = types.register_class(
                "Counted",
                8,
                None,
                vec![FieldDesc {
                    name: "payload".into(),
                    offset: 0,
                    ty: TypeHandle::OBJECT,
                }],
            );
            let u8_ty = types.register_primitive("u8", rgc::types::PrimitiveKind::U8);
            let obj_array = types.register_array("object[]", TypeHandle::OBJECT);
            let byte_array = types.register_array("u8[]", u8_ty);
            (node, counted, obj_array, byte_array)
        };

        RtFixture {
            gc,
            node,
            counted,
            obj_array,
            byte_array,
        }
    }

    /// Allocate a `Node` with both fields null
    pub fn alloc_node(&mut self, roots: &dyn RootProvider) -> usize {
        self.gc
            .allocate_object(self.node, roots)
            .expect("node allocation")
    }

    /// Point `field` (0 = left, 1 = right) of `node` at `target`
    pub fn link(&self, node: usize, field: usize, target: usize) {
        let view = rgc::ObjectView::new(node);
        unsafe { view.write_field::<usize>(field * 8, target) };
    }
}
