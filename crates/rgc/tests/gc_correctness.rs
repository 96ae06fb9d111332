//! Correctness Tests
//!
//! Reachability, interior pointers, growth policy, finalization, and
//! the observable event stream.

mod common;

use common::{MockRoots, RtFixture};
use rgc::{Collector, GcConfig, GcEvent, NoRoots, ObjectView, TraceSink};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// === Reachability ===

#[test]
fn test_referenced_object_survives() {
    let mut fx = RtFixture::new();
    let b = fx.alloc_node(&NoRoots);
    let a = fx.alloc_node(&NoRoots);
    fx.link(a, 0, b);

    // Only A is rooted; B lives through A's field.
    let roots = MockRoots::holding(&[a]);
    fx.gc.collect(&roots);

    assert_eq!(fx.gc.live_objects(), 2);
    unsafe {
        assert_eq!(ObjectView::new(a).read_field::<usize>(0), b);
    }
}

#[test]
fn test_unreachable_object_is_freed_and_poisoned() {
    let mut fx = RtFixture::new();
    let a = fx.alloc_node(&NoRoots);
    let c = fx.alloc_node(&NoRoots);

    let roots = MockRoots::holding(&[a]);
    fx.gc.collect(&roots);

    assert_eq!(fx.gc.live_objects(), 1);
    assert_eq!(fx.gc.stats().objects_freed, 1);
    // The fixture enables poisoning; the freed block was overwritten
    // before release, so nothing here can be read as a valid header.
    // (The block itself is returned to the system allocator; we only
    // verify accounting, not the dead memory.)
    let _ = c;
}

#[test]
fn test_deep_chain_survives() {
    let mut fx = RtFixture::new();
    let mut head = fx.alloc_node(&NoRoots);
    for _ in 0..10_000 {
        let next = fx.alloc_node(&NoRoots);
        fx.link(next, 0, head);
        head = next;
    }

    let roots = MockRoots::holding(&[head]);
    fx.gc.collect(&roots);
    assert_eq!(fx.gc.live_objects(), 10_001);
}

#[test]
fn test_reference_cycle_is_collected_when_unrooted() {
    let mut fx = RtFixture::new();
    let a = fx.alloc_node(&NoRoots);
    let b = fx.alloc_node(&NoRoots);
    fx.link(a, 0, b);
    fx.link(b, 0, a);

    // Rooted: the cycle survives as a unit.
    let roots = MockRoots::holding(&[a]);
    fx.gc.collect(&roots);
    assert_eq!(fx.gc.live_objects(), 2);

    // Unrooted: the cycle cannot keep itself alive.
    fx.gc.collect(&NoRoots);
    assert_eq!(fx.gc.live_objects(), 0);
}

#[test]
fn test_array_elements_are_traced() {
    let mut fx = RtFixture::new();
    let d = fx.alloc_node(&NoRoots);
    let e = fx.alloc_node(&NoRoots);
    let arr = fx.gc.allocate_array(fx.obj_array, 4, &NoRoots).unwrap();

    let view = ObjectView::new(arr);
    unsafe { view.write_element::<usize>(fx.gc.types(), 1, d) };
    // E is stored nowhere.

    let roots = MockRoots::holding(&[arr]);
    fx.gc.collect(&roots);

    // Array and D survive; E is gone.
    assert_eq!(fx.gc.live_objects(), 2);
    unsafe {
        assert_eq!(view.read_element::<usize>(fx.gc.types(), 1), d);
    }
    let _ = e;
}

#[test]
fn test_primitive_array_content_is_not_treated_as_references() {
    let mut fx = RtFixture::new();
    let victim = fx.alloc_node(&NoRoots);
    let arr = fx.gc.allocate_array(fx.byte_array, 64, &NoRoots).unwrap();

    // Write the victim's address into the byte array; a conservative
    // scanner would see it, a precise one must not.
    let view = ObjectView::new(arr);
    unsafe {
        for (i, byte) in victim.to_ne_bytes().iter().enumerate() {
            view.write_element::<u8>(fx.gc.types(), i, *byte);
        }
    }

    let roots = MockRoots::holding(&[arr]);
    fx.gc.collect(&roots);
    assert_eq!(fx.gc.live_objects(), 1);
}

// === Interior pointers ===

#[test]
fn test_interior_pointer_keeps_owner_alive() {
    let mut fx = RtFixture::new();
    let elem = fx.alloc_node(&NoRoots);
    let arr = fx.gc.allocate_array(fx.obj_array, 8, &NoRoots).unwrap();
    let view = ObjectView::new(arr);
    unsafe { view.write_element::<usize>(fx.gc.types(), 3, elem) };

    // Root only the address *of element 3*, not the array itself.
    let mut roots = MockRoots::new();
    roots.byrefs.push(unsafe { view.element_addr(fx.gc.types(), 3) });
    fx.gc.collect(&roots);

    // The owning array was resolved and, through it, the element.
    assert_eq!(fx.gc.live_objects(), 2);
}

#[test]
fn test_interior_pointer_into_string_keeps_it_alive() {
    let mut fx = RtFixture::new();
    let s = fx
        .gc
        .allocate_string_from("interior pointers", &NoRoots)
        .unwrap();

    let mut roots = MockRoots::new();
    // Somewhere in the middle of the content bytes.
    roots.byrefs.push(s + 16 + 8 + 5);
    fx.gc.collect(&roots);

    assert_eq!(fx.gc.live_objects(), 1);
    unsafe { assert_eq!(ObjectView::new(s).as_str(), "interior pointers") };
}

#[test]
fn test_foreign_byref_address_is_ignored() {
    let mut fx = RtFixture::new();
    fx.alloc_node(&NoRoots);

    let local = 42usize;
    let mut roots = MockRoots::new();
    roots.byrefs.push(&local as *const usize as usize);
    fx.gc.collect(&roots);

    // The byref resolved to no object; the node was unrooted garbage.
    assert_eq!(fx.gc.live_objects(), 0);
}

// === Cycle behavior ===

#[test]
fn test_collect_is_idempotent() {
    let mut fx = RtFixture::new();
    let a = fx.alloc_node(&NoRoots);
    fx.alloc_node(&NoRoots);

    let roots = MockRoots::holding(&[a]);
    fx.gc.collect(&roots);
    let after_first = fx.gc.stats();

    fx.gc.collect(&roots);
    let after_second = fx.gc.stats();

    // The second cycle found the same live set and freed nothing.
    assert_eq!(after_second.live_objects, after_first.live_objects);
    assert_eq!(after_second.objects_freed, after_first.objects_freed);
    assert_eq!(after_second.cycles, after_first.cycles + 1);
}

#[test]
fn test_null_roots_are_ignored() {
    let mut fx = RtFixture::new();
    let a = fx.alloc_node(&NoRoots);

    let mut roots = MockRoots::holding(&[a]);
    roots.refs.push(0);
    roots.byrefs.push(0);
    fx.gc.collect(&roots);

    assert_eq!(fx.gc.live_objects(), 1);
}

#[test]
fn test_threshold_follows_growth_policy() {
    let mut fx = RtFixture::with_small_threshold(1024);
    let mut roots = MockRoots::new();
    for _ in 0..100 {
        let node = fx.alloc_node(&roots);
        roots.refs.push(node);
    }

    let live = fx.gc.live_bytes();
    fx.gc.collect(&roots);

    // Nothing was garbage, so the live set is unchanged and the next
    // threshold doubles it (growth factor 2.0, floor 1024).
    assert_eq!(fx.gc.live_bytes(), live);
    assert_eq!(fx.gc.threshold(), (live * 2).max(1024));
}

#[test]
fn test_allocation_below_threshold_does_not_collect() {
    let mut fx = RtFixture::with_small_threshold(4096);
    // A handful of 32-byte nodes stays well under the threshold.
    for _ in 0..10 {
        fx.alloc_node(&NoRoots);
    }
    assert_eq!(fx.gc.cycle_count(), 0);
    assert_eq!(fx.gc.live_objects(), 10);
}

#[test]
fn test_threshold_never_drops_below_floor() {
    let mut fx = RtFixture::with_small_threshold(4096);
    fx.alloc_node(&NoRoots);
    fx.gc.collect(&NoRoots);
    // Everything died; the threshold sits at the configured floor.
    assert_eq!(fx.gc.threshold(), 4096);
}

// === Finalization ===

fn counting_finalizer(counter: &Arc<AtomicUsize>) -> rgc::types::FinalizerFn {
    let counter = Arc::clone(counter);
    Box::new(move |_addr| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_finalizer_runs_exactly_once() {
    let mut fx = RtFixture::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let counted = fx.counted;
    fx.gc
        .types_mut()
        .set_finalizer(counted, counting_finalizer(&counter));

    fx.gc.allocate_object(counted, &NoRoots).unwrap();
    fx.gc.collect(&NoRoots);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // Nothing left to finalize on later cycles.
    fx.gc.collect(&NoRoots);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(fx.gc.stats().finalizers_run, 1);
}

#[test]
fn test_finalizer_does_not_run_while_rooted() {
    let mut fx = RtFixture::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let counted = fx.counted;
    fx.gc
        .types_mut()
        .set_finalizer(counted, counting_finalizer(&counter));

    let obj = fx.gc.allocate_object(counted, &NoRoots).unwrap();
    let roots = MockRoots::holding(&[obj]);
    fx.gc.collect(&roots);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(fx.gc.live_objects(), 1);
}

#[test]
fn test_suppressed_finalizer_is_skipped() {
    let mut fx = RtFixture::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let counted = fx.counted;
    fx.gc
        .types_mut()
        .set_finalizer(counted, counting_finalizer(&counter));

    let obj = fx.gc.allocate_object(counted, &NoRoots).unwrap();
    fx.gc.suppress_finalize(obj);
    fx.gc.collect(&NoRoots);

    assert_eq!(fx.gc.live_objects(), 0);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn test_reregistered_finalizer_runs_again() {
    let mut fx = RtFixture::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let counted = fx.counted;
    fx.gc
        .types_mut()
        .set_finalizer(counted, counting_finalizer(&counter));

    let obj = fx.gc.allocate_object(counted, &NoRoots).unwrap();
    fx.gc.suppress_finalize(obj);
    fx.gc.reregister_finalize(obj);
    fx.gc.collect(&NoRoots);

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_universal_base_instances_are_never_finalized() {
    let mut fx = RtFixture::new();
    let counter = Arc::new(AtomicUsize::new(0));
    fx.gc
        .types_mut()
        .set_finalizer(rgc::TypeHandle::OBJECT, counting_finalizer(&counter));

    fx.gc
        .allocate_object(rgc::TypeHandle::OBJECT, &NoRoots)
        .unwrap();
    fx.gc.collect(&NoRoots);

    assert_eq!(fx.gc.live_objects(), 0);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn test_finalizers_run_at_shutdown() {
    let mut fx = RtFixture::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let counted = fx.counted;
    fx.gc
        .types_mut()
        .set_finalizer(counted, counting_finalizer(&counter));

    for _ in 0..5 {
        fx.gc.allocate_object(counted, &NoRoots).unwrap();
    }
    fx.gc.shutdown();
    assert_eq!(counter.load(Ordering::SeqCst), 5);
}

// === Event stream ===

struct CaptureSink(Rc<RefCell<Vec<GcEvent>>>);

impl TraceSink for CaptureSink {
    fn event(&self, event: &GcEvent) {
        self.0.borrow_mut().push(event.clone());
    }
}

#[test]
fn test_explicit_collect_emits_full_cycle() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let mut gc = Collector::with_sink(
        GcConfig::default(),
        Box::new(CaptureSink(Rc::clone(&events))),
    )
    .unwrap();

    gc.allocate_string_from("garbage", &NoRoots).unwrap();
    gc.collect(&NoRoots);

    let events = events.borrow();
    assert!(matches!(events[0], GcEvent::CycleStart { cycle: 1, .. }));
    assert!(matches!(events[1], GcEvent::RootsDone { roots: 0, .. }));
    assert!(matches!(events[2], GcEvent::TraceDone { marked: 0, .. }));
    match &events[3] {
        GcEvent::CycleEnd {
            freed_objects,
            live_objects,
            ..
        } => {
            assert_eq!(*freed_objects, 1);
            assert_eq!(*live_objects, 0);
        }
        other => panic!("expected CycleEnd, got {other:?}"),
    }
}
