//! # RGC - Riven VM Memory and Object Runtime
//!
//! RGC is the memory subsystem of the Riven virtual machine: a raw
//! heap, a scratch allocator for call frames, a described object
//! model, and a precise single-threaded mark-sweep garbage collector.
//!
//! ## Overview
//!
//! The runtime is built from a few tightly scoped pieces:
//!
//! - **Raw heap**: zeroed, 8-byte aligned blocks with a block table
//!   that lets `free` take only an address
//! - **Scratch allocator**: bump allocation with strict LIFO release,
//!   backing method-call buffers
//! - **Object model**: every managed object starts with a 16-byte
//!   header carrying its type handle, mark flag, and live-list link
//! - **Type registry**: the host describes its classes, structs,
//!   arrays, and primitives once; tracing is driven by the
//!   descriptors, never by guessing at bit patterns
//! - **Collector**: precise, non-moving mark-sweep with interior
//!   pointer resolution, finalization, and an adaptive threshold
//!
//! ## Quick Start
//!
//! ```rust
//! use rgc::{Collector, GcConfig, NoRoots};
//!
//! fn main() -> Result<(), rgc::RgcError> {
//!     let mut gc = Collector::new(GcConfig::default())?;
//!
//!     // Describe a class: one reference field.
//!     let node = gc.types_mut().register_class(
//!         "Node",
//!         8,
//!         None,
//!         vec![rgc::types::FieldDesc {
//!             name: "next".into(),
//!             offset: 0,
//!             ty: rgc::types::TypeHandle::OBJECT,
//!         }],
//!     );
//!
//!     let obj = gc.allocate_object(node, &NoRoots)?;
//!     assert_ne!(obj, 0);
//!
//!     // Nothing roots obj, so an explicit collection frees it.
//!     gc.collect(&NoRoots);
//!     assert_eq!(gc.live_objects(), 0);
//!
//!     gc.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Collection Cycle
//!
//! ```text
//! ┌──────┐   threshold / explicit    ┌─────────┐
//! │ Idle │ ────────────────────────► │ Rooting │
//! └──────┘                           └────┬────┘
//!     ▲                                   │ roots gathered
//!     │                              ┌────▼────┐
//!     │                              │ Tracing │
//!     │                              └────┬────┘
//!     │                                   │ graph marked
//!     │         ┌──────────┐              │
//!     └──────── │ Sweeping │ ◄────────────┘
//!               └──────────┘
//! ```
//!
//! The host supplies roots through the [`RootProvider`] trait each
//! time it calls into the runtime; the collector holds no reference
//! back into the interpreter.
//!
//! ## Safety
//!
//! Object addresses are plain `usize` values and the runtime cannot
//! prove the host's claims about them. The contract is:
//!
//! 1. **Report every root**: an object the host holds but does not
//!    report will be swept
//! 2. **Addresses are stable**: the collector never moves objects, so
//!    addresses stay valid while reachable
//! 3. **Single-threaded**: the host does not run while a cycle is in
//!    progress; `Collector` is neither `Send` nor `Sync`

pub mod gc;
pub mod config;
pub mod error;

pub mod allocator;
pub mod memory;
pub mod object;

pub mod call;
pub mod frame;
pub mod marker;
pub mod types;

pub mod stats;
pub mod trace;

pub use allocator::ScratchAllocator;
pub use call::{ArgSpec, CallBuffer};
pub use config::GcConfig;
pub use error::{Result, RgcError};
pub use frame::{IntrinsicFrame, NoRoots, RootProvider, StackFrame};
pub use gc::{Collector, GcReason, GcState};
pub use object::ObjectView;
pub use stats::GcStats;
pub use trace::{GcEvent, LogSink, NullSink, TraceSink};
pub use types::{TypeHandle, TypeKind, TypeRegistry};
