//! Type Registry Module - Managed Type Descriptors
//!
//! The runtime never sees source-level types; the host interpreter
//! registers every managed type here and refers to it afterwards by a
//! small integer handle stored in object headers. The registry is the
//! single authority for layout questions: field offsets, value widths,
//! element types, inheritance chains, and finalizers all resolve
//! through it.
//!
//! Two types are pre-registered at construction:
//! - handle 0: `object`, the universal base class
//! - handle 1: `string`
//!
//! The registry is append-only. Handles are never reused, so a handle
//! captured in an object header stays valid for the life of the
//! runtime.

use crate::object::SLOT_SIZE;

/// Handle identifying a registered type
///
/// Stored directly in object headers; resolves back to a
/// [`TypeDesc`] through the [`TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TypeHandle(pub u32);

impl TypeHandle {
    /// Handle of the universal base class
    pub const OBJECT: TypeHandle = TypeHandle(0);
    /// Handle of the built-in string type
    pub const STRING: TypeHandle = TypeHandle(1);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Built-in primitive value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Char,
}

impl PrimitiveKind {
    /// In-memory width of the primitive, in bytes
    pub fn byte_size(self) -> usize {
        match self {
            PrimitiveKind::Bool | PrimitiveKind::I8 | PrimitiveKind::U8 => 1,
            PrimitiveKind::I16 | PrimitiveKind::U16 => 2,
            PrimitiveKind::I32
            | PrimitiveKind::U32
            | PrimitiveKind::F32
            | PrimitiveKind::Char => 4,
            PrimitiveKind::I64 | PrimitiveKind::U64 | PrimitiveKind::F64 => 8,
        }
    }
}

/// Shape of a registered type
///
/// This is the closed set the tracer dispatches on; adding a variant
/// means teaching the tracer about it, and the compiler enforces that
/// through exhaustive matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// No value; legal only as a return type
    Void,
    /// Fixed-width scalar, never traced
    Primitive(PrimitiveKind),
    /// Inline value aggregate; fields live wherever the struct lives
    Struct,
    /// Heap-allocated class instance, referenced by address
    Object,
    /// Heap-allocated array, referenced by address
    Array,
    /// Heap-allocated string, referenced by address
    String,
}

impl TypeKind {
    /// Whether values of this kind are heap references
    #[inline]
    pub fn is_reference(self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::Array | TypeKind::String)
    }
}

/// One field of a class or struct
#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub name: String,
    /// Byte offset within the full instance payload
    ///
    /// Offsets of inherited fields are already baked in, so a derived
    /// class's own fields start past its base's size.
    pub offset: usize,
    pub ty: TypeHandle,
}

/// Finalizer callback, invoked with the object address during sweep
pub type FinalizerFn = Box<dyn Fn(usize) + Send + Sync>;

/// Descriptor of one registered type
pub struct TypeDesc {
    pub name: String,
    pub kind: TypeKind,
    /// Payload size in bytes
    ///
    /// For classes and structs this is the full instance size
    /// including inherited fields. Zero for arrays and strings, whose
    /// size depends on the instance.
    pub size: usize,
    /// Base class, if any (classes only, excluding the universal base)
    pub base: Option<TypeHandle>,
    /// Element type (arrays only)
    pub element: Option<TypeHandle>,
    /// Fields declared by this type itself, not inherited ones
    pub fields: Vec<FieldDesc>,
    /// Finalizer to run when an instance is swept
    pub finalizer: Option<FinalizerFn>,
}

impl std::fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDesc")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("base", &self.base)
            .field("element", &self.element)
            .field("fields", &self.fields)
            .field("finalizer", &self.finalizer.is_some())
            .finish()
    }
}

/// Append-only registry of managed types
///
/// # Examples
///
/// ```rust
/// use rgc::types::{TypeHandle, TypeKind, TypeRegistry, FieldDesc};
///
/// let mut types = TypeRegistry::new();
/// let node = types.register_class(
///     "Node",
///     16,
///     None,
///     vec![
///         FieldDesc { name: "next".into(), offset: 0, ty: TypeHandle::OBJECT },
///         FieldDesc { name: "value".into(), offset: 8, ty: TypeHandle::OBJECT },
///     ],
/// );
/// assert_eq!(types.kind(node), TypeKind::Object);
/// ```
#[derive(Debug, Default)]
pub struct TypeRegistry {
    descs: Vec<TypeDesc>,
}

impl TypeRegistry {
    /// Create a registry with the built-in `object` and `string` types
    pub fn new() -> Self {
        let mut registry = TypeRegistry { descs: Vec::new() };

        let object = registry.register(TypeDesc {
            name: "object".to_string(),
            kind: TypeKind::Object,
            size: 0,
            base: None,
            element: None,
            fields: Vec::new(),
            finalizer: None,
        });
        debug_assert_eq!(object, TypeHandle::OBJECT);

        let string = registry.register(TypeDesc {
            name: "string".to_string(),
            kind: TypeKind::String,
            size: 0,
            base: None,
            element: None,
            fields: Vec::new(),
            finalizer: None,
        });
        debug_assert_eq!(string, TypeHandle::STRING);

        registry
    }

    /// Register an arbitrary descriptor, returning its handle
    pub fn register(&mut self, desc: TypeDesc) -> TypeHandle {
        let handle = TypeHandle(self.descs.len() as u32);
        self.descs.push(desc);
        handle
    }

    /// Register a class type
    ///
    /// `size` is the full instance payload including inherited fields;
    /// `fields` lists only the fields this class declares itself. A
    /// class with no explicit base implicitly derives from `object`.
    pub fn register_class(
        &mut self,
        name: &str,
        size: usize,
        base: Option<TypeHandle>,
        fields: Vec<FieldDesc>,
    ) -> TypeHandle {
        self.register(TypeDesc {
            name: name.to_string(),
            kind: TypeKind::Object,
            size,
            base: Some(base.unwrap_or(TypeHandle::OBJECT)),
            element: None,
            fields,
            finalizer: None,
        })
    }

    /// Register an inline struct type
    pub fn register_struct(
        &mut self,
        name: &str,
        size: usize,
        fields: Vec<FieldDesc>,
    ) -> TypeHandle {
        self.register(TypeDesc {
            name: name.to_string(),
            kind: TypeKind::Struct,
            size,
            base: None,
            element: None,
            fields,
            finalizer: None,
        })
    }

    /// Register a primitive type
    pub fn register_primitive(&mut self, name: &str, kind: PrimitiveKind) -> TypeHandle {
        self.register(TypeDesc {
            name: name.to_string(),
            kind: TypeKind::Primitive(kind),
            size: kind.byte_size(),
            base: None,
            element: None,
            fields: Vec::new(),
            finalizer: None,
        })
    }

    /// Register the void pseudo-type
    pub fn register_void(&mut self, name: &str) -> TypeHandle {
        self.register(TypeDesc {
            name: name.to_string(),
            kind: TypeKind::Void,
            size: 0,
            base: None,
            element: None,
            fields: Vec::new(),
            finalizer: None,
        })
    }

    /// Register an array type over `element`
    pub fn register_array(&mut self, name: &str, element: TypeHandle) -> TypeHandle {
        self.register(TypeDesc {
            name: name.to_string(),
            kind: TypeKind::Array,
            size: 0,
            base: None,
            element: Some(element),
            fields: Vec::new(),
            finalizer: None,
        })
    }

    /// Attach a finalizer to an already registered type
    pub fn set_finalizer(&mut self, handle: TypeHandle, finalizer: FinalizerFn) {
        self.descs[handle.index()].finalizer = Some(finalizer);
    }

    // === Queries ===

    /// Resolve a handle to its descriptor
    pub fn get(&self, handle: TypeHandle) -> &TypeDesc {
        &self.descs[handle.index()]
    }

    pub fn kind(&self, handle: TypeHandle) -> TypeKind {
        self.descs[handle.index()].kind
    }

    pub fn name(&self, handle: TypeHandle) -> &str {
        &self.descs[handle.index()].name
    }

    pub fn is_struct(&self, handle: TypeHandle) -> bool {
        self.kind(handle) == TypeKind::Struct
    }

    pub fn is_reference(&self, handle: TypeHandle) -> bool {
        self.kind(handle).is_reference()
    }

    pub fn element_of(&self, handle: TypeHandle) -> Option<TypeHandle> {
        self.descs[handle.index()].element
    }

    pub fn base_of(&self, handle: TypeHandle) -> Option<TypeHandle> {
        self.descs[handle.index()].base
    }

    pub fn fields_of(&self, handle: TypeHandle) -> &[FieldDesc] {
        &self.descs[handle.index()].fields
    }

    pub fn has_finalizer(&self, handle: TypeHandle) -> bool {
        self.descs[handle.index()].finalizer.is_some()
    }

    pub fn finalizer(&self, handle: TypeHandle) -> Option<&FinalizerFn> {
        self.descs[handle.index()].finalizer.as_ref()
    }

    /// Width of a value of this type when stored inline
    ///
    /// References occupy one slot regardless of the referenced type;
    /// structs occupy their declared size; primitives their natural
    /// width.
    pub fn value_size(&self, handle: TypeHandle) -> usize {
        let desc = &self.descs[handle.index()];
        match desc.kind {
            TypeKind::Void => 0,
            TypeKind::Primitive(kind) => kind.byte_size(),
            TypeKind::Struct => desc.size,
            TypeKind::Object | TypeKind::Array | TypeKind::String => SLOT_SIZE,
        }
    }

    /// Whether values of this type need more than one slot inline
    pub fn is_large_value(&self, handle: TypeHandle) -> bool {
        self.is_struct(handle) && self.descs[handle.index()].size > SLOT_SIZE
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }
}
