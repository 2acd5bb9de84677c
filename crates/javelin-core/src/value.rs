//! Tagged primitive values
//!
//! A [`Value`] is one operand-stack or local-variable slot. The tag fixes the
//! width and signedness every operation on it uses; only an explicit
//! conversion (see [`arith::cast`](crate::arith::cast)) changes it.
//!
//! References carry the object's dynamic type next to an opaque heap
//! handle. The heap itself belongs to the enclosing interpreter.

use javelin_types::{PrimitiveType, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handles at or above this value are minted by the kernel for faults it
/// raises; the interpreter's heap must allocate below it.
pub const SYNTHETIC_HANDLE_BASE: u64 = 1 << 62;

/// Non-null object reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    handle: u64,
    class: TypeId,
}

impl ObjRef {
    /// Reference to a heap object of dynamic type `class`
    #[inline]
    pub const fn new(handle: u64, class: TypeId) -> Self {
        ObjRef { handle, class }
    }

    /// Fresh reference for an object the kernel itself creates
    pub fn synthetic(class: TypeId) -> Self {
        static NEXT_HANDLE: AtomicU64 = AtomicU64::new(SYNTHETIC_HANDLE_BASE);
        ObjRef {
            handle: NEXT_HANDLE.fetch_add(1, Ordering::Relaxed),
            class,
        }
    }

    /// Opaque heap handle
    #[inline]
    pub const fn handle(&self) -> u64 {
        self.handle
    }

    /// Dynamic type of the referenced object
    #[inline]
    pub const fn class(&self) -> TypeId {
        self.class
    }

    /// Check whether the kernel minted this reference
    #[inline]
    pub const fn is_synthetic(&self) -> bool {
        self.handle >= SYNTHETIC_HANDLE_BASE
    }
}

/// A primitive value or a (possibly null) reference
#[derive(Clone, Copy, PartialEq)]
pub enum Value {
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `char`
    Char(u16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// Reference; `None` is null
    Reference(Option<ObjRef>),
}

impl Value {
    /// The null reference
    #[inline]
    pub const fn null() -> Self {
        Value::Reference(None)
    }

    /// Non-null reference
    #[inline]
    pub const fn object(reference: ObjRef) -> Self {
        Value::Reference(Some(reference))
    }

    /// Zero value of a primitive type (`false`, `0`, `'\0'`, `0.0`)
    pub const fn default_for(prim: PrimitiveType) -> Self {
        match prim {
            PrimitiveType::Boolean => Value::Boolean(false),
            PrimitiveType::Byte => Value::Byte(0),
            PrimitiveType::Short => Value::Short(0),
            PrimitiveType::Char => Value::Char(0),
            PrimitiveType::Int => Value::Int(0),
            PrimitiveType::Long => Value::Long(0),
            PrimitiveType::Float => Value::Float(0.0),
            PrimitiveType::Double => Value::Double(0.0),
        }
    }

    /// Primitive type of this value; `None` for references
    pub const fn primitive_type(&self) -> Option<PrimitiveType> {
        match self {
            Value::Boolean(_) => Some(PrimitiveType::Boolean),
            Value::Byte(_) => Some(PrimitiveType::Byte),
            Value::Short(_) => Some(PrimitiveType::Short),
            Value::Char(_) => Some(PrimitiveType::Char),
            Value::Int(_) => Some(PrimitiveType::Int),
            Value::Long(_) => Some(PrimitiveType::Long),
            Value::Float(_) => Some(PrimitiveType::Float),
            Value::Double(_) => Some(PrimitiveType::Double),
            Value::Reference(_) => None,
        }
    }

    /// Check if this value is the null reference
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Reference(None))
    }

    /// Check if this value is a reference (null included)
    #[inline]
    pub const fn is_reference(&self) -> bool {
        matches!(self, Value::Reference(_))
    }

    /// Extract a non-null reference
    #[inline]
    pub const fn as_object(&self) -> Option<ObjRef> {
        match self {
            Value::Reference(r) => *r,
            _ => None,
        }
    }

    /// Extract boolean value
    #[inline]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an `int`
    #[inline]
    pub const fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract a `long`
    #[inline]
    pub const fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Extract a `char`
    #[inline]
    pub const fn as_char(&self) -> Option<u16> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    /// Extract a `float`
    #[inline]
    pub const fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Extract a `double`
    #[inline]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Get type name for diagnostics
    pub const fn type_name(&self) -> &'static str {
        match self.primitive_type() {
            Some(prim) => prim.name(),
            None => "reference",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "boolean({})", b),
            Value::Byte(b) => write!(f, "byte({})", b),
            Value::Short(s) => write!(f, "short({})", s),
            Value::Char(c) => write!(f, "char({:#06x})", c),
            Value::Int(i) => write!(f, "int({})", i),
            Value::Long(l) => write!(f, "long({})", l),
            Value::Float(x) => write!(f, "float({:?})", x),
            Value::Double(x) => write!(f, "double({:?})", x),
            Value::Reference(None) => write!(f, "null"),
            Value::Reference(Some(r)) => write!(f, "ref({:#x}, {})", r.handle, r.class),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_types::TypeGraphBuilder;

    #[test]
    fn test_null() {
        let v = Value::null();
        assert!(v.is_null());
        assert!(v.is_reference());
        assert_eq!(v.as_object(), None);
        assert_eq!(v.primitive_type(), None);
    }

    #[test]
    fn test_tags_are_exact() {
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Short(42).as_int(), None);
        assert_eq!(Value::Char(65).as_char(), Some(65));
        assert_eq!(Value::Long(-1).as_long(), Some(-1));
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
    }

    #[test]
    fn test_defaults() {
        for prim in PrimitiveType::ALL {
            assert_eq!(Value::default_for(prim).primitive_type(), Some(prim));
        }
        assert_eq!(Value::default_for(PrimitiveType::Char), Value::Char(0));
    }

    #[test]
    fn test_synthetic_refs_are_distinct() {
        let graph = TypeGraphBuilder::new().build().unwrap();
        let a = ObjRef::synthetic(graph.object());
        let b = ObjRef::synthetic(graph.object());
        assert_ne!(a, b);
        assert!(a.is_synthetic());
        assert!(!ObjRef::new(7, graph.object()).is_synthetic());
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", Value::Int(-3)), "int(-3)");
        assert_eq!(format!("{:?}", Value::Char(0x41)), "char(0x0041)");
        assert_eq!(format!("{:?}", Value::null()), "null");
    }
}
