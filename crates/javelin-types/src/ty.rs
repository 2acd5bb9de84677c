//! Core type descriptors for the Javelin type graph

use std::fmt;

/// Stable index of a descriptor inside a [`TypeGraph`](crate::TypeGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Position of the descriptor in the graph arena
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Fully qualified name of the root class
pub const OBJECT_CLASS: &str = "java.lang.Object";

/// Name of the `void` pseudo-type
pub const VOID_TYPE: &str = "void";

/// Primitive types
///
/// The discriminant doubles as the primitive's fixed slot in every
/// [`TypeGraph`](crate::TypeGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// `boolean`
    Boolean = 0,
    /// `byte`, signed 8-bit
    Byte = 1,
    /// `short`, signed 16-bit
    Short = 2,
    /// `char`, unsigned 16-bit
    Char = 3,
    /// `int`, signed 32-bit
    Int = 4,
    /// `long`, signed 64-bit
    Long = 5,
    /// `float`, IEEE 754 binary32
    Float = 6,
    /// `double`, IEEE 754 binary64
    Double = 7,
}

impl PrimitiveType {
    /// Every primitive, in slot order
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Char,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    /// Source-level keyword
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Field descriptor character
    pub const fn descriptor(self) -> char {
        match self {
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Short => 'S',
            PrimitiveType::Char => 'C',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
        }
    }

    /// Storage width in bits
    pub const fn bit_width(self) -> u32 {
        match self {
            PrimitiveType::Boolean => 1,
            PrimitiveType::Byte => 8,
            PrimitiveType::Short | PrimitiveType::Char => 16,
            PrimitiveType::Int | PrimitiveType::Float => 32,
            PrimitiveType::Long | PrimitiveType::Double => 64,
        }
    }

    /// Byte, short, char, int or long
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveType::Byte
                | PrimitiveType::Short
                | PrimitiveType::Char
                | PrimitiveType::Int
                | PrimitiveType::Long
        )
    }

    /// Float or double
    pub const fn is_floating(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Resolve a source-level keyword
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A (non-root) class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassType {
    /// Fully qualified name
    pub name: String,
    /// Direct superclass; always present, `java.lang.Object` at the top
    pub super_class: TypeId,
    /// Directly implemented interfaces, in declaration order
    pub interfaces: Vec<TypeId>,
    /// Declared `abstract`
    pub is_abstract: bool,
}

/// An interface
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceType {
    /// Fully qualified name
    pub name: String,
    /// Directly extended interfaces, in declaration order
    pub extends: Vec<TypeId>,
}

/// Array of some element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayType {
    /// Component type
    pub element: TypeId,
}

/// Discriminant of a [`TypeDescriptor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Primitive value type
    Primitive,
    /// The `void` pseudo-type
    Void,
    /// `java.lang.Object`
    Object,
    /// Any other class
    Class,
    /// Interface
    Interface,
    /// Array
    Array,
}

/// One node of the type graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// Primitive value type
    Primitive(PrimitiveType),
    /// The `void` pseudo-type
    Void,
    /// The root class
    Object,
    /// Class other than the root
    Class(ClassType),
    /// Interface
    Interface(InterfaceType),
    /// Array of an element type
    Array(ArrayType),
}

impl TypeDescriptor {
    /// Kind without payload
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDescriptor::Primitive(_) => TypeKind::Primitive,
            TypeDescriptor::Void => TypeKind::Void,
            TypeDescriptor::Object => TypeKind::Object,
            TypeDescriptor::Class(_) => TypeKind::Class,
            TypeDescriptor::Interface(_) => TypeKind::Interface,
            TypeDescriptor::Array(_) => TypeKind::Array,
        }
    }

    /// Check if this is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDescriptor::Primitive(_))
    }

    /// Check if this is `void`
    pub fn is_void(&self) -> bool {
        matches!(self, TypeDescriptor::Void)
    }

    /// Check if values of this type are references (class, interface, array)
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Object
                | TypeDescriptor::Class(_)
                | TypeDescriptor::Interface(_)
                | TypeDescriptor::Array(_)
        )
    }

    /// Check if this is a class, the root included
    pub fn is_class(&self) -> bool {
        matches!(self, TypeDescriptor::Object | TypeDescriptor::Class(_))
    }

    /// Check if this is an interface
    pub fn is_interface(&self) -> bool {
        matches!(self, TypeDescriptor::Interface(_))
    }

    /// Check if this is an array
    pub fn is_array(&self) -> bool {
        matches!(self, TypeDescriptor::Array(_))
    }

    /// Get the primitive type if this is a primitive
    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            TypeDescriptor::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Get the class payload if this is a non-root class
    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            TypeDescriptor::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Get the interface payload if this is an interface
    pub fn as_interface(&self) -> Option<&InterfaceType> {
        match self {
            TypeDescriptor::Interface(i) => Some(i),
            _ => None,
        }
    }

    /// Element type if this is an array
    pub fn element_type(&self) -> Option<TypeId> {
        match self {
            TypeDescriptor::Array(a) => Some(a.element),
            _ => None,
        }
    }

    /// Direct superclass (classes only)
    pub fn super_class(&self) -> Option<TypeId> {
        match self {
            TypeDescriptor::Class(c) => Some(c.super_class),
            _ => None,
        }
    }

    /// Directly implemented (class) or extended (interface) interfaces
    pub fn direct_interfaces(&self) -> &[TypeId] {
        match self {
            TypeDescriptor::Class(c) => &c.interfaces,
            TypeDescriptor::Interface(i) => &i.extends,
            _ => &[],
        }
    }

    /// Declared `abstract`; interfaces always are
    pub fn is_abstract(&self) -> bool {
        match self {
            TypeDescriptor::Class(c) => c.is_abstract,
            TypeDescriptor::Interface(_) => true,
            _ => false,
        }
    }
}
