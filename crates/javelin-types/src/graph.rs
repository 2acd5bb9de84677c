//! The type graph arena
//!
//! A [`TypeGraph`] owns every [`TypeDescriptor`] of one type universe.
//! Relations between descriptors are [`TypeId`] indices into the arena,
//! never owning pointers, so diamonds and deep chains need no shared
//! ownership. The graph is immutable once built and is meant to be shared
//! (behind an `Arc`) by every call stack that runs against it.
//!
//! # Fixed slots
//!
//! ```text
//! 0..=7   primitives, in PrimitiveType discriminant order
//! 8       void
//! 9       java.lang.Object
//! 10..    declared classes, interfaces and arrays
//! ```

use crate::assignability::AssignabilityEngine;
use crate::ty::{PrimitiveType, TypeDescriptor, TypeId, OBJECT_CLASS, VOID_TYPE};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

pub(crate) const VOID_SLOT: u32 = 8;
pub(crate) const OBJECT_SLOT: u32 = 9;
pub(crate) const FIRST_DECLARED_SLOT: u32 = 10;

/// Read-only graph of type descriptors
#[derive(Debug, Clone)]
pub struct TypeGraph {
    types: Vec<TypeDescriptor>,
    names: FxHashMap<String, TypeId>,
    arrays: FxHashMap<TypeId, TypeId>,
}

impl TypeGraph {
    /// Graph holding only the built-in slots
    pub(crate) fn with_builtins() -> Self {
        let mut graph = TypeGraph {
            types: Vec::with_capacity(64),
            names: FxHashMap::default(),
            arrays: FxHashMap::default(),
        };
        for prim in PrimitiveType::ALL {
            graph.push(prim.name().to_string(), TypeDescriptor::Primitive(prim));
        }
        graph.push(VOID_TYPE.to_string(), TypeDescriptor::Void);
        graph.push(OBJECT_CLASS.to_string(), TypeDescriptor::Object);
        graph
    }

    pub(crate) fn push(&mut self, name: String, descriptor: TypeDescriptor) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        if let TypeDescriptor::Array(array) = &descriptor {
            self.arrays.insert(array.element, id);
        }
        self.types.push(descriptor);
        self.names.insert(name, id);
        id
    }

    pub(crate) fn replace(&mut self, id: TypeId, descriptor: TypeDescriptor) {
        self.types[id.index()] = descriptor;
    }

    /// Number of descriptors, built-ins included
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// A graph always holds its built-ins
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Descriptor for an id, if the id belongs to this graph
    pub fn get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.types.get(id.index())
    }

    /// Iterate over all descriptors with their ids
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDescriptor)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, d)| (TypeId(i as u32), d))
    }

    /// Look up a type by name (`"int"`, `"java.lang.String"`, `"java.lang.String[]"`)
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    /// Slot of a primitive type
    #[inline]
    pub fn primitive(&self, prim: PrimitiveType) -> TypeId {
        TypeId(prim as u32)
    }

    /// Slot of `void`
    #[inline]
    pub fn void(&self) -> TypeId {
        TypeId(VOID_SLOT)
    }

    /// Slot of `java.lang.Object`
    #[inline]
    pub fn object(&self) -> TypeId {
        TypeId(OBJECT_SLOT)
    }

    /// Array type with the given element, if it was declared
    pub fn array_of(&self, element: TypeId) -> Option<TypeId> {
        self.arrays.get(&element).copied()
    }

    /// Human-readable name (`"int[][]"` for arrays)
    pub fn name(&self, id: TypeId) -> String {
        match self.get(id) {
            Some(TypeDescriptor::Primitive(p)) => p.name().to_string(),
            Some(TypeDescriptor::Void) => VOID_TYPE.to_string(),
            Some(TypeDescriptor::Object) => OBJECT_CLASS.to_string(),
            Some(TypeDescriptor::Class(c)) => c.name.clone(),
            Some(TypeDescriptor::Interface(i)) => i.name.clone(),
            Some(TypeDescriptor::Array(a)) => format!("{}[]", self.name(a.element)),
            None => format!("<unknown {}>", id),
        }
    }

    /// JVM field descriptor (`"I"`, `"Ljava/lang/String;"`, `"[[J"`)
    pub fn jvm_descriptor(&self, id: TypeId) -> String {
        match self.get(id) {
            Some(TypeDescriptor::Primitive(p)) => p.descriptor().to_string(),
            Some(TypeDescriptor::Void) => "V".to_string(),
            Some(TypeDescriptor::Array(a)) => format!("[{}", self.jvm_descriptor(a.element)),
            Some(_) => format!("L{};", self.name(id).replace('.', "/")),
            None => String::new(),
        }
    }

    /// Walk a class chain from `start` (inclusive) up to `java.lang.Object`
    ///
    /// Yields nothing for non-class descriptors.
    pub fn superclass_chain(&self, start: TypeId) -> SuperclassChain<'_> {
        let next = match self.get(start) {
            Some(d) if d.is_class() => Some(start),
            _ => None,
        };
        SuperclassChain { graph: self, next }
    }

    /// Check whether `sub`'s class chain contains `sup`
    pub fn is_subclass_of(&self, sub: TypeId, sup: TypeId) -> bool {
        self.superclass_chain(sub).any(|id| id == sup)
    }

    /// Every interface reachable from `id`, breadth first, without duplicates
    ///
    /// For a class this covers the interfaces of the whole superclass chain;
    /// for an interface it starts with the interface itself.
    pub fn interface_closure(&self, id: TypeId) -> Vec<TypeId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        match self.get(id) {
            Some(TypeDescriptor::Interface(_)) => queue.push_back(id),
            Some(d) if d.is_class() => {
                for class in self.superclass_chain(id) {
                    if let Some(desc) = self.get(class) {
                        queue.extend(desc.direct_interfaces().iter().copied());
                    }
                }
            }
            _ => {}
        }

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            order.push(next);
            if let Some(desc) = self.get(next) {
                queue.extend(desc.direct_interfaces().iter().copied());
            }
        }

        order
    }

    /// Innermost non-array element type and the nesting depth
    pub fn array_base(&self, id: TypeId) -> (TypeId, usize) {
        let mut current = id;
        let mut dims = 0;
        while let Some(element) = self.get(current).and_then(TypeDescriptor::element_type) {
            current = element;
            dims += 1;
        }
        (current, dims)
    }

    /// Assignability queries against this graph
    pub fn assignability(&self) -> AssignabilityEngine<'_> {
        AssignabilityEngine::new(self)
    }

    /// Shorthand for `self.assignability().is_assignable_from(target, source)`
    pub fn is_assignable_from(&self, target: TypeId, source: TypeId) -> bool {
        self.assignability().is_assignable_from(target, source)
    }
}

/// Iterator over a class and its superclasses
pub struct SuperclassChain<'g> {
    graph: &'g TypeGraph,
    next: Option<TypeId>,
}

impl Iterator for SuperclassChain<'_> {
    type Item = TypeId;

    fn next(&mut self) -> Option<TypeId> {
        let current = self.next?;
        self.next = self.graph.get(current).and_then(TypeDescriptor::super_class);
        Some(current)
    }
}
