//! Assignability rules
//!
//! Implements `target.isAssignableFrom(source)`: can a value whose type is
//! `source` be stored in a location of type `target` without an explicit
//! conversion. Rules are checked in this order:
//!
//! 1. identical descriptors
//! 2. primitives and `void` only match themselves
//! 3. `Object` accepts every reference type, arrays included
//! 4. class <- class through the superclass chain
//! 5. interface <- class through the interfaces of the whole chain
//! 6. interface <- interface through transitive extension
//! 7. class <- interface never (the `Object` case is rule 3)
//! 8. array <- array: reference elements are covariant, primitive
//!    elements must be identical
//! 9. anything else is not assignable
//!
//! Interface checks are existential over the closure, so diamonds cannot
//! give conflicting answers.

use crate::error::{TypeGraphError, TypeGraphResult};
use crate::graph::TypeGraph;
use crate::ty::{TypeDescriptor, TypeId};
use rustc_hash::FxHashSet;

/// Assignability queries over one [`TypeGraph`]
#[derive(Debug, Clone, Copy)]
pub struct AssignabilityEngine<'g> {
    graph: &'g TypeGraph,
}

impl<'g> AssignabilityEngine<'g> {
    /// Create an engine bound to a graph
    pub fn new(graph: &'g TypeGraph) -> Self {
        AssignabilityEngine { graph }
    }

    /// `target.isAssignableFrom(source)` with a possibly absent source
    ///
    /// # Errors
    ///
    /// Returns [`TypeGraphError::NullArgument`] when `source` is `None`.
    pub fn check_assignable_from(&self, target: TypeId, source: Option<TypeId>) -> TypeGraphResult<bool> {
        match source {
            Some(source) => Ok(self.is_assignable_from(target, source)),
            None => Err(TypeGraphError::NullArgument { what: "source type" }),
        }
    }

    /// `target.isAssignableFrom(source)`
    ///
    /// Total over ids of this graph; ids from elsewhere are never assignable
    /// except to themselves.
    pub fn is_assignable_from(&self, target: TypeId, source: TypeId) -> bool {
        if target == source {
            return true;
        }

        let (target_ty, source_ty) = match (self.graph.get(target), self.graph.get(source)) {
            (Some(t), Some(s)) => (t, s),
            _ => return false,
        };

        if !target_ty.is_reference() || !source_ty.is_reference() {
            return false;
        }

        match (target_ty, source_ty) {
            (TypeDescriptor::Object, _) => true,

            (TypeDescriptor::Class(_), TypeDescriptor::Class(_)) => {
                self.graph.is_subclass_of(source, target)
            }

            (TypeDescriptor::Interface(_), TypeDescriptor::Class(_)) => {
                self.class_implements(source, target)
            }

            (TypeDescriptor::Interface(_), TypeDescriptor::Interface(_)) => {
                self.interface_extends(source, target)
            }

            (TypeDescriptor::Array(t), TypeDescriptor::Array(s)) => {
                let element_primitive = |id: TypeId| {
                    self.graph.get(id).map_or(false, TypeDescriptor::is_primitive)
                };
                if element_primitive(t.element) || element_primitive(s.element) {
                    t.element == s.element
                } else {
                    self.is_assignable_from(t.element, s.element)
                }
            }

            // Class <- interface, class/interface <- array, array <- non-array,
            // anything <- Object when the target is not Object itself
            _ => false,
        }
    }

    /// Check if `class` (or any superclass) implements `interface`, directly
    /// or through extended interfaces
    pub fn class_implements(&self, class: TypeId, interface: TypeId) -> bool {
        self.graph.superclass_chain(class).any(|c| {
            self.graph
                .get(c)
                .map_or(false, |desc| {
                    desc.direct_interfaces()
                        .iter()
                        .any(|&i| self.interface_extends(i, interface))
                })
        })
    }

    /// Check if `sub` is `sup` or transitively extends it
    pub fn interface_extends(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut seen = FxHashSet::default();
        let mut pending = vec![sub];
        while let Some(current) = pending.pop() {
            if current == sup {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(desc) = self.graph.get(current) {
                pending.extend(desc.direct_interfaces().iter().copied());
            }
        }
        false
    }
}
