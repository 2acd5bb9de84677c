//! Type graph construction
//!
//! Declarations refer to each other by name and may appear in any order.
//! [`TypeGraphBuilder::build`] assigns slots, resolves names and rejects
//! malformed universes (dangling names, cycles, kind mismatches) before any
//! code can run against the graph.

use crate::error::{TypeGraphError, TypeGraphResult};
use crate::graph::TypeGraph;
use crate::java_lang;
use crate::ty::{ArrayType, ClassType, InterfaceType, TypeDescriptor, TypeId};

#[derive(Debug, Clone)]
enum Declaration {
    Class {
        name: String,
        superclass: Option<String>,
        interfaces: Vec<String>,
        is_abstract: bool,
    },
    Interface {
        name: String,
        extends: Vec<String>,
    },
}

impl Declaration {
    fn name(&self) -> &str {
        match self {
            Declaration::Class { name, .. } | Declaration::Interface { name, .. } => name,
        }
    }
}

/// Collects declarations and builds a [`TypeGraph`]
#[derive(Debug, Clone, Default)]
pub struct TypeGraphBuilder {
    decls: Vec<Declaration>,
    arrays: Vec<String>,
}

impl TypeGraphBuilder {
    /// Builder holding only the implicit built-ins (primitives, `void`, `Object`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a concrete class; `None` as superclass means `java.lang.Object`
    pub fn class(&mut self, name: &str, superclass: Option<&str>, interfaces: &[&str]) -> &mut Self {
        self.push_class(name, superclass, interfaces, false)
    }

    /// Declare an abstract class
    pub fn abstract_class(
        &mut self,
        name: &str,
        superclass: Option<&str>,
        interfaces: &[&str],
    ) -> &mut Self {
        self.push_class(name, superclass, interfaces, true)
    }

    /// Declare an interface
    pub fn interface(&mut self, name: &str, extends: &[&str]) -> &mut Self {
        self.decls.push(Declaration::Interface {
            name: name.to_string(),
            extends: extends.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Declare the array type whose element is `element`
    ///
    /// `element` may itself be an array name (`"int[]"`), in which case every
    /// intermediate dimension is declared too.
    pub fn array(&mut self, element: &str) -> &mut Self {
        self.arrays.push(format!("{}[]", element));
        self
    }

    /// Register the `java.lang` classes the kernel raises faults with
    pub fn with_java_lang(&mut self) -> &mut Self {
        java_lang::register(self);
        self
    }

    /// Check whether a name was declared on this builder
    pub fn declares(&self, name: &str) -> bool {
        self.decls.iter().any(|d| d.name() == name)
    }

    fn push_class(
        &mut self,
        name: &str,
        superclass: Option<&str>,
        interfaces: &[&str],
        is_abstract: bool,
    ) -> &mut Self {
        self.decls.push(Declaration::Class {
            name: name.to_string(),
            superclass: superclass.map(str::to_string),
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
            is_abstract,
        });
        self
    }

    /// Resolve all declarations into an immutable graph
    pub fn build(&self) -> TypeGraphResult<TypeGraph> {
        let mut graph = TypeGraph::with_builtins();

        // Reserve a slot per declaration so forward references resolve
        let mut slots = Vec::with_capacity(self.decls.len());
        for decl in &self.decls {
            let name = decl.name();
            if graph.lookup(name).is_some() {
                return Err(TypeGraphError::DuplicateType {
                    name: name.to_string(),
                });
            }
            let provisional = match decl {
                Declaration::Class { is_abstract, .. } => TypeDescriptor::Class(ClassType {
                    name: name.to_string(),
                    super_class: graph.object(),
                    interfaces: Vec::new(),
                    is_abstract: *is_abstract,
                }),
                Declaration::Interface { .. } => TypeDescriptor::Interface(InterfaceType {
                    name: name.to_string(),
                    extends: Vec::new(),
                }),
            };
            slots.push(graph.push(name.to_string(), provisional));
        }

        for array in &self.arrays {
            ensure_array(&mut graph, array)?;
        }

        for (decl, &slot) in self.decls.iter().zip(&slots) {
            let resolved = match decl {
                Declaration::Class {
                    name,
                    superclass,
                    interfaces,
                    is_abstract,
                } => {
                    let super_class = match superclass {
                        Some(sup) => {
                            let id = resolve(&graph, name, sup)?;
                            if !graph.get(id).map_or(false, TypeDescriptor::is_class) {
                                return Err(TypeGraphError::InvalidSuperclass {
                                    class: name.clone(),
                                    superclass: sup.clone(),
                                });
                            }
                            id
                        }
                        None => graph.object(),
                    };
                    TypeDescriptor::Class(ClassType {
                        name: name.clone(),
                        super_class,
                        interfaces: resolve_interfaces(&graph, name, interfaces)?,
                        is_abstract: *is_abstract,
                    })
                }
                Declaration::Interface { name, extends } => {
                    TypeDescriptor::Interface(InterfaceType {
                        name: name.clone(),
                        extends: resolve_interfaces(&graph, name, extends)?,
                    })
                }
            };
            graph.replace(slot, resolved);
        }

        check_class_cycles(&graph, &slots)?;
        check_interface_cycles(&graph, &slots)?;

        tracing::debug!(
            types = graph.len(),
            declared = slots.len(),
            arrays = self.arrays.len(),
            "type graph built"
        );
        Ok(graph)
    }
}

fn resolve(graph: &TypeGraph, from: &str, to: &str) -> TypeGraphResult<TypeId> {
    graph
        .lookup(to)
        .ok_or_else(|| TypeGraphError::DanglingReference {
            from: from.to_string(),
            to: to.to_string(),
        })
}

fn resolve_interfaces(graph: &TypeGraph, from: &str, names: &[String]) -> TypeGraphResult<Vec<TypeId>> {
    names
        .iter()
        .map(|name| {
            let id = resolve(graph, from, name)?;
            if graph.get(id).map_or(false, TypeDescriptor::is_interface) {
                Ok(id)
            } else {
                Err(TypeGraphError::NotAnInterface {
                    from: from.to_string(),
                    to: name.clone(),
                })
            }
        })
        .collect()
}

fn ensure_array(graph: &mut TypeGraph, name: &str) -> TypeGraphResult<TypeId> {
    if let Some(id) = graph.lookup(name) {
        return Ok(id);
    }
    let element_name = name.strip_suffix("[]").unwrap_or(name);
    let element = if element_name.ends_with("[]") {
        ensure_array(graph, element_name)?
    } else {
        resolve(graph, name, element_name)?
    };
    if graph.get(element).map_or(true, TypeDescriptor::is_void) {
        return Err(TypeGraphError::InvalidArrayElement {
            element: element_name.to_string(),
        });
    }
    Ok(graph.push(name.to_string(), TypeDescriptor::Array(ArrayType { element })))
}

fn check_class_cycles(graph: &TypeGraph, slots: &[TypeId]) -> TypeGraphResult<()> {
    for &slot in slots {
        let mut current = slot;
        let mut steps = 0;
        while let Some(sup) = graph.get(current).and_then(TypeDescriptor::super_class) {
            current = sup;
            steps += 1;
            if current == slot || steps > graph.len() {
                return Err(TypeGraphError::CyclicInheritance {
                    name: graph.name(slot),
                });
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

fn check_interface_cycles(graph: &TypeGraph, slots: &[TypeId]) -> TypeGraphResult<()> {
    let mut marks = vec![Mark::Unvisited; graph.len()];
    for &slot in slots {
        if graph.get(slot).map_or(false, TypeDescriptor::is_interface) {
            visit_interface(graph, slot, &mut marks)?;
        }
    }
    Ok(())
}

fn visit_interface(graph: &TypeGraph, id: TypeId, marks: &mut [Mark]) -> TypeGraphResult<()> {
    match marks[id.index()] {
        Mark::Done => return Ok(()),
        Mark::Visiting => {
            return Err(TypeGraphError::CyclicInterface {
                name: graph.name(id),
            })
        }
        Mark::Unvisited => {}
    }
    marks[id.index()] = Mark::Visiting;
    if let Some(desc) = graph.get(id) {
        for &parent in desc.direct_interfaces() {
            visit_interface(graph, parent, marks)?;
        }
    }
    marks[id.index()] = Mark::Done;
    Ok(())
}
