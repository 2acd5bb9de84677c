//! Virtual method dispatch
//!
//! Resolution walks the receiver's dynamic class chain from the most
//! derived class up to `java.lang.Object` and takes the first concrete
//! implementation. Arrays and interface-typed receivers dispatch as
//! `Object`. When no class in the chain declares the method, the most
//! specific concrete default among the receiver's interfaces is used: a
//! default overridden by a sub-interface is skipped, and ties between
//! unrelated interfaces go to the first in breadth-first order.
//!
//! Results can be memoized per (type, signature) in a cache shared by
//! every call stack using the table.

use crate::fault::Fault;
use crate::options::KernelOptions;
use crate::value::Value;
use crate::{KernelError, KernelResult};
use javelin_types::{TypeDescriptor, TypeGraph, TypeId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Method name plus JVM descriptor, e.g. `hashCode()I`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    name: String,
    descriptor: String,
}

impl MethodSignature {
    /// Create a signature
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        MethodSignature {
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter and return descriptor
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.descriptor)
    }
}

/// Opaque callable entry handed back to the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodEntry(pub u32);

/// Declared body of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodBody {
    /// Implemented
    Concrete(MethodEntry),
    /// Declared without an implementation
    Abstract,
}

/// Result of a successful resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedMethod {
    /// Type that declares the selected implementation
    pub owner: TypeId,
    /// Entry to call
    pub entry: MethodEntry,
}

type MethodMap = FxHashMap<MethodSignature, MethodBody>;

/// Collects method declarations for a [`DispatchTable`]
#[derive(Debug)]
pub struct DispatchTableBuilder {
    graph: Arc<TypeGraph>,
    methods: FxHashMap<TypeId, MethodMap>,
    memoize: bool,
}

impl DispatchTableBuilder {
    /// Start a table over `graph`
    pub fn new(graph: Arc<TypeGraph>) -> Self {
        DispatchTableBuilder {
            graph,
            methods: FxHashMap::default(),
            memoize: true,
        }
    }

    /// Declare `signature` on `owner`; a later declaration replaces an
    /// earlier one
    pub fn declare(&mut self, owner: TypeId, signature: MethodSignature, body: MethodBody) -> &mut Self {
        self.methods.entry(owner).or_default().insert(signature, body);
        self
    }

    /// Declare an implemented method
    pub fn concrete(&mut self, owner: TypeId, name: &str, descriptor: &str, entry: MethodEntry) -> &mut Self {
        self.declare(owner, MethodSignature::new(name, descriptor), MethodBody::Concrete(entry))
    }

    /// Declare an abstract method
    pub fn abstract_method(&mut self, owner: TypeId, name: &str, descriptor: &str) -> &mut Self {
        self.declare(owner, MethodSignature::new(name, descriptor), MethodBody::Abstract)
    }

    /// Take the memoization switch from kernel options
    pub fn options(&mut self, options: &KernelOptions) -> &mut Self {
        self.memoize = options.memoize_dispatch;
        self
    }

    /// Validate owners and freeze the table
    ///
    /// # Errors
    ///
    /// [`KernelError::InvalidState`] when a method is declared on a type
    /// that is neither a class nor an interface.
    pub fn build(&self) -> KernelResult<DispatchTable> {
        for owner in self.methods.keys() {
            let ok = self
                .graph
                .get(*owner)
                .is_some_and(|d| d.is_class() || d.is_interface());
            if !ok {
                return Err(KernelError::invalid_state(format!(
                    "methods declared on {}, which is not a class or interface",
                    self.graph.name(*owner)
                )));
            }
        }
        let count: usize = self.methods.values().map(FxHashMap::len).sum();
        debug!(types = self.methods.len(), methods = count, "dispatch table built");
        Ok(DispatchTable {
            graph: Arc::clone(&self.graph),
            methods: self.methods.clone(),
            cache: RwLock::new(FxHashMap::default()),
            memoize: self.memoize,
        })
    }
}

/// Per-type method tables with memoized virtual resolution
///
/// `Send + Sync`; share it behind an `Arc` across call stacks.
#[derive(Debug)]
pub struct DispatchTable {
    graph: Arc<TypeGraph>,
    methods: FxHashMap<TypeId, MethodMap>,
    cache: RwLock<FxHashMap<TypeId, FxHashMap<MethodSignature, ResolvedMethod>>>,
    memoize: bool,
}

impl DispatchTable {
    /// Shared type graph
    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Body `owner` itself declares for `signature`
    pub fn declared(&self, owner: TypeId, signature: &MethodSignature) -> Option<MethodBody> {
        self.methods.get(&owner).and_then(|m| m.get(signature)).copied()
    }

    /// Number of memoized resolutions
    pub fn cached(&self) -> usize {
        self.cache.read().values().map(FxHashMap::len).sum()
    }

    /// `invokevirtual` / `invokeinterface` on a receiver value
    ///
    /// # Errors
    ///
    /// - [`Fault::NullReference`] for a null receiver
    /// - [`Fault::AbstractMethod`] when no concrete implementation exists
    pub fn resolve(&self, receiver: Value, signature: &MethodSignature) -> KernelResult<ResolvedMethod> {
        match receiver {
            Value::Reference(Some(r)) => self.resolve_type(r.class(), signature),
            Value::Reference(None) => Err(Fault::null_reference(format!(
                "Cannot invoke \"{}\" because the receiver is null",
                signature
            ))
            .into()),
            other => Err(KernelError::invalid_state(format!(
                "cannot invoke {} on a {} value",
                signature,
                other.type_name()
            ))),
        }
    }

    /// Resolve against a dynamic receiver type
    pub fn resolve_type(&self, dynamic: TypeId, signature: &MethodSignature) -> KernelResult<ResolvedMethod> {
        if self.memoize {
            let hit = self
                .cache
                .read()
                .get(&dynamic)
                .and_then(|m| m.get(signature))
                .copied();
            if let Some(resolved) = hit {
                trace!(%signature, ty = %dynamic, "dispatch cache hit");
                return Ok(resolved);
            }
        }

        let start = match self.graph.get(dynamic) {
            Some(TypeDescriptor::Array(_)) | Some(TypeDescriptor::Interface(_)) => self.graph.object(),
            Some(d) if d.is_class() => dynamic,
            _ => {
                return Err(KernelError::invalid_state(format!(
                    "{} cannot receive method calls",
                    self.graph.name(dynamic)
                )))
            }
        };

        let resolved = self.select(start, dynamic, signature)?;
        if self.memoize {
            self.cache
                .write()
                .entry(dynamic)
                .or_default()
                .insert(signature.clone(), resolved);
        }
        Ok(resolved)
    }

    /// `invokespecial`-style lookup starting at `start` (e.g. `super.m()`)
    pub fn resolve_special(&self, start: TypeId, signature: &MethodSignature) -> KernelResult<ResolvedMethod> {
        match self.graph.get(start) {
            Some(d) if d.is_class() => self.select(start, start, signature),
            _ => Err(KernelError::invalid_state(format!(
                "{} is not a class",
                self.graph.name(start)
            ))),
        }
    }

    fn select(
        &self,
        start: TypeId,
        dynamic: TypeId,
        signature: &MethodSignature,
    ) -> KernelResult<ResolvedMethod> {
        for class in self.graph.superclass_chain(start) {
            match self.declared(class, signature) {
                Some(MethodBody::Concrete(entry)) => return Ok(ResolvedMethod { owner: class, entry }),
                Some(MethodBody::Abstract) => return Err(self.abstract_method(dynamic, signature)),
                None => {}
            }
        }
        let defaults: Vec<(TypeId, MethodEntry)> = self
            .graph
            .interface_closure(start)
            .into_iter()
            .filter_map(|iface| match self.declared(iface, signature) {
                Some(MethodBody::Concrete(entry)) => Some((iface, entry)),
                _ => None,
            })
            .collect();
        // a default overridden by a sub-interface's default is not a candidate
        let engine = self.graph.assignability();
        let selected = defaults.iter().find(|(owner, _)| {
            !defaults
                .iter()
                .any(|(other, _)| other != owner && engine.interface_extends(*other, *owner))
        });
        match selected {
            Some(&(owner, entry)) => Ok(ResolvedMethod { owner, entry }),
            None => Err(self.abstract_method(dynamic, signature)),
        }
    }

    fn abstract_method(&self, dynamic: TypeId, signature: &MethodSignature) -> KernelError {
        Fault::AbstractMethod {
            class: self.graph.name(dynamic),
            method: signature.to_string(),
        }
        .into()
    }
}
