//! Javelin Type Graph
//!
//! Type descriptors, the shared read-only type graph and the assignability
//! rules the rest of the kernel (exception matching, casts, array stores)
//! is built on.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod ty;
pub mod graph;
pub mod builder;
pub mod error;
pub mod assignability;
pub mod manifest;
pub mod java_lang;

pub use ty::{ArrayType, ClassType, InterfaceType, PrimitiveType, TypeDescriptor, TypeId, TypeKind};
pub use ty::{OBJECT_CLASS, VOID_TYPE};
pub use graph::{SuperclassChain, TypeGraph};
pub use builder::TypeGraphBuilder;
pub use error::{TypeGraphError, TypeGraphResult};
pub use assignability::AssignabilityEngine;
pub use manifest::{ClassDecl, InterfaceDecl, TypeGraphManifest};
