//! Type graph errors

use thiserror::Error;

/// Errors raised while building or querying a type graph
///
/// Everything except [`TypeGraphError::NullArgument`] is a construction-time
/// failure: a graph that was built successfully never produces them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeGraphError {
    /// Two declarations share a name
    #[error("Duplicate type: {name}")]
    DuplicateType {
        /// Name declared twice
        name: String,
    },

    /// A declaration refers to a type nobody declared
    #[error("Dangling type reference from {from} to {to}")]
    DanglingReference {
        /// Declaring type
        from: String,
        /// Missing referenced type
        to: String,
    },

    /// A class chain loops back onto itself
    #[error("Cyclic class inheritance through {name}")]
    CyclicInheritance {
        /// A class on the cycle
        name: String,
    },

    /// An interface transitively extends itself
    #[error("Cyclic interface extension through {name}")]
    CyclicInterface {
        /// An interface on the cycle
        name: String,
    },

    /// A class names something other than a class as its superclass
    #[error("Invalid superclass: {class} extends {superclass}, which is not a class")]
    InvalidSuperclass {
        /// Declaring class
        class: String,
        /// Offending superclass name
        superclass: String,
    },

    /// An implements/extends list names something other than an interface
    #[error("{from} lists {to} as an interface, but it is not one")]
    NotAnInterface {
        /// Declaring type
        from: String,
        /// Offending name
        to: String,
    },

    /// Arrays of `void` do not exist
    #[error("Invalid array element type: {element}")]
    InvalidArrayElement {
        /// Element name
        element: String,
    },

    /// `isAssignableFrom` called with an absent source
    #[error("Null argument: {what}")]
    NullArgument {
        /// Which argument was absent
        what: &'static str,
    },

    /// Manifest could not be read or parsed
    #[error("Invalid type manifest: {message}")]
    Manifest {
        /// Reader or parser message
        message: String,
    },
}

/// Result alias for type graph operations
pub type TypeGraphResult<T> = Result<T, TypeGraphError>;
