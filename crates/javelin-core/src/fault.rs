//! Catchable runtime faults
//!
//! A [`Fault`] is a condition the running program can observe and catch:
//! the kernel turns it into a thrown instance of the matching `java.lang`
//! class and feeds it through the same unwinding path as a user `throw`.

use javelin_types::java_lang;
use thiserror::Error;

/// Broad fault category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Integer division or remainder by zero
    Arithmetic,
    /// Null where a live reference is required
    NullReference,
    /// Cast or array store with an incompatible dynamic type
    UnassignableType,
    /// Array index or copy range outside the array
    IndexOutOfBounds,
    /// Array allocation with a negative length
    NegativeArraySize,
    /// Virtual call with no concrete implementation
    AbstractMethod,
    /// Call depth limit exceeded
    StackOverflow,
}

/// Runtime fault raised by a kernel operation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Fault {
    /// Integer `/` or `%` with a zero divisor
    #[error("/ by zero")]
    DivisionByZero,

    /// Null reference used where an object is required
    #[error("{message}")]
    NullReference {
        /// What needed the reference
        message: String,
    },

    /// `checkcast` failure
    #[error("class {from} cannot be cast to class {to}")]
    ClassCast {
        /// Dynamic type of the object
        from: String,
        /// Cast target
        to: String,
    },

    /// Array store or bulk copy with an incompatible element
    #[error("{message}")]
    ArrayStore {
        /// Description of the mismatch
        message: String,
    },

    /// Index or range outside an array
    #[error("{message}")]
    IndexOutOfBounds {
        /// Description of the offending index or range
        message: String,
    },

    /// Negative length passed to an array allocation
    #[error("{length}")]
    NegativeArraySize {
        /// Requested length
        length: i32,
    },

    /// No concrete implementation found for a virtual call
    #[error("{class}.{method}")]
    AbstractMethod {
        /// Receiver class
        class: String,
        /// Method name and descriptor
        method: String,
    },

    /// Call depth limit exceeded
    #[error("call depth {depth} exceeds limit")]
    StackOverflow {
        /// Depth that was requested
        depth: usize,
    },
}

impl Fault {
    /// Null-reference fault with a message
    pub fn null_reference(message: impl Into<String>) -> Self {
        Fault::NullReference {
            message: message.into(),
        }
    }

    /// Array-store fault with a message
    pub fn array_store(message: impl Into<String>) -> Self {
        Fault::ArrayStore {
            message: message.into(),
        }
    }

    /// Index fault with a message
    pub fn index_out_of_bounds(message: impl Into<String>) -> Self {
        Fault::IndexOutOfBounds {
            message: message.into(),
        }
    }

    /// Category of this fault
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::DivisionByZero => FaultKind::Arithmetic,
            Fault::NullReference { .. } => FaultKind::NullReference,
            Fault::ClassCast { .. } | Fault::ArrayStore { .. } => FaultKind::UnassignableType,
            Fault::IndexOutOfBounds { .. } => FaultKind::IndexOutOfBounds,
            Fault::NegativeArraySize { .. } => FaultKind::NegativeArraySize,
            Fault::AbstractMethod { .. } => FaultKind::AbstractMethod,
            Fault::StackOverflow { .. } => FaultKind::StackOverflow,
        }
    }

    /// Fully qualified class the fault is thrown as
    pub fn exception_class(&self) -> &'static str {
        match self {
            Fault::DivisionByZero => java_lang::ARITHMETIC_EXCEPTION,
            Fault::NullReference { .. } => java_lang::NULL_POINTER_EXCEPTION,
            Fault::ClassCast { .. } => java_lang::CLASS_CAST_EXCEPTION,
            Fault::ArrayStore { .. } => java_lang::ARRAY_STORE_EXCEPTION,
            Fault::IndexOutOfBounds { .. } => java_lang::ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION,
            Fault::NegativeArraySize { .. } => java_lang::NEGATIVE_ARRAY_SIZE_EXCEPTION,
            Fault::AbstractMethod { .. } => java_lang::ABSTRACT_METHOD_ERROR,
            Fault::StackOverflow { .. } => java_lang::STACK_OVERFLOW_ERROR,
        }
    }
}
