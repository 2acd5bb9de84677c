//! Javelin Kernel Core
//!
//! The primitive value and type-system kernel an interpreter loop calls
//! into:
//! - Fixed-width arithmetic, promotions and conversions
//! - Reference casts, arrays and bulk array copy
//! - Exception dispatch across call frames with `finally` guarantees
//! - Virtual method dispatch over the shared type graph

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod value;
pub mod fault;
pub mod arith;
pub mod cast;
pub mod array;
pub mod exception;
pub mod dispatch;
pub mod options;

pub use value::{ObjRef, Value, SYNTHETIC_HANDLE_BASE};
pub use fault::{Fault, FaultKind};
pub use arith::{BinaryOp, CompareOp, NanBias, UnaryOp};
pub use array::{array_copy, Array, ArrayArena, ArrayStorage};
pub use exception::{
    CallFrame, CallStack, ExceptionFrame, FrameStatus, Handler, PendingOutcome, RegionPhase,
    ThrowSite, ThrownObject, Transfer,
};
pub use dispatch::{DispatchTable, DispatchTableBuilder, MethodBody, MethodEntry, MethodSignature, ResolvedMethod};
pub use options::KernelOptions;

use javelin_types::TypeGraphError;

/// Kernel errors the running program cannot catch
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum KernelError {
    /// Catchable fault not yet turned into a thrown object
    #[error(transparent)]
    Fault(#[from] Fault),

    /// Exception escaped the outermost frame
    #[error("Uncaught exception {exception_type}{}", format_message(.message))]
    Uncaught {
        /// Dynamic type name of the thrown object
        exception_type: String,
        /// Detail message, if any
        message: Option<String>,
        /// Innermost throw site
        origin: Option<ThrowSite>,
        /// The escaped object
        exception: Box<ThrownObject>,
    },

    /// Malformed type graph
    #[error("Type graph error: {0}")]
    TypeGraph(#[from] TypeGraphError),

    /// A well-known exception class is absent from the type graph
    #[error("Class {name} is not in the type graph")]
    MissingClass {
        /// Fully qualified class name
        name: String,
    },

    /// Operator applied to operand types it does not accept
    #[error("Operator {operation} cannot be applied to {operands}")]
    OperandMismatch {
        /// Operator symbol
        operation: &'static str,
        /// Operand type names
        operands: String,
    },

    /// Primitive conversion with no defined meaning
    #[error("Cannot convert {from} to {to}")]
    UnsupportedConversion {
        /// Source type name
        from: &'static str,
        /// Target type name
        to: &'static str,
    },

    /// Dispatcher driven out of order by the interpreter loop
    #[error("Invalid dispatcher state: {0}")]
    InvalidState(String),

    /// Options could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Parser or I/O error text
        message: String,
    },
}

fn format_message(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {}", m),
        None => String::new(),
    }
}

impl KernelError {
    /// Shorthand for an [`KernelError::InvalidState`]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        KernelError::InvalidState(message.into())
    }

    /// The catchable fault, if this error carries one
    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            KernelError::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

/// Kernel operation result
pub type KernelResult<T> = Result<T, KernelError>;
