//! Thrown objects and throw sites

use crate::value::{ObjRef, Value};
use javelin_types::TypeId;
use std::fmt;

/// Method and program counter where a throw happened
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThrowSite {
    /// Method name as the interpreter knows it
    pub method: String,
    /// Program counter within the method
    pub pc: usize,
}

impl ThrowSite {
    /// Create a throw site
    pub fn new(method: impl Into<String>, pc: usize) -> Self {
        ThrowSite {
            method: method.into(),
            pc,
        }
    }
}

impl fmt::Display for ThrowSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.method, self.pc)
    }
}

/// Exception object in flight
///
/// The heap object itself lives with the interpreter; the dispatcher only
/// needs its reference and dynamic type. The stack trace is diagnostic
/// data and takes no part in handler matching.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrownObject {
    reference: ObjRef,
    message: Option<String>,
    origin: Option<ThrowSite>,
    trace: Vec<ThrowSite>,
}

impl ThrownObject {
    /// Wrap a heap reference
    pub fn new(reference: ObjRef) -> Self {
        ThrownObject {
            reference,
            message: None,
            origin: None,
            trace: Vec::new(),
        }
    }

    /// Attach a detail message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Thrown reference
    #[inline]
    pub fn reference(&self) -> ObjRef {
        self.reference
    }

    /// Thrown reference as an operand value
    #[inline]
    pub fn value(&self) -> Value {
        Value::object(self.reference)
    }

    /// Dynamic type
    #[inline]
    pub fn class(&self) -> TypeId {
        self.reference.class()
    }

    /// Detail message
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Innermost throw site, once thrown
    pub fn origin(&self) -> Option<&ThrowSite> {
        self.origin.as_ref()
    }

    /// Throw-site chain, innermost first; empty when capture is disabled
    pub fn stack_trace(&self) -> &[ThrowSite] {
        &self.trace
    }

    pub(crate) fn record(&mut self, origin: ThrowSite, trace: Vec<ThrowSite>) {
        self.origin = Some(origin);
        self.trace = trace;
    }
}
