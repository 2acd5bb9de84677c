//! Call frames and their protected regions

use super::thrown::{ThrowSite, ThrownObject};
use crate::value::Value;
use javelin_types::{TypeGraph, TypeId};

/// One `catch` clause of a protected region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handler {
    /// Declared exception type; `None` catches everything
    pub catch_type: Option<TypeId>,
    /// Handler entry point
    pub entry: usize,
}

impl Handler {
    /// Handler for `catch_type` and its subtypes
    pub fn catching(catch_type: TypeId, entry: usize) -> Self {
        Handler {
            catch_type: Some(catch_type),
            entry,
        }
    }

    /// Handler that matches any thrown object
    pub fn catch_all(entry: usize) -> Self {
        Handler {
            catch_type: None,
            entry,
        }
    }

    /// Check whether this handler accepts an object of dynamic type `thrown`
    pub fn matches(&self, graph: &TypeGraph, thrown: TypeId) -> bool {
        match self.catch_type {
            None => true,
            Some(ty) => graph.is_assignable_from(ty, thrown),
        }
    }
}

/// What a `finally` block resumes with once it completes normally
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOutcome {
    /// Continue a jump to `target`, leaving `remaining` more regions first
    Jump {
        /// Jump target
        target: usize,
        /// Enclosing regions still to leave
        remaining: usize,
    },
    /// Continue returning from the method
    Return(Option<Value>),
    /// Continue unwinding
    Throw(ThrownObject),
}

/// Where control is relative to a region
#[derive(Debug, Clone, PartialEq)]
pub enum RegionPhase {
    /// Inside the `try` body
    Protected,
    /// Inside one of the region's handlers; only its `finally` still
    /// applies
    Handling,
    /// Inside the `finally` block
    Finalizing(PendingOutcome),
}

/// An active `try` region
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionFrame {
    handlers: Vec<Handler>,
    finally: Option<usize>,
    pub(crate) phase: RegionPhase,
}

impl ExceptionFrame {
    /// Region with handlers in source order and an optional `finally`
    pub fn new(handlers: Vec<Handler>, finally: Option<usize>) -> Self {
        ExceptionFrame {
            handlers,
            finally,
            phase: RegionPhase::Protected,
        }
    }

    /// Handlers in source order
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// `finally` entry point
    pub fn finally(&self) -> Option<usize> {
        self.finally
    }

    /// Current phase
    pub fn phase(&self) -> &RegionPhase {
        &self.phase
    }

    /// Outcome the running `finally` will resume
    pub fn pending(&self) -> Option<&PendingOutcome> {
        match &self.phase {
            RegionPhase::Finalizing(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// First handler, in source order, that accepts `thrown`
    pub(crate) fn find_handler(&self, graph: &TypeGraph, thrown: TypeId) -> Option<&Handler> {
        self.handlers.iter().find(|h| h.matches(graph, thrown))
    }
}

/// Frame state as seen by the interpreter loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStatus {
    /// Executing normally (body or handler)
    Running,
    /// Searching for a handler
    Unwinding,
    /// Executing a `finally` block
    InFinally,
    /// Completed by `return`
    Returned,
    /// Discarded by an exception nobody in it caught
    Propagating,
}

/// One method activation
#[derive(Debug, Clone, PartialEq)]
pub struct CallFrame {
    method: String,
    pub(crate) pc: usize,
    pub(crate) regions: Vec<ExceptionFrame>,
    pub(crate) status: FrameStatus,
}

impl CallFrame {
    pub(crate) fn new(method: String) -> Self {
        CallFrame {
            method,
            pc: 0,
            regions: Vec::new(),
            status: FrameStatus::Running,
        }
    }

    /// Method name
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Last program counter reported for this frame
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Active regions, outermost first
    pub fn regions(&self) -> &[ExceptionFrame] {
        &self.regions
    }

    /// Current status
    pub fn status(&self) -> FrameStatus {
        self.status
    }

    /// Current throw site
    pub fn site(&self) -> ThrowSite {
        ThrowSite::new(self.method.clone(), self.pc)
    }
}
