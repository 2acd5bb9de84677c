//! The exception dispatch state machine

use super::frame::{CallFrame, ExceptionFrame, FrameStatus, Handler, PendingOutcome, RegionPhase};
use super::thrown::ThrownObject;
use crate::fault::Fault;
use crate::options::KernelOptions;
use crate::value::{ObjRef, Value};
use crate::{KernelError, KernelResult};
use javelin_types::{java_lang, TypeGraph};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Where the interpreter loop continues after a dispatcher call
///
/// `depth` is the 1-based frame the transfer lands in (the stack depth
/// after the transition).
#[derive(Debug, Clone, PartialEq)]
pub enum Transfer {
    /// Continue at `pc`
    Jump {
        /// Frame depth
        depth: usize,
        /// Next program counter
        pc: usize,
    },
    /// Run a `catch` handler with the caught object
    EnterHandler {
        /// Frame depth
        depth: usize,
        /// Handler entry
        pc: usize,
        /// The caught object
        exception: ThrownObject,
        /// The catching region is still open because it has a `finally`;
        /// the handler must exit through [`CallStack::leave`]. When false
        /// the region is already gone and the handler exits with a plain
        /// jump.
        region_open: bool,
    },
    /// Run a `finally` block; finish it with [`CallStack::end_finally`]
    EnterFinally {
        /// Frame depth
        depth: usize,
        /// `finally` entry
        pc: usize,
    },
    /// Hand a return value to the caller; depth 0 means the run finished
    Return {
        /// Caller frame depth
        depth: usize,
        /// Returned value, `None` for `void`
        value: Option<Value>,
    },
}

impl Transfer {
    /// Frame depth the transfer lands in
    pub fn depth(&self) -> usize {
        match self {
            Transfer::Jump { depth, .. }
            | Transfer::EnterHandler { depth, .. }
            | Transfer::EnterFinally { depth, .. }
            | Transfer::Return { depth, .. } => *depth,
        }
    }

    /// Program counter to continue at, if the transfer names one
    pub fn pc(&self) -> Option<usize> {
        match self {
            Transfer::Jump { pc, .. }
            | Transfer::EnterHandler { pc, .. }
            | Transfer::EnterFinally { pc, .. } => Some(*pc),
            Transfer::Return { .. } => None,
        }
    }
}

/// One logical thread's call stack
///
/// Owns its frames exclusively; the type graph is shared.
#[derive(Debug)]
pub struct CallStack {
    graph: Arc<TypeGraph>,
    options: KernelOptions,
    frames: Vec<CallFrame>,
    retired: Option<CallFrame>,
}

fn enter_finally(frame: &mut CallFrame, depth: usize, entry: usize) -> Transfer {
    frame.status = FrameStatus::InFinally;
    frame.pc = entry;
    trace!(method = %frame.method(), entry, "entering finally");
    Transfer::EnterFinally { depth, pc: entry }
}

impl CallStack {
    /// Empty call stack with default options
    pub fn new(graph: Arc<TypeGraph>) -> Self {
        Self::with_options(graph, KernelOptions::default())
    }

    /// Empty call stack
    pub fn with_options(graph: Arc<TypeGraph>, options: KernelOptions) -> Self {
        CallStack {
            graph,
            options,
            frames: Vec::new(),
            retired: None,
        }
    }

    /// Shared type graph
    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Active options
    pub fn options(&self) -> &KernelOptions {
        &self.options
    }

    /// Number of live frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Check whether no frame is live
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Innermost frame
    pub fn current(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Live frames, outermost first
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    /// Most recently removed frame, with its final status
    pub fn last_retired(&self) -> Option<&CallFrame> {
        self.retired.as_ref()
    }

    fn current_mut(&mut self) -> KernelResult<&mut CallFrame> {
        self.frames
            .last_mut()
            .ok_or_else(|| KernelError::invalid_state("no active call frame"))
    }

    /// Push a frame for `method`
    ///
    /// Past `max_call_depth` no frame is pushed; a `StackOverflowError` is
    /// raised in the caller instead.
    pub fn enter_call(&mut self, method: impl Into<String>) -> KernelResult<Transfer> {
        let method = method.into();
        if self.frames.len() >= self.options.max_call_depth {
            let depth = self.frames.len() + 1;
            debug!(%method, depth, "call depth limit reached");
            return self.raise(Fault::StackOverflow { depth });
        }
        self.frames.push(CallFrame::new(method));
        Ok(Transfer::Jump {
            depth: self.frames.len(),
            pc: 0,
        })
    }

    /// Record the current program counter (the throw site for faults)
    pub fn set_pc(&mut self, pc: usize) -> KernelResult<()> {
        self.current_mut()?.pc = pc;
        Ok(())
    }

    /// Open a protected region with handlers in source order
    pub fn enter_try(&mut self, handlers: Vec<Handler>, finally: Option<usize>) -> KernelResult<()> {
        let frame = self.current_mut()?;
        frame.regions.push(ExceptionFrame::new(handlers, finally));
        Ok(())
    }

    /// Leave the innermost region for `target`, running its `finally` first
    ///
    /// A handler entered with `region_open: false` no longer has a region
    /// of its own; calling this from it would leave the enclosing region.
    pub fn leave(&mut self, target: usize) -> KernelResult<Transfer> {
        self.leave_regions(1, target)
    }

    /// Leave `count` regions for `target` (`break` out of nested `try`s)
    ///
    /// Each `finally` on the way runs innermost first. Jumping out of a
    /// running `finally` abandons whatever it was going to resume.
    pub fn leave_regions(&mut self, count: usize, target: usize) -> KernelResult<Transfer> {
        let open = self.current_mut()?.regions.len();
        if count > open {
            return Err(KernelError::invalid_state(format!(
                "cannot leave {} regions, {} open",
                count, open
            )));
        }
        self.continue_jump(target, count)
    }

    fn continue_jump(&mut self, target: usize, mut remaining: usize) -> KernelResult<Transfer> {
        let depth = self.frames.len();
        let frame = self.current_mut()?;
        while remaining > 0 {
            let Some(region) = frame.regions.last_mut() else {
                break;
            };
            remaining -= 1;
            let finalizing = region.pending().is_some();
            match region.finally() {
                Some(entry) if !finalizing => {
                    region.phase = RegionPhase::Finalizing(PendingOutcome::Jump { target, remaining });
                    return Ok(enter_finally(frame, depth, entry));
                }
                _ => {
                    frame.regions.pop();
                }
            }
        }
        frame.status = FrameStatus::Running;
        frame.pc = target;
        Ok(Transfer::Jump { depth, pc: target })
    }

    /// Normal completion of the running `finally`: resume its pending outcome
    pub fn end_finally(&mut self) -> KernelResult<Transfer> {
        let frame = self.current_mut()?;
        let outcome = match frame.regions.last().map(ExceptionFrame::phase) {
            Some(RegionPhase::Finalizing(_)) => match frame.regions.pop().map(|r| r.phase) {
                Some(RegionPhase::Finalizing(outcome)) => outcome,
                _ => return Err(KernelError::invalid_state("finally region vanished")),
            },
            _ => return Err(KernelError::invalid_state("end of finally outside a finally block")),
        };
        frame.status = FrameStatus::Running;
        match outcome {
            PendingOutcome::Jump { target, remaining } => self.continue_jump(target, remaining),
            PendingOutcome::Return(value) => self.continue_return(value),
            PendingOutcome::Throw(thrown) => self.unwind(thrown),
        }
    }

    /// `return` from the current method
    ///
    /// Every enclosing `finally` runs first. A `return` from inside a
    /// `finally` replaces whatever that block was going to resume,
    /// including a pending exception.
    pub fn return_value(&mut self, value: Option<Value>) -> KernelResult<Transfer> {
        self.continue_return(value)
    }

    fn continue_return(&mut self, value: Option<Value>) -> KernelResult<Transfer> {
        let depth = self.frames.len();
        let frame = self.current_mut()?;
        while let Some(region) = frame.regions.last_mut() {
            let finalizing = region.pending().is_some();
            match region.finally() {
                Some(entry) if !finalizing => {
                    region.phase = RegionPhase::Finalizing(PendingOutcome::Return(value));
                    return Ok(enter_finally(frame, depth, entry));
                }
                _ => {
                    frame.regions.pop();
                }
            }
        }
        if let Some(mut done) = self.frames.pop() {
            done.status = FrameStatus::Returned;
            trace!(method = %done.method(), "frame returned");
            self.retired = Some(done);
        }
        Ok(Transfer::Return {
            depth: self.frames.len(),
            value,
        })
    }

    /// `athrow`: throw the object behind `value`
    ///
    /// Throwing null raises `NullPointerException` instead.
    pub fn throw(&mut self, value: Value) -> KernelResult<Transfer> {
        match value {
            Value::Reference(Some(reference)) => self.throw_object(ThrownObject::new(reference)),
            Value::Reference(None) => self.raise(Fault::null_reference(
                "Cannot throw exception because the value is null",
            )),
            other => Err(KernelError::invalid_state(format!(
                "cannot throw a {} value",
                other.type_name()
            ))),
        }
    }

    /// Throw a prepared object
    ///
    /// An object that was thrown before keeps its original origin and
    /// stack trace.
    pub fn throw_object(&mut self, mut thrown: ThrownObject) -> KernelResult<Transfer> {
        if let Some(throwable) = self.graph.lookup(java_lang::THROWABLE) {
            if !self.graph.is_assignable_from(throwable, thrown.class()) {
                return Err(KernelError::invalid_state(format!(
                    "{} is not a subclass of {}",
                    self.graph.name(thrown.class()),
                    java_lang::THROWABLE
                )));
            }
        }
        if thrown.origin().is_none() {
            if let Some(frame) = self.frames.last() {
                let trace = if self.options.capture_stack_traces {
                    self.frames.iter().rev().map(CallFrame::site).collect()
                } else {
                    Vec::new()
                };
                thrown.record(frame.site(), trace);
            }
        }
        self.unwind(thrown)
    }

    /// Turn a fault into a thrown instance of its `java.lang` class
    ///
    /// # Errors
    ///
    /// [`KernelError::MissingClass`] when the graph lacks that class; use
    /// `TypeGraphBuilder::with_java_lang` to register the standard ones.
    pub fn raise(&mut self, fault: Fault) -> KernelResult<Transfer> {
        let name = fault.exception_class();
        let class = self
            .graph
            .lookup(name)
            .ok_or_else(|| KernelError::MissingClass {
                name: name.to_string(),
            })?;
        trace!(exception = name, %fault, "raising fault");
        let thrown = ThrownObject::new(ObjRef::synthetic(class)).with_message(fault.to_string());
        self.throw_object(thrown)
    }

    /// Route a failed kernel operation: faults are raised, anything else
    /// is returned unchanged
    pub fn handle(&mut self, error: KernelError) -> KernelResult<Transfer> {
        match error {
            KernelError::Fault(fault) => self.raise(fault),
            other => Err(other),
        }
    }

    fn unwind(&mut self, thrown: ThrownObject) -> KernelResult<Transfer> {
        let graph = Arc::clone(&self.graph);
        loop {
            let depth = self.frames.len();
            let frame = match self.frames.last_mut() {
                Some(frame) => frame,
                None => return Err(self.uncaught(thrown)),
            };
            frame.status = FrameStatus::Unwinding;

            while let Some(region) = frame.regions.last_mut() {
                match region.phase {
                    RegionPhase::Protected => {
                        if let Some(entry) = region.find_handler(&graph, thrown.class()).map(|h| h.entry) {
                            let region_open = region.finally().is_some();
                            if region_open {
                                region.phase = RegionPhase::Handling;
                            } else {
                                frame.regions.pop();
                            }
                            frame.status = FrameStatus::Running;
                            frame.pc = entry;
                            trace!(
                                method = %frame.method(),
                                entry,
                                exception = %graph.name(thrown.class()),
                                "handler matched"
                            );
                            return Ok(Transfer::EnterHandler {
                                depth,
                                pc: entry,
                                exception: thrown,
                                region_open,
                            });
                        }
                    }
                    RegionPhase::Handling => {}
                    // a throw out of a finally masks what it was resuming
                    RegionPhase::Finalizing(_) => {
                        frame.regions.pop();
                        continue;
                    }
                }

                if let Some(entry) = region.finally() {
                    region.phase = RegionPhase::Finalizing(PendingOutcome::Throw(thrown));
                    return Ok(enter_finally(frame, depth, entry));
                }
                frame.regions.pop();
            }

            if let Some(mut discarded) = self.frames.pop() {
                discarded.status = FrameStatus::Propagating;
                debug!(
                    method = %discarded.method(),
                    exception = %graph.name(thrown.class()),
                    "frame discarded by propagation"
                );
                self.retired = Some(discarded);
            }
        }
    }

    fn uncaught(&self, thrown: ThrownObject) -> KernelError {
        let exception_type = self.graph.name(thrown.class());
        warn!(
            exception = %exception_type,
            origin = ?thrown.origin(),
            "uncaught exception escaped the outermost frame"
        );
        KernelError::Uncaught {
            exception_type,
            message: thrown.message().map(str::to_owned),
            origin: thrown.origin().cloned(),
            exception: Box::new(thrown),
        }
    }
}
