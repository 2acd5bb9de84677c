//! Exception dispatch
//!
//! A [`CallStack`] holds one [`CallFrame`] per active call; each frame
//! holds its open `try` regions ([`ExceptionFrame`]), innermost last. The
//! interpreter loop reports control events (call, enter/leave a region,
//! throw, return, end of a `finally`) and receives a [`Transfer`] telling
//! it where to continue.
//!
//! Region phases:
//!
//! ```text
//! Protected --handler matched--> Handling (or popped if no finally)
//! Protected --exit, no match---> Finalizing(outcome) (or popped)
//! Handling  --exit-------------> Finalizing(outcome) (or popped)
//! Finalizing --end_finally-----> popped, outcome resumed
//! Finalizing --throw/return----> popped, outcome discarded
//! ```
//!
//! Handlers of a region are tried in source order and the first whose
//! type is assignable from the thrown object's dynamic type wins.

mod dispatcher;
mod frame;
mod thrown;

pub use dispatcher::{CallStack, Transfer};
pub use frame::{CallFrame, ExceptionFrame, FrameStatus, Handler, PendingOutcome, RegionPhase};
pub use thrown::{ThrowSite, ThrownObject};
