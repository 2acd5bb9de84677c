//! Kernel runtime options
//!
//! ```toml
//! max_call_depth = 256
//! capture_stack_traces = false
//! memoize_dispatch = true
//! ```

use crate::{KernelError, KernelResult};
use serde::Deserialize;
use std::path::Path;

/// Options shared by a call stack and its dispatch table
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct KernelOptions {
    /// Deepest call stack allowed; one more call raises
    /// `java.lang.StackOverflowError` in the caller
    pub max_call_depth: usize,

    /// Record the throw-site chain on every thrown object
    pub capture_stack_traces: bool,

    /// Cache virtual dispatch results
    pub memoize_dispatch: bool,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 1024,
            capture_stack_traces: true,
            memoize_dispatch: true,
        }
    }
}

impl KernelOptions {
    /// Parse options from TOML text; absent keys keep their defaults
    pub fn from_toml_str(source: &str) -> KernelResult<Self> {
        toml::from_str(source).map_err(|e| KernelError::Config {
            message: e.to_string(),
        })
    }

    /// Read and parse an options file
    pub fn load(path: impl AsRef<Path>) -> KernelResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| KernelError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&source)
    }

    /// Set the call depth limit
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Enable or disable stack trace capture
    pub fn with_stack_traces(mut self, capture: bool) -> Self {
        self.capture_stack_traces = capture;
        self
    }

    /// Enable or disable dispatch memoization
    pub fn with_memoized_dispatch(mut self, memoize: bool) -> Self {
        self.memoize_dispatch = memoize;
        self
    }
}
