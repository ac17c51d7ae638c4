//! Script Engine seam
//!
//! Defines the trait that bridges a host process to an embedded script
//! interpreter. The interpreter is a black box behind this contract: the
//! bridge stages and runs a startup program, demand-loads modules, and calls
//! named functions, without ever seeing parsing, bytecode, or memory
//! management.

use crate::error::EngineResult;
use crate::value::ScriptValue;

/// Outcome of one function invocation, with error capture.
///
/// The three cases are deliberately distinguishable: a raised script error
/// is not the same as a call that completed without producing a value.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The callee raised; the error text was captured inside the engine
    /// instead of propagating as a fault.
    Error(String),
    /// The call completed but yielded no return value.
    Empty,
    /// The call completed with a single scalar result.
    Value(ScriptValue),
}

/// The capability contract an embedded interpreter exposes to the bridge.
///
/// One instance is shared process-wide. Implementations that are not safe
/// for concurrent entry must say so via `thread_safe`; the bridge then
/// serializes every call sequence against a single entry guard. All methods
/// take `&self`; an engine carries its own interior state.
pub trait ScriptEngine: Send + Sync {
    /// Stage a top-level program, replacing any previously staged one.
    /// Compilation is distinct from execution: a startup failure must be
    /// attributable to the step that caused it.
    fn compile(&self, source: &str) -> EngineResult<()>;

    /// Run the top level of the most recently compiled program.
    fn run(&self) -> EngineResult<()>;

    /// Load a module by name, once. Engines own the required-once
    /// memoization; repeated calls for a loaded module are cheap no-ops.
    /// A failed load must leave the module unloaded so the next require
    /// retries it.
    fn require_module(&self, module: &str) -> EngineResult<()>;

    /// Whether `module` is already defined in the engine's namespace,
    /// e.g. because the startup program pulled it in itself.
    fn has_package(&self, module: &str) -> bool;

    /// Call a fully-qualified `Module::function` with positional arguments.
    /// Errors raised by the callee are captured and reported in the
    /// outcome; this method does not panic on script-level failure.
    fn call_function(&self, target: &str, args: &[ScriptValue]) -> CallOutcome;

    /// The interpreter's self-reported version string, if it has one.
    fn version(&self) -> Option<String> {
        None
    }

    /// Whether one instance of this engine tolerates concurrent entry from
    /// several host threads. Consulted exactly once, at startup, to choose
    /// the entry-guard strategy.
    fn thread_safe(&self) -> bool {
        false
    }
}
