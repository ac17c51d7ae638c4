//! Call gateway.
//!
//! Turns one host dispatch into one script invocation: resolve the target
//! named by the directive block, make sure its module is loaded, build the
//! call arguments, invoke with error capture, and interpret what came
//! back. The whole sequence runs under a single entry-guard region, and
//! every path out of it is a documented `HandlerStatus`.

use std::sync::Arc;

use scriptrt::{CallOutcome, EngineResult, ScriptEngine};

use crate::guard::EntryGuard;
use crate::host::{
    HandlerStatus, ParameterBlock, RequestHandle, ServerLog, SessionHandle, Severity,
};
use crate::trace::TraceSink;
use crate::value_bridge::CallScope;

const COMPONENT: &str = "script-handler";

/// Directive key naming the script module to dispatch into.
pub const KEY_MODULE: &str = "module";
/// Directive key naming the entry function within the module.
pub const KEY_ENTRY: &str = "sub";
/// Entry function assumed when the directive names none.
pub const DEFAULT_ENTRY: &str = "handler";

/// Fully-resolved dispatch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    module: String,
    entry: String,
}

impl CallTarget {
    /// Read the target from the directive block. `module` is required and
    /// its absence is the one misconfiguration that stops a dispatch
    /// before the engine is entered; `sub` defaults to `handler`.
    pub fn resolve(block: &ParameterBlock) -> Option<Self> {
        let module = block.find_value(KEY_MODULE)?;
        let entry = block.find_value(KEY_ENTRY).unwrap_or(DEFAULT_ENTRY);
        Some(CallTarget {
            module: module.to_string(),
            entry: entry.to_string(),
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// The engine-side name, `module::entry`.
    pub fn qualified(&self) -> String {
        format!("{}::{}", self.module, self.entry)
    }
}

/// Demand-load `module` before calling into it. Issued on every dispatch;
/// the engine's own load memoization makes repeats cheap, and a failed
/// load stays unloaded so the next request retries.
pub(crate) fn ensure_module(engine: &dyn ScriptEngine, module: &str) -> EngineResult<()> {
    engine.require_module(module)
}

/// One gateway per bridge: the engine, the entry-guard strategy chosen at
/// startup, and the two diagnostic sinks.
pub struct CallGateway {
    engine: Arc<dyn ScriptEngine>,
    guard: EntryGuard,
    trace: Arc<TraceSink>,
    log: Arc<dyn ServerLog>,
}

impl CallGateway {
    pub fn new(
        engine: Arc<dyn ScriptEngine>,
        guard: EntryGuard,
        trace: Arc<TraceSink>,
        log: Arc<dyn ServerLog>,
    ) -> Self {
        CallGateway {
            engine,
            guard,
            trace,
            log,
        }
    }

    pub fn engine(&self) -> &dyn ScriptEngine {
        self.engine.as_ref()
    }

    pub fn guard_mode(&self) -> &'static str {
        self.guard.mode()
    }

    /// Run one dispatch end to end. Never panics across the boundary and
    /// never returns anything but a documented status.
    pub fn dispatch(
        &self,
        block: &ParameterBlock,
        session: SessionHandle,
        request: RequestHandle,
    ) -> HandlerStatus {
        let _permit = self.guard.enter();

        let Some(target) = CallTarget::resolve(block) else {
            self.log.log(
                Severity::Misconfig,
                COMPONENT,
                Some(session),
                Some(request),
                "no module argument specified",
            );
            self.trace
                .line(format_args!("dispatch refused: no module argument"));
            return HandlerStatus::Aborted;
        };
        let qualified = target.qualified();
        self.trace.line(format_args!("dispatch {} begin", qualified));

        if let Err(err) = ensure_module(self.engine.as_ref(), target.module()) {
            self.log.log(
                Severity::Misconfig,
                COMPONENT,
                Some(session),
                Some(request),
                &format!("cannot load module {}: {}", target.module(), err),
            );
            self.trace
                .line(format_args!("dispatch {} aborted: module load failed", qualified));
            return HandlerStatus::Aborted;
        }

        let scope = CallScope::for_request(block, session, request);
        let report = scope.flatten_report();
        if !report.is_clean() {
            self.trace.line(format_args!(
                "dispatch {}: flatten skipped {} entries, overwrote {}",
                qualified, report.skipped, report.overwritten
            ));
        }

        let status = match self.engine.call_function(&qualified, scope.args()) {
            CallOutcome::Error(text) => {
                self.log.log(
                    Severity::Catastrophe,
                    COMPONENT,
                    Some(session),
                    Some(request),
                    &format!("error running {}: {}", qualified, text),
                );
                HandlerStatus::Aborted
            }
            CallOutcome::Empty => {
                self.log.log(
                    Severity::Inform,
                    COMPONENT,
                    Some(session),
                    Some(request),
                    &format!("{} returned no value, proceeding", qualified),
                );
                HandlerStatus::Proceed
            }
            CallOutcome::Value(value) => HandlerStatus::from_return(&value),
        };
        self.trace
            .line(format_args!("dispatch {} -> {}", qualified, status));
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolve_requires_a_module() {
        let block = ParameterBlock::from_pairs([("fn", "script-handler")]);
        assert_eq!(CallTarget::resolve(&block), None);
    }

    #[test]
    fn resolve_defaults_the_entry_function() {
        let block = ParameterBlock::from_pairs([("module", "Site::Auth")]);
        let target = CallTarget::resolve(&block).expect("target");
        assert_eq!(target.module(), "Site::Auth");
        assert_eq!(target.entry(), "handler");
        assert_eq!(target.qualified(), "Site::Auth::handler");
    }

    #[test]
    fn resolve_honours_an_explicit_entry() {
        let block = ParameterBlock::from_pairs([("module", "Site::Auth"), ("sub", "check")]);
        let target = CallTarget::resolve(&block).expect("target");
        assert_eq!(target.qualified(), "Site::Auth::check");
    }

    #[test]
    fn resolve_uses_first_occurrences() {
        let mut block = ParameterBlock::new();
        block.push("module", "Site::First");
        block.push("sub", "alpha");
        block.push("module", "Site::Second");
        block.push("sub", "beta");
        let target = CallTarget::resolve(&block).expect("target");
        assert_eq!(target.qualified(), "Site::First::alpha");
    }
}
