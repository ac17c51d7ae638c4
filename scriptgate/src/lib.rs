//! Server-side bridge that hosts a script engine behind request dispatch.
//!
//! The host knows two extension points: [`init`], called once at startup
//! with the init directive block, and [`handler`], called per request
//! dispatch. Everything between them is instance API:
//!
//! - [`host`]: the vocabulary shared with the host. Parameter blocks,
//!   opaque session/request handles, log severities, handler status.
//! - [`lifecycle`]: [`ScriptBridge`] bring-up (startup script, base-module
//!   preload, guard selection) and shutdown tracing.
//! - [`gateway`]: [`CallGateway`] dispatch. Resolve, ensure-loaded, build
//!   arguments, invoke with error capture, interpret the result.
//! - [`value_bridge`]: one-way conversions into the engine. Blessing
//!   handles, flattening directive blocks, per-call argument ownership.
//! - [`guard`]: whole-dispatch serialization for engines that do not
//!   tolerate concurrent entry.
//! - [`trace`]: the optional append-only trace log.
//!
//! The engine itself is an injected [`scriptrt::ScriptEngine`]; nothing
//! here assumes a particular scripting language.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use scriptrt::{EngineError, ScriptEngine};

pub mod gateway;
pub mod guard;
pub mod host;
pub mod lifecycle;
pub mod trace;
pub mod value_bridge;

pub use gateway::{CallGateway, CallTarget, DEFAULT_ENTRY, KEY_ENTRY, KEY_MODULE};
pub use guard::{EntryGuard, EntryPermit};
pub use host::{
    HandlerStatus, ParameterBlock, RequestHandle, ServerLog, SessionHandle, Severity,
    StdServerLog,
};
pub use lifecycle::{
    InitError, ScriptBridge, StartupScript, BASE_MODULES, KEY_CONF, KEY_INIT_SCRIPT,
    KEY_TRACE_LOG,
};
pub use trace::TraceSink;
pub use value_bridge::{bless_request, bless_session, flatten, CallScope, FlattenReport};

static BRIDGE: OnceCell<ScriptBridge> = OnceCell::new();

/// Startup extension point. Brings the process-wide bridge up from the
/// init directives; at most one bridge ever exists per process.
///
/// Returns `Proceed` when the bridge is ready, including when an earlier
/// call already built it (noted in the log, the existing engine is kept).
/// Returns `Aborted` when bring-up failed; the specific condition was
/// already logged at its failure site.
pub fn init<F>(block: &ParameterBlock, log: Arc<dyn ServerLog>, factory: F) -> HandlerStatus
where
    F: FnOnce(&ParameterBlock) -> Result<Arc<dyn ScriptEngine>, EngineError>,
{
    if BRIDGE.get().is_some() {
        log.log(
            Severity::Inform,
            "script-init",
            None,
            None,
            "bridge already initialized, keeping the existing engine",
        );
        return HandlerStatus::Proceed;
    }
    match ScriptBridge::initialize(factory, block, Arc::clone(&log)) {
        Ok(bridge) => {
            if BRIDGE.set(bridge).is_err() {
                // Lost a startup race; the winner's engine serves.
                log.log(
                    Severity::Inform,
                    "script-init",
                    None,
                    None,
                    "bridge already initialized, keeping the existing engine",
                );
            }
            HandlerStatus::Proceed
        }
        Err(_) => HandlerStatus::Aborted,
    }
}

/// Dispatch extension point. Refuses with `Aborted` when the bridge never
/// came up (that failure was logged once, at startup).
pub fn handler(
    block: &ParameterBlock,
    session: SessionHandle,
    request: RequestHandle,
) -> HandlerStatus {
    match BRIDGE.get() {
        Some(bridge) => bridge.handle(block, session, request),
        None => HandlerStatus::Aborted,
    }
}

/// The process-wide bridge, when [`init`] has built it.
pub fn bridge() -> Option<&'static ScriptBridge> {
    BRIDGE.get()
}
