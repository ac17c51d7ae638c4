//! Bridge lifecycle.
//!
//! One `ScriptBridge` per process: built once at host startup from the
//! init directive block, then handling requests until process exit.
//! Bring-up is a fixed sequence with one distinguishable fatal condition
//! per step. There is no teardown sequence; dropping the bridge traces a
//! shutdown line and the process exit reclaims the rest.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use scriptrt::{EngineError, ScriptEngine};

use crate::gateway::{ensure_module, CallGateway};
use crate::guard::EntryGuard;
use crate::host::{
    HandlerStatus, ParameterBlock, RequestHandle, ServerLog, SessionHandle, Severity,
};
use crate::trace::TraceSink;

const COMPONENT: &str = "script-init";

/// Directive key naming the startup script path.
pub const KEY_INIT_SCRIPT: &str = "init-script";
/// Older name for the startup script path, still honored with a warning.
pub const KEY_CONF: &str = "conf";
/// Directive key naming the trace-log path.
pub const KEY_TRACE_LOG: &str = "tracelog";

/// Wrapper modules every handler script may assume are present. The
/// startup program may provide them itself; whatever it leaves out is
/// demand-loaded here.
pub const BASE_MODULES: [&str; 2] = ["Host::Session", "Host::Request"];

/// A fatal condition during bridge bring-up. Each step of the sequence
/// has its own variant; any of them means the host runs without script
/// handling.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Construct(EngineError),

    #[error("cannot read startup script {}: {source}", .path.display())]
    ScriptUnreadable { path: PathBuf, source: io::Error },

    #[error("trouble compiling {script}: {message}")]
    StartupCompile { script: String, message: String },

    #[error("trouble running {script}: {message}")]
    StartupRun { script: String, message: String },

    #[error("cannot load base module {module}: {message}")]
    Preload { module: String, message: String },
}

/// Where the startup program comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupScript {
    /// Path named by `init-script`.
    Configured(PathBuf),
    /// Path named by the older `conf` key.
    Legacy(PathBuf),
    /// Nothing configured; the engine gets an empty program.
    Builtin,
}

impl StartupScript {
    /// Three-tier resolution: `init-script` wins, then `conf`, then the
    /// built-in empty program.
    pub fn resolve(block: &ParameterBlock) -> Self {
        if let Some(path) = block.find_value(KEY_INIT_SCRIPT) {
            StartupScript::Configured(PathBuf::from(path))
        } else if let Some(path) = block.find_value(KEY_CONF) {
            StartupScript::Legacy(PathBuf::from(path))
        } else {
            StartupScript::Builtin
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, StartupScript::Legacy(_))
    }

    /// The program text. Only the file-backed tiers touch the filesystem.
    fn source(&self) -> Result<String, InitError> {
        match self {
            StartupScript::Configured(path) | StartupScript::Legacy(path) => fs::read_to_string(path)
                .map_err(|source| InitError::ScriptUnreadable {
                    path: path.clone(),
                    source,
                }),
            StartupScript::Builtin => Ok(String::new()),
        }
    }
}

impl fmt::Display for StartupScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupScript::Configured(path) | StartupScript::Legacy(path) => {
                write!(f, "{}", path.display())
            }
            StartupScript::Builtin => write!(f, "built-in startup program"),
        }
    }
}

/// The process-wide bridge: engine, gateway, and diagnostics, built once.
pub struct ScriptBridge {
    gateway: CallGateway,
    trace: Arc<TraceSink>,
    engine_version: Option<String>,
    booted_at: DateTime<Utc>,
}

impl ScriptBridge {
    /// Bring the bridge up from the host's init directives.
    ///
    /// The sequence is fixed: open the trace sink, resolve and read the
    /// startup script, construct the engine through `factory`, compile
    /// then run the startup program, preload whatever base modules the
    /// program left out, note the engine version, and pick the entry
    /// strategy from the engine's declared thread safety. Every fatal
    /// condition is logged here at its failure site before it is
    /// returned.
    pub fn initialize<F>(
        factory: F,
        block: &ParameterBlock,
        log: Arc<dyn ServerLog>,
    ) -> Result<ScriptBridge, InitError>
    where
        F: FnOnce(&ParameterBlock) -> Result<Arc<dyn ScriptEngine>, EngineError>,
    {
        // An unopenable trace file disables tracing for the process; it is
        // never a reason to refuse startup.
        let trace = Arc::new(match block.find_value(KEY_TRACE_LOG) {
            Some(path) => TraceSink::open(path).unwrap_or_else(|_| TraceSink::disabled()),
            None => TraceSink::disabled(),
        });

        let script = StartupScript::resolve(block);
        if script.is_legacy() {
            log.log(
                Severity::Inform,
                COMPONENT,
                None,
                None,
                "the conf parameter is deprecated, use init-script instead",
            );
        }
        let source = match script.source() {
            Ok(source) => source,
            Err(err) => {
                log.log(Severity::Misconfig, COMPONENT, None, None, &err.to_string());
                return Err(err);
            }
        };

        let engine = match factory(block) {
            Ok(engine) => engine,
            Err(err) => {
                let fail = InitError::Construct(err);
                log.log(Severity::Catastrophe, COMPONENT, None, None, &fail.to_string());
                return Err(fail);
            }
        };

        // Compiling and running the startup program are two separate
        // steps with separate diagnostics.
        if let Err(err) = engine.compile(&source) {
            let fail = InitError::StartupCompile {
                script: script.to_string(),
                message: err.detail().to_string(),
            };
            log.log(Severity::Catastrophe, COMPONENT, None, None, &fail.to_string());
            return Err(fail);
        }
        if let Err(err) = engine.run() {
            let fail = InitError::StartupRun {
                script: script.to_string(),
                message: err.detail().to_string(),
            };
            log.log(Severity::Catastrophe, COMPONENT, None, None, &fail.to_string());
            return Err(fail);
        }
        trace.line(format_args!("startup program {} compiled and ran", script));

        for module in BASE_MODULES {
            if engine.has_package(module) {
                trace.line(format_args!("{} provided by startup program", module));
                continue;
            }
            if let Err(err) = ensure_module(engine.as_ref(), module) {
                let fail = InitError::Preload {
                    module: module.to_string(),
                    message: err.to_string(),
                };
                log.log(Severity::Misconfig, COMPONENT, None, None, &fail.to_string());
                return Err(fail);
            }
            trace.line(format_args!("preloaded {}", module));
        }

        let engine_version = engine.version();
        if let Some(version) = &engine_version {
            log.log(
                Severity::Inform,
                COMPONENT,
                None,
                None,
                &format!("loaded a version {} interpreter", version),
            );
        }

        let guard = EntryGuard::for_engine(engine.as_ref());
        trace.line(format_args!("bridge up, {} entry", guard.mode()));

        let gateway = CallGateway::new(engine, guard, Arc::clone(&trace), log);
        Ok(ScriptBridge {
            gateway,
            trace,
            engine_version,
            booted_at: Utc::now(),
        })
    }

    /// Serve one request dispatch.
    pub fn handle(
        &self,
        block: &ParameterBlock,
        session: SessionHandle,
        request: RequestHandle,
    ) -> HandlerStatus {
        self.gateway.dispatch(block, session, request)
    }

    pub fn gateway(&self) -> &CallGateway {
        &self.gateway
    }

    /// The engine's self-reported version, when it gave one.
    pub fn engine_version(&self) -> Option<&str> {
        self.engine_version.as_deref()
    }

    pub fn booted_at(&self) -> DateTime<Utc> {
        self.booted_at
    }
}

impl fmt::Debug for ScriptBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptBridge")
            .field("engine_version", &self.engine_version)
            .field("booted_at", &self.booted_at)
            .finish_non_exhaustive()
    }
}

impl Drop for ScriptBridge {
    fn drop(&mut self) {
        self.trace.line(format_args!("bridge shutting down"));
    }
}
