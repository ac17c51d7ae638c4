//! The process-wide extension points. One test walks the whole lifetime
//! in order, because the bridge singleton is set once per process.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use scriptgate::{
    handler, init, HandlerStatus, ParameterBlock, RequestHandle, ServerLog, SessionHandle,
    Severity,
};
use scriptrt::{EngineError, ModuleDef, RegistryEngine, ScriptEngine, ScriptValue};

#[derive(Default)]
struct RecordingLog {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl RecordingLog {
    fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .any(|(s, m)| *s == severity && m.contains(needle))
    }
}

impl ServerLog for RecordingLog {
    fn log(
        &self,
        severity: Severity,
        _component: &str,
        _session: Option<SessionHandle>,
        _request: Option<RequestHandle>,
        message: &str,
    ) {
        self.lines
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}

#[test]
fn entry_points_cover_the_bridge_lifetime() {
    let dispatch_block = ParameterBlock::from_pairs([("module", "Site::Auth")]);

    // Before init every dispatch is refused.
    assert_eq!(
        handler(&dispatch_block, SessionHandle::new(1), RequestHandle::new(1)),
        HandlerStatus::Aborted
    );
    assert!(scriptgate::bridge().is_none());

    let log = Arc::new(RecordingLog::default());
    let status = init(
        &ParameterBlock::new(),
        log.clone() as Arc<dyn ServerLog>,
        |_: &ParameterBlock| -> Result<Arc<dyn ScriptEngine>, EngineError> {
            Ok(Arc::new(
                RegistryEngine::new()
                    .with_module(ModuleDef::new("Host::Session"))
                    .with_module(ModuleDef::new("Host::Request"))
                    .with_module(
                        ModuleDef::new("Site::Auth")
                            .function("handler", |_| Ok(Some(ScriptValue::Integer(1)))),
                    ),
            ))
        },
    );
    assert_eq!(status, HandlerStatus::Proceed);
    assert!(scriptgate::bridge().is_some());

    // A second init keeps the existing engine; its factory never runs.
    let again = init(
        &ParameterBlock::new(),
        log.clone() as Arc<dyn ServerLog>,
        |_: &ParameterBlock| -> Result<Arc<dyn ScriptEngine>, EngineError> {
            Err(EngineError::Construct(
                "second factory must not be invoked".to_string(),
            ))
        },
    );
    assert_eq!(again, HandlerStatus::Proceed);
    assert!(log.contains(Severity::Inform, "already initialized"));

    // Dispatch flows through the singleton.
    assert_eq!(
        handler(&dispatch_block, SessionHandle::new(2), RequestHandle::new(2)),
        HandlerStatus::Proceed
    );
    let version = scriptgate::bridge()
        .and_then(|bridge| bridge.engine_version())
        .unwrap_or_default();
    assert!(version.starts_with("registry/"));
}
