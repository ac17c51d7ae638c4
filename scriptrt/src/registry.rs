//! Function-table engine
//!
//! A concrete `ScriptEngine` whose "modules" are tables of native Rust
//! closures registered before the engine is shared. It gives embedders a
//! scripting surface without an external interpreter, and gives tests a
//! real engine with controllable behavior. The staged program source is
//! held but not interpreted; this engine's code lives in its tables.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::engine::{CallOutcome, ScriptEngine};
use crate::error::{EngineError, EngineResult};
use crate::value::ScriptValue;

/// A native entry point. `Ok(None)` means the call completed without a
/// return value; `Err` text is captured as a script-level error.
pub type NativeFn =
    Arc<dyn Fn(&[ScriptValue]) -> Result<Option<ScriptValue>, String> + Send + Sync>;

type LoadHook = Box<dyn Fn() -> Result<(), String> + Send + Sync>;

/// One registered module: a named set of native functions plus an optional
/// load hook run at first successful require.
pub struct ModuleDef {
    name: String,
    functions: HashMap<String, NativeFn>,
    on_load: Option<LoadHook>,
}

impl ModuleDef {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleDef {
            name: name.into(),
            functions: HashMap::new(),
            on_load: None,
        }
    }

    /// Register a function under this module's namespace.
    pub fn function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[ScriptValue]) -> Result<Option<ScriptValue>, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    /// Hook run when the module is first required. Failure leaves the
    /// module unloaded; a later require runs the hook again.
    pub fn on_load<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.on_load = Some(Box::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Engine backed by registered modules. The module table is fixed once the
/// engine is built; only the loaded set and the staged program mutate at
/// runtime.
pub struct RegistryEngine {
    modules: HashMap<String, ModuleDef>,
    loaded: RwLock<HashSet<String>>,
    program: RwLock<Option<String>>,
    thread_safe: bool,
}

impl RegistryEngine {
    pub fn new() -> Self {
        RegistryEngine {
            modules: HashMap::new(),
            loaded: RwLock::new(HashSet::new()),
            program: RwLock::new(None),
            thread_safe: false,
        }
    }

    /// Add a module to the table. Chainable at construction time.
    pub fn with_module(mut self, def: ModuleDef) -> Self {
        self.modules.insert(def.name.clone(), def);
        self
    }

    /// Declare whether one instance tolerates concurrent entry. The default
    /// is `false`: table lookups here are lock-protected, but the declared
    /// posture should match the native functions behind them.
    pub fn with_thread_safety(mut self, thread_safe: bool) -> Self {
        self.thread_safe = thread_safe;
        self
    }

    /// The most recently staged program source, if any.
    pub fn staged_source(&self) -> Option<String> {
        self.program.read().ok().and_then(|g| g.clone())
    }

    fn mark_loaded(&self, module: &str) -> EngineResult<()> {
        self.loaded
            .write()
            .map_err(|_| EngineError::Runtime("loaded-set lock poisoned".to_string()))?
            .insert(module.to_string());
        Ok(())
    }
}

impl Default for RegistryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine for RegistryEngine {
    fn compile(&self, source: &str) -> EngineResult<()> {
        let mut guard = self
            .program
            .write()
            .map_err(|_| EngineError::Runtime("program lock poisoned".to_string()))?;
        *guard = Some(source.to_string());
        Ok(())
    }

    fn run(&self) -> EngineResult<()> {
        // The staged source is opaque to a table engine; its top level is
        // empty by construction.
        Ok(())
    }

    fn require_module(&self, module: &str) -> EngineResult<()> {
        if self.has_package(module) {
            return Ok(());
        }
        let def = self
            .modules
            .get(module)
            .ok_or_else(|| EngineError::ModuleNotFound(module.to_string()))?;
        if let Some(hook) = &def.on_load {
            hook().map_err(|message| EngineError::ModuleLoad {
                module: module.to_string(),
                message,
            })?;
        }
        self.mark_loaded(module)
    }

    fn has_package(&self, module: &str) -> bool {
        self.loaded
            .read()
            .map(|g| g.contains(module))
            .unwrap_or(false)
    }

    fn call_function(&self, target: &str, args: &[ScriptValue]) -> CallOutcome {
        let Some((module, function)) = target.rsplit_once("::") else {
            return CallOutcome::Error(format!("malformed call target '{}'", target));
        };
        if !self.has_package(module) {
            return CallOutcome::Error(format!(
                "undefined function {} (module {} is not loaded)",
                target, module
            ));
        }
        let native = self
            .modules
            .get(module)
            .and_then(|def| def.functions.get(function))
            .cloned();
        let Some(native) = native else {
            return CallOutcome::Error(format!("undefined function {}", target));
        };
        match native(args) {
            Err(text) => CallOutcome::Error(text),
            Ok(None) => CallOutcome::Empty,
            Ok(Some(value)) => CallOutcome::Value(value),
        }
    }

    fn version(&self) -> Option<String> {
        Some(format!("registry/{}", env!("CARGO_PKG_VERSION")))
    }

    fn thread_safe(&self) -> bool {
        self.thread_safe
    }
}
