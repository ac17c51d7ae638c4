//! Script-engine contract for in-process embedding.
//!
//! This crate defines the narrow seam between a host program and a
//! scripting engine it carries in-process: the value model that crosses
//! the boundary ([`ScriptValue`]), the engine contract ([`ScriptEngine`]),
//! the error surface ([`EngineError`]), and a table-backed engine
//! ([`RegistryEngine`]) for embedders and tests that need a concrete one.
//!
//! The crate knows nothing about any particular host. Host-side wiring
//! (request dispatch, logging, lifecycle) lives with the embedder.

pub mod engine;
pub mod error;
pub mod registry;
pub mod value;

pub use engine::{CallOutcome, ScriptEngine};
pub use error::{EngineError, EngineResult};
pub use registry::{ModuleDef, NativeFn, RegistryEngine};
pub use value::{HostRef, HostRefTag, ScriptValue};
