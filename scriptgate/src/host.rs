//! Host-side vocabulary.
//!
//! Rust renderings of what the serving host hands the plugin at its
//! extension points: the name/value parameter block, opaque session and
//! request tokens, the server's error-log contract, and the status a
//! handler returns to the request pipeline.

use std::fmt;

use scriptrt::ScriptValue;

/// Ordered collection of raw `name=value` directive entries.
///
/// Entries keep host order. Duplicate names and entries without a `=`
/// delimiter are stored as-is; lookup and flattening decide how to treat
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterBlock {
    entries: Vec<String>,
}

impl ParameterBlock {
    pub fn new() -> Self {
        ParameterBlock {
            entries: Vec::new(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut block = ParameterBlock::new();
        for (name, value) in pairs {
            block.push(name.as_ref(), value.as_ref());
        }
        block
    }

    /// Append a well-formed `name=value` entry.
    pub fn push(&mut self, name: &str, value: &str) {
        self.entries.push(format!("{}={}", name, value));
    }

    /// Append an entry exactly as given, delimiter or not.
    pub fn push_raw(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    /// Value of the first entry named `name`, the name being everything
    /// before the first `=`. Later duplicates are invisible here.
    pub fn find_value(&self, name: &str) -> Option<&str> {
        self.entries.iter().find_map(|entry| {
            let (entry_name, value) = entry.split_once('=')?;
            (entry_name == name).then_some(value)
        })
    }

    /// The raw entries in host order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Opaque token for the host's per-connection state. The bridge passes it
/// through to scripts and never dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn new(token: u64) -> Self {
        SessionHandle(token)
    }

    pub fn token(&self) -> u64 {
        self.0
    }
}

/// Opaque token for the host's per-request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle(u64);

impl RequestHandle {
    pub fn new(token: u64) -> Self {
        RequestHandle(token)
    }

    pub fn token(&self) -> u64 {
        self.0
    }
}

/// Severity band of a host log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operational notice.
    Inform,
    /// Configuration problem an administrator must fix.
    Misconfig,
    /// Fatal condition inside the bridge or the script it ran.
    Catastrophe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Inform => write!(f, "inform"),
            Severity::Misconfig => write!(f, "misconfig"),
            Severity::Catastrophe => write!(f, "catastrophe"),
        }
    }
}

/// The host's error-log collaborator. Session and request context are
/// optional because startup runs before any request exists.
pub trait ServerLog: Send + Sync {
    fn log(
        &self,
        severity: Severity,
        component: &str,
        session: Option<SessionHandle>,
        request: Option<RequestHandle>,
        message: &str,
    );
}

/// Default sink forwarding to the `log` facade, for embedders that run the
/// bridge without a host logger.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdServerLog;

impl ServerLog for StdServerLog {
    fn log(
        &self,
        severity: Severity,
        component: &str,
        _session: Option<SessionHandle>,
        _request: Option<RequestHandle>,
        message: &str,
    ) {
        match severity {
            Severity::Inform => log::info!(target: "scriptgate", "{}: {}", component, message),
            Severity::Misconfig => log::warn!(target: "scriptgate", "{}: {}", component, message),
            Severity::Catastrophe => {
                log::error!(target: "scriptgate", "{}: {}", component, message)
            }
        }
    }
}

/// What a handler tells the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStatus {
    /// Continue the pipeline.
    Proceed,
    /// Stop serving this request.
    Aborted,
    /// Any other script-chosen code, passed through unnormalized.
    Code(i64),
}

impl HandlerStatus {
    /// Interpret a script return value: the conventional success integer 1
    /// maps to `Proceed`, any other number passes through untouched.
    pub fn from_return(value: &ScriptValue) -> Self {
        match value.as_int() {
            1 => HandlerStatus::Proceed,
            n => HandlerStatus::Code(n),
        }
    }

    /// Numeric form the host pipeline consumes.
    pub fn raw(&self) -> i64 {
        match self {
            HandlerStatus::Proceed => 0,
            HandlerStatus::Aborted => -1,
            HandlerStatus::Code(n) => *n,
        }
    }
}

impl fmt::Display for HandlerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerStatus::Proceed => write!(f, "proceed"),
            HandlerStatus::Aborted => write!(f, "aborted"),
            HandlerStatus::Code(n) => write!(f, "code({})", n),
        }
    }
}
