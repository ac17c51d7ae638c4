//! Host-to-engine value conversion.
//!
//! Two one-way conversions cross the boundary at dispatch time: opaque
//! host handles are blessed into typed engine references, and the
//! directive parameter block is flattened into an engine mapping. Both are
//! build-only; nothing converts back. The `CallScope` owns the results for
//! exactly one invocation.

use indexmap::IndexMap;

use scriptrt::{HostRef, HostRefTag, ScriptValue};

use crate::host::{ParameterBlock, RequestHandle, SessionHandle};

/// Wrap the session token as a typed engine reference. Pure wrapping, no
/// validation; the token is never dereferenced on this side.
pub fn bless_session(session: SessionHandle) -> ScriptValue {
    ScriptValue::HostRef(HostRef::new(HostRefTag::Session, session.token()))
}

/// Wrap the request token as a typed engine reference.
pub fn bless_request(request: RequestHandle) -> ScriptValue {
    ScriptValue::HostRef(HostRef::new(HostRefTag::Request, request.token()))
}

/// What the lossy parts of a flatten amounted to. Entries without a
/// delimiter are dropped and duplicate names keep only their last value;
/// the counts let callers surface that instead of silently losing data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenReport {
    /// Entries with no `=` delimiter, dropped from the mapping.
    pub skipped: usize,
    /// Earlier values displaced by a later duplicate name.
    pub overwritten: usize,
}

impl FlattenReport {
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.overwritten == 0
    }
}

/// Flatten the block into an engine mapping, splitting each entry at its
/// first `=`. Keys keep first-occurrence order; a duplicate name
/// overwrites its value in place, so the last value wins.
pub fn flatten(block: &ParameterBlock) -> (IndexMap<String, ScriptValue>, FlattenReport) {
    let mut mapping = IndexMap::new();
    let mut report = FlattenReport::default();
    for entry in block.entries() {
        let Some((name, value)) = entry.split_once('=') else {
            report.skipped += 1;
            continue;
        };
        let displaced = mapping
            .insert(name.to_string(), ScriptValue::String(value.to_string()))
            .is_some();
        if displaced {
            report.overwritten += 1;
        }
    }
    (mapping, report)
}

/// Owner of the three positional arguments for one handler invocation, in
/// fixed call order: directive mapping, blessed session, blessed request.
///
/// A scope is built per call and dropped when the dispatch returns, so
/// everything bridged for the call is reclaimed with it. The blessed
/// handles inside are only meaningful while the host's request is being
/// served; the scope's lifetime is what keeps them from outliving it.
pub struct CallScope {
    args: [ScriptValue; 3],
    report: FlattenReport,
}

impl CallScope {
    pub fn for_request(
        block: &ParameterBlock,
        session: SessionHandle,
        request: RequestHandle,
    ) -> Self {
        let (mapping, report) = flatten(block);
        CallScope {
            args: [
                ScriptValue::Map(mapping),
                bless_session(session),
                bless_request(request),
            ],
            report,
        }
    }

    /// The arguments in call order.
    pub fn args(&self) -> &[ScriptValue] {
        &self.args
    }

    pub fn flatten_report(&self) -> FlattenReport {
        self.report
    }
}
