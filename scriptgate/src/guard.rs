//! Dispatch entry guard.
//!
//! Strategy picked once at startup from the engine's declared thread
//! safety: an engine that does not tolerate concurrent entry gets
//! whole-dispatch serialization, a thread-safe one gets pass-through
//! entry. The choice never changes while the bridge lives.

use std::sync::{Mutex, MutexGuard};

use scriptrt::ScriptEngine;

#[derive(Debug)]
pub enum EntryGuard {
    /// One dispatch at a time; whole sequences are strictly ordered.
    Serialized(Mutex<()>),
    /// Overlapping dispatches permitted; ordering between them unspecified.
    Concurrent,
}

/// Region token. While `Some`, the holder owns the serialized region;
/// `None` means entry was pass-through.
pub type EntryPermit<'a> = Option<MutexGuard<'a, ()>>;

impl EntryGuard {
    pub fn for_engine(engine: &dyn ScriptEngine) -> Self {
        if engine.thread_safe() {
            EntryGuard::Concurrent
        } else {
            EntryGuard::Serialized(Mutex::new(()))
        }
    }

    /// Enter the dispatch region, blocking while another thread holds a
    /// serialized permit. The region is advisory serialization only, so a
    /// poisoned lock is recovered rather than refused.
    pub fn enter(&self) -> EntryPermit<'_> {
        match self {
            EntryGuard::Serialized(gate) => Some(match gate.lock() {
                Ok(permit) => permit,
                Err(poisoned) => poisoned.into_inner(),
            }),
            EntryGuard::Concurrent => None,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            EntryGuard::Serialized(_) => "serialized",
            EntryGuard::Concurrent => "concurrent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptrt::RegistryEngine;

    #[test]
    fn strategy_follows_engine_declaration() {
        let unsafe_engine = RegistryEngine::new();
        assert_eq!(EntryGuard::for_engine(&unsafe_engine).mode(), "serialized");

        let safe_engine = RegistryEngine::new().with_thread_safety(true);
        assert_eq!(EntryGuard::for_engine(&safe_engine).mode(), "concurrent");
    }

    #[test]
    fn permits_match_strategy() {
        let serialized = EntryGuard::Serialized(Mutex::new(()));
        assert!(serialized.enter().is_some());

        let concurrent = EntryGuard::Concurrent;
        assert!(concurrent.enter().is_none());
    }

    #[test]
    fn poisoned_region_is_recovered() {
        let guard = EntryGuard::Serialized(Mutex::new(()));
        let crashed = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _permit = guard.enter();
                    panic!("dispatch blew up while holding the region");
                })
                .join()
        });
        assert!(crashed.is_err());
        // Later dispatches still get in.
        assert!(guard.enter().is_some());
    }
}
