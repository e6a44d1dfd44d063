//! Handle registry
//!
//! The authoritative handle → session mapping. Callers only get the
//! composite operations (insert-if-absent, swap-rename, remove); there is no
//! raw get/put, so check-then-act races cannot be written at the call site.
//!
//! The lock is held for the map operation only, never across a send.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::session::Session;
use crate::types::Handle;

/// Handle → session map
#[derive(Debug, Default)]
pub struct Registry {
    sessions: RwLock<HashMap<Handle, Arc<Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handle -> session` if the handle is free
    ///
    /// Returns false without mutation when another session holds the handle.
    /// Re-registering a session under the handle it already owns succeeds.
    /// On success the session's own handle is updated under the same lock.
    pub fn register(&self, handle: &Handle, session: &Arc<Session>) -> bool {
        let mut sessions = self.sessions.write();
        if let Some(existing) = sessions.get(handle) {
            return existing.id() == session.id();
        }
        sessions.insert(handle.clone(), Arc::clone(session));
        session.set_handle(handle.clone());
        debug!("Registered {} for {}", handle, session.id());
        true
    }

    /// Move `session` from `old` to `new` as one step
    ///
    /// Fails, changing nothing, if `new` is taken or `old` is not registered
    /// to `session` (for example because it was closed concurrently).
    /// Lookups never see both handles at once and never see neither.
    pub fn rename(&self, old: &Handle, new: &Handle, session: &Arc<Session>) -> bool {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(new) {
            return false;
        }
        if !sessions.get(old).is_some_and(|s| s.id() == session.id()) {
            return false;
        }
        sessions.remove(old);
        sessions.insert(new.clone(), Arc::clone(session));
        session.set_handle(new.clone());
        debug!("Renamed {} -> {} for {}", old, new, session.id());
        true
    }

    /// Remove `handle`; no-op if absent
    pub fn unregister(&self, handle: &str) {
        if self.sessions.write().remove(handle).is_some() {
            debug!("Unregistered {}", handle);
        }
    }

    /// Remove whatever handle `session` is registered under
    ///
    /// Returns that handle, or None if the session was not registered.
    /// An entry owned by a different session is left alone.
    pub fn unregister_session(&self, session: &Session) -> Option<Handle> {
        let mut sessions = self.sessions.write();
        let handle = session.handle();
        match sessions.get(&handle) {
            Some(existing) if existing.id() == session.id() => {
                sessions.remove(&handle);
                debug!("Unregistered {} for {}", handle, session.id());
                Some(handle)
            }
            _ => None,
        }
    }

    /// Snapshot of registered handles, sorted
    pub fn list(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.sessions.read().keys().cloned().collect();
        handles.sort();
        handles
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Session currently registered under `handle`
    pub(crate) fn lookup(&self, handle: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(handle).cloned()
    }

    /// All registered sessions, for fan-out outside the lock
    pub(crate) fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use tokio::sync::mpsc;

    use super::*;
    use crate::message::ServerMessage;
    use crate::types::SessionId;

    fn session() -> (Arc<Session>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(8);
        let session = Session::new(SessionId::new(), Handle::derived("User", 1), tx);
        (Arc::new(session), rx)
    }

    fn handle(raw: &str) -> Handle {
        Handle::parse(raw).unwrap()
    }

    #[test]
    fn test_register_unique() {
        let registry = Registry::new();
        let (a, _ra) = session();
        let (b, _rb) = session();

        assert!(registry.register(&handle("alice"), &a));
        assert!(!registry.register(&handle("alice"), &b));
        assert!(registry.register(&handle("alice"), &a));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("alice").unwrap().id(), a.id());
        assert_eq!(a.handle().as_str(), "alice");
        assert_eq!(b.handle().as_str(), "User1");
    }

    #[test]
    fn test_concurrent_register_same_handle() {
        const CONTENDERS: usize = 32;
        let registry = Arc::new(Registry::new());
        let barrier = Arc::new(Barrier::new(CONTENDERS));

        let workers: Vec<_> = (0..CONTENDERS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let (s, _rx) = session();
                    barrier.wait();
                    registry.register(&handle("contested"), &s)
                })
            })
            .collect();

        let wins = workers
            .into_iter()
            .map(|w| w.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(registry.list(), vec![handle("contested")]);
    }

    #[test]
    fn test_rename_swaps_atomically() {
        let registry = Registry::new();
        let (a, _ra) = session();
        registry.register(&handle("alice"), &a);

        assert!(registry.rename(&handle("alice"), &handle("bob2"), &a));

        assert!(registry.lookup("alice").is_none());
        assert_eq!(registry.lookup("bob2").unwrap().id(), a.id());
        assert_eq!(a.handle().as_str(), "bob2");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rename_to_taken_changes_nothing() {
        let registry = Registry::new();
        let (a, _ra) = session();
        let (b, _rb) = session();
        registry.register(&handle("alice"), &a);
        registry.register(&handle("bob"), &b);

        assert!(!registry.rename(&handle("alice"), &handle("bob"), &a));

        assert_eq!(registry.lookup("alice").unwrap().id(), a.id());
        assert_eq!(registry.lookup("bob").unwrap().id(), b.id());
        assert_eq!(a.handle().as_str(), "alice");
    }

    #[test]
    fn test_rename_after_unregister_fails() {
        let registry = Registry::new();
        let (a, _ra) = session();
        registry.register(&handle("alice"), &a);
        assert_eq!(registry.unregister_session(&a), Some(handle("alice")));

        assert!(!registry.rename(&handle("alice"), &handle("bob2"), &a));

        assert!(registry.is_empty());
        assert!(registry.lookup("bob2").is_none());
        assert_eq!(a.handle().as_str(), "alice");
    }

    #[test]
    fn test_rename_of_unowned_handle_fails() {
        let registry = Registry::new();
        let (a, _ra) = session();
        let (b, _rb) = session();
        registry.register(&handle("alice"), &a);

        assert!(!registry.rename(&handle("alice"), &handle("bob2"), &b));

        assert_eq!(registry.list(), vec![handle("alice")]);
        assert_eq!(registry.lookup("alice").unwrap().id(), a.id());
    }

    #[test]
    fn test_concurrent_rename_and_register() {
        for _ in 0..100 {
            let registry = Arc::new(Registry::new());
            let barrier = Arc::new(Barrier::new(2));
            let (a, _ra) = session();
            let (b, _rb) = session();
            registry.register(&handle("alice"), &a);

            let renamer = {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                let a = Arc::clone(&a);
                thread::spawn(move || {
                    barrier.wait();
                    registry.rename(&handle("alice"), &handle("target"), &a)
                })
            };
            let registrar = {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                let b = Arc::clone(&b);
                thread::spawn(move || {
                    barrier.wait();
                    registry.register(&handle("target"), &b)
                })
            };
            let renamed = renamer.join().unwrap();
            let registered = registrar.join().unwrap();

            // Exactly one of them gets the handle
            assert_ne!(renamed, registered);
            let owner = registry.lookup("target").unwrap();
            if renamed {
                assert_eq!(owner.id(), a.id());
                assert!(registry.lookup("alice").is_none());
                assert_eq!(registry.list(), vec![handle("target")]);
                assert_eq!(a.handle().as_str(), "target");
            } else {
                assert_eq!(owner.id(), b.id());
                assert_eq!(registry.lookup("alice").unwrap().id(), a.id());
                assert_eq!(registry.list(), vec![handle("alice"), handle("target")]);
                assert_eq!(a.handle().as_str(), "alice");
            }
        }
    }

    #[test]
    fn test_unregister_idempotent() {
        let registry = Registry::new();
        let (a, _ra) = session();
        registry.register(&handle("alice"), &a);

        registry.unregister("alice");
        registry.unregister("alice");
        registry.unregister("never-there");

        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_session_leaves_other_owner() {
        let registry = Registry::new();
        let (a, _ra) = session();
        let (b, _rb) = session();
        registry.register(&handle("alice"), &a);
        registry.unregister("alice");
        registry.register(&handle("alice"), &b);

        // `a` still believes it is alice, but the entry now belongs to `b`
        assert_eq!(registry.unregister_session(&a), None);
        assert_eq!(registry.lookup("alice").unwrap().id(), b.id());

        assert_eq!(registry.unregister_session(&b), Some(handle("alice")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_sorted_snapshot() {
        let registry = Registry::new();
        let (a, _ra) = session();
        let (b, _rb) = session();
        let (c, _rc) = session();
        registry.register(&handle("carol"), &c);
        registry.register(&handle("alice"), &a);
        registry.register(&handle("bob"), &b);
        registry.unregister("bob");

        assert_eq!(registry.list(), vec![handle("alice"), handle("carol")]);
        assert_eq!(registry.snapshot().len(), 2);
    }
}
