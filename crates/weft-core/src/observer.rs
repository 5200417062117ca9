// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Synchronous cache event observers.
//!
//! Observers are invoked inline, in registration order, within the calling
//! thread. They must behave as pure observers: re-entering `patch` on the
//! same cache from a hook is undefined behavior by contract (the core is
//! single-threaded and does not guard against it).

use crate::operation::RecordOperation;
use crate::record::Record;

/// Hooks for the two cache events.
///
/// Both methods default to no-ops, so observers implement only what they
/// watch.
pub trait CacheObserver {
    /// Called after each operation's main mutation, with the operation and
    /// the record data it produced (`None` for removals-of-nothing is never
    /// seen here; no-op operations are skipped before emission).
    fn on_patch(&self, _operation: &RecordOperation, _data: &Option<Record>) {}

    /// Called after the cache is bulk-reset.
    fn on_reset(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::RecordIdentity;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recording {
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl CacheObserver for Recording {
        fn on_patch(&self, operation: &RecordOperation, _data: &Option<Record>) {
            self.seen
                .borrow_mut()
                .push(operation.kind().name().to_owned());
        }

        fn on_reset(&self) {
            self.seen.borrow_mut().push("reset".to_owned());
        }
    }

    #[test]
    fn default_hooks_are_no_ops() {
        struct Silent;
        impl CacheObserver for Silent {}
        let observer = Silent;
        observer.on_patch(
            &RecordOperation::RemoveRecord {
                record: RecordIdentity::new("planet", "jupiter"),
            },
            &None,
        );
        observer.on_reset();
    }

    #[test]
    fn recording_observer_sees_events() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let observer = Recording { seen: seen.clone() };
        observer.on_patch(
            &RecordOperation::RemoveRecord {
                record: RecordIdentity::new("planet", "jupiter"),
            },
            &None,
        );
        observer.on_reset();
        assert_eq!(*seen.borrow(), vec!["removeRecord", "reset"]);
    }
}
