//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::key::Key;

pub(crate) const MAX_DEPTH: usize = 1024;

// Thread-local resolving stack, shared by every container on the thread.
// Entries are tagged with the owning container's id so two containers never
// see each other's keys.
thread_local! {
    static RESOLVING: RefCell<Vec<(usize, Key)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a key as under construction until dropped.
///
/// Guards nest strictly, so dropping always pops the entry pushed by
/// [`StackGuard::enter`], whether resolution returned normally, failed, or
/// unwound.
pub(crate) struct StackGuard {
    container: usize,
}

impl StackGuard {
    /// Pushes `key` onto the resolving stack of `container`.
    ///
    /// Fails with [`DiError::Circular`] when the key is already being
    /// resolved by the same container; the chain lists every key on the
    /// stack followed by the re-entering key.
    pub(crate) fn enter(container: usize, key: &Key) -> DiResult<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            let mut depth = 0;
            let mut seen = false;
            for (owner, entry) in stack.iter() {
                if *owner == container {
                    depth += 1;
                    seen |= entry == key;
                }
            }

            if seen {
                let mut chain: Vec<String> = stack
                    .iter()
                    .filter(|(owner, _)| *owner == container)
                    .map(|(_, entry)| entry.to_string())
                    .collect();
                chain.push(key.to_string());
                return Err(DiError::Circular(chain));
            }

            if depth >= MAX_DEPTH {
                return Err(DiError::DepthExceeded(MAX_DEPTH));
            }

            stack.push((container, key.clone()));
            Ok(StackGuard { container })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        // try_with: the thread-local may already be gone during thread teardown
        let _ = RESOLVING.try_with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|(owner, _)| *owner == self.container) {
                stack.remove(pos);
            }
        });
    }
}

/// Keys the current thread is resolving for `container`, outermost first.
pub(crate) fn resolving_keys(container: usize) -> Vec<Key> {
    RESOLVING.with(|stack| {
        stack
            .borrow()
            .iter()
            .filter(|(owner, _)| *owner == container)
            .map(|(_, key)| key.clone())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentering_key_reports_full_chain() {
        let a = Key::from("A");
        let b = Key::from("B");
        let _ga = StackGuard::enter(1, &a).unwrap();
        let _gb = StackGuard::enter(1, &b).unwrap();

        match StackGuard::enter(1, &a) {
            Err(DiError::Circular(chain)) => assert_eq!(chain, vec!["A", "B", "A"]),
            _ => panic!("expected circular error"),
        }
    }

    #[test]
    fn containers_do_not_share_entries() {
        let a = Key::from("A");
        let _outer = StackGuard::enter(10, &a).unwrap();
        let inner = StackGuard::enter(11, &a);
        assert!(inner.is_ok());
        drop(inner);
        assert_eq!(resolving_keys(11), Vec::<Key>::new());
        assert_eq!(resolving_keys(10), vec![a]);
    }

    #[test]
    fn guard_pops_on_drop() {
        let key = Key::from("Service");
        {
            let _guard = StackGuard::enter(20, &key).unwrap();
            assert_eq!(resolving_keys(20).len(), 1);
        }
        assert!(resolving_keys(20).is_empty());
    }
}
