//! Poison-tolerant access to the `RwLock`s guarding the cache and the
//! in-memory store.
//!
//! Both hold plain data with no cross-field invariants a panicking writer
//! could break, so a poisoned lock is recovered and the access logged.

use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    owner: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), owner, op, "read")
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    owner: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), owner, op, "write")
}

fn recover<G>(result: LockResult<G>, owner: &'static str, op: &'static str, access: &str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target = "bookshelf::lock",
            owner,
            op,
            access,
            "lock poisoned by an earlier panic; continuing with current contents"
        );
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn poisoned_lock_still_yields_guards() {
        let lock = RwLock::new(vec![1]);
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let mut guard = lock.write().expect("lock");
            guard.push(2);
            panic!("poison");
        }));
        assert!(lock.is_poisoned());

        rw_write(&lock, "test", "push").push(3);
        assert_eq!(*rw_read(&lock, "test", "read"), vec![1, 2, 3]);
    }
}
