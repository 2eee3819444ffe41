//! Handle-indexed registry of live objects.
//!
//! A [`Registry`] is an arena: callers hand it an object and get back an
//! opaque [`Handle`], the index under which the object can later be looked
//! up or released. Handles are allocated from a counter that starts at 1 and
//! only moves forward, so:
//!
//! - the null handle (`0`) is never issued;
//! - a released handle value is never handed out again by the same registry.
//!
//! The registry is not a process-wide global. Whoever owns the process
//! creates one and passes it to the operations that need it.

use std::collections::HashMap;
use std::sync::Mutex;

use ferry_types::Handle;
use tracing::trace;

struct Slots<T> {
    next: u64,
    entries: HashMap<Handle, T>,
}

/// A concurrency-safe mapping from handles to objects.
///
/// Lookups return a clone of the stored value, so `T` is normally an `Arc`
/// or an enum of `Arc`s. All mutations are serialized by a single mutex.
pub struct Registry<T> {
    slots: Mutex<Slots<T>>,
}

impl<T: Clone> Registry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                next: 1,
                entries: HashMap::new(),
            }),
        }
    }

    /// Store `value` and return a fresh handle for it.
    pub fn add(&self, value: T) -> Handle {
        let mut slots = self.slots.lock().expect("registry lock poisoned");
        let handle = Handle::from_raw(slots.next);
        slots.next += 1;
        slots.entries.insert(handle, value);
        trace!(%handle, live = slots.entries.len(), "handle added");
        handle
    }

    /// Look up a live handle.
    pub fn get(&self, handle: Handle) -> Option<T> {
        if handle.is_null() {
            return None;
        }
        let slots = self.slots.lock().expect("registry lock poisoned");
        slots.entries.get(&handle).cloned()
    }

    /// Release a handle, returning the object it referred to.
    ///
    /// The registry's reference is dropped with the returned value; the
    /// object is destroyed once no other owner holds it.
    pub fn remove(&self, handle: Handle) -> Option<T> {
        let mut slots = self.slots.lock().expect("registry lock poisoned");
        let removed = slots.entries.remove(&handle);
        if removed.is_some() {
            trace!(%handle, live = slots.entries.len(), "handle removed");
        }
        removed
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.slots.lock().expect("registry lock poisoned").entries.len()
    }

    /// Returns `true` if no handle is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock().expect("registry lock poisoned");
        f.debug_struct("Registry")
            .field("live", &slots.entries.len())
            .field("next", &slots.next)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn add_and_get() {
        let reg = Registry::new();
        let h = reg.add("project");
        assert!(!h.is_null());
        assert_eq!(reg.get(h), Some("project"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn first_handle_is_one() {
        let reg = Registry::new();
        assert_eq!(reg.add(()).as_raw(), 1);
    }

    #[test]
    fn null_and_unknown_handles_miss() {
        let reg: Registry<u32> = Registry::new();
        reg.add(1);
        assert_eq!(reg.get(Handle::NULL), None);
        assert_eq!(reg.get(Handle::from_raw(99)), None);
    }

    #[test]
    fn removed_handle_misses() {
        let reg = Registry::new();
        let h = reg.add(5u8);
        assert_eq!(reg.remove(h), Some(5));
        assert_eq!(reg.get(h), None);
        assert_eq!(reg.remove(h), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn handles_are_not_reused() {
        let reg = Registry::new();
        let a = reg.add('a');
        reg.remove(a);
        let b = reg.add('b');
        assert_ne!(a, b);
        assert_eq!(reg.get(a), None);
        assert_eq!(reg.get(b), Some('b'));
    }

    #[test]
    fn remove_drops_last_reference() {
        let reg = Registry::new();
        let value = Arc::new(());
        let h = reg.add(Arc::clone(&value));
        assert_eq!(Arc::strong_count(&value), 2);
        drop(reg.remove(h));
        assert_eq!(Arc::strong_count(&value), 1);
    }

    #[test]
    fn removed_handle_is_gone_others_remain() {
        let reg = Registry::new();
        let ids: Vec<_> = (0..5).map(|i| reg.add(i)).collect();
        reg.remove(ids[2]);
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.get(ids[2]), None);
        assert_eq!(reg.get(ids[0]), Some(0));
        assert_eq!(reg.get(ids[4]), Some(4));
    }

    #[test]
    fn concurrent_adds_yield_distinct_handles() {
        let reg = Arc::new(Registry::new());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || (0..100).map(|i| reg.add(t * 1000 + i)).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for t in threads {
            for h in t.join().expect("thread should not panic") {
                assert!(seen.insert(h), "duplicate handle {h}");
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(reg.len(), 800);
    }

    #[test]
    fn debug_format() {
        let reg = Registry::new();
        reg.add(1);
        let dbg = format!("{reg:?}");
        assert!(dbg.contains("live: 1"));
        assert!(dbg.contains("next: 2"));
    }
}
