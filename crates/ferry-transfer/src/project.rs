use std::fmt;
use std::sync::Arc;

use ferry_scope::{OwnedScope, Scope};
use ferry_store::ObjectStore;

/// An opened connection to an object store.
///
/// Every transfer started from a project runs under a child of the
/// project's root scope, so closing the project cancels all of them.
pub struct Project {
    scope: OwnedScope,
    store: Arc<dyn ObjectStore>,
}

impl Project {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            scope: OwnedScope::new(Scope::root()),
            store,
        }
    }

    /// The project's root scope.
    pub fn scope(&self) -> &Scope {
        self.scope.scope()
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.scope.is_cancelled()
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_store::InMemoryObjectStore;

    #[test]
    fn cancelling_root_cancels_children() {
        let project = Project::new(Arc::new(InMemoryObjectStore::new()));
        let child = project.scope().child();
        assert!(!project.is_closed());

        project.scope().cancel();
        assert!(project.is_closed());
        assert!(child.is_cancelled());
    }

    #[test]
    fn drop_cancels_children() {
        let project = Project::new(Arc::new(InMemoryObjectStore::new()));
        let child = project.scope().child();
        drop(project);
        assert!(child.is_cancelled());
    }
}
