//! Cancellable execution scopes.
//!
//! A [`Scope`] bounds the lifetime of one operation. Scopes form a strict
//! tree: cancelling a scope cancels its whole subtree, but never its
//! ancestors or siblings.
//!
//! ```
//! use ferry_scope::Scope;
//!
//! let project = Scope::root();
//! let upload = project.child();
//! let download = project.child();
//!
//! upload.cancel();
//! assert!(upload.is_cancelled());
//! assert!(!project.is_cancelled());
//! assert!(!download.is_cancelled());
//!
//! project.cancel();
//! assert!(download.is_cancelled());
//! ```

use std::fmt;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The scope was cancelled before the operation completed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// A node in the cancellation tree.
///
/// Cloning a `Scope` yields another reference to the same node, not a child.
#[derive(Clone)]
pub struct Scope {
    token: CancellationToken,
    depth: u32,
}

impl Scope {
    /// Create a new root scope with no parent.
    pub fn root() -> Self {
        Self {
            token: CancellationToken::new(),
            depth: 0,
        }
    }

    /// Derive a child scope.
    ///
    /// The child is cancelled whenever this scope is, and can be cancelled
    /// on its own without affecting this scope.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            depth: self.depth + 1,
        }
    }

    /// Cancel this scope and every scope derived from it.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(depth = self.depth, "scope cancelled");
        }
        self.token.cancel();
    }

    /// Returns `true` once this scope or any ancestor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail with [`Cancelled`] if the scope has been cancelled.
    pub fn ensure_active(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Distance from the root scope.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Wait until the scope is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("depth", &self.depth)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A scope that is cancelled when dropped.
///
/// Sessions own their scope through an `OwnedScope`, so releasing the
/// session promptly cancels any I/O still running under it.
#[derive(Debug)]
pub struct OwnedScope {
    scope: Scope,
}

impl OwnedScope {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl std::ops::Deref for OwnedScope {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        &self.scope
    }
}

impl Drop for OwnedScope {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn root_starts_active() {
        let root = Scope::root();
        assert!(!root.is_cancelled());
        assert!(root.ensure_active().is_ok());
        assert_eq!(root.depth(), 0);
    }

    #[test]
    fn parent_cancel_reaches_grandchildren() {
        let root = Scope::root();
        let child = root.child();
        let grandchild = child.child();
        assert_eq!(grandchild.depth(), 2);

        root.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
        assert_eq!(grandchild.ensure_active(), Err(Cancelled));
    }

    #[test]
    fn child_cancel_leaves_parent_and_siblings() {
        let root = Scope::root();
        let a = root.child();
        let b = root.child();
        let a_child = a.child();

        a.cancel();
        assert!(a.is_cancelled());
        assert!(a_child.is_cancelled());
        assert!(!root.is_cancelled());
        assert!(!b.is_cancelled());
    }

    #[test]
    fn clone_shares_node() {
        let root = Scope::root();
        let alias = root.clone();
        alias.cancel();
        assert!(root.is_cancelled());
    }

    #[test]
    fn child_of_cancelled_scope_is_cancelled() {
        let root = Scope::root();
        root.cancel();
        assert!(root.child().is_cancelled());
    }

    #[test]
    fn owned_scope_cancels_on_drop() {
        let root = Scope::root();
        let owned = OwnedScope::new(root.child());
        let observer = owned.scope().clone();
        assert!(!observer.is_cancelled());

        drop(owned);
        assert!(observer.is_cancelled());
        assert!(!root.is_cancelled());
    }

    #[test]
    fn debug_format() {
        let dbg = format!("{:?}", Scope::root().child());
        assert!(dbg.contains("depth: 1"));
        assert!(dbg.contains("cancelled: false"));
    }

    #[tokio::test]
    async fn cancelled_future_resolves() {
        let root = Scope::root();
        let child = root.child();
        let waiter = tokio::spawn(async move { child.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        root.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("child should observe cancellation")
            .unwrap();
    }
}
