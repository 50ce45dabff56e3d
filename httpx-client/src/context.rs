//! Request context: cancellation, deadline and request-scoped values.
//!
//! A [`Context`] is an immutable chain. Deriving a child (`with_value`,
//! `with_deadline`, `with_cancel`) never changes the parent, and children
//! see everything attached to their ancestors.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cancellation, deadline and value carrier bound to a finalized request.
#[derive(Clone, Default)]
pub struct Context {
    node: Option<Arc<Node>>,
}

struct Node {
    parent: Context,
    kind: Kind,
}

enum Kind {
    Value {
        key: String,
        value: Arc<dyn Any + Send + Sync>,
    },
    Deadline(Instant),
    Cancel(Arc<AtomicBool>),
}

impl Context {
    /// The empty root context: no values, no deadline, never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Whether this is the background context.
    pub fn is_background(&self) -> bool {
        self.node.is_none()
    }

    fn derive(&self, kind: Kind) -> Self {
        Self {
            node: Some(Arc::new(Node {
                parent: self.clone(),
                kind,
            })),
        }
    }

    /// Child context carrying `value` under `key`.
    pub fn with_value<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> Self {
        self.derive(Kind::Value {
            key: key.into(),
            value: Arc::new(value),
        })
    }

    /// Child context with a deadline. An earlier inherited deadline wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.derive(Kind::Deadline(deadline))
    }

    /// Child context whose deadline is `timeout` from now.
    ///
    /// A timeout too large to represent as an [`Instant`] adds no
    /// deadline; the result is a plain clone of `self`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.clone(),
        }
    }

    /// Child context that can be cancelled through the returned handle.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        let handle = CancelHandle {
            flag: Arc::clone(&flag),
        };
        (self.derive(Kind::Cancel(flag)), handle)
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(self.node.as_deref(), |node| node.parent.node.as_deref())
    }

    /// Look up the nearest value stored under `key` with type `T`.
    pub fn value<T: Any>(&self, key: &str) -> Option<&T> {
        self.nodes().find_map(|node| match &node.kind {
            Kind::Value { key: k, value } if k == key => value.downcast_ref::<T>(),
            _ => None,
        })
    }

    /// The earliest deadline in the chain.
    pub fn deadline(&self) -> Option<Instant> {
        self.nodes()
            .filter_map(|node| match node.kind {
                Kind::Deadline(deadline) => Some(deadline),
                _ => None,
            })
            .min()
    }

    /// Time left before the deadline; zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline().is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Whether this context or any ancestor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.nodes().any(|node| match &node.kind {
            Kind::Cancel(flag) => flag.load(Ordering::Acquire),
            _ => false,
        })
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self
            .nodes()
            .filter_map(|node| match &node.kind {
                Kind::Value { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect();

        f.debug_struct("Context")
            .field("values", &keys)
            .field("deadline", &self.deadline())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Cancels the context returned alongside it by [`Context::with_cancel`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancel the context and all contexts derived from it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background() {
        let ctx = Context::background();
        assert!(ctx.is_background());
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.deadline(), None);
        assert_eq!(ctx.value::<String>("key"), None);
    }

    #[test]
    fn test_values_are_inherited_and_shadowed() {
        let parent = Context::background().with_value("key", "value".to_string());
        let child = parent.with_value("other", 7u32);
        let shadow = child.with_value("key", "shadowed".to_string());

        assert!(!child.is_background());
        assert_eq!(child.value::<String>("key").map(String::as_str), Some("value"));
        assert_eq!(child.value::<u32>("other"), Some(&7));
        assert_eq!(shadow.value::<String>("key").map(String::as_str), Some("shadowed"));
        assert_eq!(parent.value::<u32>("other"), None);
    }

    #[test]
    fn test_value_type_mismatch() {
        let ctx = Context::background().with_value("key", 1i64);
        assert_eq!(ctx.value::<String>("key"), None);
    }

    #[test]
    fn test_earliest_deadline_wins() {
        let soon = Instant::now() + Duration::from_secs(1);
        let later = soon + Duration::from_secs(60);
        let ctx = Context::background().with_deadline(soon).with_deadline(later);

        assert_eq!(ctx.deadline(), Some(soon));
        assert!(ctx.remaining().unwrap() <= Duration::from_secs(1));
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = Context::background().with_timeout(Duration::ZERO);
        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_unrepresentable_timeout_adds_no_deadline() {
        let ctx = Context::background().with_timeout(Duration::MAX);
        assert!(ctx.is_background());
        assert_eq!(ctx.deadline(), None);

        let soon = Instant::now() + Duration::from_secs(5);
        let bounded = Context::background()
            .with_deadline(soon)
            .with_timeout(Duration::MAX);
        assert_eq!(bounded.deadline(), Some(soon));
        assert!(!bounded.is_expired());
    }

    #[test]
    fn test_cancel_propagates_to_children() {
        let (ctx, handle) = Context::background().with_cancel();
        let child = ctx.with_value("key", "value");

        assert!(!child.is_cancelled());
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(ctx.is_cancelled());
        assert!(child.is_cancelled());
    }
}
