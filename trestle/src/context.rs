//! Call-scoped contexts.
//!
//! A [`CallContext`] carries the ambient facts of one remote call: an
//! optional deadline and a set of typed values. Contexts are immutable;
//! every `with_*` method derives a child that shares the rest of the chain,
//! so handing a context to another task is a cheap [`Arc`] clone and never
//! exposes anything to mutation behind the caller's back.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use metainfo::TypeMap;
use pin_project::pin_project;
use thiserror::Error;
use tokio::time::{sleep_until, Sleep};

/// An immutable, cheaply cloneable context scoped to a single call.
///
/// Derivations layer on top of their parent: a child can bind new values and
/// tighten the deadline, but can never change what an ancestor observes.
#[derive(Clone, Default)]
pub struct CallContext {
    inner: Option<Arc<Layer>>,
}

struct Layer {
    parent: CallContext,
    deadline: Option<Instant>,
    values: TypeMap,
}

impl CallContext {
    /// Creates an empty root context with no deadline and no values.
    #[inline]
    pub fn new() -> Self {
        Self { inner: None }
    }

    /// Derives a child context with `value` bound under its type.
    ///
    /// A later binding of the same type shadows an earlier one for lookups
    /// through the child; the ancestor context itself is untouched.
    pub fn with_value<T: Send + Sync + 'static>(&self, value: T) -> Self {
        let mut values = TypeMap::with_capacity(1);
        values.insert(value);
        self.child(None, values)
    }

    /// Returns the nearest binding of type `T` along the derivation chain.
    pub fn value<T: 'static>(&self) -> Option<&T> {
        let mut layer = self.inner.as_deref();
        while let Some(current) = layer {
            if let Some(value) = current.values.get::<T>() {
                return Some(value);
            }
            layer = current.parent.inner.as_deref();
        }
        None
    }

    /// Derives a child context bounded by `deadline`.
    ///
    /// If the chain already carries an earlier deadline, the earlier one
    /// stays in effect: a derivation can tighten a deadline, never extend it.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let effective = match self.deadline() {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        self.child(Some(effective), TypeMap::default())
    }

    /// Derives a child context whose deadline is `timeout` from now.
    ///
    /// A timeout too large to represent as an [`Instant`] behaves like no
    /// timeout at all.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.clone(),
        }
    }

    /// The effective deadline, if any derivation in the chain set one.
    pub fn deadline(&self) -> Option<Instant> {
        let mut layer = self.inner.as_deref();
        while let Some(current) = layer {
            if let Some(deadline) = current.deadline {
                return Some(deadline);
            }
            layer = current.parent.inner.as_deref();
        }
        None
    }

    /// Time left before the deadline.
    ///
    /// `None` when no deadline applies, zero once the deadline has passed.
    #[inline]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has passed. A context without a deadline never
    /// expires.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.deadline()
            .is_some_and(|deadline| deadline <= Instant::now())
    }

    /// Runs `fut` under this context's deadline.
    ///
    /// Deadlines are cooperative: nothing is cancelled unless the execution
    /// path polls through an adapter like this one. The returned future
    /// resolves to `Err(DeadlineExceeded)` if the deadline fires first; a
    /// context without a deadline imposes no bound.
    pub fn until_deadline<F: Future>(&self, fut: F) -> UntilDeadline<F> {
        let sleep = match self.deadline() {
            Some(deadline) => {
                OptionPin::Some(sleep_until(tokio::time::Instant::from_std(deadline)))
            }
            None => OptionPin::None,
        };
        UntilDeadline { inner: fut, sleep }
    }

    fn child(&self, deadline: Option<Instant>, values: TypeMap) -> Self {
        Self {
            inner: Some(Arc::new(Layer {
                parent: self.clone(),
                deadline,
                values,
            })),
        }
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("deadline", &self.deadline())
            .finish_non_exhaustive()
    }
}

/// The context deadline passed before the guarded operation finished.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("context deadline exceeded")]
pub struct DeadlineExceeded;

/// Future returned by [`CallContext::until_deadline`].
#[pin_project]
pub struct UntilDeadline<F> {
    #[pin]
    inner: F,
    #[pin]
    sleep: OptionPin<Sleep>,
}

#[pin_project(project = OptionPinProj)]
enum OptionPin<T> {
    Some(#[pin] T),
    None,
}

impl<F: Future> Future for UntilDeadline<F> {
    type Output = Result<F::Output, DeadlineExceeded>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if let Poll::Ready(output) = this.inner.poll(cx) {
            return Poll::Ready(Ok(output));
        }

        if let OptionPinProj::Some(sleep) = this.sleep.project() {
            futures_util::ready!(sleep.poll(cx));
            return Poll::Ready(Err(DeadlineExceeded));
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TraceId(u64);

    #[derive(Debug, PartialEq)]
    struct Peer(&'static str);

    #[test]
    fn value_lookup_walks_the_chain() {
        let root = CallContext::new();
        assert!(root.value::<TraceId>().is_none());

        let ctx = root.with_value(TraceId(7)).with_value(Peer("10.0.0.1"));
        assert_eq!(ctx.value::<TraceId>(), Some(&TraceId(7)));
        assert_eq!(ctx.value::<Peer>(), Some(&Peer("10.0.0.1")));

        // The root never sees bindings made on descendants.
        assert!(root.value::<TraceId>().is_none());
    }

    #[test]
    fn newer_binding_shadows_older() {
        let ctx = CallContext::new().with_value(TraceId(1));
        let derived = ctx.with_value(TraceId(2));

        assert_eq!(derived.value::<TraceId>(), Some(&TraceId(2)));
        assert_eq!(ctx.value::<TraceId>(), Some(&TraceId(1)));
    }

    #[test]
    fn deadline_can_only_tighten() {
        let now = Instant::now();
        let near = now + Duration::from_secs(1);
        let far = now + Duration::from_secs(60);

        let ctx = CallContext::new().with_deadline(near);
        assert_eq!(ctx.deadline(), Some(near));

        // Deriving with a later deadline keeps the earlier one.
        let extended = ctx.with_deadline(far);
        assert_eq!(extended.deadline(), Some(near));

        let tightened = ctx.with_deadline(now);
        assert_eq!(tightened.deadline(), Some(now));
    }

    #[test]
    fn deadline_survives_value_layers() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let ctx = CallContext::new()
            .with_deadline(deadline)
            .with_value(TraceId(3));

        assert_eq!(ctx.deadline(), Some(deadline));
        assert!(!ctx.is_expired());
        assert!(ctx.remaining().unwrap() <= Duration::from_secs(5));
    }

    #[test]
    fn no_deadline_means_unbounded() {
        let ctx = CallContext::new();
        assert_eq!(ctx.deadline(), None);
        assert_eq!(ctx.remaining(), None);
        assert!(!ctx.is_expired());
    }

    #[test]
    fn passed_deadline_reports_expired() {
        let ctx = CallContext::new().with_deadline(Instant::now());
        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn unrepresentable_timeout_degrades_to_unbounded() {
        let ctx = CallContext::new().with_timeout(Duration::MAX);
        assert_eq!(ctx.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn until_deadline_lets_fast_futures_through() {
        let ctx = CallContext::new().with_timeout(Duration::from_secs(10));
        let out = ctx.until_deadline(async { 42 }).await;
        assert_eq!(out, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn until_deadline_fires_on_expiry() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(50));
        let out = ctx.until_deadline(std::future::pending::<()>()).await;
        assert_eq!(out, Err(DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn until_deadline_without_deadline_never_fires() {
        let ctx = CallContext::new();
        let out = ctx
            .until_deadline(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                "done"
            })
            .await;
        assert_eq!(out, Ok("done"));
    }
}
