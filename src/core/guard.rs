//! Guard predicates for controlling transitions.
//!
//! Guards are pure boolean functions over the event payload that determine
//! whether a candidate transition may execute. They enable declarative
//! transition rules without side effects.

/// Pure predicate that decides whether a candidate transition applies.
///
/// When an event is fired, the candidate edges registered for the current
/// state are tried in registration order; the first edge whose guard
/// accepts the payload (or that has no guard) is taken. Guards must be
/// side-effect-free: a rejecting guard is evaluated and discarded, and the
/// engine assumes that leaves no trace.
///
/// # Example
///
/// ```rust
/// use statik::Guard;
///
/// let positive = Guard::new(|amount: &i64| *amount > 0);
///
/// assert!(positive.check(&10));
/// assert!(!positive.check(&-3));
/// ```
pub struct Guard<P> {
    predicate: Box<dyn Fn(&P) -> bool + Send + Sync>,
}

impl<P> Guard<P> {
    /// Create a guard from a pure predicate over the event payload.
    ///
    /// The predicate must be deterministic and thread-safe (`Send + Sync`).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Evaluate the guard against an event payload.
    pub fn check(&self, payload: &P) -> bool {
        (self.predicate)(payload)
    }
}

impl<P> std::fmt::Debug for Guard<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Guard")
    }
}
