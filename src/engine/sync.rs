//! Externally supplied critical-section wrappers.

/// Which engine operation a critical section is wrapping.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GateOp {
    /// A throwing fire request.
    Fire,
    /// A non-throwing fire request.
    TryFire,
    /// A forced transition.
    Force,
    /// A reset.
    Reset,
}

/// Critical-section wrapper around every fire, force and reset call.
///
/// The engine has no internal locking: without a gate, concurrent calls
/// from multiple threads are undefined by contract. Installing a gate via
/// [`set_synchronizer`](crate::StateMachine::set_synchronizer) delegates
/// mutual exclusion to the caller.
///
/// Implementations must invoke `section` exactly once, synchronously, on
/// the calling thread. A gate that declines to run the section makes the
/// wrapped operation report
/// [`FireError::GateDeclined`](crate::FireError::GateDeclined) (or, for
/// `try_fire`, return `false`).
///
/// # Example
///
/// ```rust
/// use statik::{GateOp, SynchronizationGate};
/// use std::sync::Mutex;
///
/// struct MutexGate(Mutex<()>);
///
/// impl SynchronizationGate for MutexGate {
///     fn critical(&self, _op: GateOp, section: &mut dyn FnMut()) {
///         let _held = self.0.lock().unwrap();
///         section();
///     }
/// }
/// ```
pub trait SynchronizationGate: Send + Sync {
    /// Run `section` inside the gate's critical section.
    fn critical(&self, op: GateOp, section: &mut dyn FnMut());
}
