//! Statik: a hierarchical state machine engine
//!
//! Statik runs trees of nested state machines: any state may own a child
//! machine that is entered and exited with it. Transitions are declared
//! up front with guards and handlers, events may carry a typed payload,
//! and handler failures are contained as machine-wide faults instead of
//! unwinding through the engine.
//!
//! # Core Concepts
//!
//! - **Hierarchy**: states own nested machines; entering a state
//!   activates its child machine at that machine's initial state
//! - **Guards**: pure payload predicates that pick among candidate edges
//! - **Reentrancy**: handlers queue follow-up events that run, in order,
//!   after the current transition completes
//! - **Checkpoints**: the active configuration round-trips through a
//!   name-based [`StatePath`]
//!
//! # Example
//!
//! ```rust
//! use statik::{MachineBuilder, TransitionBuilder};
//!
//! let mut b: MachineBuilder = MachineBuilder::new("player");
//! let idle = b.state("idle");
//! let running = b.state("running");
//! let stopped = b.state("stopped");
//! b.initial(idle);
//!
//! let start = b.event("start");
//! let stop = b.event("stop");
//! b.transition(TransitionBuilder::new().on(start).from(idle).to(running))
//!     .unwrap();
//! b.transition(TransitionBuilder::new().on(stop).from(running).to(stopped))
//!     .unwrap();
//!
//! let mut player = b.build().unwrap();
//! player.fire(start).unwrap();
//! assert_eq!(player.current_state(), running);
//!
//! assert!(player.try_fire(stop));
//! assert_eq!(player.serialize().to_string(), "stopped");
//! ```

pub mod builder;
pub mod checkpoint;
pub mod core;
pub mod engine;

// Re-export the working surface at the crate root
pub use builder::{BuildError, MachineBuilder, TransitionBuilder};
pub use checkpoint::{Checkpoint, CheckpointError, StatePath, CHECKPOINT_VERSION};
pub use core::{
    EventId, Fault, FaultedComponent, FireError, FireMethod, GroupId, Guard, HandlerError,
    HandlerResult, MachineId, StateId, TransitionContext,
};
pub use engine::{
    GateOp, StateMachine, SynchronizationGate, TransitionEvent, TransitionNotFoundEvent,
};
