//! The pure core of the service queue: elapsed-time arithmetic over pause
//! intervals, the status state machine, and duration-based severity. No I/O
//! and no clocks; `now` is always a parameter.

pub mod elapsed;
pub mod severity;
pub mod transition;

pub use elapsed::active_seconds;
pub use severity::{classify, Severity};
pub use transition::{apply, plan, PauseEffect, TransitionError, TransitionInput, TransitionPlan};
