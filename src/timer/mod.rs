pub mod controller;
pub mod state;

pub use controller::{QueueError, ServiceTimerController};
pub use state::ServiceTimerState;
