//! Service queue engine for veterinary clinic scheduling: the status
//! lifecycle for queued services, elapsed-active-time over pause intervals,
//! per-record display tickers, and a SQLite-backed record store.

pub mod db;
pub mod events;
pub mod lifecycle;
pub mod queue;
pub mod settings;
pub mod timer;

pub use db::models::{PauseInterval, ServiceRecord, ServiceStatus};
pub use db::Database;
pub use events::{EventBus, QueueEvent};
pub use lifecycle::{Severity, TransitionError, TransitionInput};
pub use queue::{NewServiceRecord, ServiceQueue};
pub use timer::{QueueError, ServiceTimerController, ServiceTimerState};
