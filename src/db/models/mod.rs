pub mod pause;
pub mod service_record;

pub use pause::PauseInterval;
pub use service_record::{ServiceRecord, ServiceStatus};
