//! Publishers: periodic feeds and event-driven broadcasts.

pub mod delivery;
pub mod events;
pub mod periodic;

pub use delivery::DeliveryReport;
pub use events::EventPublisher;
pub use periodic::{CycleOutcome, PeriodicPublisher};
