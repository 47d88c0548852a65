//! Ports for the collaborators the hub consumes.

pub mod outbound;

pub use outbound::{
    DataProvider, FixedTimeSource, SystemTimeSource, TimeSource, UserRecord, UserStore,
};
